mod booze_cruise;
mod materials;

pub use booze_cruise::ladder_position;
pub use materials::{EncodedMaterial, ManufacturedMaterial, Material, RawMaterial};
