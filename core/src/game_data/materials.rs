//! Engineering material catalog.
//!
//! Three disjoint closed enumerations (raw, encoded, manufactured). Journal
//! records spell names in arbitrary case, so every lookup lowercases first
//! and then probes a compile-time `phf` table.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Declares one material enumeration together with its lookup table,
/// canonical names and grades.
macro_rules! material_catalog {
    (
        $(#[$meta:meta])*
        $enum:ident, $table:ident {
            $( $variant:ident = $key:tt, $grade:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum {
            $( $variant, )*
        }

        static $table: phf::Map<&'static str, $enum> = phf::phf_map! {
            $( $key => $enum::$variant, )*
        };

        impl $enum {
            pub const ALL: &'static [$enum] = &[ $( $enum::$variant, )* ];

            /// Canonical (lowercase) journal name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $enum::$variant => $key, )*
                }
            }

            /// Material grade, `None` for ungraded (Guardian, Thargoid, ancient) materials.
            pub fn grade(self) -> Option<u8> {
                match self {
                    $( $enum::$variant => $grade, )*
                }
            }

            /// Case-insensitive lookup.
            pub fn from_name(name: &str) -> Option<Self> {
                $table.get(name.to_ascii_lowercase().as_str()).copied()
            }
        }

        impl fmt::Display for $enum {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $enum {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for $enum {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                Self::from_name(&name).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} material: {name}",
                        stringify!($enum)
                    ))
                })
            }
        }
    };
}

material_catalog! {
    /// Raw materials, mined or collected from surface deposits.
    RawMaterial, RAW_MATERIALS {
        Antimony = "antimony", Some(4);
        Arsenic = "arsenic", Some(2);
        Boron = "boron", Some(3);
        Cadmium = "cadmium", Some(3);
        Carbon = "carbon", Some(1);
        Chromium = "chromium", Some(2);
        Germanium = "germanium", Some(2);
        Iron = "iron", Some(1);
        Lead = "lead", Some(1);
        Manganese = "manganese", Some(2);
        Mercury = "mercury", Some(3);
        Molybdenum = "molybdenum", Some(3);
        Nickel = "nickel", Some(1);
        Niobium = "niobium", Some(3);
        Phosphorus = "phosphorus", Some(1);
        Polonium = "polonium", Some(4);
        Rhenium = "rhenium", Some(1);
        Ruthenium = "ruthenium", Some(4);
        Selenium = "selenium", Some(4);
        Sulphur = "sulphur", Some(1);
        Technetium = "technetium", Some(4);
        Tellurium = "tellurium", Some(4);
        Tin = "tin", Some(3);
        Tungsten = "tungsten", Some(3);
        Vanadium = "vanadium", Some(2);
        Yttrium = "yttrium", Some(4);
        Zinc = "zinc", Some(2);
        Zirconium = "zirconium", Some(2);
    }
}

material_catalog! {
    /// Encoded materials (data), gathered by scanning.
    EncodedMaterial, ENCODED_MATERIALS {
        AdaptiveEncryptors = "adaptiveencryptors", Some(5);
        AncientBiologicalData = "ancientbiologicaldata", None;
        AncientCulturalData = "ancientculturaldata", None;
        AncientHistoricalData = "ancienthistoricaldata", None;
        AncientLanguageData = "ancientlanguagedata", None;
        AncientTechnologicalData = "ancienttechnologicaldata", None;
        ArchivedEmissionData = "archivedemissiondata", Some(2);
        BulkScanData = "bulkscandata", Some(1);
        ClassifiedScanData = "classifiedscandata", Some(5);
        CompactEmissionsData = "compactemissionsdata", Some(5);
        ConsumerFirmware = "consumerfirmware", Some(2);
        DataminedWake = "dataminedwake", Some(5);
        DecodedEmissionData = "decodedemissiondata", Some(4);
        DisruptedWakeEchoes = "disruptedwakeechoes", Some(1);
        EmbeddedFirmware = "embeddedfirmware", Some(5);
        EmissionData = "emissiondata", Some(3);
        EncodedScanData = "encodedscandata", Some(4);
        EncryptedFiles = "encryptedfiles", Some(1);
        EncryptionArchives = "encryptionarchives", Some(4);
        EncryptionCodes = "encryptioncodes", Some(2);
        FsdTelemetry = "fsdtelemetry", Some(2);
        GuardianModuleBlueprint = "guardian_moduleblueprint", None;
        HyperspaceTrajectories = "hyperspacetrajectories", Some(4);
        IndustrialFirmware = "industrialfirmware", Some(3);
        LegacyFirmware = "legacyfirmware", Some(1);
        ScanArchives = "scanarchives", Some(2);
        ScanDatabanks = "scandatabanks", Some(3);
        ScrambledEmissionData = "scrambledemissiondata", Some(1);
        SecurityFirmware = "securityfirmware", Some(4);
        ShieldCycleRecordings = "shieldcyclerecordings", Some(1);
        ShieldDensityReports = "shielddensityreports", Some(3);
        ShieldFrequencyData = "shieldfrequencydata", Some(5);
        ShieldPatternAnalysis = "shieldpatternanalysis", Some(4);
        ShieldSoakAnalysis = "shieldsoakanalysis", Some(2);
        SymmetricKeys = "symmetrickeys", Some(3);
        WakeSolutions = "wakesolutions", Some(3);
    }
}

material_catalog! {
    /// Manufactured materials, salvaged from wrecks and signal sources.
    ManufacturedMaterial, MANUFACTURED_MATERIALS {
        BasicConductors = "basicconductors", Some(1);
        BiotechConductors = "biotechconductors", Some(5);
        ChemicalDistillery = "chemicaldistillery", Some(3);
        ChemicalManipulators = "chemicalmanipulators", Some(4);
        ChemicalProcessors = "chemicalprocessors", Some(2);
        ChemicalStorageUnits = "chemicalstorageunits", Some(1);
        CompactComposites = "compactcomposites", Some(1);
        CompoundShielding = "compoundshielding", Some(4);
        ConductiveCeramics = "conductiveceramics", Some(3);
        ConductiveComponents = "conductivecomponents", Some(2);
        ConductivePolymers = "conductivepolymers", Some(4);
        ConfigurableComponents = "configurablecomponents", Some(4);
        CrystalShards = "crystalshards", Some(1);
        ElectrochemicalArrays = "electrochemicalarrays", Some(3);
        ExquisiteFocusCrystals = "exquisitefocuscrystals", Some(5);
        FedCoreComposites = "fedcorecomposites", Some(5);
        FedProprietaryComposites = "fedproprietarycomposites", Some(4);
        FilamentComposites = "filamentcomposites", Some(2);
        FocusCrystals = "focuscrystals", Some(3);
        GalvanisingAlloys = "galvanisingalloys", Some(2);
        GridResistors = "gridresistors", Some(1);
        GuardianPowerCell = "guardian_powercell", None;
        GuardianPowerConduit = "guardian_powerconduit", None;
        GuardianSentinelWeaponParts = "guardian_sentinel_weaponparts", None;
        GuardianSentinelWreckageComponents = "guardian_sentinel_wreckagecomponents", None;
        GuardianTechComponent = "guardian_techcomponent", None;
        HeatConductionWiring = "heatconductionwiring", Some(1);
        HeatDispersionPlate = "heatdispersionplate", Some(2);
        HeatExchangers = "heatexchangers", Some(3);
        HeatResistantCeramics = "heatresistantceramics", Some(2);
        HeatVanes = "heatvanes", Some(4);
        HighDensityComposites = "highdensitycomposites", Some(3);
        HybridCapacitors = "hybridcapacitors", Some(2);
        ImperialShielding = "imperialshielding", Some(5);
        ImprovisedComponents = "improvisedcomponents", Some(5);
        MechanicalComponents = "mechanicalcomponents", Some(3);
        MechanicalEquipment = "mechanicalequipment", Some(2);
        MechanicalScrap = "mechanicalscrap", Some(1);
        MilitaryGradeAlloys = "militarygradealloys", Some(5);
        MilitarySupercapacitors = "militarysupercapacitors", Some(5);
        PharmaceuticalIsolators = "pharmaceuticalisolators", Some(5);
        PhaseAlloys = "phasealloys", Some(3);
        PolymerCapacitors = "polymercapacitors", Some(4);
        PrecipitatedAlloys = "precipitatedalloys", Some(3);
        ProtoHeatRadiators = "protoheatradiators", Some(5);
        ProtoLightAlloys = "protolightalloys", Some(4);
        ProtoRadiolicAlloys = "protoradiolicalloys", Some(5);
        RefinedFocusCrystals = "refinedfocuscrystals", Some(4);
        SalvagedAlloys = "salvagedalloys", Some(1);
        ShieldEmitters = "shieldemitters", Some(2);
        ShieldingSensors = "shieldingsensors", Some(3);
        TemperedAlloys = "temperedalloys", Some(1);
        TgCausticCrystal = "tg_causticcrystal", None;
        TgCausticGeneratorParts = "tg_causticgeneratorparts", None;
        TgCausticShard = "tg_causticshard", None;
        TgPropulsionElement = "tg_propulsionelement", None;
        TgWreckageComponents = "tg_wreckagecomponents", None;
        ThermicAlloys = "thermicalloys", Some(4);
        UncutFocusCrystals = "uncutfocuscrystals", Some(2);
        UnknownCarapace = "unknowncarapace", None;
        UnknownEnergySource = "unknownenergysource", None;
        UnknownOrganicCircuitry = "unknownorganiccircuitry", None;
        WornShieldEmitters = "wornshieldemitters", Some(1);
    }
}

/// Any material, resolved to exactly one of the three categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Raw(RawMaterial),
    Encoded(EncodedMaterial),
    Manufactured(ManufacturedMaterial),
}

impl Material {
    /// Case-insensitive lookup across all three categories.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if let Some(m) = ENCODED_MATERIALS.get(lower.as_str()) {
            return Some(Material::Encoded(*m));
        }
        if let Some(m) = MANUFACTURED_MATERIALS.get(lower.as_str()) {
            return Some(Material::Manufactured(*m));
        }
        RAW_MATERIALS.get(lower.as_str()).map(|m| Material::Raw(*m))
    }

    pub fn name(self) -> &'static str {
        match self {
            Material::Raw(m) => m.name(),
            Material::Encoded(m) => m.name(),
            Material::Manufactured(m) => m.name(),
        }
    }

    pub fn grade(self) -> Option<u8> {
        match self {
            Material::Raw(m) => m.grade(),
            Material::Encoded(m) => m.grade(),
            Material::Manufactured(m) => m.grade(),
        }
    }

    /// Whether this is the top grade of its category (4 for raw, 5 otherwise).
    pub fn is_max_grade(self) -> Option<bool> {
        match self {
            Material::Raw(m) => m.grade().map(|g| g == 4),
            Material::Encoded(m) => m.grade().map(|g| g == 5),
            Material::Manufactured(m) => m.grade().map(|g| g == 5),
        }
    }

    /// Storage cap for graded materials: 350 - 50 * grade.
    pub fn cap(self) -> Option<i64> {
        self.grade().map(|g| 350 - 50 * i64::from(g))
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Material {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Material {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Material::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown material: {name}")))
    }
}
