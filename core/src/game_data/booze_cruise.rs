//! The booze-cruise carrier ladder, nearest-to-Rackham's-Peak first.

const LADDER: &[&str] = &[
    "HIP 58832",            // Rackham's Peak
    "HD 105341",            // carrier bottleneck
    "HD 104495",            // carrier parking
    "HIP 57784",
    "HIP 57478",
    "HIP 56843",
    "HD 104392",
    "HD 102779",
    "HD 102000",
    "HD 104785",
    "HD 105548",
    "HD 107865",
    "Plaa Trua WQ-C d13-0",
    "Plaa Trua QL-B c27-0",
    "Wregoe OP-D b58-0",
    "Wregoe ZE-B c28-2",
    "Gali",                 // Chadwick Dock
];

/// Ladder label (`N0`..`N16`) for a system, if it is on the ladder.
pub fn ladder_position(system: &str) -> Option<String> {
    LADDER
        .iter()
        .position(|s| *s == system)
        .map(|idx| format!("N{idx}"))
}
