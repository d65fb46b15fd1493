//! Static catalog of pollen codes known to the Google Pollen API
//!
//! Used as the default selection for locations stored without one, and to tell
//! pollen-type categories apart from individual plant codes.

/// Whether a code is a broad pollen type or a single plant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Listed under `pollenTypeInfo` (GRASS, TREE, WEED)
    Category,
    /// Listed under `plantInfo`
    Plant,
}

/// A code the service is known to report
#[derive(Debug, Clone, Copy)]
pub struct KnownCode {
    pub code: &'static str,
    pub kind: CodeKind,
}

const fn category(code: &'static str) -> KnownCode {
    KnownCode {
        code,
        kind: CodeKind::Category,
    }
}

const fn plant(code: &'static str) -> KnownCode {
    KnownCode {
        code,
        kind: CodeKind::Plant,
    }
}

/// Every known code, categories first
pub static CODES: [KnownCode; 19] = [
    category("GRASS"),
    category("TREE"),
    category("WEED"),
    plant("BIRCH"),
    plant("HAZEL"),
    plant("ALDER"),
    plant("MUGWORT"),
    plant("ASH"),
    plant("COTTONWOOD"),
    plant("OAK"),
    plant("PINE"),
    plant("OLIVE"),
    plant("GRAMINALES"),
    plant("RAGWEED"),
    plant("ELM"),
    plant("MAPLE"),
    plant("JUNIPER"),
    plant("CYPRESS_PINE"),
    plant("JAPANESE_CEDAR"),
];

/// Get a known code, case-insensitively
///
/// # Example
///
/// ```
/// use pollenwatch::data::{get_code, CodeKind};
///
/// assert_eq!(get_code("birch").map(|c| c.kind), Some(CodeKind::Plant));
/// ```
pub fn get_code(code: &str) -> Option<&'static KnownCode> {
    CODES.iter().find(|known| known.code.eq_ignore_ascii_case(code))
}

/// Get all known codes
pub fn all_codes() -> &'static [KnownCode] {
    &CODES
}

/// Category codes used when a stored location has no category selection
pub fn default_categories() -> Vec<String> {
    codes_of(CodeKind::Category)
}

/// Plant codes used when a stored location has no plant selection
pub fn default_plants() -> Vec<String> {
    codes_of(CodeKind::Plant)
}

fn codes_of(kind: CodeKind) -> Vec<String> {
    CODES
        .iter()
        .filter(|known| known.kind == kind)
        .map(|known| known.code.to_string())
        .collect()
}
