use phf::{Map, phf_map};

/// Conventional handling of a MARTHE property keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub description: &'static str,
    /// Whether the property is conventionally estimated in log10 space.
    pub log_transform: bool,
}

static PROPERTIES: Map<&'static str, PropertyInfo> = phf_map! {
    "permh" => PropertyInfo { description: "horizontal permeability", log_transform: true },
    "kepon" => PropertyInfo { description: "aquitard vertical exchange coefficient", log_transform: true },
    "emmca" => PropertyInfo { description: "confined storage coefficient", log_transform: true },
    "emmli" => PropertyInfo { description: "unconfined storage coefficient", log_transform: true },
    "charg" => PropertyInfo { description: "hydraulic head", log_transform: false },
    "debit" => PropertyInfo { description: "cell flow rate", log_transform: false },
};

pub fn lookup(name: &str) -> Option<&'static PropertyInfo> {
    PROPERTIES.get(name.trim().to_ascii_lowercase().as_str())
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn log_transformed_by_default(name: &str) -> bool {
    lookup(name).is_some_and(|info| info.log_transform)
}
