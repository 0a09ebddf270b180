//! Calibration settings loaded from a TOML file.
//!
//! The settings name the model, the properties to parameterize and their
//! estimation metadata, the observation record files, and the PEST control
//! options. Everything the `setup` and `forward` workflows do is driven
//! from here, so validation happens at load time rather than deep inside a
//! run.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::core::pest::control::{ParamTransform, UnknownTransformError};
use crate::core::utils::keywords;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("No parameters defined")]
    NoParameters,

    #[error("No observations defined")]
    NoObservations,

    #[error("Duplicate parameter '{name}'")]
    DuplicateParameter { name: String },

    #[error("Duplicate observation locality '{name}'")]
    DuplicateLocality { name: String },

    #[error("Parameter '{name}': lower bound {lower} is not below upper bound {upper}")]
    UnorderedBounds {
        name: String,
        lower: f64,
        upper: f64,
    },

    #[error("Parameter '{name}': default {value} lies outside [{lower}, {upper}]")]
    DefaultOutsideBounds {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Parameter '{name}': log transform requires a positive lower bound")]
    LogRequiresPositiveBounds { name: String },

    #[error("Parameter '{name}': {source}")]
    Transform {
        name: String,
        #[source]
        source: UnknownTransformError,
    },

    #[error("Parameter '{name}': zonation code 0 marks inactive cells")]
    ZeroIzoneCode { name: String },

    #[error("Parameter '{name}': pilot layer numbers are 1-based")]
    ZeroPilotLayer { name: String },

    #[error("Parameter '{name}': pilot spacing must be at least 1")]
    ZeroPilotSpacing { name: String },

    #[error("Observation file '{file}' has no usable stem")]
    BadObservationFile { file: PathBuf },

    #[error("Observation file '{file}': weight must be positive")]
    NonPositiveWeight { file: PathBuf },
}

/// Which zonation a parameter starts from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum IzoneSettings {
    /// Every active cell carries the given code.
    Uniform { uniform: i32 },
    /// Codes are read from a grid file of the model's shape.
    File { file: PathBuf },
}

impl Default for IzoneSettings {
    fn default() -> Self {
        IzoneSettings::Uniform { uniform: -1 }
    }
}

/// Regular pilot-point placement over one layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PilotSettings {
    /// 1-based layer number.
    pub layer: usize,
    /// Cell stride between pilot points.
    pub every: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSettings {
    /// MARTHE property keyword, also used as the PEST group name.
    pub name: String,
    /// Initial parameter value.
    pub default: f64,
    /// PEST transform keyword; defaults by property convention.
    #[serde(default)]
    pub transform: Option<String>,
    /// `[lower, upper]` estimation bounds.
    pub bounds: [f64; 2],
    #[serde(default)]
    pub izone: IzoneSettings,
    #[serde(default)]
    pub pilot: Vec<PilotSettings>,
}

impl ParamSettings {
    /// Resolves the transform keyword, falling back to the property
    /// registry convention when the settings are silent.
    pub fn resolved_transform(&self) -> Result<ParamTransform, UnknownTransformError> {
        match &self.transform {
            Some(word) => word.parse(),
            None if keywords::log_transformed_by_default(&self.name) => Ok(ParamTransform::Log),
            None => Ok(ParamTransform::None),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObsSettings {
    /// Observation record file (`.dat` or `.csv`).
    pub file: PathBuf,
    /// Locality name; defaults to the file stem.
    #[serde(default)]
    pub loc: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ObsSettings {
    /// Resolves the locality name.
    pub fn locality(&self) -> Result<String, SettingsError> {
        if let Some(loc) = &self.loc {
            return Ok(loc.clone());
        }
        self.file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SettingsError::BadObservationFile {
                file: self.file.clone(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    /// Path of the model's `.rma` file.
    pub rma: PathBuf,
    /// Simulator executable name, resolved on PATH.
    #[serde(default = "default_exe")]
    pub exe: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PestSettings {
    /// Control file name; defaults to `<model>.pst`.
    #[serde(default)]
    pub pst: Option<String>,
    #[serde(default = "default_noptmax")]
    pub noptmax: i32,
}

impl Default for PestSettings {
    fn default() -> Self {
        Self {
            pst: None,
            noptmax: default_noptmax(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibSettings {
    pub model: ModelSettings,
    #[serde(default)]
    pub parameters: Vec<ParamSettings>,
    #[serde(default)]
    pub observations: Vec<ObsSettings>,
    #[serde(default)]
    pub pest: PestSettings,
}

fn default_exe() -> String {
    "marthe".to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_noptmax() -> i32 {
    20
}

impl CalibSettings {
    /// Loads and validates settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: CalibSettings =
            toml::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.parameters.is_empty() {
            return Err(SettingsError::NoParameters);
        }
        if self.observations.is_empty() {
            return Err(SettingsError::NoObservations);
        }

        let mut param_names = HashSet::new();
        for param in &self.parameters {
            if !param_names.insert(param.name.as_str()) {
                return Err(SettingsError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
            let [lower, upper] = param.bounds;
            if !(lower < upper) {
                return Err(SettingsError::UnorderedBounds {
                    name: param.name.clone(),
                    lower,
                    upper,
                });
            }
            if param.default < lower || param.default > upper {
                return Err(SettingsError::DefaultOutsideBounds {
                    name: param.name.clone(),
                    value: param.default,
                    lower,
                    upper,
                });
            }
            let transform =
                param
                    .resolved_transform()
                    .map_err(|source| SettingsError::Transform {
                        name: param.name.clone(),
                        source,
                    })?;
            if transform == ParamTransform::Log && lower <= 0.0 {
                return Err(SettingsError::LogRequiresPositiveBounds {
                    name: param.name.clone(),
                });
            }
            if let IzoneSettings::Uniform { uniform: 0 } = param.izone {
                return Err(SettingsError::ZeroIzoneCode {
                    name: param.name.clone(),
                });
            }
            for pilot in &param.pilot {
                if pilot.layer == 0 {
                    return Err(SettingsError::ZeroPilotLayer {
                        name: param.name.clone(),
                    });
                }
                if pilot.every == 0 {
                    return Err(SettingsError::ZeroPilotSpacing {
                        name: param.name.clone(),
                    });
                }
            }
        }

        let mut localities = HashSet::new();
        for obs in &self.observations {
            if obs.weight <= 0.0 {
                return Err(SettingsError::NonPositiveWeight {
                    file: obs.file.clone(),
                });
            }
            let locality = obs.locality()?;
            if !localities.insert(locality.clone()) {
                return Err(SettingsError::DuplicateLocality { name: locality });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [model]
        rma = "models/mona/mona.rma"
        exe = "marthe64"

        [[parameters]]
        name = "permh"
        default = 1e-3
        transform = "log"
        bounds = [1e-8, 1.0]
        izone = { uniform = -1 }

        [[parameters.pilot]]
        layer = 1
        every = 4

        [[parameters]]
        name = "emmca"
        default = 1e-4
        bounds = [1e-10, 1e-1]
        izone = { file = "emmca.izone" }

        [[observations]]
        file = "obs/p31.dat"
        weight = 2.0

        [[observations]]
        file = "obs/p32.csv"
        loc = "north_field"

        [pest]
        pst = "mona.pst"
        noptmax = 30
    "#;

    fn parse(text: &str) -> CalibSettings {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn full_settings_parse_and_validate() {
        let settings = parse(FULL);
        settings.validate().unwrap();

        assert_eq!(settings.model.exe, "marthe64");
        assert_eq!(settings.parameters.len(), 2);
        assert_eq!(
            settings.parameters[0].pilot,
            vec![PilotSettings { layer: 1, every: 4 }]
        );
        assert_eq!(
            settings.parameters[1].izone,
            IzoneSettings::File {
                file: PathBuf::from("emmca.izone")
            }
        );
        assert_eq!(settings.observations[1].locality().unwrap(), "north_field");
        assert_eq!(settings.pest.noptmax, 30);
    }

    #[test]
    fn defaults_fill_omitted_fields() {
        let text = r#"
            [model]
            rma = "mona.rma"

            [[parameters]]
            name = "permh"
            default = 1e-3
            bounds = [1e-8, 1.0]

            [[observations]]
            file = "obs/p31.dat"
        "#;
        let settings = parse(text);
        settings.validate().unwrap();

        assert_eq!(settings.model.exe, "marthe");
        assert_eq!(settings.parameters[0].izone, IzoneSettings::default());
        assert_eq!(
            settings.parameters[0].resolved_transform(),
            Ok(ParamTransform::Log)
        );
        assert_eq!(settings.observations[0].weight, 1.0);
        assert_eq!(settings.observations[0].locality().unwrap(), "p31");
        assert_eq!(settings.pest.pst, None);
        assert_eq!(settings.pest.noptmax, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = r#"
            [model]
            rma = "mona.rma"
            threads = 4
        "#;
        assert!(toml::from_str::<CalibSettings>(text).is_err());
    }

    #[test]
    fn unordered_bounds_are_rejected() {
        let mut settings = parse(FULL);
        settings.parameters[0].bounds = [1.0, 1.0];
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::UnorderedBounds { .. })
        ));
    }

    #[test]
    fn defaults_must_sit_inside_bounds() {
        let mut settings = parse(FULL);
        settings.parameters[0].default = 2.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DefaultOutsideBounds { .. })
        ));
    }

    #[test]
    fn log_transform_needs_positive_bounds() {
        let mut settings = parse(FULL);
        settings.parameters[0].bounds = [0.0, 1.0];
        settings.parameters[0].default = 0.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::LogRequiresPositiveBounds { .. })
        ));
    }

    #[test]
    fn unknown_transform_words_are_rejected() {
        let mut settings = parse(FULL);
        settings.parameters[0].transform = Some("tied".to_string());
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Transform { .. })
        ));
    }

    #[test]
    fn pilot_placement_is_validated() {
        let mut settings = parse(FULL);
        settings.parameters[0].pilot[0].layer = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroPilotLayer { .. })
        ));

        let mut settings = parse(FULL);
        settings.parameters[0].pilot[0].every = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ZeroPilotSpacing { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut settings = parse(FULL);
        settings.parameters[1].name = "permh".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DuplicateParameter { .. })
        ));

        let mut settings = parse(FULL);
        settings.observations[1].loc = Some("p31".to_string());
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DuplicateLocality { .. })
        ));
    }

    #[test]
    fn weights_must_be_positive() {
        let mut settings = parse(FULL);
        settings.observations[0].weight = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NonPositiveWeight { .. })
        ));
    }

    #[test]
    fn empty_sections_are_rejected() {
        let mut settings = parse(FULL);
        settings.parameters.clear();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NoParameters)
        ));

        let mut settings = parse(FULL);
        settings.observations.clear();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NoObservations)
        ));
    }
}
