use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::io::factors::FactorsError;
use crate::core::io::obs::ObsError;
use crate::core::io::prn::PrnError;
use crate::core::models::field::FieldError;
use crate::core::models::izone::IzoneError;
use crate::core::models::model::ModelError;
use crate::engine::settings::SettingsError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Field error: {source}")]
    Field {
        #[from]
        source: FieldError,
    },

    #[error("Zonation error: {source}")]
    Izone {
        #[from]
        source: IzoneError,
    },

    #[error("Record file error: {source}")]
    Obs {
        #[from]
        source: ObsError,
    },

    #[error("History file error: {source}")]
    Prn {
        #[from]
        source: PrnError,
    },

    #[error("Factor file error: {source}")]
    Factors {
        #[from]
        source: FactorsError,
    },

    #[error("Settings error: {source}")]
    Settings {
        #[from]
        source: SettingsError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Layer index {lay} out of range for a model with {nlay} layers")]
    LayerOutOfRange { lay: usize, nlay: usize },

    #[error("Duplicate parameter group '{name}'")]
    DuplicateParamGroup { name: String },

    #[error("Unknown parameter group '{name}'")]
    UnknownParamGroup { name: String },

    #[error("Duplicate observation locality '{name}'")]
    DuplicateObsLocality { name: String },

    #[error("Unknown observation locality '{name}'")]
    UnknownObsLocality { name: String },

    #[error("Observation file '{path}': {reason}")]
    ObsFile { path: PathBuf, reason: &'static str },

    #[error("Duplicate name '{name}' across the estimation interface")]
    DuplicateName { name: String },

    #[error("The calibration defines no {what}")]
    EmptyInterface { what: &'static str },

    #[error("Missing value for parameter '{name}'")]
    MissingParameterValue { name: String },

    #[error("Parameter file '{path}' line {line}: {message}")]
    ParamData {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Factor file references unknown pilot point '{name}'")]
    UnknownPilotPoint { name: String },

    #[error("No kriging factors for parameter '{name}' layer {lay}")]
    MissingFactors { name: String, lay: usize },

    #[error("Parameter '{name}': layer {lay} has pilot zones but no pilot placement")]
    UnplacedPilotZones { name: String, lay: usize },

    #[error("Executable '{name}' not found on PATH")]
    ExeNotFound { name: String },

    #[error("Failed to run '{name}': {source}")]
    Spawn { name: String, source: io::Error },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
