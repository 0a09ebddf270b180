use rsmarthe::core::io::prn::PrnError;
use rsmarthe::core::models::model::ModelError;
use rsmarthe::engine::error::EngineError;
use rsmarthe::engine::settings::SettingsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    MartheCore(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("History extraction error: {0}")]
    Extract(#[from] PrnError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("The simulation did not terminate normally ({0})")]
    Simulation(String),
}
