pub mod extract;
pub mod forward;
pub mod run;
pub mod sample;
pub mod setup;

use crate::error::Result;
use rsmarthe::core::models::model::MartheModel;
use rsmarthe::engine::settings::CalibSettings;
use std::path::Path;

/// Loads the model a settings file points at. A relative model file path is
/// resolved against the settings file's directory, so a settings file can
/// travel with its model.
pub(crate) fn load_model(settings: &CalibSettings, config_path: &Path) -> Result<MartheModel> {
    let rma = if settings.model.rma.is_absolute() {
        settings.model.rma.clone()
    } else {
        let base = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        base.join(&settings.model.rma)
    };
    Ok(MartheModel::load(rma)?)
}
