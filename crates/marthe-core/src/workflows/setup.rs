use crate::core::io::grid::GridFile;
use crate::core::io::traits::TextFile;
use crate::core::models::izone::Izone;
use crate::core::models::model::{MartheModel, ModelError};
use crate::engine::calibration::{CalibDirs, Calibration};
use crate::engine::error::EngineError;
use crate::engine::params::ParamGroup;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::settings::{CalibSettings, IzoneSettings, ParamSettings, SettingsError};
use ndarray::Array3;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// What the setup produced, for reporting back to the caller.
#[derive(Debug, Clone)]
pub struct SetupSummary {
    /// Adjustable parameters across all groups.
    pub n_parameters: usize,
    /// Observation records across all localities.
    pub n_observations: usize,
    pub data_files: Vec<PathBuf>,
    pub tpl_files: Vec<PathBuf>,
    pub ins_files: Vec<PathBuf>,
    pub pst_path: PathBuf,
}

/// Builds the whole estimation interface for the model from the settings:
/// the `tpl/ ins/ param/ sim/` directories, the parameter data files and
/// their templates, the instruction files, and the control file.
#[instrument(skip_all, name = "setup_workflow")]
pub fn run(
    model: &mut MartheModel,
    settings: &CalibSettings,
    settings_path: &Path,
    reporter: &ProgressReporter,
) -> Result<SetupSummary, EngineError> {
    // === Phase 0: Interface directories ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        "Preparing the estimation interface for model '{}'.",
        model.name()
    );
    let dirs = CalibDirs::under(model.dir());
    dirs.create_all()?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Parameter and observation groups ===
    reporter.report(Progress::PhaseStart {
        name: "Building groups",
    });
    let calib = build_calibration(model, settings, settings_base(settings_path))?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Data, template and instruction files ===
    reporter.report(Progress::PhaseStart {
        name: "Writing interface files",
    });
    let data_files = calib.write_param_data(&dirs)?;
    let tpl_files = calib.write_tplfiles(&dirs)?;
    let ins_files = calib.write_insfiles(&dirs)?;
    info!(
        "Wrote {} data, {} template and {} instruction files.",
        data_files.len(),
        tpl_files.len(),
        ins_files.len()
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Control file ===
    reporter.report(Progress::PhaseStart {
        name: "Control file",
    });
    let pst_name = settings
        .pest
        .pst
        .clone()
        .unwrap_or_else(|| format!("{}.pst", model.name()));
    let command = format!("rsmarthe forward --config {}", settings_path.display());
    let pst_path = calib.build_pst(model.dir(), &pst_name, &command, settings.pest.noptmax)?;
    reporter.report(Progress::PhaseFinish);

    let n_parameters = calib
        .params()
        .iter()
        .map(|g| g.zpc().len() + g.pp().len())
        .sum();
    let n_observations = calib.obs().iter().map(|g| g.len()).sum();
    info!(
        "Setup complete: {} parameters, {} observations, control file '{}'.",
        n_parameters,
        n_observations,
        pst_path.display()
    );
    Ok(SetupSummary {
        n_parameters,
        n_observations,
        data_files,
        tpl_files,
        ins_files,
        pst_path,
    })
}

/// The directory settings-file paths are resolved against.
pub(crate) fn settings_base(settings_path: &Path) -> &Path {
    match settings_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub(crate) fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Assembles the calibration aggregate the settings describe.
///
/// The assembly is deterministic, so the forward workflow can rebuild the
/// exact groups the setup emitted and merge estimator-written values back
/// into them by name.
pub(crate) fn build_calibration(
    model: &mut MartheModel,
    settings: &CalibSettings,
    base: &Path,
) -> Result<Calibration, EngineError> {
    let mut calib = Calibration::new();
    for param in &settings.parameters {
        let group = build_param_group(model, param, base)?;
        calib.add_param(group)?;
    }
    for obs in &settings.observations {
        let path = resolve(base, &obs.file);
        calib.add_obs(&path, obs.loc.as_deref(), obs.weight)?;
    }
    Ok(calib)
}

fn build_param_group(
    model: &mut MartheModel,
    param: &ParamSettings,
    base: &Path,
) -> Result<ParamGroup, EngineError> {
    model.load_prop(&param.name)?;
    let izone = match &param.izone {
        IzoneSettings::Uniform { uniform } => {
            let codes = Array3::from_elem(model.imask().dim(), *uniform);
            Izone::from_codes(model.imask(), codes)?
        }
        IzoneSettings::File { file } => {
            let path = resolve(base, file);
            let (field, _) =
                GridFile::read_from_path(&path).map_err(|source| ModelError::GridRead {
                    path: path.clone(),
                    source,
                })?;
            let codes = field.values().mapv(|v| v.round() as i32);
            Izone::from_codes(model.imask(), codes)?
        }
    };
    let transform = param
        .resolved_transform()
        .map_err(|source| SettingsError::Transform {
            name: param.name.clone(),
            source,
        })?;
    let mut group = ParamGroup::new(
        &param.name,
        param.default,
        transform,
        (param.bounds[0], param.bounds[1]),
        izone,
    );
    for pilot in &param.pilot {
        group.pp_from_rgrid(model.geometry(), pilot.layer - 1, pilot.every)?;
    }
    let placed = group.pp_layers();
    for lay in group.pilot_layers() {
        if !placed.contains(&lay) {
            return Err(EngineError::UnplacedPilotZones {
                name: param.name.clone(),
                lay: lay + 1,
            });
        }
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::GridGeometry;
    use crate::core::io::grid::GridMetadata;
    use crate::core::models::field::MartheField;
    use crate::engine::settings::{ModelSettings, ObsSettings, PestSettings, PilotSettings};
    use tempfile::tempdir;

    fn model_fixture(dir: &Path) -> MartheModel {
        let geometry =
            GridGeometry::new(vec![0.5, 1.5, 2.5, 3.5], vec![3.5, 2.5, 1.5, 0.5]).unwrap();
        let mut values = Array3::from_elem((1, 4, 4), 2e-3);
        values[[0, 0, 3]] = 0.0;
        let permh = MartheField::new("permh", geometry, values).unwrap();
        let model = MartheModel::from_permh(dir, "mona", permh);
        model.write_prop("permh").unwrap();
        model
    }

    fn obs_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("p31.dat");
        std::fs::write(&path, "1996-01-31 112.3\n1996-02-29 111.9\n").unwrap();
        path
    }

    fn settings_fixture(dir: &Path, izone: IzoneSettings, pilot: Vec<PilotSettings>) -> CalibSettings {
        CalibSettings {
            model: ModelSettings {
                rma: dir.join("mona.rma"),
                exe: "marthe".to_string(),
            },
            parameters: vec![ParamSettings {
                name: "permh".to_string(),
                default: 1e-3,
                transform: None,
                bounds: [1e-8, 1.0],
                izone,
                pilot,
            }],
            observations: vec![ObsSettings {
                file: obs_fixture(dir),
                loc: None,
                weight: 1.0,
            }],
            pest: PestSettings::default(),
        }
    }

    #[test]
    fn setup_builds_the_whole_interface() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());
        let settings = settings_fixture(dir.path(), IzoneSettings::default(), Vec::new());
        let settings_path = dir.path().join("calib.toml");

        let summary = run(
            &mut model,
            &settings,
            &settings_path,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(summary.n_parameters, 1);
        assert_eq!(summary.n_observations, 2);
        assert!(dir.path().join("param/permh_zpc.dat").is_file());
        assert!(dir.path().join("tpl/permh_zpc.tpl").is_file());
        assert!(dir.path().join("ins/p31.ins").is_file());
        assert_eq!(summary.pst_path, dir.path().join("mona.pst"));

        let pst = std::fs::read_to_string(&summary.pst_path).unwrap();
        assert!(pst.contains("* model command line"));
        assert!(pst.contains(&format!(
            "rsmarthe forward --config {}",
            settings_path.display()
        )));
    }

    #[test]
    fn pilot_placement_writes_per_layer_files() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());
        let settings = settings_fixture(
            dir.path(),
            IzoneSettings::Uniform { uniform: 1 },
            vec![PilotSettings { layer: 1, every: 2 }],
        );

        let summary = run(
            &mut model,
            &settings,
            &dir.path().join("calib.toml"),
            &ProgressReporter::new(),
        )
        .unwrap();

        // Rows 0 and 2, columns 0 and 2, all active: four points, no ZPC.
        assert_eq!(summary.n_parameters, 4);
        assert_eq!(summary.data_files.len(), 1);
        assert!(dir.path().join("param/permh_pp_l01.dat").is_file());
        assert!(dir.path().join("tpl/permh_pp_l01.tpl").is_file());
    }

    #[test]
    fn pilot_zones_without_a_placement_are_rejected() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());
        let settings = settings_fixture(dir.path(), IzoneSettings::Uniform { uniform: 1 }, Vec::new());

        assert!(matches!(
            run(
                &mut model,
                &settings,
                &dir.path().join("calib.toml"),
                &ProgressReporter::new(),
            ),
            Err(EngineError::UnplacedPilotZones { lay: 1, .. })
        ));
    }

    #[test]
    fn zonation_files_split_the_grid() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());

        // West half zone -1, east half zone -2.
        let geometry =
            GridGeometry::new(vec![0.5, 1.5, 2.5, 3.5], vec![3.5, 2.5, 1.5, 0.5]).unwrap();
        let mut codes = Array3::from_elem((1, 4, 4), -1.0);
        for row in 0..4 {
            for col in 2..4 {
                codes[[0, row, col]] = -2.0;
            }
        }
        let izone_field = MartheField::new("izone", geometry, codes).unwrap();
        let izone_path = dir.path().join("permh.izone");
        GridFile::write_to_path(&izone_field, &GridMetadata::default(), &izone_path).unwrap();

        let settings = settings_fixture(
            dir.path(),
            IzoneSettings::File {
                file: izone_path,
            },
            Vec::new(),
        );
        let calib = build_calibration(&mut model, &settings, dir.path()).unwrap();
        let names: Vec<&str> = calib.params()[0]
            .zpc()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["permh_l01_zpc02", "permh_l01_zpc01"]);
    }

    #[test]
    fn relative_paths_resolve_against_the_settings_file() {
        assert_eq!(settings_base(Path::new("conf/calib.toml")), Path::new("conf"));
        assert_eq!(settings_base(Path::new("calib.toml")), Path::new("."));
        assert_eq!(
            resolve(Path::new("conf"), Path::new("obs/p31.dat")),
            PathBuf::from("conf/obs/p31.dat")
        );
        assert_eq!(
            resolve(Path::new("conf"), Path::new("/abs/p31.dat")),
            PathBuf::from("/abs/p31.dat")
        );
    }
}
