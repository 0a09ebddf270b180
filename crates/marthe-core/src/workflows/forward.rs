use crate::core::io::factors::InterpFactors;
use crate::core::io::prn;
use crate::core::models::model::MartheModel;
use crate::engine::calibration::CalibDirs;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::run::{self, RunConfig, RunReport};
use crate::engine::settings::CalibSettings;
use crate::workflows::setup;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// What one forward run did, the simulator's report included.
#[derive(Debug, Clone)]
pub struct ForwardSummary {
    /// Grid cells rewritten from the parameter tables.
    pub cells_written: usize,
    pub grids_written: Vec<PathBuf>,
    pub report: RunReport,
    pub sim_files: Vec<PathBuf>,
}

/// The model run the estimator repeats: merge the estimator-written
/// parameter data files into the groups, push the values into the property
/// grids, run the simulator, and extract the simulated series the
/// instruction files read.
///
/// A simulation that does not terminate normally is not an error; it comes
/// back in the summary with extraction skipped, matching how estimation
/// suites treat failed model runs.
#[instrument(skip_all, name = "forward_workflow")]
pub fn run(
    model: &mut MartheModel,
    settings: &CalibSettings,
    settings_path: &Path,
    reporter: &ProgressReporter,
) -> Result<ForwardSummary, EngineError> {
    // === Phase 0: Rebuild the estimation interface ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let dirs = CalibDirs::under(model.dir());
    let base = setup::settings_base(settings_path);
    let mut calib = setup::build_calibration(model, settings, base)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Merge estimator-written parameter data ===
    reporter.report(Progress::PhaseStart {
        name: "Reading parameter data",
    });
    let mut merged = 0;
    for group in calib.params_mut() {
        if group.has_zpc() {
            merged += group.read_zpc_data(dirs.param.join(group.zpc_data_name()))?;
        }
        for lay in group.pp_layers() {
            merged += group.read_pp_data(lay, dirs.param.join(group.pp_data_name(lay)))?;
        }
    }
    info!(
        "Merged {} parameter values from '{}'.",
        merged,
        dirs.param.display()
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Apply to the property grids ===
    reporter.report(Progress::PhaseStart {
        name: "Applying parameters",
    });
    reporter.report(Progress::TaskStart {
        total_steps: calib.params().len() as u64,
    });
    let mut cells_written = 0;
    let mut grids_written = Vec::new();
    for group in calib.params() {
        let mut factors_by_layer = BTreeMap::new();
        for lay in group.pilot_layers() {
            let path = dirs.param.join(group.pp_factors_name(lay));
            if !path.is_file() {
                return Err(EngineError::MissingFactors {
                    name: group.name().to_string(),
                    lay: lay + 1,
                });
            }
            factors_by_layer.insert(lay, InterpFactors::read_from_path(&path)?);
        }
        cells_written += group.apply(model, &factors_by_layer)?;
        grids_written.push(model.write_prop(group.name())?);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    info!(
        "Applied {} cells across {} property grids.",
        cells_written,
        grids_written.len()
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Simulator run ===
    reporter.report(Progress::PhaseStart {
        name: "Running MARTHE",
    });
    let config = RunConfig {
        exe_name: settings.model.exe.clone(),
        ..RunConfig::default()
    };
    let report = run::run_model(model, &config, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Extract the simulated series ===
    let sim_files = if report.success {
        reporter.report(Progress::PhaseStart {
            name: "Extracting simulated series",
        });
        let files = prn::extract_prn(model.prn_path(), &dirs.sim)?;
        for group in calib.obs() {
            if !dirs.sim.join(group.sim_name()).is_file() {
                warn!(
                    "The history file holds no series for locality '{}'.",
                    group.locality()
                );
            }
        }
        reporter.report(Progress::PhaseFinish);
        files
    } else {
        warn!("The simulator did not terminate normally; skipping series extraction.");
        reporter.report(Progress::Message(
            "Simulation failed, series extraction skipped.".to_string(),
        ));
        Vec::new()
    };

    info!(
        "Forward run complete in {:.1}s (success: {}).",
        report.elapsed.as_secs_f64(),
        report.success
    );
    Ok(ForwardSummary {
        cells_written,
        grids_written,
        report,
        sim_files,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::grid::GridGeometry;
    use crate::core::io::grid::GridFile;
    use crate::core::io::traits::TextFile;
    use crate::core::models::field::MartheField;
    use crate::engine::settings::{
        IzoneSettings, ModelSettings, ObsSettings, ParamSettings, PestSettings,
    };
    use ndarray::Array3;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    const PRN: &str = "\
 Simulation MARTHE
 Edition des historiques

Date\tp31
-\tm
1996-01-31\t112.30
1996-02-29\t111.90
";

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

    fn stub_simulator(dir: &Path) -> String {
        let path = dir.join("marthe_stub.sh");
        std::fs::write(&path, "#!/bin/sh\necho 'Normal termination of the simulation'\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().to_string()
    }

    fn settings_fixture(dir: &Path) -> CalibSettings {
        let obs_path = dir.join("p31.dat");
        std::fs::write(&obs_path, "1996-01-31 112.3\n1996-02-29 111.9\n").unwrap();
        CalibSettings {
            model: ModelSettings {
                rma: dir.join("mona.rma"),
                exe: stub_simulator(dir),
            },
            parameters: vec![ParamSettings {
                name: "permh".to_string(),
                default: 1e-3,
                transform: None,
                bounds: [1e-8, 1.0],
                izone: IzoneSettings::default(),
                pilot: Vec::new(),
            }],
            observations: vec![ObsSettings {
                file: obs_path,
                loc: None,
                weight: 1.0,
            }],
            pest: PestSettings::default(),
        }
    }

    #[test]
    fn forward_run_applies_values_and_extracts_series() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());
        let settings = settings_fixture(dir.path());
        let settings_path = dir.path().join("calib.toml");
        std::fs::write(dir.path().join("historiq.prn"), PRN).unwrap();

        setup::run(&mut model, &settings, &settings_path, &ProgressReporter::new()).unwrap();

        // Stand in for the estimator rewriting the data file.
        std::fs::write(
            dir.path().join("param/permh_zpc.dat"),
            "permh_l01_zpc01 5.0e-3\n",
        )
        .unwrap();

        let summary = run(
            &mut model,
            &settings,
            &settings_path,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(summary.report.success);
        assert_eq!(summary.cells_written, 15);
        assert_eq!(summary.grids_written, vec![dir.path().join("mona.permh")]);
        assert_eq!(summary.sim_files, vec![dir.path().join("sim/p31.dat")]);

        // The in-memory field and the on-disk grid both carry the new value.
        let field = model.prop("permh").unwrap();
        assert_eq!(field.values()[[0, 0, 0]], 5.0e-3);
        assert_eq!(field.values()[[0, 0, 3]], 0.0);
        let (reread, _) = GridFile::read_from_path(dir.path().join("mona.permh")).unwrap();
        assert_eq!(reread.values()[[0, 2, 2]], 5.0e-3);

        let sim = std::fs::read_to_string(dir.path().join("sim/p31.dat")).unwrap();
        assert_eq!(sim.lines().count(), 2);
        assert!(sim.starts_with("1996-01-31"));
    }

    #[test]
    fn failed_simulations_skip_extraction() {
        let dir = tempdir().unwrap();
        let mut model = model_fixture(dir.path());
        let mut settings = settings_fixture(dir.path());
        let settings_path = dir.path().join("calib.toml");

        let crash = dir.path().join("crash.sh");
        std::fs::write(&crash, "#!/bin/sh\necho 'solver error'\nexit 1\n").unwrap();
        let mut perms = std::fs::metadata(&crash).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&crash, perms).unwrap();
        settings.model.exe = crash.to_string_lossy().to_string();

        setup::run(&mut model, &settings, &settings_path, &ProgressReporter::new()).unwrap();
        let summary = run(
            &mut model,
            &settings,
            &settings_path,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(!summary.report.success);
        assert_eq!(summary.report.failed_lines, vec!["solver error"]);
        assert!(summary.sim_files.is_empty());
        assert!(!dir.path().join("sim/p31.dat").exists());
    }
}
