//! The calibration aggregate tying parameter and observation groups to
//! the PEST interface files.
//!
//! The estimation interface lives in four directories under the model
//! directory: `param/` holds the parameter data files the estimator
//! rewrites, `tpl/` their templates, `sim/` the simulated series the
//! forward run extracts, and `ins/` the instructions reading them back.
//! The control file sits next to them in the model directory, so every
//! path it references is relative.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::io::obs;
use crate::core::pest::control::{ControlFile, IoPair};
use crate::core::pest::fmt::loc_prefix;
use crate::engine::error::EngineError;
use crate::engine::obs::ObsGroup;
use crate::engine::params::ParamGroup;

pub const TPL_DIR: &str = "tpl";
pub const INS_DIR: &str = "ins";
pub const PARAM_DIR: &str = "param";
pub const SIM_DIR: &str = "sim";

/// The interface directories resolved against one model directory.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibDirs {
    pub tpl: PathBuf,
    pub ins: PathBuf,
    pub param: PathBuf,
    pub sim: PathBuf,
}

impl CalibDirs {
    pub fn under<P: AsRef<Path>>(model_dir: P) -> Self {
        let model_dir = model_dir.as_ref();
        Self {
            tpl: model_dir.join(TPL_DIR),
            ins: model_dir.join(INS_DIR),
            param: model_dir.join(PARAM_DIR),
            sim: model_dir.join(SIM_DIR),
        }
    }

    /// Creates the four directories, parents included.
    pub fn create_all(&self) -> io::Result<()> {
        for dir in [&self.tpl, &self.ins, &self.param, &self.sim] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Parameter and observation groups assembled into one estimation problem.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    params: Vec<ParamGroup>,
    obs: Vec<ObsGroup>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[ParamGroup] {
        &self.params
    }

    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut ParamGroup> {
        self.params.iter_mut()
    }

    pub fn obs(&self) -> &[ObsGroup] {
        &self.obs
    }

    pub fn param(&self, name: &str) -> Option<&ParamGroup> {
        self.params.iter().find(|g| g.name() == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut ParamGroup> {
        self.params.iter_mut().find(|g| g.name() == name)
    }

    pub fn obs_group(&self, locality: &str) -> Option<&ObsGroup> {
        self.obs.iter().find(|g| g.locality() == locality)
    }

    /// Adds a parameter group, rejecting duplicates by group name.
    pub fn add_param(&mut self, group: ParamGroup) -> Result<(), EngineError> {
        if self.param(group.name()).is_some() {
            return Err(EngineError::DuplicateParamGroup {
                name: group.name().to_string(),
            });
        }
        debug!(
            "Added parameter group '{}' ({} zpc, {} pilot points)",
            group.name(),
            group.zpc().len(),
            group.pp().len()
        );
        self.params.push(group);
        Ok(())
    }

    /// Adds an observation group from a records file.
    ///
    /// The locality name defaults to the file stem and must be unique; the
    /// group receives the next `locNN` prefix in insertion order.
    pub fn add_obs(
        &mut self,
        file: &Path,
        locality: Option<&str>,
        weight: f64,
    ) -> Result<&ObsGroup, EngineError> {
        let locality = match locality {
            Some(name) => name.to_string(),
            None => file
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty())
                .map(str::to_string)
                .ok_or(EngineError::ObsFile {
                    path: file.to_path_buf(),
                    reason: "no usable file stem",
                })?,
        };
        if self.obs_group(&locality).is_some() {
            return Err(EngineError::DuplicateObsLocality { name: locality });
        }
        let records = obs::read_records(file)?;
        if records.is_empty() {
            return Err(EngineError::ObsFile {
                path: file.to_path_buf(),
                reason: "holds no records",
            });
        }
        let prefix = loc_prefix(self.obs.len() + 1);
        debug!(
            "Added observation locality '{}' as {} ({} records)",
            locality,
            prefix,
            records.len()
        );
        let index = self.obs.len();
        self.obs.push(ObsGroup::new(locality, prefix, weight, records));
        Ok(&self.obs[index])
    }

    /// Writes every group's parameter data files under `param/` and
    /// returns the written paths.
    pub fn write_param_data(&self, dirs: &CalibDirs) -> Result<Vec<PathBuf>, EngineError> {
        let mut written = Vec::new();
        for group in &self.params {
            if group.has_zpc() {
                let path = dirs.param.join(group.zpc_data_name());
                write_file(&path, |w| group.write_zpc_data(w))?;
                written.push(path);
            }
            for lay in group.pp_layers() {
                let path = dirs.param.join(group.pp_data_name(lay));
                write_file(&path, |w| group.write_pp_data(lay, w))?;
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Writes the template files of one parameter group under `tpl/`.
    pub fn write_tplfile(&self, name: &str, dirs: &CalibDirs) -> Result<Vec<PathBuf>, EngineError> {
        let group = self.param(name).ok_or_else(|| EngineError::UnknownParamGroup {
            name: name.to_string(),
        })?;
        Self::write_group_tpl(group, dirs)
    }

    /// Writes the template files of every parameter group.
    pub fn write_tplfiles(&self, dirs: &CalibDirs) -> Result<Vec<PathBuf>, EngineError> {
        let mut written = Vec::new();
        for group in &self.params {
            written.extend(Self::write_group_tpl(group, dirs)?);
        }
        Ok(written)
    }

    fn write_group_tpl(group: &ParamGroup, dirs: &CalibDirs) -> Result<Vec<PathBuf>, EngineError> {
        let mut written = Vec::new();
        if group.has_zpc() {
            let path = dirs.tpl.join(group.zpc_tpl_name());
            write_file(&path, |w| group.write_zpc_tpl(w))?;
            written.push(path);
        }
        for lay in group.pp_layers() {
            let path = dirs.tpl.join(group.pp_tpl_name(lay));
            write_file(&path, |w| group.write_pp_tpl(lay, w))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Writes the instruction file of one observation locality under `ins/`.
    pub fn write_insfile(&self, locality: &str, dirs: &CalibDirs) -> Result<PathBuf, EngineError> {
        let group = self
            .obs_group(locality)
            .ok_or_else(|| EngineError::UnknownObsLocality {
                name: locality.to_string(),
            })?;
        let path = dirs.ins.join(group.ins_name());
        write_file(&path, |w| group.write_ins(w))?;
        Ok(path)
    }

    /// Writes the instruction files of every observation locality.
    pub fn write_insfiles(&self, dirs: &CalibDirs) -> Result<Vec<PathBuf>, EngineError> {
        let mut written = Vec::new();
        for group in &self.obs {
            let path = dirs.ins.join(group.ins_name());
            write_file(&path, |w| group.write_ins(w))?;
            written.push(path);
        }
        Ok(written)
    }

    /// Assembles and writes the PEST control file into the model directory.
    ///
    /// Validates that both sides of the interface are non-empty and that
    /// parameter and observation names are unique across groups before
    /// writing. All referenced paths are relative to the model directory.
    pub fn build_pst(
        &self,
        model_dir: &Path,
        pst_name: &str,
        command: &str,
        noptmax: i32,
    ) -> Result<PathBuf, EngineError> {
        if self.params.is_empty() {
            return Err(EngineError::EmptyInterface {
                what: "parameters",
            });
        }
        if self.obs.is_empty() {
            return Err(EngineError::EmptyInterface {
                what: "observations",
            });
        }

        let parameters: Vec<_> = self.params.iter().flat_map(|g| g.pst_parameters()).collect();
        let observations: Vec<_> = self.obs.iter().flat_map(|g| g.pst_observations()).collect();
        check_unique(parameters.iter().map(|p| p.name.as_str()))?;
        check_unique(observations.iter().map(|o| o.name.as_str()))?;

        let mut template_pairs = Vec::new();
        for group in &self.params {
            if group.has_zpc() {
                template_pairs.push(IoPair {
                    interface: Path::new(TPL_DIR).join(group.zpc_tpl_name()),
                    target: Path::new(PARAM_DIR).join(group.zpc_data_name()),
                });
            }
            for lay in group.pp_layers() {
                template_pairs.push(IoPair {
                    interface: Path::new(TPL_DIR).join(group.pp_tpl_name(lay)),
                    target: Path::new(PARAM_DIR).join(group.pp_data_name(lay)),
                });
            }
        }
        let instruction_pairs = self
            .obs
            .iter()
            .map(|group| IoPair {
                interface: Path::new(INS_DIR).join(group.ins_name()),
                target: Path::new(SIM_DIR).join(group.sim_name()),
            })
            .collect();

        let control = ControlFile {
            parameter_groups: self.params.iter().map(|g| g.name().to_string()).collect(),
            parameters,
            observation_groups: self.obs.iter().map(|g| g.locality().to_string()).collect(),
            observations,
            model_command: command.to_string(),
            template_pairs,
            instruction_pairs,
            noptmax,
        };

        let path = model_dir.join(pst_name);
        control.write_to_path(&path)?;
        debug!(
            "Wrote control file '{}' ({} parameters, {} observations)",
            path.display(),
            control.parameters.len(),
            control.observations.len()
        );
        Ok(path)
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(EngineError::DuplicateName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn write_file<F>(path: &Path, write: F) -> Result<(), EngineError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}
