//! The PEST control file.
//!
//! Assembles the `.pst` sections from the parameter and observation
//! interface: control data with section counts, parameter groups and data,
//! observation groups and data, the model command line, and the
//! template/instruction pairing.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::core::pest::fmt::{ffmt, sfmt};

/// How PEST transforms a parameter during estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTransform {
    None,
    Log,
    Fixed,
}

impl ParamTransform {
    /// Returns the keyword used in the `* parameter data` section.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamTransform::None => "none",
            ParamTransform::Log => "log",
            ParamTransform::Fixed => "fixed",
        }
    }
}

/// The transform keyword was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown parameter transform '{value}' (expected 'none', 'log' or 'fixed')")]
pub struct UnknownTransformError {
    pub value: String,
}

impl FromStr for ParamTransform {
    type Err = UnknownTransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ParamTransform::None),
            "log" => Ok(ParamTransform::Log),
            "fixed" => Ok(ParamTransform::Fixed),
            _ => Err(UnknownTransformError {
                value: s.to_string(),
            }),
        }
    }
}

/// One `* parameter data` row.
#[derive(Debug, Clone, PartialEq)]
pub struct PstParameter {
    pub name: String,
    pub transform: ParamTransform,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    pub group: String,
}

/// One `* observation data` row.
#[derive(Debug, Clone, PartialEq)]
pub struct PstObservation {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub group: String,
}

/// One `* model input/output` pairing: a template or instruction file and
/// the model file it addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct IoPair {
    pub interface: PathBuf,
    pub target: PathBuf,
}

/// The assembled control file.
///
/// Section counts are derived from the row collections; callers are
/// responsible for name uniqueness across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFile {
    pub parameter_groups: Vec<String>,
    pub parameters: Vec<PstParameter>,
    pub observation_groups: Vec<String>,
    pub observations: Vec<PstObservation>,
    pub model_command: String,
    pub template_pairs: Vec<IoPair>,
    pub instruction_pairs: Vec<IoPair>,
    /// NOPTMAX: 0 runs the model once, -1/-2 compute statistics only.
    pub noptmax: i32,
}

impl ControlFile {
    /// Writes the control file sections in PEST order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "pcf")?;
        writeln!(writer, "* control data")?;
        writeln!(writer, "restart estimation")?;
        writeln!(
            writer,
            "{} {} {} 0 {}",
            self.parameters.len(),
            self.observations.len(),
            self.parameter_groups.len(),
            self.observation_groups.len()
        )?;
        writeln!(
            writer,
            "{} {} single point 1 0 0",
            self.template_pairs.len(),
            self.instruction_pairs.len()
        )?;
        writeln!(writer, "10.0 -3.0 0.3 0.03 10")?;
        writeln!(writer, "10.0 10.0 0.001")?;
        writeln!(writer, "0.1")?;
        writeln!(writer, "{} 0.01 3 3 0.01 3", self.noptmax)?;
        writeln!(writer, "1 1 1")?;

        writeln!(writer, "* parameter groups")?;
        for group in &self.parameter_groups {
            writeln!(writer, "{} relative 0.01 0.0 switch 2.0 parabolic", sfmt(group))?;
        }

        writeln!(writer, "* parameter data")?;
        for param in &self.parameters {
            writeln!(
                writer,
                "{} {:<10} {:<10} {} {} {} {} 1.0 0.0 1",
                sfmt(&param.name),
                param.transform.as_str(),
                "factor",
                ffmt(param.value),
                ffmt(param.lower),
                ffmt(param.upper),
                sfmt(&param.group)
            )?;
        }

        writeln!(writer, "* observation groups")?;
        for group in &self.observation_groups {
            writeln!(writer, "{}", group)?;
        }

        writeln!(writer, "* observation data")?;
        for obs in &self.observations {
            writeln!(
                writer,
                "{} {} {} {}",
                sfmt(&obs.name),
                ffmt(obs.value),
                ffmt(obs.weight),
                sfmt(&obs.group)
            )?;
        }

        writeln!(writer, "* model command line")?;
        writeln!(writer, "{}", self.model_command)?;

        writeln!(writer, "* model input/output")?;
        for pair in &self.template_pairs {
            writeln!(
                writer,
                "{} {}",
                pair.interface.display(),
                pair.target.display()
            )?;
        }
        for pair in &self.instruction_pairs {
            writeln!(
                writer,
                "{} {}",
                pair.interface.display(),
                pair.target.display()
            )?;
        }
        Ok(())
    }

    /// Writes the control file to `path`, creating or truncating it.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}
