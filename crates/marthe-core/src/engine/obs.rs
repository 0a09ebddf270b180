//! Observation groups over measured time series.
//!
//! Each group wraps one locality's record file. Records get generated
//! names built from the locality's running prefix, so the instruction
//! file, the control file and the simulated counterpart under `sim/`
//! always agree on what each line is called.

use std::io::{self, Write};

use crate::core::io::obs::ObsRecord;
use crate::core::pest::control::PstObservation;
use crate::core::pest::fmt::obs_name;
use crate::core::pest::instruction;

/// One locality's observations with their estimation metadata.
#[derive(Debug, Clone)]
pub struct ObsGroup {
    locality: String,
    prefix: String,
    weight: f64,
    records: Vec<ObsRecord>,
}

impl ObsGroup {
    pub fn new(
        locality: impl Into<String>,
        prefix: impl Into<String>,
        weight: f64,
        records: Vec<ObsRecord>,
    ) -> Self {
        Self {
            locality: locality.into(),
            prefix: prefix.into(),
            weight,
            records,
        }
    }

    /// The locality name, doubling as the PEST observation group name.
    pub fn locality(&self) -> &str {
        &self.locality
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn records(&self) -> &[ObsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Generated observation names, one per record in file order.
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.records.len()).map(|index| obs_name(&self.prefix, index))
    }

    /// File name of the instruction file under `ins/`.
    pub fn ins_name(&self) -> String {
        format!("{}.ins", self.locality)
    }

    /// File name of the simulated series under `sim/`, the one
    /// `extract_prn` produces for this locality.
    pub fn sim_name(&self) -> String {
        format!("{}.dat", self.locality)
    }

    /// Writes the instruction file addressing the simulated series line by
    /// line; the sim file carries exactly one row per record, so each
    /// instruction advances one line.
    pub fn write_ins(&self, writer: &mut impl Write) -> io::Result<()> {
        instruction::write_instructions(writer, self.names())
    }

    /// The group's rows for the PEST `* observation data` section.
    pub fn pst_observations(&self) -> Vec<PstObservation> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| PstObservation {
                name: obs_name(&self.prefix, index),
                value: record.value,
                weight: self.weight,
                group: self.locality.clone(),
            })
            .collect()
    }
}
