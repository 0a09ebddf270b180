//! # PEST Interface Module
//!
//! Writers for the file formats the PEST/PEST++ suite reads: fixed-width
//! data columns, template files, instruction files, and the control file
//! tying the interface together.
//!
//! ## Key Components
//!
//! - [`fmt`] - Fixed-width field formatters and the parameter/observation
//!   naming conventions
//! - [`template`] - Template files (`ptf`) mirroring the parameter data
//!   files with marker slots
//! - [`instruction`] - Instruction files (`pif`) addressing the simulated
//!   record files
//! - [`control`] - The control file (`.pst`) with its section layout

pub mod control;
pub mod fmt;
pub mod instruction;
pub mod template;
