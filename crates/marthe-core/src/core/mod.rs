//! # Core Module
//!
//! This module provides the fundamental building blocks for representing a
//! MARTHE model and for exchanging files with the two external tools the
//! library couples: the MARTHE simulator and the PEST/PEST++ estimation
//! suite.
//!
//! ## Overview
//!
//! Everything in here is stateless with respect to a calibration run: data
//! structures describe a model as it sits on disk, and codecs translate
//! between those structures and the record-oriented text formats the external
//! tools define.
//!
//! ## Architecture
//!
//! - **Grid Geometry** ([`grid`]) - Structured-grid shapes and cell-center
//!   coordinate lookup
//! - **Model Representation** ([`models`]) - The model, its property fields,
//!   and zonation arrays
//! - **File I/O** ([`io`]) - Codecs for MARTHE grid files, the simulated
//!   history, observation records, and kriging-factor files
//! - **PEST Interface** ([`pest`]) - Writers for template, instruction, and
//!   control files
//! - **Keyword Knowledge** ([`utils`]) - The registry of known MARTHE
//!   property keywords

pub mod grid;
pub mod io;
pub mod models;
pub mod pest;
pub mod utils;
