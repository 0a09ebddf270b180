//! # Core I/O Module
//!
//! Readers and writers for the text file formats the toolkit exchanges with
//! the simulator and with the PEST utility suite.
//!
//! ## Key Components
//!
//! - [`traits`] - The [`TextFile`](traits::TextFile) codec interface shared
//!   by the formats that are both read and written
//! - [`grid`] - MARTHE exchange grid files (`<model>.<prop>`), one block per
//!   layer
//! - [`prn`] - The simulated-history file `historiq.prn` and its extraction
//!   into per-locality series
//! - [`obs`] - Observation record files (`.dat` and `.csv`) and the
//!   fixed-layout simulated counterparts under `sim/`
//! - [`factors`] - Kriging factor files produced by PEST's `ppk2fac`,
//!   consumed for pilot-point interpolation
//!
//! ## Usage
//!
//! Formats implementing [`TextFile`](traits::TextFile) are driven through
//! the path helpers:
//!
//! ```ignore
//! use rsmarthe::core::io::grid::GridFile;
//! use rsmarthe::core::io::traits::TextFile;
//!
//! let (field, meta) = GridFile::read_from_path("models/mona/mona.permh")?;
//! ```

pub mod factors;
pub mod grid;
pub mod obs;
pub mod prn;
pub mod traits;
