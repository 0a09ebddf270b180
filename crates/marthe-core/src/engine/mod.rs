//! # Engine Module
//!
//! The estimation interface between a loaded model and the PEST suite:
//! parameter and observation groups, the calibration aggregate that writes
//! the interface files, the external model runner, and the configuration
//! they are all driven by.
//!
//! ## Key Components
//!
//! - [`params`] - Parameter groups: zonation, zones of piecewise constancy,
//!   pilot points, data/template writing and value read-back
//! - [`obs`] - Observation groups: dated records, naming, instruction files
//! - [`calibration`] - The aggregate tying groups together and emitting the
//!   control file
//! - [`run`] - Invocation of the simulator executable with streamed output
//! - [`settings`] - TOML calibration settings
//! - [`progress`] - Progress reporting callbacks for long operations
//! - [`error`] - Engine-level error types

pub mod calibration;
pub mod error;
pub mod obs;
pub mod params;
pub mod progress;
pub mod run;
pub mod settings;
