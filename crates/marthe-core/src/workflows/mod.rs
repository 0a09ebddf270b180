//! # Workflows Module
//!
//! This module provides the high-level entry points that orchestrate complete
//! calibration tasks over a MARTHE model.
//!
//! ## Overview
//!
//! Workflows are what CLI commands and scripts call. Each one loads what it
//! needs from the calibration settings, drives the engine through its phases,
//! reports progress along the way, and returns a summary of what was done.
//!
//! ## Architecture
//!
//! The module is organized around the two halves of a PEST-style calibration:
//!
//! - **Setup Workflow** ([`setup`]) - Builds the estimation interface from the
//!   settings: parameter and observation groups, data/template/instruction
//!   files, and the control file the estimator starts from.
//! - **Forward Workflow** ([`forward`]) - The model run the estimator repeats:
//!   reads the parameter data files back, pushes the values into the property
//!   grids, runs the simulator, and extracts the simulated series.
//!
//! ## Key Capabilities
//!
//! - **End-to-end assembly** from settings file to ready-to-run control file
//! - **Deterministic rebuilds** so the forward run always agrees with the
//!   interface the setup produced
//! - **Progress monitoring** with phase reporting and streamed simulator output
//! - **Error handling** with diagnostics naming the offending file or group

pub mod forward;
pub mod setup;
