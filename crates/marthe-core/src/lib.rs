//! # rsmarthe Core Library
//!
//! A toolkit for coupling the MARTHE groundwater simulator with PEST-style
//! parameter estimation, built around the file formats both tools already
//! speak.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`MartheModel`, `MartheField`, `Izone`), codecs for the MARTHE grid and
//!   simulated-history formats, and writers for the PEST template,
//!   instruction, and control formats.
//!
//! - **[`engine`]: The Coupling Core.** This stateful layer ties a model to a
//!   calibration problem: parameter groups over zonations, observation
//!   localities, the [`engine::calibration::Calibration`] aggregate, and the
//!   external-model runner that streams MARTHE's output.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures: `setup` emits
//!   the complete PEST interface for a model, and `forward` performs the
//!   parameter-to-simulation run that PEST invokes on every iteration.

pub mod core;
pub mod engine;
pub mod workflows;
