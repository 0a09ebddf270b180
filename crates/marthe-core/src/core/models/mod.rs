//! # Core Models Module
//!
//! Data structures representing a MARTHE model as it sits on disk: the model
//! itself, its property fields, and the integer zonation arrays that drive
//! parameterization.
//!
//! ## Key Components
//!
//! - [`model`] - The model: working directory, grid shape and geometry, the
//!   active-cell mask, and the map of loaded property fields
//! - [`field`] - A single property field with point sampling, layer views,
//!   and zone-wise value assignment
//! - [`izone`] - Zonation codes: negative for zones of piecewise constancy,
//!   positive for pilot-point zones, zero for inactive cells
//!
//! ## Usage
//!
//! Most operations start from a model loaded off its `.rma` file:
//!
//! ```ignore
//! use rsmarthe::core::models::model::MartheModel;
//!
//! let mut model = MartheModel::load("models/mona/mona.rma")?;
//! model.load_prop("kepon")?;
//! let head = model.prop("permh").unwrap().sample(456.7, 567.2, 0);
//! ```

pub mod field;
pub mod izone;
pub mod model;
