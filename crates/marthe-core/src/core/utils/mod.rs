//! # Core Utilities Module
//!
//! Shared helper functionality used across the core layer.
//!
//! ## Key Components
//!
//! - [`keywords`] - The table of known MARTHE property keywords with their
//!   conventional estimation defaults

pub mod keywords;
