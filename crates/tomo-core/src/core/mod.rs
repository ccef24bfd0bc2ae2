//! # Core Module
//!
//! Stateless building blocks shared by every protocol.
//!
//! - **Constants** ([`constants`]) - File names, the HEALPix sampling list and the symmetry table
//! - **Protocol Forms** ([`forms`]) - Option declarations of every protocol
//! - **Domain Objects** ([`models`]) - Particle sets, tomograms and provenance edges
//! - **Parameter Schemas** ([`params`]) - Form declarations and parameter values
//! - **Utilities** ([`utils`]) - Program naming, path helpers and Euler geometry

pub mod constants;
pub mod forms;
pub mod models;
pub mod params;
pub mod utils;
