//! `dealsheet-normalize` — Deal sheet normalization engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the upload-ready
//! table plus a run report. No CLI or IO dependencies.

pub mod config;
pub mod derive;
pub mod directory;
pub mod discrepancy;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod remap;
pub mod schema;
pub mod validate;

pub use config::NormalizeConfig;
pub use engine::run;
pub use error::NormalizeError;
pub use model::{Cell, NormalizeInput, NormalizeOutput, NormalizeReport, OutputTable, Table};
