//! `conseil-recon` - Roster and subject-table aggregation engine.
//!
//! Pure engine crate: receives pre-loaded rows, returns consolidated bulletins
//! plus advisory warnings. No file or network dependencies.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod stats;
pub mod validate;

pub use config::SourceLayout;
pub use engine::run;
pub use error::ReconError;
pub use model::{CohortInput, CohortResult, SubjectTable};
pub use validate::ConsistencyWarning;
