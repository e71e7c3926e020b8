//! Data models for Radar Oficial.

mod gazette;
mod institution;
mod job;

pub use gazette::{Gazette, NewGazette};
pub use institution::{Institution, InstitutionType, KnownInstitution};
pub use job::{Job, JobKind, JobState};
