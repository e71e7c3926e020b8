//! Service layer for Radar Oficial business logic.
//!
//! Services hold their collaborators explicitly and are shared by the CLI
//! and the job scheduler.

pub mod ingest;
pub mod reindex;

pub use ingest::{IngestError, IngestReport, IngestionPipeline};
pub use reindex::{
    HttpReindexTrigger, KnowledgeBase, ReindexBatcher, ReindexError, ReindexReport,
    ReindexTrigger,
};
