//! Radar Oficial - official gazette acquisition pipeline.
//!
//! Discovers newly published gazettes ("diários") from Piauí publishers,
//! stores each PDF once in object storage, records it in the database and
//! asks the downstream indexing service to reindex the affected knowledge
//! bases.

pub mod cli;
pub mod config;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod services;
pub mod storage;
