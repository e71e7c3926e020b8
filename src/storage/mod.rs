//! Artifact storage for gazette PDFs.
//!
//! Objects live under deterministic keys of the form
//! `{slug}/{year}/{month}/{description}_{filename}`, so re-running a fetch
//! for the same gazette always targets the same object.

mod memory;
mod spaces;

pub use memory::MemoryArtifactStore;
pub use spaces::SpacesArtifactStore;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};

/// Errors raised by artifact stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("artifact storage not configured: {0}")]
    NotConfigured(String),

    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },
}

/// Object storage for gazette artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL of the object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    /// Public URL for a key, whether or not it has been uploaded yet.
    fn public_url(&self, key: &str) -> String;
}

/// Reduce a description to a key-safe segment.
///
/// Keeps ASCII letters, digits, spaces and underscores (accented letters
/// are dropped, not transliterated), turns whitespace into underscores and
/// collapses underscore runs.
pub fn sanitize_description(description: &str) -> String {
    let kept: String = description
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    let mut out = String::with_capacity(kept.len());
    for c in kept.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Key segment for a description, never empty.
///
/// Descriptions that sanitize to nothing get a digest of the raw text so
/// distinct descriptions still land on distinct keys.
pub fn description_segment(description: &str) -> String {
    let sanitized = sanitize_description(description);
    if !sanitized.is_empty() && sanitized != "_" {
        return sanitized;
    }
    let digest = hex::encode(Sha256::digest(description.as_bytes()));
    format!("gazette_{}", &digest[..16])
}

/// Build the artifact key for a gazette.
pub fn artifact_key(slug: &str, date: NaiveDate, description: &str, filename: &str) -> String {
    format!(
        "{}/{}/{:02}/{}_{}",
        slug,
        date.year(),
        date.month(),
        description_segment(description),
        filename
    )
}
