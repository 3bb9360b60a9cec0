//! Note-scanning-and-transcription pipeline.
//!
//! This module contains:
//! - extract: finds audio embeds in note text
//! - resolve: maps references to vault assets
//! - rewrite: inserts transcripts and action-item blocks idempotently
//! - orchestrator: drives the pipeline per note and across the vault

pub mod extract;
pub mod orchestrator;
pub mod resolve;
pub mod rewrite;

// Re-export commonly used types
pub use extract::{extract_references, AudioRef, PROCESSED_MARKER};
pub use orchestrator::{FileRunResult, ScanOutcome, ScanPipeline, ScanStatus, ScanSummary};
pub use resolve::Resolver;
pub use rewrite::{rewrite_document, RewriteItem};
