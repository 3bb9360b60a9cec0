//! vaultscribe - voice-note transcription for Markdown vaults
//!
//! Scans a vault of Markdown notes for `![[…]]` audio embeds, transcribes
//! them through a remote speech-to-text endpoint, optionally extracts action
//! items through a chat-completions endpoint, and rewrites the notes in
//! place. A `#transcribed` marker after each processed embed is the only
//! durable state: scanning is idempotent and can always be re-derived from
//! the note text.
//!
//! # Modules
//!
//! - `config`: settings record and vault discovery
//! - `vault`: note enumeration, link index, file IO
//! - `scan`: extraction, resolution, rewriting, orchestration
//! - `remote`: transcription and analysis HTTP clients
//! - `media`: ffmpeg transcode and capture glue
//! - `watch`: debounced filesystem trigger
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Transcribe every unprocessed audio embed in the vault
//! vaultscribe scan
//!
//! # Transcribe one local file into the vault
//! vaultscribe file memo.m4a
//!
//! # Keep scanning as notes and recordings change
//! vaultscribe watch
//! ```

pub mod cli;
pub mod config;
pub mod media;
pub mod remote;
pub mod scan;
pub mod vault;
pub mod watch;

// Re-export main types at crate root for convenience
pub use config::Settings;
pub use remote::{RemoteClientError, SpeechToText, TaskExtractor};
pub use scan::{AudioRef, ScanOutcome, ScanPipeline, ScanStatus, ScanSummary, PROCESSED_MARKER};
pub use vault::{LinkIndex, Vault};
pub use watch::{Debounce, VaultWatcher};
