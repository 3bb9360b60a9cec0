//! Scan orchestration.
//!
//! Drives the per-note pipeline: extract references, resolve assets, read
//! bytes, transcribe, analyze, rewrite, persist. Processing is strictly
//! sequential (one reference, one note at a time); a failure on one reference
//! is logged and skipped, the batch continues. Batch entry is guarded by an
//! in-flight flag so a watch trigger cannot interleave with a running scan.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, info, instrument, warn};

use super::extract::{extract_references, AudioRef};
use super::resolve::Resolver;
use super::rewrite::{rewrite_document, RewriteItem};
use crate::config::Settings;
use crate::media;
use crate::remote::{AnalysisClient, SpeechToText, TaskExtractor, TranscriptionClient};
use crate::vault::Vault;

/// Containers the transcription endpoint accepts as-is. Anything else is
/// transcoded to WAV first.
const UPSTREAM_CONTAINERS: &[&str] = &[
    "m4a", "mp3", "wav", "ogg", "webm", "flac", "mp4", "mpeg", "mpga", "oga",
];

/// Pipeline status, surfaced to the user while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    Recording,
    Processing,
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// Counters for one batch, reported as a single notice.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Notes that contained at least one unprocessed reference
    pub documents: usize,

    /// Unprocessed references encountered
    pub references: usize,

    /// References transcribed and written back
    pub transcribed: usize,

    /// References skipped on resolution, IO, or remote failure
    pub skipped: usize,
}

impl ScanSummary {
    /// The one user-facing line for this batch.
    pub fn notice(&self) -> String {
        if self.references == 0 {
            return "No audio references found".to_string();
        }

        let mut notice = format!(
            "Transcribed {} of {} reference(s) across {} note(s)",
            self.transcribed, self.references, self.documents
        );
        if self.skipped > 0 {
            notice.push_str(&format!(", {} skipped", self.skipped));
        }
        notice
    }
}

/// Outcome of a guarded scan trigger.
#[derive(Debug)]
pub enum ScanOutcome {
    Completed(ScanSummary),

    /// Rejected: another scan holds the in-flight flag
    AlreadyRunning,
}

/// Result of a single-file run (`file` or `record` command).
#[derive(Debug)]
pub struct FileRunResult {
    pub transcript: String,
    pub analysis: String,

    /// Vault-relative path of the imported copy, when `save_audio` is on
    pub imported: Option<PathBuf>,

    /// Vault-relative path of the created note, when `create_note` is on
    pub note: Option<PathBuf>,
}

/// The scan pipeline. Remote calls go through the `SpeechToText` and
/// `TaskExtractor` seams so tests can substitute in-memory fakes.
pub struct ScanPipeline {
    settings: Settings,
    vault: Vault,
    stt: Arc<dyn SpeechToText>,
    tasks: Arc<dyn TaskExtractor>,
    status: Mutex<ScanStatus>,
    in_flight: AtomicBool,
}

impl ScanPipeline {
    pub fn new(
        settings: Settings,
        vault: Vault,
        stt: Arc<dyn SpeechToText>,
        tasks: Arc<dyn TaskExtractor>,
    ) -> Self {
        Self {
            settings,
            vault,
            stt,
            tasks,
            status: Mutex::new(ScanStatus::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Build a pipeline with the real HTTP clients.
    pub fn from_settings(settings: Settings, vault: Vault) -> Result<Self> {
        let stt = Arc::new(TranscriptionClient::new(settings.clone())?);
        let tasks = Arc::new(AnalysisClient::new(settings.clone())?);
        Ok(Self::new(settings, vault, stt, tasks))
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn status(&self) -> ScanStatus {
        *self.status.lock().expect("status lock poisoned")
    }

    pub fn set_status(&self, next: ScanStatus) {
        let mut status = self.status.lock().expect("status lock poisoned");
        if *status != next {
            debug!(from = %*status, to = %next, "Status transition");
            *status = next;
        }
    }

    /// Scan every note under the configured notes folder.
    #[instrument(skip(self))]
    pub async fn scan_all(&self) -> Result<ScanSummary> {
        self.set_status(ScanStatus::Processing);
        let result = self.scan_all_inner().await;
        self.set_status(ScanStatus::Idle);
        result
    }

    /// Scan a single note.
    #[instrument(skip(self), fields(note = %note.display()))]
    pub async fn scan_note(&self, note: &Path) -> Result<ScanSummary> {
        self.set_status(ScanStatus::Processing);

        let index = self.vault.link_index()?;
        let resolver = Resolver::new(&self.vault, &index, &self.settings.audio_folder);

        let mut summary = ScanSummary::default();
        let result = self.process_note(&resolver, note, &mut summary).await;

        self.set_status(ScanStatus::Idle);
        result.map(|_| summary)
    }

    /// Guarded batch entry for triggered scans. A trigger while a scan is
    /// running is rejected, not queued: the next filesystem change re-arms
    /// the debounce anyway.
    pub async fn try_scan_all(&self) -> Result<ScanOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Scan already in flight, trigger rejected");
            return Ok(ScanOutcome::AlreadyRunning);
        }

        let result = self.scan_all().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result.map(ScanOutcome::Completed)
    }

    async fn scan_all_inner(&self) -> Result<ScanSummary> {
        let notes = self.vault.notes(&self.settings.notes_folder)?;
        let index = self.vault.link_index()?;
        let resolver = Resolver::new(&self.vault, &index, &self.settings.audio_folder);

        let mut summary = ScanSummary::default();

        for note in &notes {
            if let Err(e) = self.process_note(&resolver, note, &mut summary).await {
                warn!(note = %note.display(), error = %e, "Note skipped");
            }
        }

        info!(
            documents = summary.documents,
            transcribed = summary.transcribed,
            skipped = summary.skipped,
            "Scan finished"
        );

        Ok(summary)
    }

    /// One read-modify-write pass over a note.
    async fn process_note(
        &self,
        resolver: &Resolver<'_>,
        note: &Path,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        let text = self.vault.read_note(note).await?;
        let refs = extract_references(&text, &self.settings.audio_extensions);
        if refs.is_empty() {
            return Ok(());
        }

        summary.documents += 1;
        let mut items = Vec::new();

        for reference in refs {
            summary.references += 1;
            match self.process_reference(resolver, note, &reference).await {
                Ok(item) => {
                    summary.transcribed += 1;
                    items.push(item);
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(
                        note = %note.display(),
                        reference = %reference.path,
                        error = %e,
                        "Reference skipped"
                    );
                }
            }
        }

        if items.is_empty() {
            return Ok(());
        }

        let rewritten = rewrite_document(&text, &items);
        if rewritten != text {
            self.vault.write_note(note, &rewritten).await?;
        }

        Ok(())
    }

    /// Resolve, read, transcribe, and analyze one reference.
    async fn process_reference(
        &self,
        resolver: &Resolver<'_>,
        note: &Path,
        reference: &AudioRef,
    ) -> Result<RewriteItem> {
        let asset = resolver
            .resolve(&reference.path, note)
            .with_context(|| format!("No matching asset for '{}'", reference.path))?;

        let recorded_at = asset_date(&self.vault.abs(&asset));
        let file_name = asset
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| reference.basename().to_string());

        let (audio, upload_name) = if needs_transcode(&file_name) {
            let wav = media::transcode_to_wav(&self.vault.abs(&asset)).await?;
            (wav, wav_name(&file_name))
        } else {
            (self.vault.read_bytes(&asset).await?, file_name)
        };

        let transcript = self
            .stt
            .transcribe(audio, &upload_name)
            .await
            .context("Transcription failed")?;

        let analysis = self.analyze_transcript(&transcript).await;

        Ok(RewriteItem {
            reference: reference.clone(),
            recorded_at,
            transcript,
            analysis,
        })
    }

    /// Analysis is optional: a failure degrades to transcript-only output.
    async fn analyze_transcript(&self, transcript: &str) -> String {
        if !self.settings.extract_tasks || transcript.is_empty() {
            return String::new();
        }

        match self.tasks.analyze(transcript).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Analysis failed, keeping transcript only");
                String::new()
            }
        }
    }

    /// Process a single external audio file: transcribe, optionally import
    /// the audio into the vault and create a note from the transcript.
    #[instrument(skip(self), fields(audio = %path.display()))]
    pub async fn process_audio_file(&self, path: &Path) -> Result<FileRunResult> {
        self.set_status(ScanStatus::Processing);
        let result = self.process_audio_file_inner(path).await;
        self.set_status(ScanStatus::Idle);
        result
    }

    async fn process_audio_file_inner(&self, path: &Path) -> Result<FileRunResult> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Not a file path: {}", path.display()))?;

        let (audio, upload_name) = if needs_transcode(&file_name) {
            let wav = media::transcode_to_wav(path).await?;
            (wav, wav_name(&file_name))
        } else {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
            (bytes, file_name.clone())
        };

        let transcript = self
            .stt
            .transcribe(audio, &upload_name)
            .await
            .context("Transcription failed")?;
        let analysis = self.analyze_transcript(&transcript).await;

        let imported = if self.settings.save_audio {
            Some(
                self.vault
                    .import_audio(path, &self.settings.audio_folder)
                    .await?,
            )
        } else {
            None
        };

        let note = if self.settings.create_note {
            Some(
                self.create_transcript_note(path, imported.as_deref(), &transcript, &analysis)
                    .await?,
            )
        } else {
            None
        };

        Ok(FileRunResult {
            transcript,
            analysis,
            imported,
            note,
        })
    }

    /// Build the new note through the same rewriter the scan path uses, so
    /// both flows produce identical markup.
    async fn create_transcript_note(
        &self,
        src: &Path,
        imported: Option<&Path>,
        transcript: &str,
        analysis: &str,
    ) -> Result<PathBuf> {
        let title = src
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "recording".to_string());

        let body = match imported {
            Some(rel) => {
                let raw = rel.to_string_lossy().replace('\\', "/");
                let reference = AudioRef {
                    raw: raw.clone(),
                    path: raw,
                };
                let seed = format!("# {}\n\n{}\n", title, reference.embed());
                let item = RewriteItem {
                    reference,
                    recorded_at: asset_date(src),
                    transcript: transcript.to_string(),
                    analysis: analysis.to_string(),
                };
                rewrite_document(&seed, &[item])
            }
            None => {
                let mut body = format!("# {}\n\n{}\n", title, transcript);
                if !analysis.is_empty() {
                    body.push_str(&format!("\n## Action Items\n\n{}\n", analysis));
                }
                body
            }
        };

        self.vault
            .create_note(&self.settings.create_note_folder, &title, &body)
            .await
    }
}

fn needs_transcode(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => !UPSTREAM_CONTAINERS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(ext)),
        None => true,
    }
}

fn wav_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{}.wav", stem),
        None => format!("{}.wav", file_name),
    }
}

/// Creation date of an asset, falling back to mtime, then to now.
fn asset_date(path: &Path) -> String {
    let stamp = std::fs::metadata(path)
        .ok()
        .and_then(|m| m.created().or_else(|_| m.modified()).ok())
        .map(DateTime::<Local>::from)
        .unwrap_or_else(Local::now);

    stamp.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_notice_empty_set() {
        let summary = ScanSummary::default();
        assert_eq!(summary.notice(), "No audio references found");
    }

    #[test]
    fn test_summary_notice_with_skips() {
        let summary = ScanSummary {
            documents: 2,
            references: 3,
            transcribed: 2,
            skipped: 1,
        };
        assert_eq!(
            summary.notice(),
            "Transcribed 2 of 3 reference(s) across 2 note(s), 1 skipped"
        );
    }

    #[test]
    fn test_needs_transcode() {
        assert!(!needs_transcode("clip.m4a"));
        assert!(!needs_transcode("clip.WAV"));
        assert!(needs_transcode("clip.amr"));
        assert!(needs_transcode("noext"));
    }

    #[test]
    fn test_wav_name() {
        assert_eq!(wav_name("clip.amr"), "clip.wav");
        assert_eq!(wav_name("noext"), "noext.wav");
    }
}
