//! Command-line interface for vaultscribe.
//!
//! Commands for transcribing voice notes in a vault: scanning notes for
//! audio embeds, processing single files, recording, and watching for
//! changes. Every command surfaces exactly one success/failure notice.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::media;
use crate::scan::{ScanPipeline, ScanStatus};
use crate::vault::Vault;
use crate::watch::VaultWatcher;

/// vaultscribe - voice-note transcription for Markdown vaults
#[derive(Parser, Debug)]
#[command(name = "vaultscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Vault directory (defaults to VAULTSCRIBE_VAULT or an upward search
    /// for .vaultscribe/)
    #[arg(short, long, global = true)]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default config file into the vault
    Init,

    /// Show resolved settings
    Config,

    /// Scan notes and transcribe unprocessed audio references
    Scan {
        /// Single note to scan (vault-relative); omit to scan the
        /// configured notes folder
        note: Option<PathBuf>,
    },

    /// Transcribe a single local audio file
    File {
        /// Path to the audio file
        audio: PathBuf,

        /// Print the transcript only; skip vault import and note creation
        #[arg(long)]
        print_only: bool,
    },

    /// Record from the default input device until Ctrl-C, then transcribe
    Record,

    /// Watch the vault and scan after changes settle
    Watch,
}

impl Cli {
    /// Execute the CLI command against a resolved vault and settings.
    pub async fn execute(self, root: PathBuf, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Init => execute_init(&root),
            Commands::Config => execute_config(&root, &settings),
            Commands::Scan { note } => execute_scan(root, settings, note).await,
            Commands::File { audio, print_only } => {
                execute_file(root, settings, &audio, print_only).await
            }
            Commands::Record => execute_record(root, settings).await,
            Commands::Watch => execute_watch(root, settings).await,
        }
    }
}

fn execute_init(root: &Path) -> Result<()> {
    let path = Settings::config_path(root);
    if path.exists() {
        anyhow::bail!("Config already exists: {}", path.display());
    }

    Settings::default().save(root)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn execute_config(root: &Path, settings: &Settings) -> Result<()> {
    println!("Vault:             {}", root.display());
    println!("Config file:       {}", Settings::config_path(root).display());
    println!();
    println!(
        "API key:           {}",
        if settings.api_key.is_empty() { "(not set)" } else { "(set)" }
    );
    println!(
        "Auth header:       {}",
        if settings.auth_header.is_empty() { "(not set)" } else { "(set)" }
    );
    println!("Transcription URL: {}", settings.transcription_url);
    println!("Analysis URL:      {}", settings.analysis_url);
    println!("Model:             {}", settings.model);
    println!("Analysis model:    {}", settings.analysis_model);
    println!(
        "Language:          {}",
        if settings.language.is_empty() { "(auto)" } else { &settings.language }
    );
    println!("Notes folder:      {}", folder_or_root(&settings.notes_folder));
    println!("Audio folder:      {}", settings.audio_folder);
    println!("Extensions:        {}", settings.audio_extensions.join(", "));
    println!("Save audio:        {}", settings.save_audio);
    println!("Create note:       {}", settings.create_note);
    println!("Extract tasks:     {}", settings.extract_tasks);
    println!("Debounce:          {}s", settings.debounce_secs);
    Ok(())
}

fn folder_or_root(folder: &str) -> &str {
    if folder.is_empty() {
        "(vault root)"
    } else {
        folder
    }
}

async fn execute_scan(root: PathBuf, settings: Settings, note: Option<PathBuf>) -> Result<()> {
    let vault = Vault::open(&root)?;
    let pipeline = ScanPipeline::from_settings(settings, vault)?;

    let summary = match note {
        Some(note) => {
            let rel = relativize(&root, &note);
            pipeline.scan_note(&rel).await?
        }
        None => pipeline.scan_all().await?,
    };

    println!("{}", summary.notice());
    Ok(())
}

async fn execute_file(
    root: PathBuf,
    mut settings: Settings,
    audio: &Path,
    print_only: bool,
) -> Result<()> {
    if print_only {
        settings.save_audio = false;
        settings.create_note = false;
    }

    let vault = Vault::open(&root)?;
    let pipeline = ScanPipeline::from_settings(settings, vault)?;

    let result = pipeline
        .process_audio_file(audio)
        .await
        .with_context(|| format!("Failed to process {}", audio.display()))?;

    println!("{}", result.transcript);
    if !result.analysis.is_empty() {
        println!("\n{}", result.analysis);
    }

    let mut notice = "Transcription complete".to_string();
    if let Some(imported) = &result.imported {
        notice.push_str(&format!(", audio saved to {}", imported.display()));
    }
    if let Some(note) = &result.note {
        notice.push_str(&format!(", note created at {}", note.display()));
    }
    eprintln!("{}", notice);

    Ok(())
}

async fn execute_record(root: PathBuf, settings: Settings) -> Result<()> {
    let vault = Vault::open(&root)?;
    let pipeline = ScanPipeline::from_settings(settings, vault)?;

    let capture_dir = tempfile::tempdir().context("Failed to create capture directory")?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let capture = capture_dir.path().join(format!("recording-{}.wav", stamp));

    pipeline.set_status(ScanStatus::Recording);
    eprintln!("Recording... press Ctrl-C to stop");

    let recorded = media::record(&capture).await;
    if let Err(e) = recorded {
        pipeline.set_status(ScanStatus::Idle);
        return Err(e).context("Recording failed");
    }

    let result = pipeline
        .process_audio_file(&capture)
        .await
        .context("Failed to process recording")?;

    println!("{}", result.transcript);
    if !result.analysis.is_empty() {
        println!("\n{}", result.analysis);
    }

    let mut notice = "Recording transcribed".to_string();
    if let Some(imported) = &result.imported {
        notice.push_str(&format!(", audio saved to {}", imported.display()));
    }
    if let Some(note) = &result.note {
        notice.push_str(&format!(", note created at {}", note.display()));
    }
    eprintln!("{}", notice);

    Ok(())
}

async fn execute_watch(root: PathBuf, settings: Settings) -> Result<()> {
    let quiet = Duration::from_secs(settings.debounce_secs);
    let extensions = settings.audio_extensions.clone();

    let vault = Vault::open(&root)?;
    let pipeline = Arc::new(ScanPipeline::from_settings(settings, vault)?);

    // Catch up on anything that changed while we were not running
    match pipeline.try_scan_all().await? {
        crate::scan::ScanOutcome::Completed(summary) => {
            tracing::info!("{}", summary.notice());
        }
        crate::scan::ScanOutcome::AlreadyRunning => {}
    }

    let handle = VaultWatcher::new(Arc::clone(&pipeline), quiet, extensions).spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    handle.stop().await?;
    println!("Watch stopped");
    Ok(())
}

/// Accept both vault-relative and absolute note paths.
fn relativize(root: &Path, note: &Path) -> PathBuf {
    note.strip_prefix(root).unwrap_or(note).to_path_buf()
}
