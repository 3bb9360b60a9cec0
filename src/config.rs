//! Configuration for vaultscribe.
//!
//! Settings live in `<vault>/.vaultscribe/config.yaml` and are merged over
//! defaults on load: missing keys fall back, present keys override. The API
//! key can also come from the environment (VAULTSCRIBE_API_KEY, then
//! OPENAI_API_KEY), which takes precedence over the file.
//!
//! Vault discovery:
//! - explicit `--vault` path wins
//! - then the VAULTSCRIBE_VAULT environment variable
//! - then an upward search from the current directory for `.vaultscribe/`
//! - then the current directory itself

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".vaultscribe";
const CONFIG_FILE: &str = "config.yaml";

/// Flat settings record, persisted as YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API key for the remote endpoints (bearer auth)
    pub api_key: String,

    /// Verbatim Authorization header value for gateway deployments.
    /// When non-empty this takes precedence over `api_key`.
    pub auth_header: String,

    /// Speech-to-text endpoint
    pub transcription_url: String,

    /// Chat-completions endpoint for action-item extraction
    pub analysis_url: String,

    /// Transcription model name
    pub model: String,

    /// Analysis model name
    pub analysis_model: String,

    /// Transcription language hint (empty = auto-detect)
    pub language: String,

    /// Transcription prompt hint (empty = none)
    pub prompt: String,

    /// Vault-relative folder searched as the resolution fallback and used
    /// when importing recordings
    pub audio_folder: String,

    /// Vault-relative folder scanned for notes (empty = whole vault)
    pub notes_folder: String,

    /// Vault-relative folder for notes created from single-file runs
    pub create_note_folder: String,

    /// Copy external audio files into the vault when processing them
    pub save_audio: bool,

    /// Create a new note from the transcript of a single-file run
    pub create_note: bool,

    /// Run the action-item extraction call after transcription
    pub extract_tasks: bool,

    /// Recognized audio extensions (lowercase, no dot)
    pub audio_extensions: Vec<String>,

    /// Quiet period for the watch-mode debounce, in seconds
    pub debounce_secs: u64,

    /// Lower the default log filter to debug
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_header: String::new(),
            transcription_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            analysis_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "whisper-1".to_string(),
            analysis_model: "gpt-4o-mini".to_string(),
            language: String::new(),
            prompt: String::new(),
            audio_folder: "audio".to_string(),
            notes_folder: String::new(),
            create_note_folder: "transcripts".to_string(),
            save_audio: true,
            create_note: false,
            extract_tasks: true,
            audio_extensions: vec![
                "m4a".to_string(),
                "mp3".to_string(),
                "wav".to_string(),
                "ogg".to_string(),
                "webm".to_string(),
                "flac".to_string(),
            ],
            debounce_secs: 5,
            debug: false,
        }
    }
}

impl Settings {
    /// Path of the config file inside a vault
    pub fn config_path(vault_root: &Path) -> PathBuf {
        vault_root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load settings for a vault, merging the config file (if any) over
    /// defaults and applying environment overrides.
    pub fn load(vault_root: &Path) -> Result<Self> {
        let path = Self::config_path(vault_root);

        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        if let Some(key) = env_api_key() {
            settings.api_key = key;
        }

        Ok(settings)
    }

    /// Persist settings to the vault's config file.
    pub fn save(&self, vault_root: &Path) -> Result<()> {
        let path = Self::config_path(vault_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml = serde_yaml::to_string(self).context("Failed to serialize settings")?;
        std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Whether a path carries one of the recognized audio extensions.
    pub fn is_audio_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.audio_extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn env_api_key() -> Option<String> {
    std::env::var("VAULTSCRIBE_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
        .filter(|k| !k.is_empty())
}

/// Determine the vault root for this invocation.
pub fn find_vault_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    if let Ok(env_root) = std::env::var("VAULTSCRIBE_VAULT") {
        if !env_root.is_empty() {
            return Ok(PathBuf::from(env_root));
        }
    }

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    // Walk up looking for a .vaultscribe/ directory
    let mut current = cwd.clone();
    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    Ok(cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(temp.path()).unwrap();

        assert_eq!(settings.model, "whisper-1");
        assert_eq!(settings.audio_folder, "audio");
        assert!(settings.audio_extensions.contains(&"m4a".to_string()));
        assert_eq!(settings.debounce_secs, 5);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(CONFIG_FILE),
            "model: whisper-large\nnotes_folder: daily\n",
        )
        .unwrap();

        let settings = Settings::load(temp.path()).unwrap();

        // Present keys override
        assert_eq!(settings.model, "whisper-large");
        assert_eq!(settings.notes_folder, "daily");
        // Missing keys keep defaults
        assert_eq!(settings.analysis_model, "gpt-4o-mini");
        assert!(settings.save_audio);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();

        let mut settings = Settings::default();
        settings.language = "no".to_string();
        settings.debounce_secs = 12;
        settings.save(temp.path()).unwrap();

        let loaded = Settings::load(temp.path()).unwrap();
        assert_eq!(loaded.language, "no");
        assert_eq!(loaded.debounce_secs, 12);
    }

    #[test]
    fn test_is_audio_path() {
        let settings = Settings::default();
        assert!(settings.is_audio_path(Path::new("clip.m4a")));
        assert!(settings.is_audio_path(Path::new("sub/dir/CLIP.M4A")));
        assert!(!settings.is_audio_path(Path::new("notes.md")));
        assert!(!settings.is_audio_path(Path::new("noext")));
    }

    #[test]
    fn test_find_vault_root_explicit() {
        let root = find_vault_root(Some(PathBuf::from("/some/vault"))).unwrap();
        assert_eq!(root, PathBuf::from("/some/vault"));
    }
}
