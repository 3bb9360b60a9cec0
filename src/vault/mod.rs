//! Vault access: note enumeration, link resolution index, and file IO.
//!
//! A vault is a plain directory of Markdown notes and their attachments.
//! All paths handed out by this module are vault-relative; callers join them
//! with [`Vault::abs`] only at the IO boundary. One scan pass does a single
//! read-modify-write per note.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Handle to a vault directory.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    /// Open an existing vault directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Vault directory does not exist: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a vault-relative path.
    pub fn abs(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    /// Whether a vault-relative path exists as a file.
    pub fn exists(&self, rel: &Path) -> bool {
        self.abs(rel).is_file()
    }

    /// Enumerate Markdown notes under a vault-relative subfolder
    /// (empty = whole vault). Returns sorted vault-relative paths.
    pub fn notes(&self, subfolder: &str) -> Result<Vec<PathBuf>> {
        let base = if subfolder.is_empty() {
            self.root.clone()
        } else {
            self.root.join(subfolder)
        };

        let pattern = format!("{}/**/*.md", base.display());
        let mut notes = Vec::new();

        for entry in glob::glob(&pattern).context("Invalid notes glob pattern")? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Skipping unreadable path during enumeration: {}", e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&self.root) {
                if is_hidden(rel) {
                    continue;
                }
                notes.push(rel.to_path_buf());
            }
        }

        notes.sort();
        Ok(notes)
    }

    /// Build the basename index used for link resolution.
    pub fn link_index(&self) -> Result<LinkIndex> {
        let pattern = format!("{}/**/*", self.root.display());
        let mut index = LinkIndex::default();

        for entry in glob::glob(&pattern).context("Invalid index glob pattern")? {
            let path = match entry {
                Ok(p) => p,
                Err(_) => continue,
            };
            if !path.is_file() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&self.root) {
                if is_hidden(rel) {
                    continue;
                }
                index.insert(rel.to_path_buf());
            }
        }

        Ok(index)
    }

    pub async fn read_note(&self, rel: &Path) -> Result<String> {
        tokio::fs::read_to_string(self.abs(rel))
            .await
            .with_context(|| format!("Failed to read note: {}", rel.display()))
    }

    pub async fn write_note(&self, rel: &Path, content: &str) -> Result<()> {
        tokio::fs::write(self.abs(rel), content)
            .await
            .with_context(|| format!("Failed to write note: {}", rel.display()))
    }

    pub async fn read_bytes(&self, rel: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(self.abs(rel))
            .await
            .with_context(|| format!("Failed to read asset: {}", rel.display()))
    }

    /// Copy an external audio file into the vault under `folder`.
    /// Collisions get a timestamp suffix. Returns the vault-relative path.
    pub async fn import_audio(&self, src: &Path, folder: &str) -> Result<PathBuf> {
        let file_name = src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "recording".to_string());

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut rel = PathBuf::from(folder).join(&file_name);
        if self.exists(&rel) {
            let stamp = Local::now().format("%Y%m%d-%H%M%S");
            let stem = src
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "recording".to_string());
            let ext = src
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            let stamped = if ext.is_empty() {
                format!("{}-{}", stem, stamp)
            } else {
                format!("{}-{}.{}", stem, stamp, ext)
            };
            rel = PathBuf::from(folder).join(stamped);
        }

        tokio::fs::copy(src, self.abs(&rel))
            .await
            .with_context(|| format!("Failed to copy {} into vault", src.display()))?;

        Ok(rel)
    }

    /// Create a new note under `folder`. Collisions get a timestamp suffix.
    /// Returns the vault-relative path.
    pub async fn create_note(&self, folder: &str, title: &str, body: &str) -> Result<PathBuf> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut rel = PathBuf::from(folder).join(format!("{}.md", title));
        if self.exists(&rel) {
            let stamp = Local::now().format("%Y%m%d-%H%M%S");
            rel = PathBuf::from(folder).join(format!("{}-{}.md", title, stamp));
        }

        self.write_note(&rel, body).await?;
        Ok(rel)
    }
}

/// Basename index over vault files, the stand-in for a host application's
/// link-resolution index.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    by_basename: HashMap<String, Vec<PathBuf>>,
}

impl LinkIndex {
    fn insert(&mut self, rel: PathBuf) {
        if let Some(name) = rel.file_name().and_then(|n| n.to_str()) {
            self.by_basename
                .entry(name.to_lowercase())
                .or_default()
                .push(rel);
        }
    }

    /// Resolve a basename with the source note's path as context.
    /// Same-directory matches win, then the shortest path, then lexicographic
    /// order for a stable result.
    pub fn resolve(&self, basename: &str, source_note: &Path) -> Option<PathBuf> {
        let candidates = self.by_basename.get(&basename.to_lowercase())?;
        let source_dir = source_note.parent().unwrap_or_else(|| Path::new(""));

        let mut best: Option<&PathBuf> = None;
        for candidate in candidates {
            let better = match best {
                None => true,
                Some(current) => {
                    let cand_same_dir = candidate.parent() == Some(source_dir);
                    let curr_same_dir = current.parent() == Some(source_dir);
                    if cand_same_dir != curr_same_dir {
                        cand_same_dir
                    } else {
                        let cand_depth = candidate.components().count();
                        let curr_depth = current.components().count();
                        if cand_depth != curr_depth {
                            cand_depth < curr_depth
                        } else {
                            candidate < current
                        }
                    }
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        best.cloned()
    }

    pub fn len(&self) -> usize {
        self.by_basename.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_basename.is_empty()
    }
}

/// Whether any component of a relative path is dot-prefixed.
fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn build_vault(files: &[&str]) -> (Vault, TempDir) {
        let temp = TempDir::new().unwrap();
        for file in files {
            let path = temp.path().join(file);
            tokio::fs::create_dir_all(path.parent().unwrap())
                .await
                .unwrap();
            tokio::fs::write(&path, b"x").await.unwrap();
        }
        (Vault::open(temp.path()).unwrap(), temp)
    }

    #[tokio::test]
    async fn test_notes_enumeration_skips_hidden() {
        let (vault, _temp) = build_vault(&[
            "daily/monday.md",
            "projects/plan.md",
            "clip.m4a",
            ".vaultscribe/config.yaml",
        ])
        .await;

        let notes = vault.notes("").unwrap();
        assert_eq!(
            notes,
            vec![PathBuf::from("daily/monday.md"), PathBuf::from("projects/plan.md")]
        );

        let scoped = vault.notes("daily").unwrap();
        assert_eq!(scoped, vec![PathBuf::from("daily/monday.md")]);
    }

    #[tokio::test]
    async fn test_link_index_prefers_source_directory() {
        let (vault, _temp) = build_vault(&[
            "daily/clip.m4a",
            "attachments/clip.m4a",
            "daily/monday.md",
        ])
        .await;

        let index = vault.link_index().unwrap();

        // Same directory as the source note wins
        let hit = index
            .resolve("clip.m4a", Path::new("daily/monday.md"))
            .unwrap();
        assert_eq!(hit, PathBuf::from("daily/clip.m4a"));

        // No same-dir candidate: shortest path, then lexicographic
        let hit = index
            .resolve("clip.m4a", Path::new("projects/plan.md"))
            .unwrap();
        assert_eq!(hit, PathBuf::from("attachments/clip.m4a"));

        assert!(index
            .resolve("missing.m4a", Path::new("daily/monday.md"))
            .is_none());
    }

    #[tokio::test]
    async fn test_link_index_case_insensitive() {
        let (vault, _temp) = build_vault(&["audio/Clip.M4A"]).await;
        let index = vault.link_index().unwrap();

        let hit = index.resolve("clip.m4a", Path::new("note.md")).unwrap();
        assert_eq!(hit, PathBuf::from("audio/Clip.M4A"));
    }

    #[tokio::test]
    async fn test_import_audio_collision_gets_stamp() {
        let temp = TempDir::new().unwrap();
        let vault = Vault::open(temp.path()).unwrap();

        let outside = TempDir::new().unwrap();
        let src = outside.path().join("memo.m4a");
        tokio::fs::write(&src, b"audio").await.unwrap();

        let first = vault.import_audio(&src, "audio").await.unwrap();
        assert_eq!(first, PathBuf::from("audio/memo.m4a"));
        assert!(vault.exists(&first));

        let second = vault.import_audio(&src, "audio").await.unwrap();
        assert_ne!(second, first);
        assert!(vault.exists(&second));
    }

    #[tokio::test]
    async fn test_create_note() {
        let temp = TempDir::new().unwrap();
        let vault = Vault::open(temp.path()).unwrap();

        let rel = vault
            .create_note("transcripts", "memo", "body text")
            .await
            .unwrap();
        assert_eq!(rel, PathBuf::from("transcripts/memo.md"));
        assert_eq!(vault.read_note(&rel).await.unwrap(), "body text");
    }
}
