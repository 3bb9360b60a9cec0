//! Reference-to-asset resolution.
//!
//! Resolution order, first success wins:
//! 1. a reference with an internal separator is already vault-qualified and
//!    must exist at that exact path
//! 2. basename lookup in the vault link index, with the source note as context
//! 3. the configured audio folder plus the basename
//!
//! A miss is not an error: the caller logs and skips the reference.

use std::path::{Path, PathBuf};

use crate::vault::{LinkIndex, Vault};

/// Resolves reference strings to vault-relative asset paths.
pub struct Resolver<'a> {
    vault: &'a Vault,
    index: &'a LinkIndex,
    audio_folder: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(vault: &'a Vault, index: &'a LinkIndex, audio_folder: &'a str) -> Self {
        Self {
            vault,
            index,
            audio_folder,
        }
    }

    /// Map a stripped reference to an existing vault-relative path.
    pub fn resolve(&self, reference: &str, source_note: &Path) -> Option<PathBuf> {
        let normalized = reference.trim_start_matches(['/', '\\']);
        if normalized.is_empty() {
            return None;
        }

        // Already qualified: the exact path decides, no index consultation
        if normalized.contains('/') || normalized.contains('\\') {
            let rel = PathBuf::from(normalized);
            return self.vault.exists(&rel).then_some(rel);
        }

        // The index may be stale under watch mode, so re-check existence
        if let Some(hit) = self.index.resolve(normalized, source_note) {
            if self.vault.exists(&hit) {
                return Some(hit);
            }
        }

        let fallback = Path::new(self.audio_folder).join(normalized);
        self.vault.exists(&fallback).then_some(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn vault_with(files: &[&str]) -> (Vault, TempDir) {
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
    async fn test_qualified_reference_skips_index() {
        let (vault, _temp) = vault_with(&["sub/dir/clip.m4a", "audio/clip.m4a"]).await;
        let index = vault.link_index().unwrap();
        let resolver = Resolver::new(&vault, &index, "audio");

        let hit = resolver
            .resolve("sub/dir/clip.m4a", Path::new("note.md"))
            .unwrap();
        assert_eq!(hit, PathBuf::from("sub/dir/clip.m4a"));
    }

    #[tokio::test]
    async fn test_qualified_miss_does_not_fall_back() {
        let (vault, _temp) = vault_with(&["audio/clip.m4a"]).await;
        let index = vault.link_index().unwrap();
        let resolver = Resolver::new(&vault, &index, "audio");

        // Exact qualified path is missing; the fallback copy must not rescue it
        assert!(resolver
            .resolve("sub/dir/clip.m4a", Path::new("note.md"))
            .is_none());
    }

    #[tokio::test]
    async fn test_bare_name_resolves_through_index() {
        let (vault, _temp) = vault_with(&["attachments/clip.m4a"]).await;
        let index = vault.link_index().unwrap();
        let resolver = Resolver::new(&vault, &index, "audio");

        let hit = resolver.resolve("clip.m4a", Path::new("note.md")).unwrap();
        assert_eq!(hit, PathBuf::from("attachments/clip.m4a"));
    }

    #[tokio::test]
    async fn test_bare_name_falls_back_to_audio_folder() {
        let (vault, _temp) = vault_with(&["audio/clip.m4a"]).await;
        let empty = LinkIndex::default();
        let resolver = Resolver::new(&vault, &empty, "audio");

        let hit = resolver.resolve("clip.m4a", Path::new("note.md")).unwrap();
        assert_eq!(hit, PathBuf::from("audio/clip.m4a"));

        assert!(resolver.resolve("other.m4a", Path::new("note.md")).is_none());
    }

    #[tokio::test]
    async fn test_leading_separators_are_stripped() {
        let (vault, _temp) = vault_with(&["audio/clip.m4a"]).await;
        let index = vault.link_index().unwrap();
        let resolver = Resolver::new(&vault, &index, "audio");

        let hit = resolver
            .resolve("/audio/clip.m4a", Path::new("note.md"))
            .unwrap();
        assert_eq!(hit, PathBuf::from("audio/clip.m4a"));
    }
}
