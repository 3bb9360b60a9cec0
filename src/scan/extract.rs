//! Reference extraction from note text.
//!
//! Finds `![[…]]` embeds line by line and keeps the ones that point at audio
//! assets and are not yet marked as transcribed. Pure function of the input
//! text: duplicates are preserved in order of appearance and the result is
//! restartable.

/// In-text tag appended after an embed once its transcript is inserted.
pub const PROCESSED_MARKER: &str = "#transcribed";

const EMBED_OPEN: &str = "![[";
const EMBED_CLOSE: &str = "]]";

/// An audio embed found in note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRef {
    /// Raw token between the brackets, alias/fragment included
    pub raw: String,

    /// Token with alias and fragment segments stripped
    pub path: String,
}

impl AudioRef {
    /// Path component after the last separator.
    pub fn basename(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.path)
    }

    /// The embed markup as it appears in the document.
    pub fn embed(&self) -> String {
        format!("{}{}{}", EMBED_OPEN, self.raw, EMBED_CLOSE)
    }

    /// The embed markup in basename-only form.
    pub fn basename_embed(&self) -> String {
        format!("{}{}{}", EMBED_OPEN, self.basename(), EMBED_CLOSE)
    }
}

/// Strip alias (`|`) and fragment (`#`) segments from an embed token.
pub fn strip_token(token: &str) -> &str {
    let end = token
        .find(['|', '#'])
        .unwrap_or(token.len());
    token[..end].trim()
}

/// Extract unprocessed audio references from note text, in order of
/// appearance, duplicates preserved.
pub fn extract_references(text: &str, extensions: &[String]) -> Vec<AudioRef> {
    let mut refs = Vec::new();

    for line in text.lines() {
        let mut rest = line;
        while let Some(open) = rest.find(EMBED_OPEN) {
            let after_open = &rest[open + EMBED_OPEN.len()..];
            let Some(close) = after_open.find(EMBED_CLOSE) else {
                break;
            };

            let raw = &after_open[..close];
            let tail = &after_open[close + EMBED_CLOSE.len()..];

            let path = strip_token(raw);
            let processed = tail.trim_start().starts_with(PROCESSED_MARKER);

            if !processed && !path.is_empty() && has_audio_extension(path, extensions) {
                refs.push(AudioRef {
                    raw: raw.to_string(),
                    path: path.to_string(),
                });
            }

            rest = tail;
        }
    }

    refs
}

fn has_audio_extension(path: &str, extensions: &[String]) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["m4a".to_string(), "mp3".to_string()]
    }

    #[test]
    fn test_processed_reference_is_excluded() {
        let text = "![[voice.m4a]]\n![[voice.m4a]] #transcribed\n";
        let refs = extract_references(text, &exts());

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "voice.m4a");
    }

    #[test]
    fn test_alias_and_fragment_are_stripped() {
        let text = "![[clip.m4a|my recording]] and ![[talk.m4a#t=30]]";
        let refs = extract_references(text, &exts());

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].raw, "clip.m4a|my recording");
        assert_eq!(refs[0].path, "clip.m4a");
        assert_eq!(refs[1].path, "talk.m4a");
    }

    #[test]
    fn test_non_audio_embeds_are_ignored() {
        let text = "![[diagram.png]] ![[note.md]] ![[clip.mp3]]";
        let refs = extract_references(text, &exts());

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "clip.mp3");
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let text = "![[a.m4a]]\nmiddle ![[b.m4a]]\n![[a.m4a]]\n";
        let refs = extract_references(text, &exts());

        let paths: Vec<&str> = refs.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a.m4a", "b.m4a", "a.m4a"]);
    }

    #[test]
    fn test_marker_only_excludes_its_own_embed() {
        let text = "![[done.m4a]] #transcribed then ![[todo.m4a]]";
        let refs = extract_references(text, &exts());

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "todo.m4a");
    }

    #[test]
    fn test_basename_of_qualified_path() {
        let text = "![[sub/dir/clip.m4a]]";
        let refs = extract_references(text, &exts());

        assert_eq!(refs[0].basename(), "clip.m4a");
        assert_eq!(refs[0].embed(), "![[sub/dir/clip.m4a]]");
        assert_eq!(refs[0].basename_embed(), "![[clip.m4a]]");
    }

    #[test]
    fn test_unterminated_embed_is_ignored() {
        let refs = extract_references("![[broken.m4a", &exts());
        assert!(refs.is_empty());
    }
}
