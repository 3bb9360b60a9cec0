//! Document rewriting.
//!
//! Inserts transcripts after their embeds and appends action-item blocks at
//! the end of the document. Replacement is textual-substring based: the
//! accepted approximation is that embed tokens are unique enough in the
//! surrounding text. An occurrence already followed by the processed marker
//! is never touched, which also keeps a repeated reference from being
//! re-replaced within one pass.

use super::extract::{AudioRef, PROCESSED_MARKER};

/// One resolved, transcribed reference ready for insertion.
#[derive(Debug, Clone)]
pub struct RewriteItem {
    pub reference: AudioRef,

    /// Creation date of the underlying asset, preformatted
    pub recorded_at: String,

    pub transcript: String,

    /// Action-item text; empty means none and is a valid outcome
    pub analysis: String,
}

/// Produce the rewritten document text. Items whose embed cannot be located
/// in either form leave the text unchanged.
pub fn rewrite_document(text: &str, items: &[RewriteItem]) -> String {
    let mut result = text.to_string();
    let mut appendix = String::new();

    for item in items {
        // Qualified form first, basename form as fallback
        let full = item.reference.embed();
        let basename = item.reference.basename_embed();

        let target = find_unprocessed(&result, &full)
            .map(|pos| (pos, full.len()))
            .or_else(|| find_unprocessed(&result, &basename).map(|pos| (pos, basename.len())));

        let Some((pos, len)) = target else {
            continue;
        };

        let embed = &result[pos..pos + len];
        let block = format!(
            "{} {}\n*{}*\n\n{}\n",
            embed, PROCESSED_MARKER, item.recorded_at, item.transcript
        );
        result.replace_range(pos..pos + len, &block);

        if !item.analysis.is_empty() {
            appendix.push_str(&format!(
                "\n## Action Items ({})\n\n{}\n",
                item.reference.basename(),
                item.analysis
            ));
        }
    }

    if !appendix.is_empty() {
        if !result.ends_with('\n') {
            result.push('\n');
        }
        result.push_str(&appendix);
    }

    result
}

/// First occurrence of `needle` that is not already followed by the
/// processed marker.
fn find_unprocessed(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let pos = from + offset;
        let tail = &haystack[pos + needle.len()..];
        if !tail.trim_start_matches([' ', '\t']).starts_with(PROCESSED_MARKER) {
            return Some(pos);
        }
        from = pos + needle.len();
    }
    None
}
