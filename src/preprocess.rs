// SPDX-License-Identifier: PMPL-1.0-or-later
//! Input preparation: size capping and removal of non-content blocks.
//!
//! `<script>`, `<style>`, `<template>` and `<noscript>` bodies carry markup-like
//! text that confuses pattern matching and has no bearing on the structural
//! checks, so they are dropped before any rule runs.

use regex::Regex;
use std::sync::LazyLock;

/// One pattern per block type; the regex crate has no backreferences.
static NON_CONTENT_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "template", "noscript"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("valid regex")
        })
        .collect()
});

/// An opener left without a closer once complete blocks are gone, through to
/// the end of the text. The byte cap can cut a block in half.
static UNTERMINATED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style|template|noscript)\b[^>]*>.*\z").expect("valid regex")
});

/// HTML ready for evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedHtml {
    pub html: String,
    /// Byte length of the raw input
    pub original_len: usize,
    /// The raw input exceeded the byte cap
    pub truncated: bool,
}

/// Cap the raw input at `max_bytes`, then strip non-content blocks
pub fn prepare(raw: &str, max_bytes: usize) -> PreparedHtml {
    let original_len = raw.len();
    let truncated = original_len > max_bytes;
    let capped = if truncated { truncate_at_char_boundary(raw, max_bytes) } else { raw };

    PreparedHtml {
        html: strip_non_content(capped),
        original_len,
        truncated,
    }
}

/// Remove script/style/template/noscript blocks including their contents.
/// A block that is never closed runs to the end of the text and is removed
/// as well.
pub fn strip_non_content(html: &str) -> String {
    let mut out = html.to_string();
    for re in NON_CONTENT_BLOCKS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, "").into_owned();
        }
    }
    if let Some(m) = UNTERMINATED_BLOCK.find(&out) {
        out.truncate(m.start());
    }
    out
}

/// Longest prefix of `s` that is at most `max_bytes` long and ends on a
/// UTF-8 character boundary
pub fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_blocks() {
        let html = r##"<html><head><script type="text/javascript">var a = "<img src=x>";</script>
            <STYLE>.x { color: red }</STYLE></head>
            <body><template><a href="#"></a></template><noscript><img src="y"></noscript><p>Hi</p></body></html>"##;
        let stripped = strip_non_content(html);
        assert!(!stripped.contains("<img"));
        assert!(!stripped.contains("<a "));
        assert!(!stripped.to_lowercase().contains("style"));
        assert!(stripped.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_unterminated_block_removed() {
        let stripped = strip_non_content("<p>a</p><script>x()</script><p>b</p><style>.y{}");
        assert_eq!(stripped, "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_cap_inside_script_drops_the_tail() {
        let raw = "<p>kept</p><script>var tpl = '<img src=x><a href=y></a>';</script><p>after</p>";
        let prepared = prepare(raw, 40);
        assert!(prepared.truncated);
        assert_eq!(prepared.html, "<p>kept</p>");
        assert!(!prepared.html.contains("<img"));
    }

    #[test]
    fn test_script_prefix_tags_untouched() {
        let html = "<scripts>keep</scripts><p>text</p>";
        assert_eq!(strip_non_content(html), html);
    }

    #[test]
    fn test_prepare_under_cap() {
        let prepared = prepare("<p>ok</p>", 100);
        assert!(!prepared.truncated);
        assert_eq!(prepared.original_len, 9);
        assert_eq!(prepared.html, "<p>ok</p>");
    }

    #[test]
    fn test_prepare_over_cap() {
        let raw = "a".repeat(50);
        let prepared = prepare(&raw, 10);
        assert!(prepared.truncated);
        assert_eq!(prepared.original_len, 50);
        assert_eq!(prepared.html.len(), 10);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is two bytes; a cap of 2 would split it
        let s = "aé";
        assert_eq!(truncate_at_char_boundary(s, 2), "a");
        assert_eq!(truncate_at_char_boundary(s, 3), "aé");
        assert_eq!(truncate_at_char_boundary(s, 0), "");
    }

    #[test]
    fn test_original_len_counts_stripped_content() {
        let raw = "<script>12345</script><p>x</p>";
        let prepared = prepare(raw, 1_000);
        assert_eq!(prepared.original_len, raw.len());
        assert_eq!(prepared.html, "<p>x</p>");
    }
}
