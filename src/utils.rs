//! Utility functions for text cleanup, truncation, and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace cleanup for scraped headlines and article bodies
//! - Character-safe truncation for prompts, fallbacks and logging
//! - JSON error detection for handling truncated LLM replies
//! - Output path validation before a crawl starts

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse scraped text onto a single line.
///
/// Carriage returns and newlines become spaces, every run of whitespace
/// becomes one space, and the result is trimmed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  Acme\r\n  ships\twidgets "), "Acme ships widgets");
/// ```
pub fn clean_text(text: &str) -> String {
    let flattened = text.replace(['\n', '\r'], " ");
    WHITESPACE_RUN.replace_all(&flattened, " ").trim().to_string()
}

/// The first `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The first `max` whitespace-separated words of `s`.
pub fn cap_words(s: &str, max: usize) -> String {
    let mut words = s.split_whitespace();
    let head: Vec<&str> = words.by_ref().take(max).collect();
    if words.next().is_none() {
        s.trim().to_string()
    } else {
        head.join(" ")
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM reply is cut off by its token limit, the JSON array it was
/// writing fails to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a title to a filename-friendly slug.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Escape text for inclusion in an HTML body or attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates the directory if needed, then performs a write test by creating
/// and immediately deleting a probe file next to the target.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %file.display()))]
pub async fn ensure_writable_parent(file: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = dir.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Acme\r\n  ships\twidgets "), "Acme ships widgets");
        assert_eq!(clean_text("\n\n"), "");
        assert_eq!(clean_text("one"), "one");
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_cap_words() {
        assert_eq!(cap_words("a b c d", 2), "a b");
        assert_eq!(cap_words("  a b  ", 5), "a b");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("Test-Article!"), "test-article");
        assert_eq!(slugify_title("Special@#$Characters"), "specialcharacters");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("M&A <b>\"x\"</b>"), "M&amp;A &lt;b&gt;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"["Title one", "Title tw"#;
        let result: Result<Vec<String>, _> = serde_json::from_str(json_eof);
        let e = result.unwrap_err();
        assert!(looks_truncated(&e));
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("news.csv");
        ensure_writable_parent(&target).await.unwrap();
        assert!(dir.path().join("nested").is_dir());
        assert!(!target.exists());
    }
}
