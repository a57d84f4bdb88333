//! Shared utility functions for the installer crate.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

static KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Escape text for embedding inside an HTML fragment.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Reduce an HTML message to plain text for terminal output.
///
/// Tags are dropped and the entities produced by [`escape_html`] are decoded.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Hex-encoded SHA-256 of the given bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fresh 32 character hex project key, derived from the clock, the process
/// id and a per-process counter.
pub fn generate_project_key() -> String {
    let now = chrono::Utc::now();
    let seed = format!(
        "{}.{}.{}.{}",
        now.timestamp(),
        now.timestamp_subsec_nanos(),
        std::process::id(),
        KEY_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let mut key = sha256_hex(seed.as_bytes());
    key.truncate(32);
    key
}
