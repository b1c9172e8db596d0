//! Output formatting helpers

/// Truncate to `max_len` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len < 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// `sha256:0123456789ab…` shortened for human output.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    let digits = hash.find(':').map_or(0, |idx| idx + 1);
    let end = (digits + 12).min(hash.len());
    hash.get(..end).unwrap_or(hash)
}
