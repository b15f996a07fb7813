//! Deterministic identifiers and filesystem-safe names.
//!
//! A source's ID is derived from its URL, so the same URL always maps to the
//! same ID. This is the derived form of the dedup key; the URL itself stays
//! the identity key in the catalog.

use sha2::{Digest, Sha256};

/// Default length cap for sanitized entity names.
pub const ENTITY_NAME_MAX: usize = 50;

/// Default length cap for sanitized file names.
pub const FILE_NAME_MAX: usize = 200;

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a stable source identifier from a URL.
///
/// Same URL always yields the same ID (e.g. `wiki_a3f2b1c4d5e6`); distinct
/// URLs collide only with negligible probability.
pub fn source_id(url: &str, prefix: &str) -> String {
    let digest = sha256_hex(url);
    format!("{}_{}", prefix, &digest[..12])
}

/// Hash a URL for use in file paths.
pub fn hash_url(url: &str) -> String {
    sha256_hex(url)[..16].to_string()
}

/// Full SHA-256 hex digest of extracted text, the catalog's secondary
/// integrity signal.
pub fn content_hash(text: &str) -> String {
    sha256_hex(text)
}

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

fn is_control(c: char) -> bool {
    c.is_control() || c == '\u{7f}'
}

/// Sanitize an entity name for use in directory names.
///
/// Spaces become underscores, filesystem-illegal and control characters are
/// stripped, runs of underscores collapse, and the result is capped at
/// `max_length`. Empty results fall back to "unknown".
pub fn sanitize_entity_name(name: &str, max_length: usize) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_control(c) {
            continue;
        }
        if c == ' ' || is_illegal(c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    let collapsed = collapse_underscores(&out);
    let trimmed: String = collapsed
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(max_length)
        .collect();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed
    }
}

/// Sanitize a file name for safe filesystem storage.
///
/// Like [`sanitize_entity_name`] but also collapses whitespace runs and
/// falls back to "unnamed".
pub fn sanitize_file_name(name: &str, max_length: usize) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_control(c) {
            continue;
        }
        if c.is_whitespace() || is_illegal(c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    let collapsed = collapse_underscores(&out);
    let trimmed: String = collapsed
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(max_length)
        .collect();
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed
    }
}

fn collapse_underscores(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    out
}

/// Extract a knowledge-graph entity ID from a directory name.
///
/// Directory names look like `Max_Planck_Q9021`; a bare `Q9021` is accepted
/// too. Returns `None` when no ID is present.
pub fn entity_id_from_dir_name(dir_name: &str) -> Option<String> {
    let candidate = match dir_name.rsplit_once('_') {
        Some((_, tail)) => tail,
        None => dir_name,
    };
    let mut chars = candidate.chars();
    if chars.next() != Some('Q') {
        return None;
    }
    let digits = chars.as_str();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(candidate.to_string())
    } else {
        None
    }
}
