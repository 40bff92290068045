//! Cache key derivation.
//!
//! Keys are 128-bit MD5 digests rendered as 32 lowercase hex characters.
//! Author names are trimmed and lowercased first; paper identifiers are hashed verbatim.

use md5::{Digest, Md5};

/// Hash arbitrary text into a fixed-width key.
#[must_use]
pub fn content_key(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize an author display name for lookup.
#[must_use]
pub fn normalize_author(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Key for the author cache.
#[must_use]
pub fn author_key(name: &str) -> String {
    content_key(&normalize_author(name))
}

/// Key for the sent-papers cache.
#[must_use]
pub fn paper_key(paper_id: &str) -> String {
    content_key(paper_id)
}
