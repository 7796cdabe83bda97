//! Hashing of the canonical solve-input feed.

use sha2::{Digest, Sha256};
use verdep_types::InputsDigest;

/// Hashes a canonical feed of input elements.
///
/// Each element is written followed by a newline, matching the textual
/// debug form of the feed used by tests, so the digest is reproducible to
/// the byte for identical inputs.
pub(crate) fn hash_feed(elements: &[String]) -> InputsDigest {
    let mut hasher = Sha256::new();
    for element in elements {
        hasher.update(element.as_bytes());
        hasher.update(b"\n");
    }
    InputsDigest::new(hasher.finalize().into())
}
