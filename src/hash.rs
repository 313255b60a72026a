//! Content fingerprints
//!
//! The same digest is used for change detection and for the `contentHash`
//! recorded next to every saved artifact.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded content hash
pub const HASH_LEN: usize = 64;

/// Computes the SHA-256 fingerprint of `bytes` as lowercase hex
///
/// # Example
///
/// ```
/// use docmirror::hash::{content_hash, HASH_LEN};
///
/// let hash = content_hash(b"hello");
/// assert_eq!(hash.len(), HASH_LEN);
/// assert_eq!(hash, content_hash(b"hello"));
/// ```
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(content_hash("same text"), content_hash("same text"));
    }

    #[test]
    fn test_hash_length() {
        assert_eq!(content_hash("").len(), HASH_LEN);
        assert_eq!(content_hash(vec![0u8; 4096]).len(), HASH_LEN);
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(content_hash("content 1"), content_hash("content 2"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
