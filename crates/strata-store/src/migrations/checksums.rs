//! Checksums of migration step definitions
//!
//! The ledger stores the SHA256 of each forward action's description so that
//! edits to an already-applied step can be detected.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string, hex encoded
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum("CREATE TABLE students (id INTEGER PRIMARY KEY)");
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn test_checksum_distinguishes_content() {
        assert_eq!(compute_checksum("SELECT 1"), compute_checksum("SELECT 1"));
        assert_ne!(compute_checksum("SELECT 1"), compute_checksum("SELECT 2"));
    }
}
