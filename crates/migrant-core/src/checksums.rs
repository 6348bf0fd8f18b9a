//! Checksums of migration bodies
//!
//! SHA256 of the body text. The ledger stores it so that a migration file
//! edited after it was applied is detected as drift.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum("SELECT 1");
        assert_eq!(checksum.len(), 64); // SHA256 is 64 hex chars
    }

    #[test]
    fn test_checksum_deterministic() {
        let body = "ALTER TABLE leads ADD COLUMN IF NOT EXISTS created_date DATE;";
        assert_eq!(compute_checksum(body), compute_checksum(body));
    }

    #[test]
    fn test_checksum_sees_whitespace_edits() {
        assert_ne!(
            compute_checksum("SELECT 1;"),
            compute_checksum("SELECT 1;\n")
        );
    }
}
