//! Content-derived message identifiers

use sha2::{Digest, Sha256};

/// Stable identifier for a piece of text: the hex SHA-256 of its UTF-8 bytes.
///
/// Same text always yields the same id, across runs and machines, so labels
/// produced against one export can be matched to records in a later one.
pub fn message_id(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_id() {
        assert_eq!(message_id("yes"), message_id("yes"));
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            message_id("yes"),
            "8a798890fe93817163b10b5f7bd2ca4d25d84c52739a645a889c173eee7d9d3d"
        );
    }

    #[test]
    fn different_text_different_id() {
        assert_ne!(message_id("yes"), message_id("Yes"));
        assert_eq!(message_id("").len(), 64);
    }
}
