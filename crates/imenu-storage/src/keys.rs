//! Shared key validation and URL encoding for storage backends.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::traits::{StorageError, StorageResult};

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Reject keys that could escape the storage root or break URLs.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part == ".." || part == "." || part.is_empty())
        || key.chars().any(|c| c.is_control())
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Percent-encode each segment of a key, keeping the `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_folder_keys() {
        assert!(validate_key("imenu/cardapios/menu_1a2b.pdf").is_ok());
    }

    #[test]
    fn rejects_escapes() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn encodes_segments() {
        assert_eq!(encode_key("imenu/images/café 1.png"), "imenu/images/caf%C3%A9%201.png");
    }
}
