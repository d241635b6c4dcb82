//! Filename sanitization and generation.

use chrono::Utc;
use uuid::Uuid;

use super::ValidationError;
use crate::constants::MAX_FILENAME_LENGTH;

/// Reduce a caller-supplied file name to a safe stem (no directory, no extension).
///
/// Returns `Ok(None)` when nothing usable is left, so the caller can fall back
/// to a generated name.
pub fn sanitize_stem(filename: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = filename.trim();
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);

    if trimmed.split(['/', '\\']).any(|part| part == "..") {
        return Err(ValidationError::InvalidFilename(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let sanitized: String = stem
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_matches('_').to_string();
    if sanitized.is_empty() {
        return Ok(None);
    }
    Ok(Some(sanitized))
}

/// Collision-resistant name: millisecond timestamp plus a random suffix.
pub fn generate_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &id[..12])
}

/// Short random suffix appended to preserved names so equal names never collide.
pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
