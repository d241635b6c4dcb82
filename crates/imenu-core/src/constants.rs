//! Shared defaults.

/// Lifetime of signed URLs when `SIGNED_URL_TTL_SECS` is not set.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

/// Mime type assumed when the caller does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Upper bound accepted for `MAX_UPLOAD_SIZE_MB`.
pub const MAX_UPLOAD_SIZE_CEILING_MB: usize = 50;

pub const DEFAULT_IMAGE_FOLDER: &str = "imenu/images";
pub const DEFAULT_DOCUMENT_FOLDER: &str = "imenu/documents";
pub const DEFAULT_MENU_FOLDER: &str = "imenu/cardapios";
pub const DEFAULT_PROFILE_FOLDER: &str = "imenu/profile-pics";

/// Longest filename stem kept from caller-supplied names.
pub const MAX_FILENAME_LENGTH: usize = 120;
