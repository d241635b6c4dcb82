//! Mime type helpers used while classifying uploads.

/// Normalize a declared mime type: drop parameters, trim and lowercase.
///
/// Bare shorthands sent by older clients (`pdf`, `png`, `image`) are expanded
/// to full mime types. Returns `None` for blank input.
pub fn normalize_mime_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next().unwrap_or(raw).trim().to_lowercase();
    if essence.is_empty() {
        return None;
    }
    if essence.contains('/') {
        return Some(essence);
    }
    let expanded = match essence.as_str() {
        "pdf" | "document" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "image" => return None,
        other => return Some(format!("application/{}", other)),
    };
    Some(expanded.to_string())
}

/// Whether the mime type carries the document marker.
pub fn is_document_mime(mime: &str) -> bool {
    mime.contains("pdf")
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// File extension (without dot) for a normalized mime type.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "application/pdf" | "application/x-pdf" => "pdf",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/heic" => "heic",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => return None,
    };
    Some(ext)
}

/// Mime type for a known file extension. Inverse of [`extension_for`].
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

/// Whether a declared type says nothing about the content.
pub fn is_generic_mime(mime: &str) -> bool {
    matches!(mime, "application/octet-stream" | "binary/octet-stream")
}

/// Lowercased extension of a file name, if it has one.
pub fn extension_from_filename(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}
