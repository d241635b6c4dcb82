//! Request body extraction for the upload routes.
//!
//! Every upload route accepts the same two body shapes:
//!
//! - `multipart/form-data` with one file field (`file`, `imagem` or `image`)
//!   plus optional text fields.
//! - `application/json` where `file` is a base64 string, a data URL, or an
//!   object `{ data, type, name }`.
//!
//! Both end up as an [`UploadPayload`]; the upload service only ever sees
//! that.

use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use base64::engine::general_purpose;
use base64::Engine;
use bytes::Bytes;
use imenu_core::{AppError, UploadPurpose, UploadRequest};
use serde::{Deserialize, Deserializer};

use crate::error::{HttpAppError, ValidatedJson};

const FILE_FIELDS: [&str; 3] = ["file", "imagem", "image"];

/// Bytes of the uploaded file as they arrived.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    /// Type from the multipart part header or the data URL prefix.
    pub content_type: Option<String>,
}

/// Form fields that ride along with the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub is_cardapio: bool,
    pub is_document: bool,
    pub wants_private_url: bool,
    pub legacy: LegacyFields,
}

/// Free-text fields of the menu form, stored and echoed untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFields {
    pub title: Option<String>,
    pub content: Option<String>,
    pub link_social: Option<String>,
    pub privacy: Option<String>,
}

impl LegacyFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.link_social.is_none()
            && self.privacy.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file: IncomingFile,
    pub options: UploadOptions,
}

impl UploadPayload {
    /// Name shown to clients on download, before sanitization.
    pub fn original_name(&self) -> Option<&str> {
        self.options
            .file_name
            .as_deref()
            .or(self.file.file_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    /// Build the normalizer input. An explicit `fileType` wins over the part
    /// header or data URL type; an explicit `fileName` wins over the part name.
    pub fn to_request(&self, purpose: UploadPurpose) -> UploadRequest {
        let mut request = UploadRequest::new(self.file.bytes.clone())
            .document(self.options.is_document)
            .private(self.options.wants_private_url)
            .with_purpose(purpose);

        let declared = self
            .options
            .file_type
            .as_deref()
            .or(self.file.content_type.as_deref())
            .filter(|mime| !mime.trim().is_empty());
        if let Some(mime) = declared {
            request = request.with_mime_type(mime);
        }
        if let Some(name) = self.original_name() {
            request = request.with_file_name(name);
        }
        request
    }
}

impl<S> FromRequest<S> for UploadPayload
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidInput(e.body_text()))?;
            return Ok(extract_multipart_payload(multipart).await?);
        }

        if content_type.starts_with("application/json") || content_type.ends_with("+json") {
            let ValidatedJson(body) =
                ValidatedJson::<JsonUploadBody>::from_request(req, state).await?;
            return Ok(body.into_payload()?);
        }

        if content_type.is_empty() {
            return Err(AppError::BadRequest("No file uploaded".to_string()).into());
        }

        Err(AppError::BadRequest(format!(
            "Unsupported content type '{}'; send multipart/form-data or application/json",
            content_type
        ))
        .into())
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", e.body_text()))
    }
}

/// Walk the multipart form. Exactly one file field is accepted.
pub async fn extract_multipart_payload(
    mut multipart: Multipart,
) -> Result<UploadPayload, AppError> {
    let mut file: Option<IncomingFile> = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if FILE_FIELDS.contains(&field_name.as_str()) {
            if file.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one file".to_string(),
                ));
            }
            let file_name = field.file_name().map(|s: &str| s.to_string());
            let content_type = field.content_type().map(|s: &str| s.to_string());
            let bytes = field.bytes().await.map_err(multipart_error)?;

            file = Some(IncomingFile {
                bytes,
                file_name,
                content_type,
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        apply_text_field(&mut options, &field_name, value);
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    Ok(UploadPayload { file, options })
}

fn apply_text_field(options: &mut UploadOptions, name: &str, value: String) {
    let text = Some(value.trim().to_string()).filter(|v| !v.is_empty());
    match name {
        "fileType" | "file_type" | "type" => options.file_type = text,
        "fileName" | "file_name" | "filename" => options.file_name = text,
        "isCardapio" | "is_cardapio" => options.is_cardapio = parse_flag(&value),
        "isDocument" | "is_document" => options.is_document = parse_flag(&value),
        "private" | "wantsPrivateUrl" | "wants_private_url" => {
            options.wants_private_url = parse_flag(&value)
        }
        "title" => options.legacy.title = text,
        "content" => options.legacy.content = text,
        "linksocial" => options.legacy.link_social = text,
        "privacidade" => options.legacy.privacy = text,
        other => tracing::debug!(field = other, "Ignoring unknown upload field"),
    }
}

/// Form checkboxes and query-ish strings: `true`, `1`, `on`, `yes`.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(s)) => parse_flag(&s),
        None => false,
    })
}

/// JSON upload body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUploadBody {
    #[serde(default, alias = "imagem", alias = "image", alias = "base64")]
    pub file: Option<JsonFile>,
    #[serde(default, alias = "file_type", alias = "mimeType", alias = "type")]
    pub file_type: Option<String>,
    #[serde(default, alias = "file_name", alias = "filename")]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "flag", alias = "is_cardapio")]
    pub is_cardapio: bool,
    #[serde(default, deserialize_with = "flag", alias = "is_document")]
    pub is_document: bool,
    #[serde(
        default,
        deserialize_with = "flag",
        alias = "private",
        alias = "wants_private_url"
    )]
    pub wants_private_url: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "linksocial")]
    pub link_social: Option<String>,
    #[serde(default, rename = "privacidade")]
    pub privacy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JsonFile {
    /// Plain base64 or a `data:<mime>;base64,` URL.
    Encoded(String),
    Fields(JsonFileFields),
}

#[derive(Debug, Deserialize)]
pub struct JsonFileFields {
    #[serde(alias = "base64")]
    pub data: String,
    #[serde(default, rename = "type", alias = "mimeType", alias = "contentType")]
    pub content_type: Option<String>,
    #[serde(default, alias = "fileName", alias = "filename")]
    pub name: Option<String>,
}

impl JsonUploadBody {
    pub fn into_payload(self) -> Result<UploadPayload, AppError> {
        let file = match self.file {
            None => return Err(AppError::BadRequest("No file uploaded".to_string())),
            Some(JsonFile::Encoded(encoded)) => {
                let (bytes, content_type) = decode_base64_payload(&encoded)?;
                IncomingFile {
                    bytes,
                    file_name: None,
                    content_type,
                }
            }
            Some(JsonFile::Fields(fields)) => {
                let (bytes, embedded) = decode_base64_payload(&fields.data)?;
                IncomingFile {
                    bytes,
                    file_name: fields.name,
                    content_type: fields.content_type.or(embedded),
                }
            }
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(UploadPayload {
            file,
            options: UploadOptions {
                file_type: non_empty(self.file_type),
                file_name: non_empty(self.file_name),
                is_cardapio: self.is_cardapio,
                is_document: self.is_document,
                wants_private_url: self.wants_private_url,
                legacy: LegacyFields {
                    title: non_empty(self.title),
                    content: non_empty(self.content),
                    link_social: non_empty(self.link_social),
                    privacy: non_empty(self.privacy),
                },
            },
        })
    }
}

/// Decode a base64 string or data URL. Returns the bytes and the data URL's
/// mime type, if any. Whitespace and missing padding are tolerated.
pub fn decode_base64_payload(raw: &str) -> Result<(Bytes, Option<String>), AppError> {
    let raw = raw.trim();
    let (content_type, data) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| AppError::InvalidInput("Malformed data URL".to_string()))?;
            let mut parts = meta.split(';');
            let mime = parts.next().unwrap_or_default().trim().to_string();
            if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(AppError::InvalidInput(
                    "Only base64 data URLs are supported".to_string(),
                ));
            }
            (Some(mime).filter(|m| !m.is_empty()), data)
        }
        None => (None, raw),
    };

    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let unpadded = cleaned.trim_end_matches('=');
    let bytes = general_purpose::STANDARD
        .decode(&cleaned)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(unpadded))
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(unpadded))
        .map_err(|_| AppError::InvalidInput("File payload is not valid base64".to_string()))?;

    Ok((Bytes::from(bytes), content_type))
}
