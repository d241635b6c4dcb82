//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::handlers;
use imenu_core::models;
use imenu_infra::{ErrorResponse, MemoryUsage};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "imenu files API",
        version = "0.1.0",
        description = "Upload images and PDF menus to the configured media host and get back public or signed URLs."
    ),
    paths(
        // Uploads
        handlers::upload::upload_file,
        handlers::upload::upload_menu,
        handlers::upload::upload_profile_picture,
        // Downloads
        handlers::download::download_by_public_id,
        handlers::download::download_by_id,
        // Local files
        handlers::files::serve_public_file,
        handlers::files::serve_signed_file,
    ),
    components(
        schemas(
            handlers::upload::UploadResponse,
            handlers::upload::MenuData,
            models::MediaKind,
            MemoryUsage,
            // Error
            ErrorResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Image and document uploads"),
        (name = "downloads", description = "Attachment downloads by public id or file id"),
        (name = "files", description = "Files served from local storage")
    )
)]
pub struct ApiDoc;
