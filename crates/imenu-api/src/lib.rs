//! imenu API Library
//!
//! HTTP handlers, the upload service and application setup for the file
//! upload service.

mod api_doc;
mod handlers;
mod services;
mod utils;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{HttpAppError, ValidatedJson};
pub use services::file_registry::FileRegistry;
pub use state::AppState;
