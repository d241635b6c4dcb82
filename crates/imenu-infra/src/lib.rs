//! imenu Infrastructure Library
//!
//! Shared infrastructure used by the HTTP service:
//! - Middleware (request ID, security headers)
//! - Telemetry initialization
//! - The JSON error envelope
//! - Process resource readings for health checks

pub mod error;
pub mod middleware;
pub mod process;
pub mod telemetry;

// Re-export commonly used types
pub use error::ErrorResponse;
pub use middleware::{get_request_id, request_id_middleware, security_headers_middleware};
pub use process::{MemoryUsage, ProcessMonitor};
pub use telemetry::{init_telemetry, LogFormat};
