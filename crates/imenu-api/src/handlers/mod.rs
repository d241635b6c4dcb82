pub mod download;
pub mod files;
pub mod upload;
