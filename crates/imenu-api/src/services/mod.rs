pub mod file_registry;
pub mod upload;
