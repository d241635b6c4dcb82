//! imenu Storage Library
//!
//! Storage abstraction and the two backends behind it: the Cloudinary media
//! host and the local filesystem.
//!
//! # Key format
//!
//! Objects are addressed by `{folder}/{stem}` (images on Cloudinary) or
//! `{folder}/{stem}.{ext}` (documents, and everything on local disk). Keys must
//! not contain `..`, backslashes or a leading `/`; validation lives in the
//! `keys` module so every backend applies the same rules.

pub mod cloudinary;
pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use cloudinary::CloudinaryStorage;
pub use factory::create_storage;
pub use imenu_core::StorageBackend;
pub use local::{ByteStream, LocalStorage};
pub use signing::LinkSigner;
pub use traits::{ResolvedUrl, Storage, StorageError, StorageResult};
