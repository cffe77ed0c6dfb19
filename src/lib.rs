//! Local SHA3-256 file fingerprinting with optional AI-written summaries.
//!
//! The hashing pipeline lives in [`hashers`]; [`app::FingerprintApp`] ties it
//! to file access, the [`summarizer`], and the session [`history`].

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod hashers;
pub mod history;
pub mod models;
pub mod summarizer;
pub mod utils;

pub use error::HashError;
pub use hashers::{ChunkedHasher, FileSource, DEFAULT_CHUNK_SIZE};
pub use models::{FileMetadata, HashRecord};
