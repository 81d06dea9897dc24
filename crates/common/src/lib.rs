//! Common utilities and shared types for kotoba.
//!
//! This crate provides foundational components used across all kotoba crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Pagination**: Page-number pagination via [`PageRequest`] and [`Page`]
//! - **Storage**: Local filesystem storage for uploaded media
//!
//! # Example
//!
//! ```no_run
//! use kotoba_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod pagination;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use pagination::{Page, PageRequest};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, generate_storage_key};
