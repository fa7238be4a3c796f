//! Core types and traits for the Linkfold URL shortener.
//!
//! This crate provides the shared vocabulary of the workspace: short codes
//! and their format, the stored record, and the seams the resolution
//! pipeline is assembled from (durable repository, volatile cache, and
//! membership filter).

pub mod cache;
pub mod error;
pub mod filter;
pub mod repository;
pub mod shortcode;

pub use cache::UrlCache;
pub use error::{CacheError, CoreError, StorageError};
pub use filter::{FilterParameters, MembershipFilter};
pub use repository::{InsertOutcome, ReadRepository, Repository, UrlRecord};
pub use shortcode::{Alphabet, CodeFormat, ShortCode};
