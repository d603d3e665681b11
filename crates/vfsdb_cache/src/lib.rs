//! # vfsdb Cache
//!
//! External durable cache abstraction and implementations for vfsdb.
//!
//! This crate provides:
//! - [`ExternalCache`], the asynchronous durability tier (pull a blob into the
//!   local virtual filesystem, push a local file out to durable storage)
//! - [`SyncStatus`], the integer outcome code every cache call reports
//! - [`BlobCache`], a cache over any durable [`vfsdb_storage::VirtualFs`]
//!   (in-memory for tests, a host directory for native builds)
//! - [`MockCache`], a scriptable cache that records its calls
//!
//! ## Key Convention
//!
//! Durable storage is keyed by the local name cut at its last
//! [`BACKUP_MARKER`] (see [`cache_key`]). A restore asks for `app.db_bak`; a
//! backup pushes `app.db_bak-1a2b3c4d`. Both map to the durable key `app.db`,
//! so every push replaces the copy the next restore will fetch.
//!
//! ## Key Invariants
//!
//! - `SUCCESS` (0) is the only success code
//! - A pushed artifact is owned by the cache once it reports success
//! - Cache failures never corrupt the local live database file

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blob;
mod cache;
mod config;
mod error;
mod mock;
mod status;

pub use blob::BlobCache;
pub use cache::{cache_key, ExternalCache, BACKUP_MARKER};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use mock::MockCache;
pub use status::SyncStatus;
