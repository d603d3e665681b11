//! # vfsdb Storage
//!
//! Virtual filesystem and swap primitives for vfsdb.
//!
//! This crate provides the lowest-level storage abstraction for vfsdb.
//! A virtual filesystem is a flat namespace of **opaque named blobs** - it does
//! not interpret the database files it holds.
//!
//! ## Design Principles
//!
//! - Files are whole blobs addressed by name (read, write, remove)
//! - No knowledge of database images, backups or cache keys
//! - Must be `Send + Sync` so the engine, the cache and the swap utility can
//!   share one filesystem
//!
//! ## Available Filesystems
//!
//! - [`InMemoryFs`] - The sandbox's ephemeral filesystem; lost on restart
//! - [`DirectoryFs`] - A flat directory on the host, for native builds
//!
//! ## Swap
//!
//! [`Swap`] makes the bytes stored under one name available under another.
//! [`CopySwap`] implements it as a plain copy within a [`VirtualFs`].
//!
//! ## Example
//!
//! ```rust
//! use vfsdb_storage::{CopySwap, InMemoryFs, Swap, VirtualFs};
//! use std::sync::Arc;
//!
//! let fs = Arc::new(InMemoryFs::new());
//! fs.write("app.db", b"hello world").unwrap();
//!
//! let swap = CopySwap::new(fs.clone());
//! swap.swap("app.db", "app.db_bak-0badf00d").unwrap();
//! assert_eq!(fs.read("app.db_bak-0badf00d").unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod memory;
mod swap;
mod vfs;

pub use directory::DirectoryFs;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryFs;
pub use swap::{CopySwap, Swap};
pub use vfs::{validate_name, VirtualFs};
