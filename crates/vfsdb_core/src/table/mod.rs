//! A small reference engine: keyed JSON rows in named tables.
//!
//! The engine keeps the whole database as one image file in a
//! [`vfsdb_storage::VirtualFs`], which is exactly the kind of engine the
//! persistence factory is built for: it knows nothing about caches or
//! backups, it only reads and writes its file.
//!
//! - [`Schema`] names the database and its tables at the type level, so each
//!   schema gets its own context type
//! - [`TableEngine`] is the [`crate::ContextProvider`]
//! - [`TableContext`] tracks inserts, updates and removals and writes them in
//!   [`TableContext::save_changes`], calling [`crate::SaveHooks`] around it
//!
//! There is no query language; rows are found by key or listed per table.

mod context;
mod engine;
mod image;
mod tracker;

pub use context::TableContext;
pub use engine::TableEngine;
pub use image::{compute_crc32, DatabaseImage, Rows, IMAGE_MAGIC, IMAGE_VERSION};

/// Type-level description of a database.
pub trait Schema: Send + Sync + 'static {
    /// Name of the database, used in logs.
    const NAME: &'static str;
    /// Tables created by `ensure_created`.
    const TABLES: &'static [&'static str];
}
