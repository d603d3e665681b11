//! # vfsdb Core
//!
//! Restore-on-start, backup-on-save persistence for embedded databases that
//! run on an ephemeral virtual filesystem.
//!
//! This crate provides:
//! - [`PersistentContextFactory`], which wraps an engine's context creation
//! - Filename resolution from connection strings, memoized per context type
//! - A single-flight startup restore from an [`vfsdb_cache::ExternalCache`]
//! - A backup pushed to the cache after every committing save
//! - [`table`], a small reference engine with change tracking
//!
//! ## Lifecycle
//!
//! ```text
//! factory built ──> filename resolved ──> restore launched
//!                                              │
//! create_context ──> await restore ──> ensure schema (once) ──> attach hooks
//!                                                                   │
//! save_changes ──> commit ──> close connection ──> swap ──> push to cache
//! ```
//!
//! ## Key Invariants
//!
//! - The restore runs once per factory and completes before any context is
//!   handed out
//! - One filename per context type for the life of the process
//! - Cache and backup failures never fail a save; they are logged and
//!   recorded in [`PersistentContextFactory::last_status`]
//! - Only engine errors reach the caller of `create_context`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod barrier;
mod config;
mod context;
mod error;
mod factory;
mod filename;
mod hooks;
mod restore;
mod state;
mod status;
pub mod table;

pub use backup::{artifact_name, backup_name};
pub use barrier::StartupBarrier;
pub use config::FactoryConfig;
pub use context::{ContextProvider, DbContext, EntityState, SaveHooks, StateChange, TrackedEntry};
pub use error::{CoreError, CoreResult};
pub use factory::PersistentContextFactory;
pub use filename::{
    filename_from_connection_string, reset_filename_registry, resolve, resolved_filename,
    DEFAULT_FILENAME,
};
pub use vfsdb_cache::SyncStatus;
