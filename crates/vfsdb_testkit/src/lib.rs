//! # vfsdb Testkit
//!
//! Test utilities for vfsdb.
//!
//! This crate provides:
//! - [`TestHarness`], an ephemeral local filesystem plus a durable cache tier
//!   that survives simulated process restarts
//! - [`DirectoryHarness`], the same over a temporary host directory
//! - [`test_schema!`], a one-line [`Schema`] declaration
//! - Property-based test generators using proptest
//! - [`init_tracing`] for log output while debugging tests
//!
//! ## Usage
//!
//! ```rust
//! use vfsdb_testkit::{test_schema, TestHarness};
//!
//! test_schema!(Notes, ["notes"]);
//!
//! let harness = TestHarness::new();
//! let factory = harness.factory::<Notes>("Data Source=notes.db");
//! let ctx = factory.create_context().unwrap();
//! ctx.insert("notes", "1", serde_json::json!("hello")).unwrap();
//! ctx.save_changes().unwrap();
//!
//! let restarted = harness.restart();
//! let ctx = restarted.factory::<Notes>("Data Source=notes.db").create_context().unwrap();
//! assert_eq!(ctx.find("notes", "1").unwrap(), Some(serde_json::json!("hello")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
mod logging;

pub use fixtures::*;
pub use generators::*;
pub use logging::init_tracing;
pub use vfsdb_core::table::Schema;

/// Declares a unit struct implementing [`Schema`].
///
/// Filenames are memoized per context type for the life of the process, so
/// tests that need their own filename declare their own schema.
///
/// ```rust
/// vfsdb_testkit::test_schema!(Inventory, ["items", "orders"]);
/// vfsdb_testkit::test_schema!(Single);
/// ```
#[macro_export]
macro_rules! test_schema {
    ($name:ident) => {
        $crate::test_schema!($name, ["items"]);
    };
    ($name:ident, [$($table:literal),+ $(,)?]) => {
        struct $name;

        impl $crate::Schema for $name {
            const NAME: &'static str = stringify!($name);
            const TABLES: &'static [&'static str] = &[$($table),+];
        }
    };
}
