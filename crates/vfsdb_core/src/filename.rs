//! Filename resolution from connection strings.
//!
//! The engine decides where its database file lives from the connection
//! string; the persistence layer has to know that name too, because it is
//! the key under which backups are restored and pushed. The name is derived
//! once per context type and remembered for the life of the process.
//!
//! ## Accepted race
//!
//! Two threads resolving the same type for the first time may both parse the
//! connection string. Parsing is pure, the first insert into the registry
//! wins, and both callers return the stored value, so they always agree.

use crate::context::{ContextProvider, DbContext};
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Filename used when the connection string does not name a file.
pub const DEFAULT_FILENAME: &str = "filenotfound.db";

/// Connection string keys (lowercased) that name the database file.
const FILENAME_KEYS: [&str; 3] = ["data source", "datasource", "filename"];

/// Process-wide map from context type to its resolved filename.
static REGISTRY: LazyLock<RwLock<HashMap<TypeId, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Extracts the database filename from a `key=value;key=value` connection
/// string.
///
/// Picks the first pair whose lowercased key contains `data source`,
/// `datasource` or `filename`. Keys and values are trimmed; segments without
/// `=` and matches with an empty value are skipped.
///
/// ```
/// use vfsdb_core::filename_from_connection_string;
///
/// assert_eq!(
///     filename_from_connection_string("Data Source=mydb.sqlite;Cache=Shared"),
///     Some("mydb.sqlite")
/// );
/// assert_eq!(filename_from_connection_string("Foo=bar"), None);
/// ```
#[must_use]
pub fn filename_from_connection_string(connection_string: &str) -> Option<&str> {
    connection_string
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim()))
        .find(|(key, value)| {
            !value.is_empty() && FILENAME_KEYS.iter().any(|wanted| key.contains(wanted))
        })
        .map(|(_, value)| value)
}

/// Resolves the database filename for the provider's context type.
///
/// The first call for a type creates one throwaway context to read its
/// connection string and drops it; later calls are registry lookups. Never
/// fails: if the context cannot be created or names no file, `default` is
/// used (the filename is only a cache key, not a contract with the engine).
pub fn resolve<P: ContextProvider>(provider: &P, default: &str) -> String {
    let type_id = TypeId::of::<P::Context>();
    let cached = REGISTRY.read().get(&type_id).cloned();
    if let Some(filename) = cached {
        return filename;
    }

    let filename = read_filename(provider).unwrap_or_else(|| default.to_string());

    let mut registry = REGISTRY.write();
    let stored = registry.entry(type_id).or_insert(filename).clone();
    tracing::debug!(
        context = type_name::<P::Context>(),
        filename = %stored,
        "resolved database filename"
    );
    stored
}

fn read_filename<P: ContextProvider>(provider: &P) -> Option<String> {
    let connection_string = match provider.create_context() {
        Ok(ctx) => ctx.connection_string(),
        Err(e) => {
            tracing::warn!(
                context = type_name::<P::Context>(),
                error = %e,
                "could not open a context to read the connection string"
            );
            None
        }
    }?;
    filename_from_connection_string(&connection_string).map(str::to_string)
}

/// Returns the filename resolved for context type `C`, if any.
#[must_use]
pub fn resolved_filename<C: DbContext>() -> Option<String> {
    REGISTRY.read().get(&TypeId::of::<C>()).cloned()
}

/// Forgets every resolved filename.
///
/// Mainly for testing: factories created afterwards resolve again.
pub fn reset_filename_registry() {
    REGISTRY.write().clear();
}
