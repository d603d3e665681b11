//! Change tracking for table contexts.

use crate::context::{EntityState, StateChange, TrackedEntry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
struct Tracked {
    original: Option<Value>,
    current: Value,
    state: EntityState,
}

/// Tracked rows of one context, keyed by `(table, key)`.
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    rows: BTreeMap<(String, String), Tracked>,
}

/// A pending write produced by [`ChangeTracker::pending`].
#[derive(Debug, Clone)]
pub(crate) struct PendingWrite {
    pub(crate) table: String,
    pub(crate) key: String,
    pub(crate) state: EntityState,
    pub(crate) value: Value,
}

fn change(table: &str, key: &str, old: EntityState, new: EntityState) -> StateChange {
    StateChange {
        entity: table.to_string(),
        key: key.to_string(),
        old_state: old,
        new_state: new,
    }
}

impl ChangeTracker {
    pub(crate) fn state(&self, table: &str, key: &str) -> EntityState {
        self.rows
            .get(&(table.to_string(), key.to_string()))
            .map_or(EntityState::Detached, |t| t.state)
    }

    /// Returns the tracked value, `Some(None)` if tracked as deleted.
    pub(crate) fn current(&self, table: &str, key: &str) -> Option<Option<&Value>> {
        self.rows
            .get(&(table.to_string(), key.to_string()))
            .map(|t| (t.state != EntityState::Deleted).then_some(&t.current))
    }

    /// Starts tracking a stored row as unchanged.
    pub(crate) fn attach(&mut self, table: &str, key: &str, value: Value) -> StateChange {
        self.rows.insert(
            (table.to_string(), key.to_string()),
            Tracked {
                original: Some(value.clone()),
                current: value,
                state: EntityState::Unchanged,
            },
        );
        change(table, key, EntityState::Detached, EntityState::Unchanged)
    }

    /// Tracks a new row. A row tracked as deleted is revived as modified.
    ///
    /// Returns `None` if the row is already tracked and not deleted.
    pub(crate) fn add(&mut self, table: &str, key: &str, value: Value) -> Option<StateChange> {
        let id = (table.to_string(), key.to_string());
        match self.rows.get_mut(&id) {
            Some(tracked) if tracked.state == EntityState::Deleted => {
                tracked.current = value;
                tracked.state = EntityState::Modified;
                Some(change(table, key, EntityState::Deleted, EntityState::Modified))
            }
            Some(_) => None,
            None => {
                self.rows.insert(
                    id,
                    Tracked {
                        original: None,
                        current: value,
                        state: EntityState::Added,
                    },
                );
                Some(change(table, key, EntityState::Detached, EntityState::Added))
            }
        }
    }

    /// Replaces the value of a tracked, non-deleted row.
    ///
    /// Returns `None` if the row is not tracked or is deleted.
    pub(crate) fn modify(
        &mut self,
        table: &str,
        key: &str,
        value: Value,
    ) -> Option<Option<StateChange>> {
        let tracked = self.rows.get_mut(&(table.to_string(), key.to_string()))?;
        let old = tracked.state;
        let new = match old {
            EntityState::Added => EntityState::Added,
            EntityState::Unchanged | EntityState::Modified => EntityState::Modified,
            EntityState::Deleted | EntityState::Detached => return None,
        };
        tracked.current = value;
        tracked.state = new;
        Some((old != new).then(|| change(table, key, old, new)))
    }

    /// Marks a tracked row for removal. An added row is simply forgotten.
    ///
    /// Returns `None` if the row is not tracked or already deleted.
    pub(crate) fn delete(&mut self, table: &str, key: &str) -> Option<StateChange> {
        let id = (table.to_string(), key.to_string());
        let old = self.rows.get(&id)?.state;
        match old {
            EntityState::Added => {
                self.rows.remove(&id);
                Some(change(table, key, old, EntityState::Detached))
            }
            EntityState::Unchanged | EntityState::Modified => {
                if let Some(tracked) = self.rows.get_mut(&id) {
                    tracked.state = EntityState::Deleted;
                }
                Some(change(table, key, old, EntityState::Deleted))
            }
            EntityState::Deleted | EntityState::Detached => None,
        }
    }

    /// Returns the writes a save would perform, in key order.
    pub(crate) fn pending(&self) -> Vec<PendingWrite> {
        self.rows
            .iter()
            .filter(|(_, t)| t.state.is_pending())
            .map(|((table, key), t)| PendingWrite {
                table: table.clone(),
                key: key.clone(),
                state: t.state,
                value: t.current.clone(),
            })
            .collect()
    }

    /// Marks every pending write as saved.
    pub(crate) fn accept_all(&mut self) -> Vec<StateChange> {
        let mut changes = Vec::new();
        self.rows.retain(|(table, key), tracked| match tracked.state {
            EntityState::Added | EntityState::Modified => {
                changes.push(change(table, key, tracked.state, EntityState::Unchanged));
                tracked.original = Some(tracked.current.clone());
                tracked.state = EntityState::Unchanged;
                true
            }
            EntityState::Deleted => {
                changes.push(change(table, key, EntityState::Deleted, EntityState::Detached));
                false
            }
            EntityState::Unchanged | EntityState::Detached => true,
        });
        changes
    }

    pub(crate) fn entries(&self) -> Vec<TrackedEntry> {
        self.rows
            .iter()
            .map(|((table, key), t)| TrackedEntry {
                entity: table.clone(),
                key: key.clone(),
                state: t.state,
                long_view: long_view(table, key, t),
            })
            .collect()
    }
}

/// Renders a tracked row with its original and current values.
///
/// ```text
/// people {key: 1} Modified
///   name: "Ada" (was "A")
///   age: 36
/// ```
fn long_view(table: &str, key: &str, tracked: &Tracked) -> String {
    let mut out = format!("{table} {{key: {key}}} {}", tracked.state);
    match (&tracked.current, &tracked.original) {
        (Value::Object(current), original) => {
            let original = original.as_ref().and_then(Value::as_object);
            for (field, value) in current {
                let _ = write!(out, "\n  {field}: {value}");
                if tracked.state == EntityState::Modified {
                    let was = original.and_then(|o| o.get(field));
                    if let Some(was) = was.filter(|was| *was != value) {
                        let _ = write!(out, " (was {was})");
                    }
                }
            }
        }
        (current, Some(original))
            if tracked.state == EntityState::Modified && current != original =>
        {
            let _ = write!(out, "\n  value: {current} (was {original})");
        }
        (current, _) => {
            let _ = write!(out, "\n  value: {current}");
        }
    }
    out
}
