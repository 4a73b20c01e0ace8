//! Per-turn memory
//!
//! The host owns a key-value store scoped to the current turn. Keys are
//! `scope.name` paths; a bare name lands in the `temp` scope. The tools
//! augmentation keeps its submit-mode flags here and nothing else in the
//! planning core holds state between calls.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Scope used when a key has no `scope.` prefix
pub const DEFAULT_SCOPE: &str = "temp";

/// Key-value store shared with the host for one turn
///
/// Implementations must tolerate reads from several tasks, but the planning
/// core writes to a given turn's memory from one task at a time.
pub trait Memory: Send + Sync {
    /// Read a value
    fn get_value(&self, path: &str) -> Option<Value>;

    /// Write a value, replacing any previous one
    fn set_value(&self, path: &str, value: Value);

    /// Remove a value
    fn delete_value(&self, path: &str);

    /// Whether a value is stored at `path`
    fn has_value(&self, path: &str) -> bool {
        self.get_value(path).is_some()
    }
}

/// Split a memory path into `(scope, name)`
///
/// ```rust
/// use teams_ai::memory::split_path;
///
/// assert_eq!(split_path("temp.input"), ("temp", "input"));
/// assert_eq!(split_path("input"), ("temp", "input"));
/// assert_eq!(split_path("conversation.list.items"), ("conversation", "list.items"));
/// ```
pub fn split_path(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((scope, name)) => (scope, name),
        None => (DEFAULT_SCOPE, path),
    }
}

/// In-process [`Memory`] backed by nested hash maps
#[derive(Debug, Default)]
pub struct TurnMemory {
    scopes: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl TurnMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every value in a scope
    pub fn clear_scope(&self, scope: &str) {
        self.scopes.write().remove(scope);
    }
}

impl Memory for TurnMemory {
    fn get_value(&self, path: &str) -> Option<Value> {
        let (scope, name) = split_path(path);
        self.scopes.read().get(scope)?.get(name).cloned()
    }

    fn set_value(&self, path: &str, value: Value) {
        let (scope, name) = split_path(path);
        self.scopes
            .write()
            .entry(scope.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    fn delete_value(&self, path: &str) {
        let (scope, name) = split_path(path);
        if let Some(values) = self.scopes.write().get_mut(scope) {
            values.remove(name);
        }
    }

    fn has_value(&self, path: &str) -> bool {
        let (scope, name) = split_path(path);
        self.scopes
            .read()
            .get(scope)
            .is_some_and(|values| values.contains_key(name))
    }
}
