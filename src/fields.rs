//! Field-kind tags and the host-facing strategy registry.
//!
//! Host inspectors decide how to present a field from its kind tag, not
//! from host reflection. Kinds that value shape cannot distinguish (a map
//! looks like a nested message, a oneof member like its payload) are
//! registered explicitly at process start; everything else is inferred on
//! first sight and memoized.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde_json::Value;

/// Kind tag for one message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Plain value: number, string, bool.
    Scalar,
    /// Nested message.
    Message,
    /// Repeated field.
    Repeated,
    /// Map field. Never inferred; shape-identical to a nested message.
    Map,
    /// Member of a oneof group. Never inferred.
    Oneof,
}

impl FieldKind {
    /// Infer a kind from a decoded value's shape. `Map` and `Oneof` cannot
    /// be told apart from `Message`/`Scalar` here; pin those with
    /// [`register_kind`].
    pub fn infer(value: &Value) -> FieldKind {
        match value {
            Value::Object(_) => FieldKind::Message,
            Value::Array(_) => FieldKind::Repeated,
            _ => FieldKind::Scalar,
        }
    }
}

/// Process-wide read-through cache of resolved field kinds, keyed by type
/// name + field path. No invalidation: schema layout is fixed for the
/// process lifetime.
fn kind_cache() -> &'static RwLock<HashMap<(String, String), FieldKind>> {
    static CACHE: OnceLock<RwLock<HashMap<(String, String), FieldKind>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Pin the kind of a field that inference cannot classify. Intended to run
/// once at process start, next to registry construction.
pub fn register_kind(type_name: &str, path: &str, kind: FieldKind) {
    kind_cache()
        .write()
        .insert((type_name.to_string(), path.to_string()), kind);
}

/// Resolve a field's kind: pinned value first, else inferred from the
/// value shape and memoized.
pub fn field_kind(type_name: &str, path: &str, value: &Value) -> FieldKind {
    let key = (type_name.to_string(), path.to_string());
    if let Some(kind) = kind_cache().read().get(&key) {
        return *kind;
    }
    *kind_cache()
        .write()
        .entry(key)
        .or_insert_with(|| FieldKind::infer(value))
}

/// One presentation strategy, supplied by the host for a field kind.
pub trait FieldStrategy: Send + Sync {
    /// Handle one field of a decoded message.
    fn visit(&self, path: &str, value: &Value);
}

/// Explicit registration table mapping field kinds to strategies.
///
/// Built by the host at process start and passed where needed. The table
/// itself is not a global; only the kind cache is process-wide.
#[derive(Default)]
pub struct FieldRegistry {
    strategies: HashMap<FieldKind, Arc<dyn FieldStrategy>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the strategy for a kind, replacing any previous one.
    pub fn register(&mut self, kind: FieldKind, strategy: Arc<dyn FieldStrategy>) {
        self.strategies.insert(kind, strategy);
    }

    pub fn strategy_for(&self, kind: FieldKind) -> Option<&Arc<dyn FieldStrategy>> {
        self.strategies.get(&kind)
    }

    /// Dispatch every top-level field of a decoded message to its kind's
    /// strategy. Fields whose kind has no registered strategy are skipped.
    pub fn visit_message(&self, type_name: &str, message: &Value) {
        let Some(fields) = message.as_object() else {
            return;
        };
        for (name, value) in fields {
            let kind = field_kind(type_name, name, value);
            if let Some(strategy) = self.strategies.get(&kind) {
                strategy.visit(name, value);
            }
        }
    }
}
