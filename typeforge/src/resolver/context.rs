//! Resolution context.
//!
//! The context is scoped to one resolution session. It owns the memo arena,
//! the record name generator, the registry used for forward references and
//! the discriminator currently in scope. Nothing here is process-global, so
//! independent sessions never observe each other's names or cache entries.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::expr::TypeRegistry;
use crate::ir::{Node, ResolutionKey, TypeGraph};

/// Memo arena entry.
#[derive(Debug, Clone)]
pub enum Slot {
    /// The record is being built; revisits become recursion holders
    InProgress { name: String },
    Done(Node),
}

/// Deterministic, collision-free record names.
///
/// The first key to claim a base name gets it unchanged; later distinct keys
/// with the same base get an incrementing numeric suffix.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    assigned: HashMap<ResolutionKey, String>,
    counters: HashMap<String, usize>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, key: &ResolutionKey, base: &str) -> String {
        if let Some(name) = self.assigned.get(key) {
            return name.clone();
        }
        let name = match self.counters.get_mut(base) {
            None => {
                self.counters.insert(base.to_string(), 0);
                base.to_string()
            }
            Some(counter) => {
                *counter += 1;
                format!("{base}{counter}")
            }
        };
        self.assigned.insert(key.clone(), name.clone());
        name
    }

    /// Forget every issued name.
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.counters.clear();
    }
}

/// State carried through one resolution session.
#[derive(Debug, Clone)]
pub struct ResolverContext {
    registry: Arc<TypeRegistry>,
    discriminator_field: Option<String>,
    memo: HashMap<ResolutionKey, Slot>,
    names: NameGenerator,
}

impl ResolverContext {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            discriminator_field: None,
            memo: HashMap::new(),
            names: NameGenerator::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn lookup(&self, key: &ResolutionKey) -> Option<&Slot> {
        self.memo.get(key)
    }

    /// Mark a key as in progress.
    pub fn begin(&mut self, key: ResolutionKey, name: String) {
        trace!(key = %key, name = %name, "Record resolution started");
        self.memo.insert(key, Slot::InProgress { name });
    }

    /// Replace the in-progress sentinel with the finished node.
    pub fn finish(&mut self, key: ResolutionKey, node: Node) {
        self.memo.insert(key, Slot::Done(node));
    }

    pub fn generate_name(&mut self, key: &ResolutionKey, base: &str) -> String {
        self.names.generate(key, base)
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator_field.as_deref()
    }

    /// Swap the discriminator in scope, returning the previous one.
    pub fn replace_discriminator(&mut self, field: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.discriminator_field, field)
    }

    /// Drop all memoized state and issued names.
    pub fn reset(&mut self) {
        self.memo.clear();
        self.names.reset();
        self.discriminator_field = None;
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Freeze the finished records into a graph rooted at `root`.
    pub fn into_graph(self, root: Node) -> TypeGraph {
        let arena = self
            .memo
            .into_iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Done(node) => Some((key, node)),
                Slot::InProgress { .. } => None,
            })
            .collect();
        TypeGraph::new(root, arena)
    }
}
