//! The finished output of one resolution session.

use std::collections::HashMap;

use crate::error::DefinitionError;

use super::key::ResolutionKey;
use super::types::{Node, TypeKind};

/// Root node plus the arena of finished records.
///
/// [`RecursionHolder`](super::RecursionHolder) nodes store only a key; they
/// are dereferenced through this arena.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    root: Node,
    arena: HashMap<ResolutionKey, Node>,
}

impl TypeGraph {
    pub fn new(root: Node, arena: HashMap<ResolutionKey, Node>) -> Self {
        Self { root, arena }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<&Node> {
        self.arena.get(key)
    }

    /// Follow a recursion holder to its record; other nodes are returned as is.
    pub fn deref<'a>(&'a self, node: &'a Node) -> Result<&'a Node, DefinitionError> {
        match &node.kind {
            TypeKind::RecursionHolder(holder) => self
                .arena
                .get(&holder.key)
                .ok_or_else(|| DefinitionError::UnresolvedRecursion(holder.name.clone())),
            _ => Ok(node),
        }
    }

    /// Number of distinct records resolved.
    pub fn record_count(&self) -> usize {
        self.arena.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &Node> {
        self.arena.values()
    }
}
