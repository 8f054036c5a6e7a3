//! Intermediate representation.
//!
//! The IR is the canonical, resolved description of a type:
//!
//! - [`types`]: node kinds, bounds and union payloads
//! - [`record`]: records, fields and flatten bookkeeping
//! - [`key`]: resolution keys used for memoization
//! - [`graph`]: the root plus the arena of finished records

pub mod graph;
pub mod key;
pub mod record;
pub mod types;

pub use graph::TypeGraph;
pub use key::ResolutionKey;
pub use record::{ExtraFields, Field, FlattenGroup, RecordType};
pub use types::{
    DiscriminatedUnion, LengthBounds, Node, NumericBounds, RecursionHolder, TypeKind, TypeNode,
};
