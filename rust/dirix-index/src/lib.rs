//! Secondary-index engine for directory entries.
//!
//! This crate keeps sorted attribute indexes consistent with the live set of
//! directory entries so that searches can be answered without scanning every
//! entry.
//!
//! # Architecture
//!
//! The engine consists of several key components:
//!
//! - **Indexers**: The [`Indexer`] variants (presence, equality, ordering,
//!   substring, approximate) derive the set of index keys an entry
//!   contributes, and the key-level diff when an entry changes.
//! - **Attribute index**: [`AttributeIndex`] owns the active indexers for
//!   one attribute type, routes entry-lifecycle events to each of them, and
//!   answers assertions from the stored keys.
//! - **Index set**: [`IndexSet`] coordinates the attribute indexes of one
//!   backend so that a single entry mutation updates every affected index
//!   atomically.
//! - **Sorted store**: the [`store::IndexStore`] trait is the persistence
//!   seam; [`store::MemoryIndexStore`] is the built-in implementation used
//!   by tests and embedders without an external store.
//!
//! Matching rules and assertions come from the `dirix-matching` crate; the
//! invariant that normalized byte order equals semantic order is what allows
//! the store's native key ordering to serve range scans.

pub mod attribute_index;
pub mod entry;
pub mod index_set;
pub mod indexer;
pub mod schema;
pub mod store;

pub use attribute_index::{AttributeIndex, AttributeIndexConfig, CandidateSet, PreparedMutation};
pub use entry::{Entry, EntryId, Modification, ModificationOp};
pub use index_set::IndexSet;
pub use indexer::{IndexKind, Indexer, KeyDiff, PRESENCE_KEY};
pub use schema::{AttributeRules, SchemaProvider, StaticSchema};
pub use store::{EntryIdSet, IndexKey, IndexStore, MemoryIndexStore, StoreTransaction, TreeName};
