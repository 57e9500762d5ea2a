//! Persistent sorted store interface and the in-memory implementation.
//!
//! The store is the engine's persistence seam: a collection of named sorted
//! trees, one per attribute/index-kind pair, each mapping a byte key to a
//! posting list of entry identifiers. Keys are ordered byte-lexicographically,
//! which — by the matching-rule normalization invariant — is also their
//! semantic order.
//!
//! All mutation flows through [`StoreTransaction`]: every key update of one
//! entry mutation is issued inside a single transaction, and a reader never
//! observes a partially-updated index set. Dropping a transaction without
//! committing aborts it, so release is guaranteed on every exit path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;
use std::sync::Mutex;

use dirix_common::Result;
use dirix_matching::NormalizedValue;

use crate::entry::EntryId;
use crate::indexer::IndexKind;

/// A byte key stored in one of the index trees.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Box<[u8]>);

impl IndexKey {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<NormalizedValue> for IndexKey {
    fn from(value: NormalizedValue) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&NormalizedValue> for IndexKey {
    fn from(value: &NormalizedValue) -> Self {
        Self(value.as_bytes().into())
    }
}

impl AsRef<[u8]> for IndexKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The posting list stored under one index key.
pub type EntryIdSet = BTreeSet<EntryId>;

/// Identifies one sorted tree: the index of one kind for one attribute type.
///
/// Rendered as `attribute.kind`, e.g. `cn.equality`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeName {
    attribute: String,
    kind: IndexKind,
}

impl TreeName {
    pub fn new(attribute: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }
}

impl fmt::Display for TreeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.attribute, self.kind.name())
    }
}

/// A persistent collection of sorted index trees with transactional access.
///
/// Implementations provide the locking and isolation discipline; the index
/// engine itself never blocks and holds no locks of its own.
pub trait IndexStore: Send + Sync {
    /// Opens a transaction scoped to this store. The transaction aborts if
    /// dropped without [`StoreTransaction::commit`].
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// One transaction over an [`IndexStore`].
///
/// Reads observe the transaction's own writes. Implementations must provide
/// at least read-committed isolation for posting-list updates.
pub trait StoreTransaction {
    /// The posting list stored under `key`, empty if the key is absent.
    fn get(&mut self, tree: &TreeName, key: &IndexKey) -> Result<EntryIdSet>;

    /// Adds `id` to the posting list under `key`.
    fn insert(&mut self, tree: &TreeName, key: &IndexKey, id: EntryId) -> Result<()>;

    /// Removes `id` from the posting list under `key`; removing the last
    /// identifier removes the key.
    fn remove(&mut self, tree: &TreeName, key: &IndexKey, id: EntryId) -> Result<()>;

    /// All non-empty posting lists with keys in `[low, high]` (both bounds
    /// inclusive, either side open when absent), in ascending key order.
    fn scan_range(
        &mut self,
        tree: &TreeName,
        low: Option<&IndexKey>,
        high: Option<&IndexKey>,
    ) -> Result<Vec<(IndexKey, EntryIdSet)>>;

    /// Publishes the transaction's writes atomically.
    fn commit(self: Box<Self>) -> Result<()>;
}

type Trees = BTreeMap<TreeName, BTreeMap<IndexKey, EntryIdSet>>;

/// In-memory [`IndexStore`] backed by ordered maps.
///
/// Transactions take a snapshot of the whole store and publish it back on
/// commit, giving full isolation for concurrent readers. Writers are
/// expected to be serialized by the caller (last commit wins), which matches
/// how the engine is exercised in tests and embedded setups.
#[derive(Default)]
pub struct MemoryIndexStore {
    trees: Mutex<Trees>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        let snapshot = self.trees.lock().expect("store lock").clone();
        Ok(Box::new(MemoryTransaction {
            store: self,
            trees: snapshot,
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryIndexStore,
    trees: Trees,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn get(&mut self, tree: &TreeName, key: &IndexKey) -> Result<EntryIdSet> {
        Ok(self
            .trees
            .get(tree)
            .and_then(|keys| keys.get(key))
            .cloned()
            .unwrap_or_default())
    }

    fn insert(&mut self, tree: &TreeName, key: &IndexKey, id: EntryId) -> Result<()> {
        self.trees
            .entry(tree.clone())
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(id);
        Ok(())
    }

    fn remove(&mut self, tree: &TreeName, key: &IndexKey, id: EntryId) -> Result<()> {
        if let Some(keys) = self.trees.get_mut(tree) {
            if let Some(postings) = keys.get_mut(key) {
                postings.remove(&id);
                if postings.is_empty() {
                    keys.remove(key);
                }
            }
        }
        Ok(())
    }

    fn scan_range(
        &mut self,
        tree: &TreeName,
        low: Option<&IndexKey>,
        high: Option<&IndexKey>,
    ) -> Result<Vec<(IndexKey, EntryIdSet)>> {
        let Some(keys) = self.trees.get(tree) else {
            return Ok(Vec::new());
        };
        let low = low.map_or(Bound::Unbounded, |key| Bound::Included(key.clone()));
        let high = high.map_or(Bound::Unbounded, |key| Bound::Included(key.clone()));
        Ok(keys
            .range((low, high))
            .map(|(key, postings)| (key.clone(), postings.clone()))
            .collect())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        *self.store.trees.lock().expect("store lock") = self.trees;
        Ok(())
    }
}
