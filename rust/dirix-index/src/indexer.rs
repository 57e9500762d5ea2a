//! Index key derivation and key-level diffing.
//!
//! An [`Indexer`] is a stateless strategy for one index kind: it derives the
//! set of keys an entry contributes, and the minimal add/remove key diff
//! when an entry is replaced or modified. The variant set is closed and
//! dispatched by an explicit kind tag so that every call site matches
//! exhaustively.
//!
//! Diffs are snapshot-based: replace and modify both compute the symmetric
//! set difference of the old and new key sets. Interpreting individual
//! modification operations could only change efficiency, never the net key
//! change. The presence variant is the one special case: it reacts to the
//! attribute's existence transition alone, so value-level changes that do
//! not cross the zero-value boundary never touch the presence index.

use std::collections::BTreeSet;
use std::sync::Arc;

use dirix_common::{
    Result,
    error::{Error, ErrorKind},
};
use dirix_matching::{MatchingRule, SubstringConfig, substring_keys};

use crate::entry::{Entry, Modification};
use crate::store::IndexKey;

/// The sentinel key under which the presence index records entries.
pub const PRESENCE_KEY: &[u8] = b"+";

/// The closed set of index kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKind {
    Presence,
    Equality,
    Ordering,
    Substring,
    Approximate,
}

impl IndexKind {
    pub const fn name(&self) -> &'static str {
        match self {
            IndexKind::Presence => "presence",
            IndexKind::Equality => "equality",
            IndexKind::Ordering => "ordering",
            IndexKind::Substring => "substring",
            IndexKind::Approximate => "approximate",
        }
    }
}

/// The key-level effect of one entry mutation on one index tree: for each
/// key, whether it is added (`true`) or removed (`false`).
///
/// A key appears at most once; the diff is computed from set differences,
/// so no key can be simultaneously added and removed.
#[derive(Debug, Default)]
pub struct KeyDiff(std::collections::BTreeMap<IndexKey, bool>);

impl KeyDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// A diff that adds every given key.
    pub fn adding(keys: BTreeSet<IndexKey>) -> Self {
        Self(keys.into_iter().map(|key| (key, true)).collect())
    }

    /// A diff that removes every given key.
    pub fn removing(keys: BTreeSet<IndexKey>) -> Self {
        Self(keys.into_iter().map(|key| (key, false)).collect())
    }

    /// The diff that turns the `old` key set into the `new` one.
    pub fn between(old: BTreeSet<IndexKey>, new: BTreeSet<IndexKey>) -> Self {
        let mut diff = Self::new();
        for key in new.difference(&old) {
            diff.0.insert(key.clone(), true);
        }
        for key in old.difference(&new) {
            diff.0.insert(key.clone(), false);
        }
        diff
    }

    pub fn add(&mut self, key: IndexKey) {
        debug_assert!(!self.0.contains_key(&key) || self.0[&key]);
        self.0.insert(key, true);
    }

    pub fn remove(&mut self, key: IndexKey) {
        debug_assert!(!self.0.contains_key(&key) || !self.0[&key]);
        self.0.insert(key, false);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Key/added pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, bool)> {
        self.0.iter().map(|(key, added)| (key, *added))
    }
}

/// Rewrites an invalid-value error surfaced during key derivation so the
/// rejection names the offending attribute, not just the rule.
fn name_attribute(attribute: &str, err: Error) -> Error {
    match err.into_kind() {
        ErrorKind::InvalidValue { rule, message } => {
            Error::invalid_value(rule, format!("attribute {attribute}: {message}"))
        }
        other => other.into(),
    }
}

/// A stateless key-derivation strategy for one index kind.
pub enum Indexer {
    Presence,
    Equality(Arc<dyn MatchingRule>),
    Ordering(Arc<dyn MatchingRule>),
    Substring(Arc<dyn MatchingRule>, SubstringConfig),
    Approximate(Arc<dyn MatchingRule>),
}

impl Indexer {
    pub fn kind(&self) -> IndexKind {
        match self {
            Indexer::Presence => IndexKind::Presence,
            Indexer::Equality(_) => IndexKind::Equality,
            Indexer::Ordering(_) => IndexKind::Ordering,
            Indexer::Substring(..) => IndexKind::Substring,
            Indexer::Approximate(_) => IndexKind::Approximate,
        }
    }

    /// The keys the entry's current values contribute to this index.
    ///
    /// A value that fails normalization fails the whole derivation; no value
    /// is ever silently dropped, because a missing key would make the index
    /// lie about the entry.
    pub fn keys_for_entry(&self, attribute: &str, entry: &Entry) -> Result<BTreeSet<IndexKey>> {
        let mut keys = BTreeSet::new();
        match self {
            Indexer::Presence => {
                if entry.has_attribute(attribute) {
                    keys.insert(IndexKey::new(PRESENCE_KEY));
                }
            }
            Indexer::Equality(rule) | Indexer::Ordering(rule) | Indexer::Approximate(rule) => {
                for raw in entry.attribute_values(attribute) {
                    let normalized = rule
                        .normalize(raw)
                        .map_err(|err| name_attribute(attribute, err))?;
                    keys.insert(normalized.into());
                }
            }
            Indexer::Substring(rule, config) => {
                for raw in entry.attribute_values(attribute) {
                    let normalized = rule
                        .normalize(raw)
                        .map_err(|err| name_attribute(attribute, err))?;
                    for key in substring_keys(&normalized, config.min_substring_length) {
                        keys.insert(IndexKey::new(key));
                    }
                }
            }
        }
        Ok(keys)
    }

    /// The key diff for an entry whose contents were replaced wholesale.
    ///
    /// Presence reacts to the existence transition only: an add when the
    /// attribute appears, a remove when it disappears, nothing when value
    /// changes leave presence unchanged.
    pub fn diff_on_replace(&self, attribute: &str, old: &Entry, new: &Entry) -> Result<KeyDiff> {
        if let Indexer::Presence = self {
            let mut diff = KeyDiff::new();
            match (old.has_attribute(attribute), new.has_attribute(attribute)) {
                (false, true) => diff.add(IndexKey::new(PRESENCE_KEY)),
                (true, false) => diff.remove(IndexKey::new(PRESENCE_KEY)),
                _ => {}
            }
            return Ok(diff);
        }

        let old_keys = self.keys_for_entry(attribute, old)?;
        let new_keys = self.keys_for_entry(attribute, new)?;
        Ok(KeyDiff::between(old_keys, new_keys))
    }

    /// The key diff for a modified entry.
    ///
    /// The modification list is accepted for interface fidelity but the diff
    /// is computed from the before/after snapshots; the net key change is
    /// identical either way.
    pub fn diff_on_modify(
        &self,
        attribute: &str,
        old: &Entry,
        new: &Entry,
        _applied: &[Modification],
    ) -> Result<KeyDiff> {
        self.diff_on_replace(attribute, old, new)
    }
}
