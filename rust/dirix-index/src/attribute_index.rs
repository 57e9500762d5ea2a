//! Per-attribute index coordination.
//!
//! An [`AttributeIndex`] owns the active indexers for one attribute type and
//! one sorted tree per active kind. It routes entry-lifecycle events to each
//! indexer and answers assertions from the stored keys.
//!
//! # Atomicity
//!
//! Every mutation is prepared in two phases: all indexers derive their key
//! diffs first, and only then is anything written to the store. A value that
//! fails normalization therefore aborts the mutation before the first store
//! write, and the caller's transaction guarantees that concurrently visible
//! state is never partially updated.
//!
//! # Trust
//!
//! Query results carry a soft not-trusted signal instead of an error: a
//! posting list that exceeded the administrative entry limit, or a predicate
//! the configured indexes cannot serve, degrades the whole result to
//! [`CandidateSet::NotTrusted`] so the caller can fall back to an unindexed
//! scan rather than trust an incomplete candidate set.

use std::collections::BTreeSet;

use dirix_common::{Result, error::Error};
use dirix_matching::{Assertion, SubstringConfig, substring_keys_for_assertion};

use crate::entry::{Entry, EntryId, Modification};
use crate::indexer::{IndexKind, Indexer, KeyDiff, PRESENCE_KEY};
use crate::schema::SchemaProvider;
use crate::store::{IndexKey, StoreTransaction, TreeName};

/// Candidate entry identifiers for one assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSet {
    /// The complete set of entries that may match the assertion.
    Defined(BTreeSet<EntryId>),
    /// The index cannot be trusted for this predicate; the caller must fall
    /// back to an unindexed evaluation path.
    NotTrusted,
}

impl CandidateSet {
    pub fn empty() -> Self {
        CandidateSet::Defined(BTreeSet::new())
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, CandidateSet::Defined(_))
    }

    pub fn contains(&self, id: EntryId) -> bool {
        match self {
            CandidateSet::Defined(ids) => ids.contains(&id),
            CandidateSet::NotTrusted => true,
        }
    }

    /// Set union; not-trusted absorbs, since the union's completeness is
    /// unknowable once either side is.
    pub fn union(self, other: CandidateSet) -> CandidateSet {
        match (self, other) {
            (CandidateSet::Defined(mut left), CandidateSet::Defined(right)) => {
                left.extend(right);
                CandidateSet::Defined(left)
            }
            _ => CandidateSet::NotTrusted,
        }
    }

    /// Set intersection; a defined side bounds the result even when the
    /// other side is not trusted.
    pub fn intersect(self, other: CandidateSet) -> CandidateSet {
        match (self, other) {
            (CandidateSet::Defined(left), CandidateSet::Defined(right)) => {
                CandidateSet::Defined(left.intersection(&right).copied().collect())
            }
            (CandidateSet::Defined(ids), CandidateSet::NotTrusted)
            | (CandidateSet::NotTrusted, CandidateSet::Defined(ids)) => CandidateSet::Defined(ids),
            (CandidateSet::NotTrusted, CandidateSet::NotTrusted) => CandidateSet::NotTrusted,
        }
    }
}

/// Configuration of one attribute index.
#[derive(Debug, Clone)]
pub struct AttributeIndexConfig {
    pub attribute: String,
    /// The index kinds to maintain for this attribute.
    pub kinds: Vec<IndexKind>,
    pub substring: SubstringConfig,
    /// Administrative bound on posting-list size before lookups through a
    /// key report not-trusted.
    pub entry_limit: usize,
}

impl AttributeIndexConfig {
    pub fn new(attribute: impl Into<String>, kinds: impl IntoIterator<Item = IndexKind>) -> Self {
        Self {
            attribute: attribute.into(),
            kinds: kinds.into_iter().collect(),
            substring: SubstringConfig::default(),
            entry_limit: SubstringConfig::default().index_entry_limit,
        }
    }

    pub fn with_substring(mut self, substring: SubstringConfig) -> Self {
        self.substring = substring;
        self
    }

    pub fn with_entry_limit(mut self, entry_limit: usize) -> Self {
        self.entry_limit = entry_limit;
        self
    }
}

/// The fully-derived effect of one entry mutation on one attribute's
/// indexes: one key diff per tree, ready to apply.
///
/// Preparing and applying are separate steps so that a multi-attribute
/// mutation can derive every diff before issuing the first write.
pub struct PreparedMutation {
    id: EntryId,
    diffs: Vec<(TreeName, KeyDiff)>,
}

impl PreparedMutation {
    /// Applies the prepared diffs through the given transaction.
    pub fn apply(&self, txn: &mut dyn StoreTransaction) -> Result<()> {
        for (tree, diff) in &self.diffs {
            for (key, added) in diff.iter() {
                if added {
                    txn.insert(tree, key, self.id)?;
                } else {
                    txn.remove(tree, key, self.id)?;
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.iter().all(|(_, diff)| diff.is_empty())
    }
}

/// Maintains and queries the indexes of one attribute type.
///
/// Instances are immutable after construction and shared across threads; all
/// state lives in the store.
pub struct AttributeIndex {
    attribute: String,
    entry_limit: usize,
    substring: SubstringConfig,
    indexers: Vec<Indexer>,
}

impl AttributeIndex {
    /// Builds the index from its configuration, resolving matching rules
    /// through the schema provider.
    ///
    /// # Errors
    ///
    /// Fails with a schema-mismatch error when an enabled kind has no
    /// matching rule for the attribute. This is a configuration error caught
    /// here, at initialization, never at mutation time.
    pub fn new(config: AttributeIndexConfig, schema: &dyn SchemaProvider) -> Result<Self> {
        dirix_common::verify_arg!(entry_limit, config.entry_limit > 0);

        let attribute = config.attribute;
        let mut indexers = Vec::with_capacity(config.kinds.len());
        let mut seen = BTreeSet::new();
        for kind in config.kinds {
            if !seen.insert(kind) {
                continue;
            }
            let indexer = match kind {
                IndexKind::Presence => Indexer::Presence,
                IndexKind::Equality => Indexer::Equality(
                    schema
                        .equality_rule(&attribute)
                        .ok_or_else(|| Error::schema_mismatch(&attribute, kind.name()))?,
                ),
                IndexKind::Ordering => Indexer::Ordering(
                    schema
                        .ordering_rule(&attribute)
                        .ok_or_else(|| Error::schema_mismatch(&attribute, kind.name()))?,
                ),
                IndexKind::Substring => Indexer::Substring(
                    schema
                        .substring_rule(&attribute)
                        .ok_or_else(|| Error::schema_mismatch(&attribute, kind.name()))?,
                    config.substring,
                ),
                IndexKind::Approximate => Indexer::Approximate(
                    schema
                        .approximate_rule(&attribute)
                        .ok_or_else(|| Error::schema_mismatch(&attribute, kind.name()))?,
                ),
            };
            indexers.push(indexer);
        }

        Ok(Self {
            attribute,
            entry_limit: config.entry_limit,
            substring: config.substring,
            indexers,
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn kinds(&self) -> impl Iterator<Item = IndexKind> {
        self.indexers.iter().map(Indexer::kind)
    }

    fn tree(&self, kind: IndexKind) -> TreeName {
        TreeName::new(self.attribute.clone(), kind)
    }

    fn indexer(&self, kind: IndexKind) -> Option<&Indexer> {
        self.indexers.iter().find(|indexer| indexer.kind() == kind)
    }

    /// Derives the all-adds mutation for a newly added entry.
    pub fn prepare_add(&self, entry: &Entry) -> Result<PreparedMutation> {
        self.prepare_with(entry.id(), |indexer| {
            Ok(KeyDiff::adding(
                indexer.keys_for_entry(&self.attribute, entry)?,
            ))
        })
    }

    /// Derives the all-removes mutation for a deleted entry.
    pub fn prepare_delete(&self, entry: &Entry) -> Result<PreparedMutation> {
        self.prepare_with(entry.id(), |indexer| {
            Ok(KeyDiff::removing(
                indexer.keys_for_entry(&self.attribute, entry)?,
            ))
        })
    }

    /// Derives the diff mutation for a replaced entry.
    pub fn prepare_replace(&self, old: &Entry, new: &Entry) -> Result<PreparedMutation> {
        self.prepare_with(new.id(), |indexer| {
            indexer.diff_on_replace(&self.attribute, old, new)
        })
    }

    /// Derives the diff mutation for a modified entry.
    pub fn prepare_modify(
        &self,
        old: &Entry,
        new: &Entry,
        applied: &[Modification],
    ) -> Result<PreparedMutation> {
        self.prepare_with(new.id(), |indexer| {
            indexer.diff_on_modify(&self.attribute, old, new, applied)
        })
    }

    fn prepare_with(
        &self,
        id: EntryId,
        mut derive: impl FnMut(&Indexer) -> Result<KeyDiff>,
    ) -> Result<PreparedMutation> {
        let mut diffs = Vec::with_capacity(self.indexers.len());
        for indexer in &self.indexers {
            diffs.push((self.tree(indexer.kind()), derive(indexer)?));
        }
        Ok(PreparedMutation { id, diffs })
    }

    /// Indexes a newly added entry.
    pub fn add_entry(&self, txn: &mut dyn StoreTransaction, entry: &Entry) -> Result<()> {
        self.prepare_add(entry)?.apply(txn)
    }

    /// Removes a deleted entry from every tree.
    pub fn delete_entry(&self, txn: &mut dyn StoreTransaction, entry: &Entry) -> Result<()> {
        self.prepare_delete(entry)?.apply(txn)
    }

    /// Applies the diff of a wholesale entry replacement.
    pub fn replace_entry(
        &self,
        txn: &mut dyn StoreTransaction,
        old: &Entry,
        new: &Entry,
    ) -> Result<()> {
        self.prepare_replace(old, new)?.apply(txn)
    }

    /// Applies the diff of a modified entry.
    pub fn modify_entry(
        &self,
        txn: &mut dyn StoreTransaction,
        old: &Entry,
        new: &Entry,
        applied: &[Modification],
    ) -> Result<()> {
        self.prepare_modify(old, new, applied)?.apply(txn)
    }

    /// Answers an assertion from the stored keys.
    ///
    /// A predicate the configured indexes cannot serve, and any consulted
    /// posting list larger than the entry limit, yields
    /// [`CandidateSet::NotTrusted`].
    pub fn evaluate(
        &self,
        txn: &mut dyn StoreTransaction,
        assertion: &Assertion,
    ) -> Result<CandidateSet> {
        match assertion {
            Assertion::Present => {
                if self.indexer(IndexKind::Presence).is_none() {
                    return Ok(CandidateSet::NotTrusted);
                }
                let postings = txn.get(
                    &self.tree(IndexKind::Presence),
                    &IndexKey::new(PRESENCE_KEY),
                )?;
                Ok(self.guarded(postings))
            }
            Assertion::Equality(assertion) => {
                self.lookup_single(txn, IndexKind::Equality, assertion.target().into())
            }
            Assertion::Approximate(assertion) => {
                self.lookup_single(txn, IndexKind::Approximate, assertion.target().into())
            }
            Assertion::GreaterOrEqual(assertion) => {
                self.lookup_range(txn, Some(assertion.target().into()), None)
            }
            Assertion::LessOrEqual(assertion) => {
                self.lookup_range(txn, None, Some(assertion.target().into()))
            }
            Assertion::Substring(assertion) => {
                if self.indexer(IndexKind::Substring).is_none() {
                    return Ok(CandidateSet::NotTrusted);
                }
                let Some(keys) =
                    substring_keys_for_assertion(assertion, self.substring.min_substring_length)
                else {
                    // A component shorter than one window has no usable key.
                    return Ok(CandidateSet::NotTrusted);
                };

                let tree = self.tree(IndexKind::Substring);
                let mut candidates: Option<BTreeSet<EntryId>> = None;
                for key in keys {
                    let postings = txn.get(&tree, &IndexKey::new(key))?;
                    if postings.len() > self.entry_limit {
                        return Ok(CandidateSet::NotTrusted);
                    }
                    candidates = Some(match candidates {
                        None => postings,
                        Some(current) => current.intersection(&postings).copied().collect(),
                    });
                    if candidates.as_ref().is_some_and(BTreeSet::is_empty) {
                        break;
                    }
                }
                Ok(CandidateSet::Defined(candidates.unwrap_or_default()))
            }
        }
    }

    fn lookup_single(
        &self,
        txn: &mut dyn StoreTransaction,
        kind: IndexKind,
        key: IndexKey,
    ) -> Result<CandidateSet> {
        if self.indexer(kind).is_none() {
            return Ok(CandidateSet::NotTrusted);
        }
        let postings = txn.get(&self.tree(kind), &key)?;
        Ok(self.guarded(postings))
    }

    fn lookup_range(
        &self,
        txn: &mut dyn StoreTransaction,
        low: Option<IndexKey>,
        high: Option<IndexKey>,
    ) -> Result<CandidateSet> {
        if self.indexer(IndexKind::Ordering).is_none() {
            return Ok(CandidateSet::NotTrusted);
        }
        let scanned = txn.scan_range(
            &self.tree(IndexKind::Ordering),
            low.as_ref(),
            high.as_ref(),
        )?;
        let mut ids = BTreeSet::new();
        for (_, postings) in scanned {
            if postings.len() > self.entry_limit {
                return Ok(CandidateSet::NotTrusted);
            }
            ids.extend(postings);
        }
        Ok(CandidateSet::Defined(ids))
    }

    fn guarded(&self, postings: BTreeSet<EntryId>) -> CandidateSet {
        if postings.len() > self.entry_limit {
            CandidateSet::NotTrusted
        } else {
            CandidateSet::Defined(postings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeRules, StaticSchema};
    use dirix_matching::create_rule;

    fn schema() -> StaticSchema {
        let mut schema = StaticSchema::new();
        schema.define(
            "cn",
            AttributeRules::uniform(create_rule("case-ignore").unwrap()),
        );
        schema
    }

    #[test]
    fn test_schema_mismatch_is_fatal_at_construction() {
        let schema = schema();
        // cn has no approximate rule configured.
        let config = AttributeIndexConfig::new("cn", [IndexKind::Approximate]);
        let Err(err) = AttributeIndex::new(config, &schema) else {
            panic!("construction accepted a kind with no rule");
        };
        assert!(err.to_string().contains("approximate"));

        // Unknown attribute: every rule is absent.
        let config = AttributeIndexConfig::new("sn", [IndexKind::Equality]);
        assert!(AttributeIndex::new(config, &schema).is_err());

        // Presence needs no rule.
        let config = AttributeIndexConfig::new("sn", [IndexKind::Presence]);
        assert!(AttributeIndex::new(config, &schema).is_ok());
    }

    #[test]
    fn test_duplicate_kinds_collapse() {
        let config = AttributeIndexConfig::new(
            "cn",
            [IndexKind::Equality, IndexKind::Equality, IndexKind::Presence],
        );
        let index = AttributeIndex::new(config, &schema()).unwrap();
        assert_eq!(index.kinds().count(), 2);
    }

    #[test]
    fn test_candidate_set_combinators() {
        let defined =
            |ids: &[u64]| CandidateSet::Defined(ids.iter().map(|id| EntryId(*id)).collect());

        assert_eq!(
            defined(&[1, 2]).union(defined(&[2, 3])),
            defined(&[1, 2, 3])
        );
        assert_eq!(
            defined(&[1, 2]).union(CandidateSet::NotTrusted),
            CandidateSet::NotTrusted
        );
        assert_eq!(
            defined(&[1, 2]).intersect(defined(&[2, 3])),
            defined(&[2])
        );
        // A defined side bounds an untrusted one.
        assert_eq!(
            CandidateSet::NotTrusted.intersect(defined(&[2, 3])),
            defined(&[2, 3])
        );
        assert!(CandidateSet::NotTrusted.contains(EntryId(99)));

        assert!(defined(&[1]).is_defined());
        assert!(defined(&[1]).union(defined(&[2])).is_defined());
        assert!(!CandidateSet::NotTrusted.is_defined());
        assert!(!defined(&[1]).union(CandidateSet::NotTrusted).is_defined());
    }
}
