//! Backend-level coordination of attribute indexes.
//!
//! An [`IndexSet`] holds every configured [`AttributeIndex`] of one backend
//! and fans each entry mutation out to all of them. The prepared diffs of
//! every attribute are derived before the first store write, so a value that
//! fails normalization under any attribute's rules rejects the whole
//! mutation with no index touched.

use ahash::AHashMap;
use itertools::Itertools;

use dirix_common::Result;
use dirix_matching::Assertion;

use crate::attribute_index::{AttributeIndex, AttributeIndexConfig, CandidateSet, PreparedMutation};
use crate::entry::{Entry, Modification};
use crate::schema::SchemaProvider;
use crate::store::StoreTransaction;

/// The attribute indexes of one backend.
#[derive(Default)]
pub struct IndexSet {
    indexes: AHashMap<String, AttributeIndex>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index set from per-attribute configurations.
    pub fn from_configs(
        configs: impl IntoIterator<Item = AttributeIndexConfig>,
        schema: &dyn SchemaProvider,
    ) -> Result<Self> {
        let mut set = Self::new();
        for config in configs {
            set.add_index(AttributeIndex::new(config, schema)?);
        }
        Ok(set)
    }

    /// Registers one attribute's index. A later registration for the same
    /// attribute replaces the earlier one.
    pub fn add_index(&mut self, index: AttributeIndex) {
        self.indexes.insert(index.attribute().to_string(), index);
    }

    pub fn index_for(&self, attribute: &str) -> Option<&AttributeIndex> {
        self.indexes.get(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    /// Indexes a newly added entry across every attribute index.
    pub fn add_entry(&self, txn: &mut dyn StoreTransaction, entry: &Entry) -> Result<()> {
        let prepared: Vec<PreparedMutation> = self
            .indexes
            .values()
            .map(|index| index.prepare_add(entry))
            .try_collect()?;
        self.apply_all(txn, &prepared)
    }

    /// Removes a deleted entry from every attribute index.
    pub fn delete_entry(&self, txn: &mut dyn StoreTransaction, entry: &Entry) -> Result<()> {
        let prepared: Vec<PreparedMutation> = self
            .indexes
            .values()
            .map(|index| index.prepare_delete(entry))
            .try_collect()?;
        self.apply_all(txn, &prepared)
    }

    /// Applies the diff of a wholesale entry replacement across every
    /// attribute index.
    pub fn replace_entry(
        &self,
        txn: &mut dyn StoreTransaction,
        old: &Entry,
        new: &Entry,
    ) -> Result<()> {
        let prepared: Vec<PreparedMutation> = self
            .indexes
            .values()
            .map(|index| index.prepare_replace(old, new))
            .try_collect()?;
        self.apply_all(txn, &prepared)
    }

    /// Applies the diff of a modified entry across every attribute index.
    /// Only the indexes of modified attributes derive a non-empty diff, but
    /// all of them are prepared so a bad value anywhere rejects everything.
    pub fn modify_entry(
        &self,
        txn: &mut dyn StoreTransaction,
        old: &Entry,
        new: &Entry,
        applied: &[Modification],
    ) -> Result<()> {
        let prepared: Vec<PreparedMutation> = self
            .indexes
            .values()
            .map(|index| index.prepare_modify(old, new, applied))
            .try_collect()?;
        self.apply_all(txn, &prepared)
    }

    /// Answers an assertion against one attribute's indexes. Attributes with
    /// no configured index yield [`CandidateSet::NotTrusted`].
    pub fn evaluate(
        &self,
        txn: &mut dyn StoreTransaction,
        attribute: &str,
        assertion: &Assertion,
    ) -> Result<CandidateSet> {
        match self.indexes.get(attribute) {
            Some(index) => index.evaluate(txn, assertion),
            None => Ok(CandidateSet::NotTrusted),
        }
    }

    fn apply_all(
        &self,
        txn: &mut dyn StoreTransaction,
        prepared: &[PreparedMutation],
    ) -> Result<()> {
        for mutation in prepared {
            mutation.apply(txn)?;
        }
        Ok(())
    }
}
