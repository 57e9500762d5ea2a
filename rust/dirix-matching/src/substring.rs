//! Substring sub-key extraction.
//!
//! The substring index does not store whole values; it stores fixed-width
//! windows of the normalized form, and a substring search intersects the
//! posting lists of the windows extracted from the filter. The same window
//! extraction must be applied at index time and at query time, mirroring how
//! term extraction works for an inverted text index.
//!
//! Windows are measured in grapheme clusters rather than bytes so a window
//! never splits a user-perceived character.

use std::collections::BTreeSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::assertion::SubstringAssertion;
use crate::rules::NormalizedValue;

/// Default substring window width, in grapheme clusters.
pub const DEFAULT_SUBSTRING_LENGTH: usize = 6;

/// Default administrative bound on a posting list's size before the index
/// stops being trusted for a predicate.
pub const DEFAULT_INDEX_ENTRY_LIMIT: usize = 4000;

/// Configuration of the substring index variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubstringConfig {
    /// Window width in grapheme clusters. Values shorter than this
    /// contribute a single whole-value key; filter components shorter than
    /// this cannot be served from the index.
    pub min_substring_length: usize,
    /// Posting lists larger than this degrade query selectivity: the key is
    /// still recorded, but lookups through it report not-trusted.
    pub index_entry_limit: usize,
}

impl Default for SubstringConfig {
    fn default() -> Self {
        Self {
            min_substring_length: DEFAULT_SUBSTRING_LENGTH,
            index_entry_limit: DEFAULT_INDEX_ENTRY_LIMIT,
        }
    }
}

/// Extracts the index keys a normalized value contributes to the substring
/// index: every window of exactly `window` grapheme clusters, or the whole
/// value when it is shorter than one window.
///
/// The result is deduplicated and ordered.
pub fn substring_keys(value: &NormalizedValue, window: usize) -> BTreeSet<Box<[u8]>> {
    let mut keys = BTreeSet::new();
    let bytes = value.as_bytes();
    let Ok(text) = std::str::from_utf8(bytes) else {
        // Canonical forms of substring-capable rules are UTF-8; anything
        // else is indexed as a single opaque key.
        keys.insert(bytes.into());
        return keys;
    };

    let clusters: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
    if clusters.len() <= window {
        keys.insert(bytes.into());
        return keys;
    }

    for start in 0..=(clusters.len() - window) {
        let from = clusters[start].0;
        let to = clusters
            .get(start + window)
            .map_or(text.len(), |(offset, _)| *offset);
        keys.insert(text.as_bytes()[from..to].into());
    }
    keys
}

/// Extracts the lookup keys for a substring assertion: every window of
/// exactly `window` grapheme clusters within each component.
///
/// Returns `None` when any component is shorter than one window; such an
/// assertion cannot be served from the index and the caller must fall back
/// to an unindexed evaluation.
pub fn substring_keys_for_assertion(
    assertion: &SubstringAssertion,
    window: usize,
) -> Option<BTreeSet<Box<[u8]>>> {
    let mut keys = BTreeSet::new();
    for component in assertion.components() {
        let text = std::str::from_utf8(component.as_bytes()).ok()?;
        let clusters: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
        if clusters.len() < window {
            return None;
        }
        for start in 0..=(clusters.len() - window) {
            let from = clusters[start].0;
            let to = clusters
                .get(start + window)
                .map_or(text.len(), |(offset, _)| *offset);
            keys.insert(text.as_bytes()[from..to].into());
        }
    }
    Some(keys)
}
