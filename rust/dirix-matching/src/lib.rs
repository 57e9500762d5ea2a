//! Matching rules for directory attribute values.
//!
//! This crate provides the normalization and comparison contract that the
//! dirix index layer is built on. A matching rule turns a raw attribute
//! value into a canonical byte form whose byte-lexicographic order agrees
//! with the rule's semantic order, which is what allows a plain sorted
//! key-value store to serve as an ordering index.
//!
//! # Overview
//!
//! Matching rules are used in two key scenarios:
//!
//! 1. **Index maintenance**: When an entry is written, rules normalize its
//!    attribute values into the canonical keys stored in the index.
//! 2. **Query processing**: When a search filter arrives, the same rules
//!    normalize the filter's target value into an [`Assertion`] that is
//!    evaluated against index keys.
//!
//! The rule used at index time and at query time must be the same, otherwise
//! lookups silently miss.
//!
//! # Available rules
//!
//! - **`case-exact`**: case-sensitive directory strings
//! - **`case-ignore`**: case-folded directory strings
//! - **`integer`**: signed 64-bit decimal integers with an order-preserving
//!   byte encoding
//! - **`approximate`**: phonetic (Soundex) equality
//!
//! # Quick Start
//!
//! ```rust
//! use dirix_matching::{create_rule, Assertion, MatchOutcome};
//!
//! let rule = create_rule("case-ignore").unwrap();
//! let assertion = Assertion::greater_or_equal(rule.clone(), b"alice").unwrap();
//!
//! let candidate = rule.normalize(b"Bob").unwrap();
//! assert_eq!(assertion.matches(&candidate), MatchOutcome::True);
//! ```

mod assertion;
mod rules;
mod substring;

pub use assertion::{Assertion, MatchOutcome, SubstringAssertion, ValueAssertion};
pub use rules::{MatchingRule, MatchingRuleKind, NormalizedValue, create_rule};
pub use substring::{
    DEFAULT_INDEX_ENTRY_LIMIT, DEFAULT_SUBSTRING_LENGTH, SubstringConfig, substring_keys,
    substring_keys_for_assertion,
};
