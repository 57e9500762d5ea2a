//! Matching rule trait, rule kinds, and the rule factory.
//!
//! A matching rule establishes the canonical form and ordering for one class
//! of attribute values. The chosen rule affects:
//!
//! - **Key storage**: how canonical keys are ordered in the sorted store
//! - **Query matching**: how assertion targets are compared with indexed keys
//! - **Substring search**: whether the rule's canonical form supports
//!   substring sub-key extraction
//!
//! The central invariant is that the byte-lexicographic order of two
//! normalized values must agree in sign with the rule's semantic ordering of
//! the raw values. Every built-in rule discharges that invariant inside
//! [`MatchingRule::normalize`], which lets [`MatchingRule::compare`] default
//! to a plain byte comparison.

pub mod approximate;
pub mod case_exact;
pub mod case_ignore;
pub mod integer;

use std::cmp::Ordering;
use std::sync::Arc;

use dirix_common::{Result, error::Error};

pub use approximate::ApproximateRule;
pub use case_exact::CaseExactRule;
pub use case_ignore::CaseIgnoreRule;
pub use integer::IntegerRule;

/// A canonical value produced by [`MatchingRule::normalize`].
///
/// The wrapped bytes are the exact bytes stored as index keys; their
/// `Ord` is byte-lexicographic and, by the rule contract, semantically
/// meaningful.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedValue(Box<[u8]>);

impl NormalizedValue {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.0
    }
}

impl AsRef<[u8]> for NormalizedValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Defines normalization and ordering semantics for one class of attribute
/// values.
///
/// The same rule instance must be used consistently during both index
/// maintenance and query evaluation. Rules are immutable and shared across
/// threads, hence the `Send + Sync + 'static` bound.
pub trait MatchingRule: Send + Sync + 'static {
    /// Returns the rule kind for identification and configuration.
    fn kind(&self) -> MatchingRuleKind;

    /// Returns the human-readable name of this rule.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Produces the canonical byte form of a raw value.
    ///
    /// Must be deterministic and side-effect-free. Fails with an
    /// invalid-value error when the raw bytes do not conform to the rule's
    /// expected syntax; callers treat that failure as fatal to the whole
    /// entry mutation.
    fn normalize(&self, raw: &[u8]) -> Result<NormalizedValue>;

    /// Compares two already-normalized values.
    ///
    /// The default implementation compares the canonical bytes directly,
    /// which is correct for every rule that upholds the order-preserving
    /// normalization invariant.
    fn compare(&self, a: &NormalizedValue, b: &NormalizedValue) -> Ordering {
        a.as_bytes().cmp(b.as_bytes())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MatchingRuleKind {
    /// Case-sensitive directory strings.
    CaseExact,
    /// Case-folded directory strings.
    CaseIgnore,
    /// Signed 64-bit decimal integers.
    Integer,
    /// Phonetic (Soundex) equality.
    Approximate,
}

/// Convert a string name to a MatchingRuleKind enum variant.
impl TryFrom<&str> for MatchingRuleKind {
    type Error = dirix_common::error::Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "case-exact" => Ok(MatchingRuleKind::CaseExact),
            "case-ignore" => Ok(MatchingRuleKind::CaseIgnore),
            "integer" => Ok(MatchingRuleKind::Integer),
            "approximate" => Ok(MatchingRuleKind::Approximate),
            _ => Err(Error::invalid_arg(
                "name",
                format!("Unrecognized matching rule: {name}"),
            )),
        }
    }
}

impl MatchingRuleKind {
    /// Get the name of the rule kind as a static string.
    pub const fn name(&self) -> &'static str {
        match self {
            MatchingRuleKind::CaseExact => "case-exact",
            MatchingRuleKind::CaseIgnore => "case-ignore",
            MatchingRuleKind::Integer => "integer",
            MatchingRuleKind::Approximate => "approximate",
        }
    }

    /// Whether the rule's canonical form supports substring sub-key
    /// extraction. Only the string rules do.
    pub const fn supports_substrings(&self) -> bool {
        matches!(
            self,
            MatchingRuleKind::CaseExact | MatchingRuleKind::CaseIgnore
        )
    }

    /// Whether the rule defines a semantic ordering usable for range scans.
    /// The approximate rule defines equality only.
    pub const fn supports_ordering(&self) -> bool {
        !matches!(self, MatchingRuleKind::Approximate)
    }
}

/// Creates a new matching rule instance based on the provided name.
///
/// # Arguments
/// - `name`: The name of the rule to create (case-sensitive).
///
/// # Errors
/// Returns an [`Error::invalid_arg`] if the rule name is not recognized.
pub fn create_rule(name: &str) -> Result<Arc<dyn MatchingRule>> {
    match MatchingRuleKind::try_from(name)? {
        MatchingRuleKind::CaseExact => Ok(Arc::new(CaseExactRule)),
        MatchingRuleKind::CaseIgnore => Ok(Arc::new(CaseIgnoreRule)),
        MatchingRuleKind::Integer => Ok(Arc::new(IntegerRule)),
        MatchingRuleKind::Approximate => Ok(Arc::new(ApproximateRule)),
    }
}

/// Decodes a raw directory-string value and applies the insignificant-space
/// handling shared by the string rules: leading and trailing whitespace is
/// dropped and internal whitespace runs collapse to a single space.
pub(crate) fn prepare_string(rule: MatchingRuleKind, raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw).map_err(|_| {
        Error::invalid_value(
            rule.name(),
            format!("value is not valid UTF-8: {:?}", truncate_for_message(raw)),
        )
    })?;

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    Ok(out)
}

/// Bounds the raw-value excerpt embedded in error messages.
pub(crate) fn truncate_for_message(raw: &[u8]) -> Vec<u8> {
    const EXCERPT: usize = 32;
    raw.iter().copied().take(EXCERPT).collect()
}
