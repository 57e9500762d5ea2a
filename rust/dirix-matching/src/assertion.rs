//! Compiled search assertions with tri-state evaluation.
//!
//! An assertion binds one matching rule to one normalized target value and
//! evaluates candidate values against it. Targets are normalized eagerly at
//! construction so a malformed filter value is rejected before any index is
//! consulted, with the same invalid-value error the index layer uses for
//! malformed entry values.

use std::cmp::Ordering;
use std::sync::Arc;

use dirix_common::{Result, error::Error};

use crate::rules::{MatchingRule, NormalizedValue};

/// Outcome of evaluating an assertion against a candidate value.
///
/// `Undefined` is produced when the candidate cannot be normalized under the
/// assertion's rule; the caller must treat the entry as neither matching nor
/// non-matching.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MatchOutcome {
    True,
    False,
    Undefined,
}

impl From<bool> for MatchOutcome {
    fn from(value: bool) -> Self {
        if value {
            MatchOutcome::True
        } else {
            MatchOutcome::False
        }
    }
}

/// A single-valued assertion: one rule, one normalized target.
pub struct ValueAssertion {
    rule: Arc<dyn MatchingRule>,
    target: NormalizedValue,
}

impl ValueAssertion {
    fn new(rule: Arc<dyn MatchingRule>, target: &[u8]) -> Result<Self> {
        let target = rule.normalize(target)?;
        Ok(Self { rule, target })
    }

    pub fn rule(&self) -> &Arc<dyn MatchingRule> {
        &self.rule
    }

    /// The normalized target, which is also the index key (or range bound)
    /// this assertion is served from.
    pub fn target(&self) -> &NormalizedValue {
        &self.target
    }

    fn compare(&self, candidate: &NormalizedValue) -> Ordering {
        self.rule.compare(candidate, &self.target)
    }
}

/// A substring assertion decomposed into initial / any / final components,
/// each already normalized under the rule.
pub struct SubstringAssertion {
    rule: Arc<dyn MatchingRule>,
    initial: Option<NormalizedValue>,
    any: Vec<NormalizedValue>,
    final_part: Option<NormalizedValue>,
}

impl SubstringAssertion {
    pub fn rule(&self) -> &Arc<dyn MatchingRule> {
        &self.rule
    }

    pub fn initial(&self) -> Option<&NormalizedValue> {
        self.initial.as_ref()
    }

    pub fn any(&self) -> &[NormalizedValue] {
        &self.any
    }

    pub fn final_part(&self) -> Option<&NormalizedValue> {
        self.final_part.as_ref()
    }

    /// All components in filter order, for sub-key extraction.
    pub fn components(&self) -> impl Iterator<Item = &NormalizedValue> {
        self.initial
            .iter()
            .chain(self.any.iter())
            .chain(self.final_part.iter())
    }

    /// Tests the components against a normalized candidate: the initial
    /// component anchors at the start, the final component at the end, and
    /// the `any` components must occur in order, without overlap, between
    /// them.
    fn matches(&self, candidate: &NormalizedValue) -> MatchOutcome {
        let bytes = candidate.as_bytes();
        let mut lo = 0usize;
        let mut hi = bytes.len();

        if let Some(initial) = &self.initial {
            if !bytes.starts_with(initial.as_bytes()) {
                return MatchOutcome::False;
            }
            lo = initial.as_bytes().len();
        }
        if let Some(final_part) = &self.final_part {
            let tail = final_part.as_bytes();
            if hi < lo + tail.len() || !bytes[..hi].ends_with(tail) {
                return MatchOutcome::False;
            }
            hi -= tail.len();
        }

        for part in &self.any {
            match find_subslice(&bytes[lo..hi], part.as_bytes()) {
                Some(at) => lo += at + part.as_bytes().len(),
                None => return MatchOutcome::False,
            }
        }
        MatchOutcome::True
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A compiled search predicate bound to one matching rule.
///
/// The variant set is closed: the attribute-index coordinator matches on it
/// exhaustively to pick the index tree and access pattern that serves each
/// predicate.
pub enum Assertion {
    /// Attribute has at least one value.
    Present,
    Equality(ValueAssertion),
    GreaterOrEqual(ValueAssertion),
    LessOrEqual(ValueAssertion),
    Substring(SubstringAssertion),
    Approximate(ValueAssertion),
}

impl Assertion {
    pub fn equality(rule: Arc<dyn MatchingRule>, target: &[u8]) -> Result<Self> {
        Ok(Assertion::Equality(ValueAssertion::new(rule, target)?))
    }

    pub fn greater_or_equal(rule: Arc<dyn MatchingRule>, target: &[u8]) -> Result<Self> {
        Self::require_ordering(&rule)?;
        Ok(Assertion::GreaterOrEqual(ValueAssertion::new(rule, target)?))
    }

    pub fn less_or_equal(rule: Arc<dyn MatchingRule>, target: &[u8]) -> Result<Self> {
        Self::require_ordering(&rule)?;
        Ok(Assertion::LessOrEqual(ValueAssertion::new(rule, target)?))
    }

    pub fn approximate(rule: Arc<dyn MatchingRule>, target: &[u8]) -> Result<Self> {
        Ok(Assertion::Approximate(ValueAssertion::new(rule, target)?))
    }

    /// Builds a substring assertion from raw filter components. At least one
    /// component must be present, and the rule must support substring
    /// matching.
    pub fn substring(
        rule: Arc<dyn MatchingRule>,
        initial: Option<&[u8]>,
        any: &[&[u8]],
        final_part: Option<&[u8]>,
    ) -> Result<Self> {
        if !rule.kind().supports_substrings() {
            return Err(Error::invalid_arg(
                "rule",
                format!("rule {} does not support substring matching", rule.name()),
            ));
        }
        if initial.is_none() && any.is_empty() && final_part.is_none() {
            return Err(Error::invalid_arg(
                "components",
                "substring assertion requires at least one component",
            ));
        }

        let normalize = |raw: &[u8]| rule.normalize(raw);
        Ok(Assertion::Substring(SubstringAssertion {
            initial: initial.map(normalize).transpose()?,
            any: any.iter().map(|raw| normalize(raw)).collect::<Result<_>>()?,
            final_part: final_part.map(normalize).transpose()?,
            rule,
        }))
    }

    /// Evaluates this assertion against an already-normalized candidate.
    pub fn matches(&self, candidate: &NormalizedValue) -> MatchOutcome {
        match self {
            Assertion::Present => MatchOutcome::True,
            Assertion::Equality(assertion) | Assertion::Approximate(assertion) => {
                (assertion.compare(candidate) == Ordering::Equal).into()
            }
            Assertion::GreaterOrEqual(assertion) => {
                (assertion.compare(candidate) != Ordering::Less).into()
            }
            Assertion::LessOrEqual(assertion) => {
                (assertion.compare(candidate) != Ordering::Greater).into()
            }
            Assertion::Substring(assertion) => assertion.matches(candidate),
        }
    }

    /// Normalizes a raw candidate under this assertion's rule, then
    /// evaluates. A candidate that does not conform to the rule's syntax
    /// yields `Undefined` rather than an error.
    pub fn matches_raw(&self, raw: &[u8]) -> MatchOutcome {
        let rule = match self.rule() {
            Some(rule) => rule,
            None => return MatchOutcome::True, // Present
        };
        match rule.normalize(raw) {
            Ok(candidate) => self.matches(&candidate),
            Err(_) => MatchOutcome::Undefined,
        }
    }

    /// The matching rule backing this assertion, if any.
    pub fn rule(&self) -> Option<&Arc<dyn MatchingRule>> {
        match self {
            Assertion::Present => None,
            Assertion::Equality(assertion)
            | Assertion::GreaterOrEqual(assertion)
            | Assertion::LessOrEqual(assertion)
            | Assertion::Approximate(assertion) => Some(assertion.rule()),
            Assertion::Substring(assertion) => Some(assertion.rule()),
        }
    }

    fn require_ordering(rule: &Arc<dyn MatchingRule>) -> Result<()> {
        if rule.kind().supports_ordering() {
            Ok(())
        } else {
            Err(Error::invalid_arg(
                "rule",
                format!("rule {} does not define an ordering", rule.name()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::create_rule;

    #[test]
    fn test_ordering_assertions() {
        let rule = create_rule("case-ignore").unwrap();
        let ge = Assertion::greater_or_equal(rule.clone(), b"alice").unwrap();
        let le = Assertion::less_or_equal(rule.clone(), b"alice").unwrap();

        let bob = rule.normalize(b"bob").unwrap();
        let alice = rule.normalize(b"ALICE").unwrap();
        let aaron = rule.normalize(b"Aaron").unwrap();

        assert_eq!(ge.matches(&bob), MatchOutcome::True);
        assert_eq!(ge.matches(&alice), MatchOutcome::True);
        assert_eq!(ge.matches(&aaron), MatchOutcome::False);

        assert_eq!(le.matches(&bob), MatchOutcome::False);
        assert_eq!(le.matches(&alice), MatchOutcome::True);
        assert_eq!(le.matches(&aaron), MatchOutcome::True);
    }

    #[test]
    fn test_equality_assertion() {
        let rule = create_rule("case-ignore").unwrap();
        let eq = Assertion::equality(rule.clone(), b"Alice").unwrap();

        assert_eq!(
            eq.matches(&rule.normalize(b"aLiCe").unwrap()),
            MatchOutcome::True
        );
        assert_eq!(
            eq.matches(&rule.normalize(b"bob").unwrap()),
            MatchOutcome::False
        );
    }

    #[test]
    fn test_integer_assertions() {
        let rule = create_rule("integer").unwrap();
        let ge = Assertion::greater_or_equal(rule.clone(), b"10").unwrap();

        assert_eq!(
            ge.matches(&rule.normalize(b"9").unwrap()),
            MatchOutcome::False
        );
        assert_eq!(
            ge.matches(&rule.normalize(b"10").unwrap()),
            MatchOutcome::True
        );
        assert_eq!(
            ge.matches(&rule.normalize(b"11").unwrap()),
            MatchOutcome::True
        );
    }

    #[test]
    fn test_malformed_target_is_rejected_eagerly() {
        let rule = create_rule("integer").unwrap();
        assert!(Assertion::equality(rule.clone(), b"abc").is_err());
        assert!(Assertion::greater_or_equal(rule, b"").is_err());
    }

    #[test]
    fn test_undefined_candidate() {
        let rule = create_rule("integer").unwrap();
        let eq = Assertion::equality(rule, b"7").unwrap();
        assert_eq!(eq.matches_raw(b"not-a-number"), MatchOutcome::Undefined);
        assert_eq!(eq.matches_raw(b"7"), MatchOutcome::True);
    }

    #[test]
    fn test_substring_assertion() {
        let rule = create_rule("case-ignore").unwrap();
        let assertion =
            Assertion::substring(rule.clone(), Some(b"ali"), &[b"ce sm"], Some(b"ith")).unwrap();

        let hit = rule.normalize(b"Alice Smith").unwrap();
        let miss = rule.normalize(b"Bob Jones").unwrap();
        assert_eq!(assertion.matches(&hit), MatchOutcome::True);
        assert_eq!(assertion.matches(&miss), MatchOutcome::False);

        // Any-only assertion
        let contains = Assertion::substring(rule.clone(), None, &[b"ce"], None).unwrap();
        assert_eq!(contains.matches(&hit), MatchOutcome::True);

        // Components must not overlap: "aba" contains "ab" then needs another "a".
        let seq = Assertion::substring(rule.clone(), None, &[b"ab", b"a"], None).unwrap();
        assert_eq!(
            seq.matches(&rule.normalize(b"aba").unwrap()),
            MatchOutcome::True
        );
        assert_eq!(
            seq.matches(&rule.normalize(b"ab").unwrap()),
            MatchOutcome::False
        );
    }

    #[test]
    fn test_substring_requires_components_and_capability() {
        let string_rule = create_rule("case-ignore").unwrap();
        assert!(Assertion::substring(string_rule, None, &[], None).is_err());

        let integer_rule = create_rule("integer").unwrap();
        assert!(Assertion::substring(integer_rule, Some(b"1"), &[], None).is_err());
    }

    #[test]
    fn test_ordering_assertion_requires_ordering_rule() {
        let rule = create_rule("approximate").unwrap();
        assert!(Assertion::greater_or_equal(rule.clone(), b"Robert").is_err());
        assert!(Assertion::approximate(rule, b"Robert").is_ok());
    }
}
