//! Case-folded directory-string rule.

use dirix_common::Result;

use super::{MatchingRule, MatchingRuleKind, NormalizedValue, prepare_string};

/// Case-folded directory-string rule.
///
/// The canonical form is the whitespace-prepared text with every character
/// folded to lower case, so values differing only in case normalize to the
/// same key. Because the fold is applied before key bytes are produced, the
/// byte order of the canonical form is the case-insensitive code-point order
/// of the original values.
pub struct CaseIgnoreRule;

impl MatchingRule for CaseIgnoreRule {
    fn kind(&self) -> MatchingRuleKind {
        MatchingRuleKind::CaseIgnore
    }

    fn normalize(&self, raw: &[u8]) -> Result<NormalizedValue> {
        let prepared = prepare_string(self.kind(), raw)?;
        let folded: String = prepared.chars().map(to_lower).collect();
        Ok(NormalizedValue::new(folded.into_bytes()))
    }
}

/// Converts a character into its lower-case variant while ignoring special
/// casing characters that expand to multiple code points, as described by
/// https://www.unicode.org/Public/UCD/latest/ucd/SpecialCasing.txt.
///
/// If the character expands when converted to lower case, the method returns
/// the character itself. In addition it maps 'ẞ' (upper Eszett) to 'ß'
/// (lower Eszett) so the two compare equal.
fn to_lower(c: char) -> char {
    if c == 'ẞ' {
        'ß'
    } else if c.is_uppercase() {
        let mut lowercase_char = c.to_lowercase();
        match (lowercase_char.next(), lowercase_char.next()) {
            (Some(ch), None) => ch,
            _ => c, // If it maps to multiple code points, return the original character
        }
    } else {
        c
    }
}
