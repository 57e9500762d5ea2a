//! Case-sensitive directory-string rule.

use dirix_common::Result;

use super::{MatchingRule, MatchingRuleKind, NormalizedValue, prepare_string};

/// Case-sensitive directory-string rule.
///
/// The canonical form is the UTF-8 text with insignificant whitespace
/// removed: leading and trailing whitespace is dropped and internal runs
/// collapse to a single space. Character case is preserved, so two values
/// differing only in case normalize to distinct keys.
///
/// UTF-8 encodes code points in code-point order, so the byte order of the
/// canonical form is the code-point order of the prepared text.
pub struct CaseExactRule;

impl MatchingRule for CaseExactRule {
    fn kind(&self) -> MatchingRuleKind {
        MatchingRuleKind::CaseExact
    }

    fn normalize(&self, raw: &[u8]) -> Result<NormalizedValue> {
        let prepared = prepare_string(self.kind(), raw)?;
        Ok(NormalizedValue::new(prepared.into_bytes()))
    }
}
