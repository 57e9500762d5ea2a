//! Signed decimal integer rule with an order-preserving byte encoding.

use dirix_common::{Result, error::Error};

use super::{MatchingRule, MatchingRuleKind, NormalizedValue, truncate_for_message};

/// Signed 64-bit decimal integer rule.
///
/// Accepts an optional leading `-` followed by ASCII digits; any other
/// character, an empty value, or a value outside the `i64` range is an
/// invalid value. The canonical form is the 8-byte big-endian encoding with
/// the sign bit flipped (offset binary), so the unsigned byte order of two
/// keys equals the numeric order of the values. Leading zeros are not
/// significant: `007` and `7` normalize to the same key.
pub struct IntegerRule;

impl MatchingRule for IntegerRule {
    fn kind(&self) -> MatchingRuleKind {
        MatchingRuleKind::Integer
    }

    fn normalize(&self, raw: &[u8]) -> Result<NormalizedValue> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| self.syntax_error(raw))?
            .trim();

        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.syntax_error(raw));
        }

        let value: i64 = text.parse().map_err(|_| {
            Error::invalid_value(
                self.name(),
                format!("integer out of range: '{text}'"),
            )
        })?;

        Ok(NormalizedValue::new(encode_ordered(value).to_vec()))
    }
}

impl IntegerRule {
    fn syntax_error(&self, raw: &[u8]) -> Error {
        Error::invalid_value(
            self.name(),
            format!(
                "not a decimal integer: {:?}",
                String::from_utf8_lossy(&truncate_for_message(raw))
            ),
        )
    }
}

/// Flips the sign bit so that the big-endian byte order of the result equals
/// the numeric order of the input.
fn encode_ordered(value: i64) -> [u8; 8] {
    ((value as u64) ^ (1 << 63)).to_be_bytes()
}
