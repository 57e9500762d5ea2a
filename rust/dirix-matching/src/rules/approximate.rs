//! Phonetic (Soundex) equality rule.

use dirix_common::{Result, error::Error};

use super::{MatchingRule, MatchingRuleKind, NormalizedValue, prepare_string};

/// Phonetic equality rule.
///
/// The canonical form is the classic four-character Soundex code of the
/// first ASCII-alphabetic word of the value, so names that sound alike
/// ("Robert", "Rupert") normalize to the same key. The rule defines equality
/// only; it has no semantic ordering and cannot back a range scan.
///
/// Values containing no ASCII letter have no phonetic form and are rejected
/// as invalid.
pub struct ApproximateRule;

impl MatchingRule for ApproximateRule {
    fn kind(&self) -> MatchingRuleKind {
        MatchingRuleKind::Approximate
    }

    fn normalize(&self, raw: &[u8]) -> Result<NormalizedValue> {
        let prepared = prepare_string(self.kind(), raw)?;
        let word: String = prepared
            .chars()
            .skip_while(|c| !c.is_ascii_alphabetic())
            .take_while(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if word.is_empty() {
            return Err(Error::invalid_value(
                self.name(),
                format!("no phonetic form for value: '{prepared}'"),
            ));
        }

        Ok(NormalizedValue::new(soundex(&word).into_bytes()))
    }
}

/// Maps a letter to its Soundex digit, or `None` for vowels and the
/// separator letters.
fn soundex_digit(c: char) -> Option<u8> {
    match c {
        'B' | 'F' | 'P' | 'V' => Some(b'1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some(b'2'),
        'D' | 'T' => Some(b'3'),
        'L' => Some(b'4'),
        'M' | 'N' => Some(b'5'),
        'R' => Some(b'6'),
        _ => None,
    }
}

/// Classic American Soundex over an upper-case ASCII word.
///
/// The first letter is kept verbatim; subsequent letters map to digits with
/// adjacent duplicates coded once. 'H' and 'W' are transparent to the
/// duplicate check while vowels reset it. The code is padded with zeros to
/// exactly four characters.
fn soundex(word: &str) -> String {
    let mut chars = word.chars();
    let first = chars.next().expect("non-empty word");

    let mut code = String::with_capacity(4);
    code.push(first);

    let mut last_digit = soundex_digit(first);
    for c in chars {
        match soundex_digit(c) {
            Some(digit) => {
                if last_digit != Some(digit) {
                    code.push(digit as char);
                    if code.len() == 4 {
                        break;
                    }
                }
                last_digit = Some(digit);
            }
            None => {
                // H and W do not separate letters of the same code.
                if c != 'H' && c != 'W' {
                    last_digit = None;
                }
            }
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}
