//! Lexicographic key generation for the legacy alphabetic scheme
//!
//! Codes use the case-insensitive alphabet `[0-9a-z]` and must start with a
//! letter, the same rules [`OrderKey::parse`](super::OrderKey::parse) applies
//! to stored legacy keys. Byte order over that alphabet matches digit order,
//! so a generated code sorts the same way as raw text and as an [`OrderKey`].
//! New keys in stored data are always canonical numeric keys; this strategy
//! remains for tooling that still writes alphabetic codes.
//!
//! [`OrderKey`]: super::OrderKey

use super::OrderKeyError;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Digit value of the character appended when a key must grow (`'m'`)
const MIDDLE: i8 = 22;

/// Conceptual digit below `'0'`: the position past the end of a key
const ABSENT: i8 = -1;

/// Conceptual digit below `'a'` for the first position, which must be a letter
const FIRST_FLOOR: i8 = 9;

/// Conceptual digit above `'z'`: no upper bound
const OPEN: i8 = 36;

/// Key sorting strictly between `before` and `after`
///
/// An empty `before` is the low sentinel; `after = None` is the high
/// sentinel. Walks to the first differing position and takes the midpoint
/// digit there. When the two digits are adjacent the lower one is kept and
/// the key grows by one position instead of being truncated.
///
/// Equal bounds yield a longer key above both. Bounds with nothing between
/// them (`"a"` and `"a0"`) are [`OrderKeyError::Exhausted`].
pub fn key_between(before: &str, after: Option<&str>) -> Result<String, OrderKeyError> {
    let lower = digits(before, true)?;
    let mut upper = after.map(|a| digits(a, false)).transpose()?;

    if let Some(u) = upper.as_deref() {
        if lower.as_slice() == u {
            let mut key = render(&lower);
            key.push(ALPHABET[MIDDLE as usize] as char);
            return Ok(key);
        }
        if lower.as_slice() > u {
            return Err(OrderKeyError::Inverted {
                before: before.to_string(),
                after: after.unwrap_or_default().to_string(),
            });
        }
    }

    let exhausted = || OrderKeyError::Exhausted {
        before: before.to_string(),
        after: after.unwrap_or_default().to_string(),
    };

    let mut key = Vec::with_capacity(lower.len() + 1);
    for i in 0.. {
        let floor = if i == 0 { FIRST_FLOOR } else { ABSENT };
        let lower_digit = lower.get(i).copied();
        let lo = lower_digit.unwrap_or(floor);
        let hi = match upper.as_deref() {
            None => OPEN,
            Some(u) => *u.get(i).ok_or_else(exhausted)?,
        };

        if lo == hi {
            key.push(lo);
            continue;
        }

        if lower_digit.is_none() && hi == OPEN {
            key.push(MIDDLE);
            break;
        }

        if hi - lo >= 2 {
            key.push(lo + (hi - lo) / 2);
            break;
        }

        if lower_digit.is_some() {
            // Keep the lower digit; everything after it sorts below `hi`
            key.push(lo);
            upper = None;
            continue;
        }

        // `before` ends here and nothing sorts between its end and `hi`, so
        // the key is `after` cut short, which needs `after` to continue
        key.push(hi);
        match upper.as_deref() {
            Some(u) if u.len() > i + 1 => break,
            _ => return Err(exhausted()),
        }
    }

    Ok(render(&key))
}

fn digits(code: &str, allow_empty: bool) -> Result<Vec<i8>, OrderKeyError> {
    let malformed = |reason: &str| OrderKeyError::Malformed {
        raw: code.to_string(),
        reason: reason.to_string(),
    };

    if code.is_empty() {
        return if allow_empty {
            Ok(Vec::new())
        } else {
            Err(malformed("empty key"))
        };
    }

    let mut out = Vec::with_capacity(code.len());
    for (i, c) in code.chars().enumerate() {
        let digit = c
            .to_ascii_lowercase()
            .to_digit(36)
            .ok_or_else(|| malformed("legacy keys are alphanumeric"))? as i8;
        if i == 0 && digit <= FIRST_FLOOR {
            return Err(malformed("legacy keys start with a letter"));
        }
        out.push(digit);
    }
    Ok(out)
}

fn render(digits: &[i8]) -> String {
    digits
        .iter()
        .map(|&d| ALPHABET[d as usize] as char)
        .collect()
}
