//! Order keys for performances within a concert program
//!
//! A performance's display position is defined by its order key, not by the
//! row's physical position. Moving one performance assigns it a fresh key
//! strictly between its new neighbours; no other row is rewritten.
//!
//! # Key schemes
//!
//! Three historical formats coexist in stored data:
//!
//! - **Legacy integer**: the original `order` column (`1`, `2`, `3`, ...),
//!   also accepted with up to three fraction digits (`"1500.5"`)
//! - **Legacy alpha**: short lexicographic codes (`"a"`, `"a0"`, `"am"`)
//! - **Numeric padded**: the canonical `DDDDDDD.DDD` format (11 chars)
//!
//! Every key is normalized to an integer count of thousandths before it is
//! compared. Raw strings from different schemes are never compared directly.
//! Newly generated keys are always canonical, so old rows migrate gradually
//! as they are moved.

pub mod alpha;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Thousandths per integer unit
pub const SCALE: u64 = 1_000;

/// Canonical key length: 7 integer digits, '.', 3 fraction digits
pub const CANONICAL_LEN: usize = 11;

const INTEGER_DIGITS: usize = 7;
const FRACTION_DIGITS: usize = 3;

/// Value of the high sentinel (1,000,000.000)
const MAX_VALUE: u64 = 1_000_000 * SCALE;

/// Largest value the canonical format can hold (9,999,999.999)
const CEILING_VALUE: u64 = 10_000_000 * SCALE - 1;

/// Gap between freshly seeded keys (1000.000)
pub const DEFAULT_SPACING: u64 = 1_000 * SCALE;

/// Legacy alpha codes are read as base-37 fractions; characters past this
/// many cannot move the value by a whole thousandth.
const LEGACY_ALPHA_SIGNIFICANT: usize = 12;
const LEGACY_ALPHA_RADIX: u128 = 37;

/// Storage format a key was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// Alphabetic codes from the first revisions
    LegacyAlpha,
    /// Plain numbers from the integer `order` column
    LegacyInteger,
    /// Fixed-width zero-padded decimal (current)
    NumericPadded,
}

/// Errors raised while parsing or generating order keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderKeyError {
    /// Input is not a key in any known scheme
    #[error("Malformed order key {raw:?}: {reason}")]
    Malformed { raw: String, reason: String },

    /// No value fits strictly between the bounds at three decimals
    #[error("No order key fits between {before} and {after}; collection needs rebalance")]
    Exhausted { before: String, after: String },

    /// Lower bound sorts after upper bound
    #[error("Order keys out of order: {before} sorts after {after}; collection needs rebalance")]
    Inverted { before: String, after: String },
}

impl OrderKeyError {
    /// True when the caller should respace the whole collection and retry
    pub fn needs_rebalance(&self) -> bool {
        matches!(
            self,
            OrderKeyError::Exhausted { .. } | OrderKeyError::Inverted { .. }
        )
    }

    fn malformed(raw: &str, reason: impl Into<String>) -> Self {
        OrderKeyError::Malformed {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed order key
///
/// Ordering uses the normalized value first, so a legacy key and a canonical
/// key with the same value compare equal. Legacy alpha codes longer than the
/// significant prefix can share a value; among keys with equal values those
/// codes sort after numeric keys and by their lowercased text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey {
    scheme: KeyScheme,
    raw: String,
    value: u64,
}

impl OrderKey {
    /// Low sentinel: the bound used when an item has no predecessor
    pub const MIN: OrderKey = OrderKey {
        scheme: KeyScheme::NumericPadded,
        raw: String::new(),
        value: 0,
    };

    /// High sentinel: the bound used when an item has no successor
    pub const MAX: OrderKey = OrderKey {
        scheme: KeyScheme::NumericPadded,
        raw: String::new(),
        value: MAX_VALUE,
    };

    /// Parse a stored key in any supported scheme
    pub fn parse(raw: &str) -> Result<Self, OrderKeyError> {
        let trimmed = raw.trim();
        let first = trimmed
            .chars()
            .next()
            .ok_or_else(|| OrderKeyError::malformed(raw, "empty key"))?;

        if is_canonical(trimmed) {
            return Ok(OrderKey {
                scheme: KeyScheme::NumericPadded,
                raw: trimmed.to_string(),
                value: parse_decimal(trimmed)?,
            });
        }

        if first.is_ascii_digit() {
            return Ok(OrderKey {
                scheme: KeyScheme::LegacyInteger,
                raw: trimmed.to_string(),
                value: parse_decimal(trimmed)?,
            });
        }

        if first.is_ascii_alphabetic() {
            return Ok(OrderKey {
                scheme: KeyScheme::LegacyAlpha,
                raw: trimmed.to_string(),
                value: legacy_alpha_value(trimmed)?,
            });
        }

        Err(OrderKeyError::malformed(raw, "unrecognized key format"))
    }

    /// Build a canonical key from a thousandths value
    ///
    /// Values above the format ceiling are clamped to it.
    pub fn from_thousandths(value: u64) -> Self {
        let value = value.min(CEILING_VALUE);
        OrderKey {
            scheme: KeyScheme::NumericPadded,
            raw: format_canonical(value),
            value,
        }
    }

    /// Default key for the item at `index` in a freshly seeded program
    pub fn seed(index: usize) -> Self {
        Self::from_thousandths((index as u64 + 1).saturating_mul(DEFAULT_SPACING))
    }

    /// Normalize a stored key string to canonical form
    pub fn normalize(raw: &str) -> Result<String, OrderKeyError> {
        Ok(Self::parse(raw)?.canonical())
    }

    /// Canonical `DDDDDDD.DDD` rendering of this key's value
    pub fn canonical(&self) -> String {
        format_canonical(self.value)
    }

    /// The string as stored
    ///
    /// Sentinels have no stored form and render canonically.
    pub fn raw(&self) -> String {
        if self.raw.is_empty() {
            self.canonical()
        } else {
            self.raw.clone()
        }
    }

    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Normalized value in thousandths
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_canonical(&self) -> bool {
        self.scheme == KeyScheme::NumericPadded
    }
}

impl OrderKey {
    /// Text that breaks ties between keys of equal value
    fn tie_break(&self) -> Option<impl Iterator<Item = u8> + '_> {
        (self.scheme == KeyScheme::LegacyAlpha)
            .then(|| self.raw.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| match (self.tie_break(), other.tie_break()) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            })
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

impl std::str::FromStr for OrderKey {
    type Err = OrderKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderKey::parse(s)
    }
}

impl TryFrom<String> for OrderKey {
    type Error = OrderKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OrderKey::parse(&value)
    }
}

impl From<OrderKey> for String {
    fn from(key: OrderKey) -> Self {
        key.raw()
    }
}

/// Generate a key strictly between `before` and `after`
///
/// `before == after` has no room between; the result is one thousandth above
/// the shared value. Adjacent keys (one thousandth apart) and distinct keys
/// sharing a value are reported as [`OrderKeyError::Exhausted`] rather than
/// returning a key equal to or outside a bound.
pub fn generate_order_key(before: &OrderKey, after: &OrderKey) -> Result<OrderKey, OrderKeyError> {
    let (lo, hi) = (before.value, after.value);

    match before.cmp(after) {
        Ordering::Equal => {
            if lo >= CEILING_VALUE {
                return Err(exhausted(before, after));
            }
            return Ok(OrderKey::from_thousandths(lo + 1));
        }
        Ordering::Greater => {
            return Err(OrderKeyError::Inverted {
                before: before.raw(),
                after: after.raw(),
            });
        }
        Ordering::Less if lo == hi => return Err(exhausted(before, after)),
        Ordering::Less => {}
    }

    let mid = lo + (hi - lo) / 2;
    if mid == lo {
        return Err(exhausted(before, after));
    }

    let key = OrderKey::from_thousandths(mid);
    debug_assert!(before < &key && &key < after);
    Ok(key)
}

/// Key for a slot between two neighbours in a sorted collection
///
/// Missing neighbours are replaced by the sentinels. Unlike
/// [`generate_order_key`], equal neighbours are an error here: a slot between
/// two items with the same key cannot be represented.
pub fn key_for_slot(
    prev: Option<&OrderKey>,
    next: Option<&OrderKey>,
) -> Result<OrderKey, OrderKeyError> {
    match (prev, next) {
        (None, None) => Ok(OrderKey::seed(0)),
        (Some(prev), None) => generate_order_key(prev, &upper_bound_for(prev)),
        (None, Some(next)) => {
            if next.value == 0 {
                return Err(exhausted(&OrderKey::MIN, next));
            }
            generate_order_key(&OrderKey::MIN, next)
        }
        (Some(prev), Some(next)) => {
            if prev == next {
                return Err(exhausted(prev, next));
            }
            generate_order_key(prev, next)
        }
    }
}

/// Key for an item appended after `last`
///
/// Steps by [`DEFAULT_SPACING`] while that stays under the high sentinel so
/// appends do not halve the remaining space each time.
pub fn key_after_last(last: Option<&OrderKey>) -> Result<OrderKey, OrderKeyError> {
    let Some(last) = last else {
        return Ok(OrderKey::seed(0));
    };

    let stepped = last.value.saturating_add(DEFAULT_SPACING);
    if stepped < MAX_VALUE {
        return Ok(OrderKey::from_thousandths(stepped));
    }

    generate_order_key(last, &upper_bound_for(last))
}

/// Evenly spaced fresh keys for a collection of `count` items
pub fn rebalance(count: usize) -> Result<Vec<OrderKey>, OrderKeyError> {
    let count_u64 = count as u64;
    let step = if count_u64.saturating_mul(DEFAULT_SPACING) < MAX_VALUE {
        DEFAULT_SPACING
    } else {
        MAX_VALUE / (count_u64 + 1)
    };

    if step == 0 {
        return Err(exhausted(&OrderKey::MIN, &OrderKey::MAX));
    }

    Ok((1..=count_u64)
        .map(|i| OrderKey::from_thousandths(i * step))
        .collect())
}

/// High bound for insertions after `prev`
///
/// Keys at or past the high sentinel (hand-edited rows) fall back to the
/// format ceiling so the bound stays above them.
fn upper_bound_for(prev: &OrderKey) -> OrderKey {
    if prev.value < MAX_VALUE {
        OrderKey::MAX
    } else {
        OrderKey::from_thousandths(CEILING_VALUE)
    }
}

fn exhausted(before: &OrderKey, after: &OrderKey) -> OrderKeyError {
    OrderKeyError::Exhausted {
        before: before.raw(),
        after: after.raw(),
    }
}

fn format_canonical(value: u64) -> String {
    format!(
        "{:0int$}.{:0frac$}",
        value / SCALE,
        value % SCALE,
        int = INTEGER_DIGITS,
        frac = FRACTION_DIGITS
    )
}

fn is_canonical(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == CANONICAL_LEN
        && bytes[INTEGER_DIGITS] == b'.'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == INTEGER_DIGITS || b.is_ascii_digit())
}

/// Parse `123`, `123.4` or `0000123.400` into thousandths
fn parse_decimal(raw: &str) -> Result<u64, OrderKeyError> {
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw, ""),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrderKeyError::malformed(raw, "integer part must be digits"));
    }
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrderKeyError::malformed(raw, "fraction part must be digits"));
    }
    if frac_part.len() > FRACTION_DIGITS {
        return Err(OrderKeyError::malformed(
            raw,
            format!("more than {} fraction digits", FRACTION_DIGITS),
        ));
    }

    let significant = int_part.trim_start_matches('0');
    if significant.len() > INTEGER_DIGITS {
        return Err(OrderKeyError::malformed(raw, "exceeds 9999999.999"));
    }

    let integer: u64 = if significant.is_empty() {
        0
    } else {
        significant
            .parse()
            .map_err(|_| OrderKeyError::malformed(raw, "integer part out of range"))?
    };

    let mut fraction: u64 = 0;
    for i in 0..FRACTION_DIGITS {
        let digit = frac_part.as_bytes().get(i).map(|b| (b - b'0') as u64).unwrap_or(0);
        fraction = fraction * 10 + digit;
    }

    Ok(integer * SCALE + fraction)
}

/// Map a legacy alphabetic code onto the numeric range `[0, MAX)`
///
/// Each character becomes a base-37 digit `1 + base36(c)`; the code is read as
/// a fraction and scaled by the high sentinel. Digits start at 1 so a strict
/// prefix maps below its extensions (`"a" < "a0"`).
fn legacy_alpha_value(raw: &str) -> Result<u64, OrderKeyError> {
    let mut numerator: u128 = 0;
    let mut denominator: u128 = 1;

    for (i, c) in raw.chars().enumerate() {
        let digit = c
            .to_ascii_lowercase()
            .to_digit(36)
            .ok_or_else(|| OrderKeyError::malformed(raw, "legacy keys are alphanumeric"))?;
        if i >= LEGACY_ALPHA_SIGNIFICANT {
            continue;
        }
        numerator = numerator * LEGACY_ALPHA_RADIX + (digit as u128 + 1);
        denominator *= LEGACY_ALPHA_RADIX;
    }

    Ok((numerator * MAX_VALUE as u128 / denominator) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> OrderKey {
        OrderKey::parse(s).unwrap()
    }

    #[test]
    fn test_parse_canonical() {
        let k = key("0001500.250");
        assert_eq!(k.scheme(), KeyScheme::NumericPadded);
        assert_eq!(k.value(), 1_500_250);
        assert_eq!(k.canonical(), "0001500.250");
    }

    #[test]
    fn test_normalize_is_identity_on_canonical() {
        for raw in ["0000000.000", "0001000.000", "0999999.999", "1000000.000"] {
            assert_eq!(OrderKey::normalize(raw).unwrap(), raw);
        }
    }

    #[test]
    fn test_parse_legacy_integer() {
        let k = key("3");
        assert_eq!(k.scheme(), KeyScheme::LegacyInteger);
        assert_eq!(k.canonical(), "0000003.000");
        assert_eq!(key("1500.5").canonical(), "0001500.500");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OrderKey::parse("").is_err());
        assert!(OrderKey::parse("-1").is_err());
        assert!(OrderKey::parse("1.2345").is_err());
        assert!(OrderKey::parse("12345678").is_err());
        assert!(OrderKey::parse("a-b").is_err());
        assert!(OrderKey::parse("1.2.3").is_err());
    }

    #[test]
    fn test_legacy_alpha_order_preserved() {
        assert!(key("a0") < key("b0"));
        assert!(key("a") < key("a0"));
        assert!(key("a0") < key("am"));
        assert!(key("am") < key("b"));
        assert!(key("z") < OrderKey::MAX);
        assert_eq!(key("A0"), key("a0"));
    }

    #[test]
    fn test_deep_legacy_codes_keep_text_order() {
        let a = key("ammmmmmmmmmmma");
        let b = key("ammmmmmmmmmmmb");
        assert_eq!(a.value(), b.value());
        assert!(a < b);
        assert_ne!(a, b);
        assert_eq!(key("AMMMMMMMMMMMMA"), a);

        let mut sorted = vec![b.clone(), a.clone()];
        sorted.sort();
        assert_eq!(sorted[0].raw(), "ammmmmmmmmmmma");

        let numeric = OrderKey::from_thousandths(a.value());
        assert!(numeric < a && numeric < b);
    }

    #[test]
    fn test_generate_between_same_value_codes_exhausts() {
        let a = key("ammmmmmmmmmmma");
        let b = key("ammmmmmmmmmmmb");

        let err = generate_order_key(&a, &b).unwrap_err();
        assert!(matches!(err, OrderKeyError::Exhausted { .. }));
        assert!(key_for_slot(Some(&a), Some(&b)).unwrap_err().needs_rebalance());

        let err = generate_order_key(&b, &a).unwrap_err();
        assert!(matches!(err, OrderKeyError::Inverted { .. }));
    }

    #[test]
    fn test_legacy_alpha_interleaves_with_generated_keys() {
        let a = key("a0");
        let b = key("b0");
        let mid = generate_order_key(&a, &b).unwrap();
        assert!(mid.is_canonical());
        assert!(a < mid && mid < b);
    }

    #[test]
    fn test_generate_between_thousands() {
        let k = generate_order_key(&key("0001000.000"), &key("0002000.000")).unwrap();
        assert_eq!(k.raw(), "0001500.000");
    }

    #[test]
    fn test_generate_mixed_schemes() {
        let k = generate_order_key(&key("1"), &key("0000002.000")).unwrap();
        assert_eq!(k.raw(), "0000001.500");
    }

    #[test]
    fn test_generate_equal_keys_goes_above() {
        let a = key("0001000.000");
        let k = generate_order_key(&a, &a).unwrap();
        assert_ne!(k, a);
        assert!(k > a);
        assert_eq!(k.raw(), "0001000.001");
    }

    #[test]
    fn test_generate_adjacent_signals_exhaustion() {
        let err = generate_order_key(&key("0001000.000"), &key("0001000.001")).unwrap_err();
        assert!(matches!(err, OrderKeyError::Exhausted { .. }));
        assert!(err.needs_rebalance());
    }

    #[test]
    fn test_generate_inverted_bounds() {
        let err = generate_order_key(&key("0002000.000"), &key("0001000.000")).unwrap_err();
        assert!(matches!(err, OrderKeyError::Inverted { .. }));
        assert!(err.needs_rebalance());
    }

    #[test]
    fn test_generate_strictly_between_sampled_pairs() {
        let mut values = vec![0u64, 1, 2, 3, 999, 1_000, 1_001, 123_456, 999_999_999];
        values.push(MAX_VALUE);
        for &a in &values {
            for &b in &values {
                if a >= b {
                    continue;
                }
                let (ka, kb) = (OrderKey::from_thousandths(a), OrderKey::from_thousandths(b));
                match generate_order_key(&ka, &kb) {
                    Ok(k) => assert!(ka < k && k < kb, "{} < {} < {}", ka, k, kb),
                    Err(e) => {
                        assert_eq!(b - a, 1, "only adjacent keys may exhaust");
                        assert!(e.needs_rebalance());
                    }
                }
            }
        }
    }

    #[test]
    fn test_repeated_insertion_never_escapes_bounds() {
        let lower = key("0001000.000");
        let mut upper = key("0001000.010");
        let mut inserted = 0;
        let mut exhausted_seen = false;

        for _ in 0..10 {
            match generate_order_key(&lower, &upper) {
                Ok(k) => {
                    assert!(lower < k && k < upper);
                    upper = k;
                    inserted += 1;
                }
                Err(e) => {
                    assert!(e.needs_rebalance());
                    exhausted_seen = true;
                    break;
                }
            }
        }

        assert!(exhausted_seen, "ten halvings of 0.010 must exhaust");
        assert!(inserted >= 3);
    }

    #[test]
    fn test_slot_at_start_and_end() {
        let first = key("0001000.000");
        let last = key("0003000.000");

        let head = key_for_slot(None, Some(&first)).unwrap();
        assert!(head < first);
        assert!(head > OrderKey::MIN);

        let tail = key_for_slot(Some(&last), None).unwrap();
        assert!(tail > last);
        assert!(tail < OrderKey::MAX);

        assert_eq!(key_for_slot(None, None).unwrap().raw(), "0001000.000");
    }

    #[test]
    fn test_slot_between_duplicates_needs_rebalance() {
        let a = key("0001000.000");
        let err = key_for_slot(Some(&a), Some(&a)).unwrap_err();
        assert!(err.needs_rebalance());

        let zero = key("0000000.000");
        assert!(key_for_slot(None, Some(&zero)).unwrap_err().needs_rebalance());
    }

    #[test]
    fn test_slot_after_key_past_high_sentinel() {
        let big = key("2000000.000");
        let tail = key_for_slot(Some(&big), None).unwrap();
        assert!(tail > big);
    }

    #[test]
    fn test_append_steps_by_default_spacing() {
        assert_eq!(key_after_last(None).unwrap().raw(), "0001000.000");
        let next = key_after_last(Some(&key("0003000.000"))).unwrap();
        assert_eq!(next.raw(), "0004000.000");

        let near_top = key("0999500.000");
        let next = key_after_last(Some(&near_top)).unwrap();
        assert!(next > near_top && next < OrderKey::MAX);
    }

    #[test]
    fn test_rebalance_spacing() {
        let keys = rebalance(3).unwrap();
        let raws: Vec<String> = keys.iter().map(|k| k.raw()).collect();
        assert_eq!(raws, vec!["0001000.000", "0002000.000", "0003000.000"]);

        let many = rebalance(5_000).unwrap();
        assert_eq!(many.len(), 5_000);
        assert!(many.windows(2).all(|w| w[0] < w[1]));
        assert!(many.last().unwrap() < &OrderKey::MAX);

        assert!(rebalance(0).unwrap().is_empty());
    }

    #[test]
    fn test_serde_round_trips_raw() {
        let k: OrderKey = serde_json::from_str("\"am\"").unwrap();
        assert_eq!(k.scheme(), KeyScheme::LegacyAlpha);
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"am\"");
        assert!(serde_json::from_str::<OrderKey>("\"??\"").is_err());
    }
}
