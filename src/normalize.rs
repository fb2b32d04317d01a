//! Price formatting and listing filters shared by both crawlers.

use std::collections::BTreeSet;

pub const CURRENCY_SUFFIX: &str = "р.";

/// Render a price given in minor units (kopecks) as `"19,99 р."`.
pub fn normalize_price(raw_minor_units: i64) -> String {
    let sign = if raw_minor_units < 0 { "-" } else { "" };
    let abs = raw_minor_units.unsigned_abs();
    format!("{}{},{:02} {}", sign, abs / 100, abs % 100, CURRENCY_SUFFIX)
}

/// True when none of `excluded_words` occurs in `name`, ignoring case.
pub fn passes_exclusion(name: &str, excluded_words: &BTreeSet<String>) -> bool {
    if excluded_words.is_empty() {
        return true;
    }
    let name = name.to_lowercase();
    !excluded_words
        .iter()
        .any(|word| name.contains(word.to_lowercase().as_str()))
}

/// Parse a formatted price back into whole currency units, truncating the
/// fraction. Spaces (including non-breaking ones) and the currency suffix
/// are ignored.
pub fn parse_price(price: &str) -> Option<i64> {
    let clean: String = price
        .replace(CURRENCY_SUFFIX, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let value: f64 = clean.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}

/// Inclusive price-range predicate. A missing bound does not constrain; an
/// unparsable price never matches.
pub fn gap_check(price: &str, min_price: Option<i64>, max_price: Option<i64>) -> bool {
    let Some(value) = parse_price(price) else {
        return false;
    };
    min_price.map_or(true, |min| min <= value) && max_price.map_or(true, |max| value <= max)
}

/// Flatten repeated `exclude` values, each holding comma- or
/// whitespace-separated words, into one lowercased set.
pub fn parse_exclusions<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|value| {
            value
                .as_ref()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .collect()
}
