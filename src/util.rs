// Utility helpers for parsing and formatting.
//
// This module centralizes all the "dirty" CSV/number handling so the rest of
// the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (separators, spaces).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - `decimal` is the decimal mark (`b'.'` or `b','`); the other one is read
///   as a thousands separator, but only in well-formed groups of three
///   (`1,234.5` with `b'.'`, `1.234,5` with `b','`).
/// - Scientific notation (`1.5E+03`) is accepted.
/// - Returns `None` for `NaN`, infinities, badly grouped values and anything
///   else that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>, decimal: u8) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let (mark, group) = if decimal == b',' { (',', '.') } else { ('.', ',') };
    let (int_part, frac_part) = match s.split_once(mark) {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if frac_part.is_some_and(|f| f.contains(group)) {
        return None;
    }
    let int_part = if int_part.contains(group) {
        ungroup(int_part, group)?
    } else {
        int_part.to_string()
    };
    let normalized = match frac_part {
        Some(f) => format!("{}.{}", int_part, f),
        None => int_part,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// `-1,234,567` -> `-1234567`; `None` unless the groups after the first are
// exactly three digits.
fn ungroup(int_part: &str, group: char) -> Option<String> {
    let unsigned = int_part.trim_start_matches(|c: char| c == '+' || c == '-');
    let sign = &int_part[..int_part.len() - unsigned.len()];
    let mut groups = unsigned.split(group);
    let head = groups.next()?;
    let all_digits = |g: &str| g.bytes().all(|b| b.is_ascii_digit());
    if !(1..=3).contains(&head.len()) || !all_digits(head) {
        return None;
    }
    let mut out = format!("{}{}", sign, head);
    for g in groups {
        if g.len() != 3 || !all_digits(g) {
            return None;
        }
        out.push_str(g);
    }
    Some(out)
}

/// Coerce a year cell to an integer. `"2020"` and `"2020.0"` both give 2020;
/// anything else (fractions, text, blanks) is treated as missing.
pub fn parse_period(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Canonical form for names and location values: BOM stripped, trimmed,
/// uppercased.
pub fn normalize_key(s: &str) -> String {
    s.trim_start_matches('\u{feff}').trim().to_uppercase()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
