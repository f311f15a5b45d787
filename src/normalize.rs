use chrono::{Datelike, NaiveDate};

/// Date shapes we accept, tried strictly in this order. Day-first beats
/// month-first for ambiguous strings like "01-02-2024"; that priority is
/// part of the contract, not locale guessing.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%m-%d-%Y", "%m/%d/%Y",
    "%y-%m-%d", "%y/%m/%d", "%d-%m-%y", "%d/%m/%y", "%m-%d-%y", "%m/%d/%y",
];

/// Season of a two-digit pair: years >= 50 belong to the 1900s.
const CENTURY_PIVOT: u32 = 50;

/// Turns a free-form season string into the 4-digit starting year.
///
/// Accepted: "2022/2023", "2021/22", "22/23" (century-window heuristic),
/// bare "2024". Any other shape is `None`.
pub fn normalize_season(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        return Some(raw.to_string());
    }

    // "YYYY/YY"-style pairs: digits, a non-digit separator run, digits.
    let first: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &raw[first.len()..];
    if rest.is_empty() {
        return None;
    }
    let second: String = rest.chars().skip_while(|c| !c.is_ascii_digit()).collect();
    if second.is_empty() || !second.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    match (first.len(), second.len()) {
        (4, 2..=4) => Some(first),
        (2, 2) => {
            let yy: u32 = first.parse().ok()?;
            let century = if yy >= CENTURY_PIVOT { 1900 } else { 2000 };
            Some((century + yy).to_string())
        }
        _ => None,
    }
}

/// Parses a date in any supported shape and reformats it as ISO `YYYY-MM-DD`.
/// First matching format wins; unparseable input is `None`.
pub fn standardize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

/// Season a date falls into: July onward belongs to that calendar year's
/// season, January through June to the previous one.
pub fn deduce_season_from_date(raw: &str) -> Option<String> {
    let iso = standardize_date(raw)?;
    let date = NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()?;
    let start_year = if date.month() <= 6 {
        date.year() - 1
    } else {
        date.year()
    };
    Some(start_year.to_string())
}
