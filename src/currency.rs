//! Locale-tolerant currency and quantity normalization.
//!
//! Overlay text arrives with mixed grouping/decimal separators
//! (`$12,345.67`, `€605.607`, `605 607`, `1'234.50`), optional K/M/B
//! magnitude suffixes, and currency symbols or ISO codes on either side.
//! The decimal separator is taken to be the *last* `.` or `,` with a digit
//! on both sides; everything before it is grouping. One refinement: when
//! that final separator is followed by exactly three digits to the end of
//! the number (`605.607`, `1.234`), it reads as grouping, since currency
//! decimals are two digits in every locale the overlay serves. A judgment
//! call on genuinely ambiguous input, kept consistent across call sites.

/// Currency prefixes recognized when harmonizing a metric set onto one
/// display style. Order matters: longer prefixes first.
const CURRENCY_PREFIXES: [&str; 6] = ["CA$", "A$", "AED", "€", "£", "$"];

/// Whitespace-family characters treated as grouping separators.
const SEPARATOR_SPACES: [char; 6] = [
    ' ', '\u{00A0}', '\u{202F}', '\u{2009}', '\u{2007}', '\u{2060}',
];

/// Parse a free-form amount string into a finite numeric value.
///
/// Returns `None` when no digits survive cleaning (a bare currency symbol,
/// an empty string, a dash placeholder). Never panics on malformed input.
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Accounting-negative notation: (123.45) means -123.45. A plain
    // leading minus is accepted too so canonical output re-parses.
    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = s[1..s.len() - 1].trim();
    } else if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest.trim_start();
    }

    // Strip and record a trailing K/M/B magnitude suffix.
    let mut multiplier = 1f64;
    let trimmed = s.trim_end();
    if let Some(last) = trimmed.chars().last() {
        let m = match last.to_ascii_uppercase() {
            'K' => Some(1e3),
            'M' => Some(1e6),
            'B' => Some(1e9),
            _ => None,
        };
        if let Some(m) = m {
            multiplier = m;
            s = trimmed[..trimmed.len() - last.len_utf8()].trim_end();
        }
    }

    // Keep digits, '.', ',', apostrophes, and whitespace-family separators;
    // drop symbols and codes. Apostrophes and spaces collapse to a single
    // space so they read as grouping below.
    let mut cleaned = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            cleaned.push(ch);
            last_was_space = false;
        } else if ch == '\'' || SEPARATOR_SPACES.contains(&ch) {
            if !last_was_space && !cleaned.is_empty() {
                cleaned.push(' ');
            }
            last_was_space = true;
        }
    }
    let cleaned = cleaned.trim();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // The last '.' or ',' with a digit on both sides is the decimal
    // separator; everything else is grouping and is discarded.
    let bytes: Vec<char> = cleaned.chars().collect();
    let mut decimal_at: Option<usize> = None;
    for (i, ch) in bytes.iter().enumerate() {
        if (*ch == '.' || *ch == ',')
            && i > 0
            && i + 1 < bytes.len()
            && bytes[i - 1].is_ascii_digit()
            && bytes[i + 1].is_ascii_digit()
        {
            decimal_at = Some(i);
        }
    }

    // A trailing group of exactly three digits is grouping, not decimals
    // ("605.607" is six hundred five thousand, not 605.607).
    if let Some(i) = decimal_at {
        let trailing = &bytes[i + 1..];
        if trailing.len() == 3 && trailing.iter().all(|c| c.is_ascii_digit()) {
            decimal_at = None;
        }
    }

    let value = match decimal_at {
        Some(i) => {
            let int_part: String = bytes[..i].iter().filter(|c| c.is_ascii_digit()).collect();
            let frac_part: String = bytes[i + 1..].iter().filter(|c| c.is_ascii_digit()).collect();
            format!("{}.{}", int_part, frac_part).parse::<f64>().ok()?
        }
        None => {
            let int_part: String = bytes.iter().filter(|c| c.is_ascii_digit()).collect();
            int_part.parse::<f64>().ok()?
        }
    };

    let value = value * multiplier;
    Some(if negative { -value } else { value })
}

/// Normalize to a whole count, for revenue aggregates and unit counts.
pub fn normalize_count(raw: &str) -> Option<i64> {
    normalize_amount(raw).map(|v| v.round() as i64)
}

/// Normalize to two-decimal precision, for per-unit currency values.
pub fn normalize_money(raw: &str) -> Option<f64> {
    normalize_amount(raw).map(|v| (v * 100.0).round() / 100.0)
}

/// Detect the dominant currency prefix across a set of display texts.
/// Falls back to `$` when none of the texts carry a recognized prefix.
pub fn detect_symbol<'a, I>(texts: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    for text in texts {
        for prefix in CURRENCY_PREFIXES {
            if text.contains(prefix) {
                return prefix;
            }
        }
    }
    "$"
}

/// Render a normalized per-unit value in a given currency style.
pub fn format_money(symbol: &str, value: f64) -> String {
    format!("{symbol}{value:.2}")
}
