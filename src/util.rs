// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" cell handling (numbers written by
// hand, dates in several layouts, spreadsheet serials, header spelling) so
// the loader can assume clean, typed values.
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a hand-written amount into `f64`.
///
/// - Trims and drops all whitespace (including non-breaking spaces used as
///   thousands separators) and currency symbols.
/// - Rejects values that contain alphabetic characters.
/// - With `decimal_comma`, `,` is the decimal mark (`1.234,50`). A `.` is
///   only read as a thousands separator when it splits the integer part into
///   groups of three digits; otherwise it stays a decimal point (`12.50`).
/// - Without it, commas are thousands separators.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_number(s: &str, decimal_comma: bool) -> Option<f64> {
    let s: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(*c, '€' | '$' | '£'))
        .collect();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let s = if decimal_comma {
        comma_decimal(&s)?
    } else {
        s.replace(',', "")
    };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rewrite a decimal-comma amount into the form `f64::from_str` expects.
fn comma_decimal(s: &str) -> Option<String> {
    let (int_part, frac) = match s.split_once(',') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let int_part = if !int_part.contains('.') {
        int_part.to_string()
    } else if grouped_by_thousands(int_part) {
        int_part.replace('.', "")
    } else if frac.is_none() {
        // `12.50` in a decimal-comma file is still a point decimal
        return Some(s.to_string());
    } else {
        return None;
    };
    Some(match frac {
        Some(f) => format!("{int_part}.{f}"),
        None => int_part,
    })
}

/// `1.234` or `12.345.678`: a lead of one to three digits, then groups of
/// exactly three.
fn grouped_by_thousands(int_part: &str) -> bool {
    let digits = |g: &str| g.chars().all(|c| c.is_ascii_digit());
    let mut groups = int_part.split('.');
    let lead = groups
        .next()
        .unwrap_or("")
        .trim_start_matches(['-', '+']);
    (1..=3).contains(&lead.len())
        && digits(lead)
        && groups.all(|g| g.len() == 3 && digits(g))
}

/// Parse a date cell into a calendar date.
///
/// `extra_formats` (chrono `strftime` patterns) are tried first, then the
/// built-in day-first layouts. A time part is accepted and dropped.
pub fn parse_date(s: &str, extra_formats: &[String]) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in extra_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Convert an untyped Excel serial (1900 date system) to a calendar date.
///
/// The fractional part is the time of day and is discarded. Serial 60 is
/// the 1900-02-29 that Excel inherited from Lotus and has no date; serials
/// below it count from 1899-12-31.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let epoch = match days {
        60 => return None,
        0..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_days(Days::new(days))
}

/// Fold a column header to a comparable key: lowercase, no accents, straight
/// apostrophes, single spaces instead of `_`/`-`/runs of whitespace.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' | 'á' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            '’' | '‘' | '`' | '´' => '\'',
            '_' | '-' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
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
    let mut res = group_digits(int_part, &Locale::en);
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

/// Insert the locale's thousands separator into a run of digits. Works on
/// the text so amounts beyond `i64` keep their value.
fn group_digits(digits: &str, locale: &Locale) -> String {
    let sep = locale.separator();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * sep.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(ch);
    }
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `1,204 interventions`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn numbers_with_separators_and_symbols() {
        assert_eq!(parse_number(" 1,234.50 ", false), Some(1234.5));
        assert_eq!(parse_number("150 €", false), Some(150.0));
        assert_eq!(parse_number("1 234,5", true), Some(1234.5));
        assert_eq!(parse_number("1.234,5", true), Some(1234.5));
        assert_eq!(parse_number("2,5", true), Some(2.5));
        assert_eq!(parse_number("-3", false), Some(-3.0));
    }

    #[test]
    fn decimal_comma_keeps_point_decimals() {
        assert_eq!(parse_number("12.50", true), Some(12.5));
        assert_eq!(parse_number("1.5", true), Some(1.5));
        assert_eq!(parse_number("0.75 €", true), Some(0.75));
        assert_eq!(parse_number("1.234", true), Some(1234.0));
        assert_eq!(parse_number("12.345.678,9", true), Some(12345678.9));
        assert_eq!(parse_number("1 250,75", true), Some(1250.75));
        assert_eq!(parse_number("1.25,5", true), None);
        assert_eq!(parse_number("1,2,3", true), None);
    }

    #[test]
    fn numbers_rejected() {
        assert_eq!(parse_number("", false), None);
        assert_eq!(parse_number("   ", false), None);
        assert_eq!(parse_number("abc", false), None);
        assert_eq!(parse_number("NaN", false), None);
        assert_eq!(parse_number("1.2.3", false), None);
    }

    #[test]
    fn dates_in_common_layouts() {
        let none: Vec<String> = Vec::new();
        assert_eq!(parse_date("2024-01-05", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05-01-2024", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05.01.2024", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 14:30:00", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T14:30", &none), Some(ymd(2024, 1, 5)));
        assert_eq!(
            parse_date("2024-01-05T23:30:00+01:00", &none),
            Some(ymd(2024, 1, 5))
        );
    }

    #[test]
    fn dates_rejected() {
        let none: Vec<String> = Vec::new();
        assert_eq!(parse_date("not-a-date", &none), None);
        assert_eq!(parse_date("", &none), None);
        assert_eq!(parse_date("2024-13-01", &none), None);
        assert_eq!(parse_date("31/02/2024", &none), None);
    }

    #[test]
    fn configured_formats_come_first() {
        // Month-first would be read day-first without the override.
        let us = vec!["%m/%d/%Y".to_string()];
        assert_eq!(parse_date("01/05/2024", &us), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("01/05/2024", &[]), Some(ymd(2024, 5, 1)));
        let with_time = vec!["%d %b %Y %H:%M".to_string()];
        assert_eq!(parse_date("05 Jan 2024 08:00", &with_time), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(45292.0), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(45292.75), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(-1.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn excel_serials_before_march_1900() {
        assert_eq!(excel_serial_to_date(1.0), Some(ymd(1900, 1, 1)));
        assert_eq!(excel_serial_to_date(59.0), Some(ymd(1900, 2, 28)));
        assert_eq!(excel_serial_to_date(60.0), None);
        assert_eq!(excel_serial_to_date(61.0), Some(ymd(1900, 3, 1)));
    }

    #[test]
    fn headers_fold_to_comparable_keys() {
        assert_eq!(normalize_header("Type d’intervention"), "type d'intervention");
        assert_eq!(normalize_header("\u{feff}Date"), "date");
        assert_eq!(normalize_header(" ÉQUIPE "), "equipe");
        assert_eq!(normalize_header("intervention_type"), "intervention type");
        assert_eq!(normalize_header("Coût"), "cout");
    }

    #[test]
    fn averages_and_formatting() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2.0, 1.0]), 1.5);
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(7.0, 0), "7");
        assert_eq!(format_int(9855usize), "9,855");
    }

    #[test]
    fn huge_amounts_keep_their_digits() {
        assert_eq!(format_number(1e19, 0), "10,000,000,000,000,000,000");
        assert_eq!(format_number(-1e19, 2), "-10,000,000,000,000,000,000.00");
        assert_eq!(format_number(123.0, 0), "123");
        assert_eq!(format_number(1000.0, 0), "1,000");
    }
}
