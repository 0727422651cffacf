// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// analysis modules can assume clean, typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (so `NaN`/`inf` never
///   sneak in as prices).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Parse a non-negative integer count. Integral reals such as `3.0` are
/// accepted since spreadsheet exports often write counts that way.
pub fn parse_count_safe(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    let v = parse_f64_safe(s)?;
    if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
        Some(v as u64)
    } else {
        None
    }
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
// `%.f` also matches an absent fractional part.
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Parse an ISO-style date, discarding any time component.
///
/// Timestamps carrying a UTC offset (`Z`, `+02:00`) keep the calendar date
/// as written, not the date after conversion to UTC.
pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .or_else(|| {
                    OFFSET_FORMATS
                        .iter()
                        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
                })
                .map(|dt| dt.date_naive())
        })
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Sample standard deviation (n - 1 denominator). A single observation has
/// no spread, so it yields 0 rather than NaN.
pub fn sample_std(v: &[f64]) -> f64 {
    if v.len() < 2 {
        return 0.0;
    }
    let mean = average(v);
    let ss: f64 = v.iter().map(|x| (x - mean) * (x - mean)).sum();
    (ss / (v.len() - 1) as f64).sqrt()
}

/// Quantile with linear interpolation between closest ranks, i.e. the
/// value at position `q * (n - 1)` of the sorted data.
pub fn quantile(v: &[f64], q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson correlation; `NaN` when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    let mean_x = average(x);
    let mean_y = average(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// Mean of successive percentage changes, in percent.
///
/// A step whose previous value is zero has no defined change and is skipped.
/// Returns `None` when no step qualifies.
pub fn mean_pct_change(series: &[f64]) -> Option<f64> {
    let changes: Vec<f64> = series
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if changes.is_empty() {
        None
    } else {
        Some(average(&changes) * 100.0)
    }
}

/// Exact integer total of unit counts; `None` once it no longer fits a `u64`.
pub fn sum_units<I>(units: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    units.into_iter().try_fold(0u64, |acc, q| acc.checked_add(q))
}

pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    if !n.is_finite() {
        return "n/a".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion. Magnitudes
    // past `u64` keep their plain digits.
    let mut res = match int_part.parse::<u64>() {
        Ok(int_val) => int_val.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_money(n: f64) -> String {
    format!("R$ {}", format_number(n, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prices_with_separators() {
        assert_eq!(parse_f64_safe(" 1,234.50 "), Some(1234.5));
        assert_eq!(parse_f64_safe("abc"), None);
        assert_eq!(parse_f64_safe("NaN"), None);
        assert_eq!(parse_f64_safe(""), None);
    }

    #[test]
    fn parses_counts() {
        assert_eq!(parse_count_safe("3"), Some(3));
        assert_eq!(parse_count_safe("3.0"), Some(3));
        assert_eq!(parse_count_safe("2.5"), None);
        assert_eq!(parse_count_safe("-1"), None);
    }

    #[test]
    fn parses_date_forms() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_date_safe("2024-01-02"), Some(d));
        assert_eq!(parse_date_safe("2024/01/02"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02 13:45:00"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02T13:45:00"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02 13:45:00.123"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02T13:45:00.5"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02T13:45:00Z"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02T13:45:00+02:00"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02T13:45:00.250-03:00"), Some(d));
        assert_eq!(parse_date_safe("2024-01-02 23:30:00+0100"), Some(d));
        assert_eq!(parse_date_safe("02.01.2024"), None);
        assert_eq!(parse_date_safe("2024-01-02T25:00:00Z"), None);
    }

    #[test]
    fn std_of_single_value_is_zero() {
        assert_eq!(sample_std(&[5.0]), 0.0);
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.75), Some(3.25));
        assert_eq!(quantile(&[10.0, 10.0, 10.0, 10.0, 1000.0], 0.75), Some(10.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn pearson_handles_constant_series() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pct_change_skips_zero_base() {
        // 0 -> 100 is undefined, 100 -> 150 is +50%, 150 -> 75 is -50%.
        assert_eq!(mean_pct_change(&[0.0, 100.0, 150.0, 75.0]), Some(0.0));
        assert_eq!(mean_pct_change(&[0.0, 0.0, 5.0]), None);
        assert_eq!(mean_pct_change(&[10.0]), None);
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(f64::NAN, 2), "n/a");
        assert_eq!(format_money(1500.0), "R$ 1,500.00");
        assert_eq!(format_int(9855u64), "9,855");
    }

    #[test]
    fn formats_numbers_beyond_u64() {
        assert_eq!(format_number(1e20, 2), "100000000000000000000.00");
        assert_eq!(format_number(-1e20, 0), "-100000000000000000000");
        assert_eq!(format_number(u64::MAX as f64 / 2.0, 0), "9,223,372,036,854,775,808");
    }

    #[test]
    fn unit_sums_stay_exact_or_fail() {
        assert_eq!(sum_units([1, 2, 3]), Some(6));
        assert_eq!(sum_units(std::iter::empty()), Some(0));
        assert_eq!(sum_units([u64::MAX]), Some(u64::MAX));
        assert_eq!(sum_units([(1 << 53) + 1, 0]), Some((1 << 53) + 1));
        assert_eq!(sum_units([u64::MAX, 1]), None);
    }
}
