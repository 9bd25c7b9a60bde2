use once_cell::sync::Lazy;
use regex_lite::Regex;

static SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(B|KB|MB|GB|TB)?$").unwrap());

/// Parse a size such as `1.5GB` or `700MB` into bytes, with 1024-based units.
///
/// A bare number is a count of gigabytes.
pub fn parse_size(value: &str) -> Option<u64> {
    let caps = SIZE.captures(value.trim())?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let exponent = match caps.get(2).map(|m| m.as_str()).unwrap_or("GB") {
        "B" => 0,
        "KB" => 1,
        "MB" => 2,
        "GB" => 3,
        _ => 4,
    };
    Some((amount * 1024f64.powi(exponent)).round() as u64)
}
