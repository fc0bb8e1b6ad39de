//! Human-readable configuration values ("30s", "15m", "1MB")

use std::time::Duration;

/// Parse a size string (e.g., "10MB", "512KB", "1024")
///
/// # Supported formats
/// - `"1GB"` - gigabytes
/// - `"10MB"` - megabytes
/// - `"512KB"` - kilobytes
/// - `"1024B"` or `"1024"` - bytes
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim().to_uppercase();
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    num_str.trim().parse::<usize>().ok()?.checked_mul(multiplier)
}

/// Parse a duration string (e.g., "30s", "15m", "1h", "100ms")
///
/// A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    let (num_str, millis) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60 * 1000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60 * 1000)
    } else {
        (s.as_str(), 1000)
    };

    let n = num_str.trim().parse::<u64>().ok()?;
    n.checked_mul(millis).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1KB"), Some(1024));
        assert_eq!(parse_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("512B"), Some(512));
        assert_eq!(parse_size("100"), Some(100));
        assert_eq!(parse_size("  64kb  "), Some(64 * 1024));
        assert_eq!(parse_size("lots"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms"), Some(Duration::from_millis(100)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }
}
