//! Page parameters for listing endpoints.

use serde::Serialize;

/// Normalized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: u64,
    /// Items per page, always at least 1
    pub size: u64,
}

impl PageRequest {
    /// Builds a page request from raw query-string values.
    ///
    /// Values are read like a leading integer prefix (`"12abc"` is 12,
    /// `"abc"` is nothing). `page` falls back to 0 unless it is positive.
    /// `size` falls back to `max_size` unless it lies strictly between 0 and
    /// `max_size`, so the default itself is never an explicit choice.
    #[must_use]
    pub fn from_query(page: Option<&str>, size: Option<&str>, max_size: u64) -> Self {
        let max_size = max_size.max(1);
        let page = page
            .and_then(parse_int_prefix)
            .filter(|page| *page > 0)
            .and_then(|page| u64::try_from(page).ok())
            .unwrap_or(0);
        let size = size
            .and_then(parse_int_prefix)
            .and_then(|size| u64::try_from(size).ok())
            .filter(|size| *size > 0 && *size < max_size)
            .unwrap_or(max_size);
        Self { page, size }
    }

    /// Row offset of this page, or `None` once it no longer fits a SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.page
            .checked_mul(self.size)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

/// Leading optionally-signed integer of `raw`, saturating on overflow.
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// `ceil(total_items / size)`
    pub total_pages: u64,
    pub total_items: u64,
    pub page: u64,
    pub size: u64,
}

/// `ceil(total / size)`, with an empty listing having zero pages.
#[must_use]
pub const fn total_pages(total: u64, size: u64) -> u64 {
    if size == 0 { 0 } else { total.div_ceil(size) }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_defaults() {
        let request = PageRequest::from_query(None, None, 15);
        assert_eq!(request, PageRequest { page: 0, size: 15 });
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let request = PageRequest::from_query(Some("-1"), Some("100"), 15);
        assert_eq!(request, PageRequest { page: 0, size: 15 });

        let request = PageRequest::from_query(Some("abc"), Some("0"), 15);
        assert_eq!(request, PageRequest { page: 0, size: 15 });

        let request = PageRequest::from_query(Some("2"), Some("-3"), 15);
        assert_eq!(request, PageRequest { page: 2, size: 15 });
    }

    #[test]
    fn test_size_bound_is_exclusive() {
        assert_eq!(PageRequest::from_query(None, Some("14"), 15).size, 14);
        assert_eq!(PageRequest::from_query(None, Some("15"), 15).size, 15);
        assert_eq!(PageRequest::from_query(None, Some("16"), 15).size, 15);
        assert_eq!(PageRequest::from_query(None, Some("1"), 15).size, 1);
    }

    #[test]
    fn test_numeric_prefix_is_read() {
        let request = PageRequest::from_query(Some("12abc"), Some("5items"), 15);
        assert_eq!(request, PageRequest { page: 12, size: 5 });

        let request = PageRequest::from_query(Some(" 3.7"), Some("+4"), 15);
        assert_eq!(request, PageRequest { page: 3, size: 4 });

        let request = PageRequest::from_query(Some("-"), Some("x10"), 15);
        assert_eq!(request, PageRequest { page: 0, size: 15 });

        let request = PageRequest::from_query(Some("99999999999999999999"), None, 15);
        assert_eq!(request.page, u64::try_from(i64::MAX).unwrap());
    }

    #[test]
    fn test_offset_stays_in_sql_range() {
        assert_eq!(PageRequest { page: 2, size: 15 }.offset(), Some(30));
        assert_eq!(PageRequest { page: 0, size: 15 }.offset(), Some(0));
        assert_eq!(
            PageRequest::from_query(Some("9223372036854775807"), None, 15).offset(),
            None
        );
        assert_eq!(PageRequest { page: u64::MAX, size: 2 }.offset(), None);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 15), 0);
        assert_eq!(total_pages(15, 15), 1);
        assert_eq!(total_pages(16, 15), 2);
        assert_eq!(total_pages(31, 5), 7);
    }
}
