//! # Reporting Module
//!
//! Pure boundary math for the read side: calendar-day windows and
//! pagination clamping. The queries themselves live in warung-db; this
//! module only decides *which* UTC instants and offsets they use.
//!
//! ## Time Zones
//! Sales are stored as UTC instants. Reports are asked for in calendar days
//! of the store's local zone, so a day is the half-open window
//! `[startOfDayLocal, endOfDayLocal)` converted to UTC. The zone is fixed
//! to WIB (UTC+7); `day_bounds_utc` takes it as an explicit parameter so a
//! multi-zone deployment only has to thread a different offset through.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Report Zone
// =============================================================================

/// Fixed reporting zone offset in hours east of UTC (WIB).
pub const REPORT_UTC_OFFSET_HOURS: i32 = 7;

/// Returns the fixed reporting zone.
pub fn report_zone() -> FixedOffset {
    // 7h east is always within FixedOffset's +/-24h range
    FixedOffset::east_opt(REPORT_UTC_OFFSET_HOURS * 3_600).expect("WIB offset is in range")
}

/// Converts a calendar date in the given zone to half-open UTC bounds
/// `[start, end)` covering that local day.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use warung_core::reporting::{day_bounds_utc, report_zone};
///
/// let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
/// let (start, end) = day_bounds_utc(date, report_zone());
/// // WIB midnight is 17:00 UTC the previous evening
/// assert_eq!(start.to_rfc3339(), "2026-01-14T17:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2026-01-15T17:00:00+00:00");
/// ```
pub fn day_bounds_utc(date: NaiveDate, zone: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_local = date.and_time(NaiveTime::MIN);
    let offset = Duration::seconds(zone.local_minus_utc() as i64);

    let start = Utc.from_utc_datetime(&(start_local - offset));
    let end = start + Duration::days(1);
    (start, end)
}

// =============================================================================
// Pagination
// =============================================================================

/// Largest page size a history query will serve.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size used when the caller passes something non-positive.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// A page request clamped to safe bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number, >= 1.
    pub page: i64,
    /// Items per page, in `[1, MAX_PAGE_SIZE]`.
    pub page_size: i64,
}

impl Page {
    /// Clamps raw caller-supplied paging values.
    ///
    /// `page < 1` becomes 1; `page_size < 1` becomes the default;
    /// `page_size > MAX_PAGE_SIZE` is capped.
    pub fn clamp(page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        Page { page, page_size }
    }

    /// Row offset for OFFSET/LIMIT queries.
    #[inline]
    pub const fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// Number of pages needed for `total` rows (0 when there are none).
    #[inline]
    pub const fn total_pages(&self, total: i64) -> i64 {
        (total + self.page_size - 1) / self.page_size
    }
}

// =============================================================================
// Report Types
// =============================================================================

/// Aggregate revenue for one calendar day. A day with no sales reports
/// zeros, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_transactions: i64,
    pub total_revenue_cents: i64,
}

/// One page of sale history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage<T> {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub items: Vec<T>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_wib() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (start, end) = day_bounds_utc(date, report_zone());

        assert_eq!(start.to_rfc3339(), "2026-01-14T17:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-01-15T17:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_day_bounds_utc_zone() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let zone = FixedOffset::east_opt(0).unwrap();
        let (start, end) = day_bounds_utc(date, zone);

        assert_eq!(start.to_rfc3339(), "2026-06-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-06-02T00:00:00+00:00");
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(Page::clamp(0, 10), Page { page: 1, page_size: 10 });
        assert_eq!(Page::clamp(-5, 10), Page { page: 1, page_size: 10 });
        assert_eq!(Page::clamp(2, 0), Page { page: 2, page_size: 10 });
        assert_eq!(Page::clamp(2, 500), Page { page: 2, page_size: 100 });
        assert_eq!(Page::clamp(3, 25), Page { page: 3, page_size: 25 });
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::clamp(1, 10).offset(), 0);
        assert_eq!(Page::clamp(3, 10).offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let page = Page::clamp(1, 10);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(11), 2);
        assert_eq!(page.total_pages(95), 10);
    }
}
