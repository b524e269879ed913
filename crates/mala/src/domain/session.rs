//! Per-day japa session records and cycle arithmetic.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Number of taps that make up one completed cycle (jap).
pub const TAPS_PER_CYCLE: u32 = 108;

/// Prefix of the legacy per-day tap count key kept for backward
/// compatibility with earlier releases that wrote it directly.
pub const LEGACY_DAY_KEY_PREFIX: &str = "japaCount_";

const DATE_KEY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Returns the number of completed cycles for a tap total.
pub fn completed_cycles(taps: u32) -> u32 {
    taps / TAPS_PER_CYCLE
}

/// Returns the tap progress within the current, incomplete cycle.
pub fn cycle_progress(taps: u32) -> u32 {
    taps % TAPS_PER_CYCLE
}

/// Formats a calendar date as its `YYYY-MM-DD` storage key.
pub fn date_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parses a `YYYY-MM-DD` storage key back into a calendar date.
///
/// # Errors
/// Returns an error when the key is not a valid ISO calendar date.
pub fn parse_date_key(key: &str) -> Result<Date, String> {
    Date::parse(key, DATE_KEY_FORMAT).map_err(|err| format!("Invalid date key {key:?}: {err}"))
}

/// Returns the legacy same-day fallback key for a date.
pub fn legacy_day_key(date: Date) -> String {
    format!("{LEGACY_DAY_KEY_PREFIX}{}", date_key(date))
}

/// Returns today's date in the device's local timezone.
///
/// Falls back to UTC when the local offset cannot be determined.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// One persisted per-day tap/cycle record for the owning user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionRecord {
    pub date: Date,
    pub taps: u32,
    pub japs: u32,
}

impl SessionRecord {
    /// Builds a record for a tap total, deriving the completed-cycle count.
    ///
    /// Both fields are always written together so that
    /// `japs == taps / TAPS_PER_CYCLE` holds for every stored record.
    pub fn for_taps(date: Date, taps: u32) -> Self {
        Self {
            date,
            taps,
            japs: completed_cycles(taps),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn completed_cycles_floors_partial_cycles() {
        // Arrange & Act & Assert
        assert_eq!(completed_cycles(0), 0);
        assert_eq!(completed_cycles(107), 0);
        assert_eq!(completed_cycles(108), 1);
        assert_eq!(completed_cycles(216), 2);
    }

    #[test]
    fn cycle_progress_counts_taps_within_current_cycle() {
        // Arrange & Act & Assert
        assert_eq!(cycle_progress(0), 0);
        assert_eq!(cycle_progress(107), 107);
        assert_eq!(cycle_progress(108), 0);
        assert_eq!(cycle_progress(250), 34);
    }

    #[test]
    fn date_key_formats_iso_calendar_date() {
        // Arrange
        let date = date!(2024 - 03 - 01);

        // Act
        let key = date_key(date);

        // Assert
        assert_eq!(key, "2024-03-01");
    }

    #[test]
    fn parse_date_key_round_trips_date_key() {
        // Arrange
        let date = date!(2024 - 12 - 31);

        // Act
        let parsed = parse_date_key(&date_key(date)).expect("failed to parse date key");

        // Assert
        assert_eq!(parsed, date);
    }

    #[test]
    fn parse_date_key_rejects_malformed_input() {
        // Arrange & Act
        let result = parse_date_key("Mon Mar 01 2024");

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn legacy_day_key_uses_japa_count_prefix() {
        // Arrange & Act
        let key = legacy_day_key(date!(2024 - 03 - 01));

        // Assert
        assert_eq!(key, "japaCount_2024-03-01");
    }

    #[test]
    fn for_taps_derives_completed_cycles() {
        // Arrange & Act
        let record = SessionRecord::for_taps(date!(2024 - 03 - 01), 216);

        // Assert
        assert_eq!(record.taps, 216);
        assert_eq!(record.japs, 2);
    }
}
