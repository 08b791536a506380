//! Resolves the local timezone used to timestamp imported transactions.

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

/// Get the current UTC offset of the IANA timezone `canonical_timezone`,
/// e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone is not known.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The UTC offset of the system's local timezone, or UTC if it cannot be
/// determined.
pub fn system_local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or_else(|error| {
        tracing::warn!("could not determine the local timezone, using UTC: {error}");
        UtcOffset::UTC
    })
}
