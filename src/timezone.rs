//! The client's local timezone, used to decide which calendar day a transaction falls on.

use std::fmt;

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

use crate::Error;

/// A timezone that maps instants to local date-times.
#[derive(Clone, Copy)]
pub enum LocalZone {
    /// A canonical IANA timezone, e.g. "Pacific/Auckland", with daylight saving rules.
    Named(&'static Tz),
    /// A fixed offset from UTC.
    Fixed(UtcOffset),
}

impl LocalZone {
    /// Look up a timezone by its canonical name.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if `canonical_timezone` is not a known timezone.
    pub fn from_name(canonical_timezone: &str) -> Result<Self, Error> {
        time_tz::timezones::get_by_name(canonical_timezone)
            .map(LocalZone::Named)
            .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
    }

    /// The zone's offset from UTC at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self {
            LocalZone::Named(tz) => tz.get_offset_utc(&instant).to_utc(),
            LocalZone::Fixed(offset) => *offset,
        }
    }

    /// Convert `instant` to the zone's local time.
    ///
    /// Returns `None` if the local time falls outside of the range `time` can
    /// represent, e.g. the last hours of year 9999 east of UTC.
    pub fn to_local(&self, instant: OffsetDateTime) -> Option<OffsetDateTime> {
        instant.checked_to_offset(self.offset_at(instant))
    }

    /// The current date in this zone.
    pub fn today(&self) -> Date {
        let now = OffsetDateTime::now_utc();

        self.to_local(now).unwrap_or(now).date()
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        LocalZone::Fixed(UtcOffset::UTC)
    }
}

impl fmt::Debug for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalZone::Named(tz) => f.debug_tuple("Named").field(&tz.name()).finish(),
            LocalZone::Fixed(offset) => f.debug_tuple("Fixed").field(offset).finish(),
        }
    }
}
