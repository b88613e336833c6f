//! Display helpers for transactions: calendar days, day labels, times and status badges.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::timezone::LocalZone;

use super::core::{Direction, Timestamp, Transaction};

const TIME_FORMAT: &[BorrowedFormatItem] = format_description!("[hour]:[minute]");

/// Shown in place of a time when a transaction has no timestamp.
pub const MISSING_TIME: &str = "—";

/// Maps timestamps to local calendar days relative to "today".
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    zone: LocalZone,
    today: Date,
}

impl Calendar {
    /// A calendar for `zone` where the current local date is `today`.
    pub fn new(zone: LocalZone, today: Date) -> Self {
        Self { zone, today }
    }

    /// A calendar for `zone` using the current date.
    pub fn now(zone: LocalZone) -> Self {
        Self::new(zone, zone.today())
    }

    /// The current local date.
    pub fn today(&self) -> Date {
        self.today
    }

    /// The local calendar date of `timestamp`.
    ///
    /// Returns `None` if the timestamp, or its local time, cannot be represented as a date.
    pub fn local_date(&self, timestamp: &Timestamp) -> Option<Date> {
        timestamp
            .to_datetime()
            .and_then(|instant| self.zone.to_local(instant))
            .map(|local| local.date())
    }

    /// The human label for a day, e.g. "today", "tuesday" or "march 3, 2023".
    pub fn day_label(&self, date: Date) -> String {
        let days_ago = (self.today - date).whole_days();

        match days_ago {
            0 => "today".to_owned(),
            1 => "yesterday".to_owned(),
            2..=6 => date.weekday().to_string().to_lowercase(),
            _ if date.year() == self.today.year() => {
                format!("{} {}", date.month(), date.day()).to_lowercase()
            }
            _ => format!("{} {}, {}", date.month(), date.day(), date.year()).to_lowercase(),
        }
    }

    /// The local time of day as 24-hour "HH:MM".
    pub fn format_time(&self, timestamp: Option<&Timestamp>) -> String {
        timestamp
            .and_then(|timestamp| timestamp.to_datetime())
            .and_then(|instant| self.zone.to_local(instant))
            .and_then(|local| local.format(TIME_FORMAT).ok())
            .unwrap_or_else(|| MISSING_TIME.to_owned())
    }
}

/// The key used to bucket transactions by day, an ISO 8601 date such as "2024-01-05".
pub fn day_key(date: Date) -> String {
    date.to_string()
}

/// How a direction is presented next to an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionDisplay {
    /// "+" for incoming, "-" for outgoing.
    pub symbol: &'static str,
    /// "in" or "out".
    pub label: &'static str,
}

impl From<Direction> for DirectionDisplay {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Incoming => Self {
                symbol: "+",
                label: "in",
            },
            Direction::Outgoing => Self {
                symbol: "-",
                label: "out",
            },
        }
    }
}

/// How a categorised field came to have its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    /// The field has no value.
    None,
    /// The user set the value.
    Manual,
    /// A rule or detector set the value.
    Auto,
}

impl FieldStatus {
    /// The badge text for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldStatus::None => "none",
            FieldStatus::Manual => "manual",
            FieldStatus::Auto => "auto",
        }
    }
}

/// Whether the transaction's category is missing, manual or automatic.
pub fn categorization_status(transaction: &Transaction) -> FieldStatus {
    field_status(
        transaction.category_id.is_some(),
        transaction.category_manually_set,
    )
}

/// Whether the transaction's merchant is missing, manual or automatic.
pub fn merchant_status(transaction: &Transaction) -> FieldStatus {
    field_status(
        transaction.merchant.is_some(),
        transaction.merchant_manually_set,
    )
}

fn field_status(is_set: bool, manually_set: bool) -> FieldStatus {
    match (is_set, manually_set) {
        (false, _) => FieldStatus::None,
        (true, true) => FieldStatus::Manual,
        (true, false) => FieldStatus::Auto,
    }
}

#[cfg(test)]
mod tests {
    use time::{
        UtcOffset,
        macros::{date, datetime},
    };

    use crate::{
        timezone::LocalZone,
        transaction::{Direction, Timestamp, test_utils::transaction},
    };

    use super::{
        Calendar, FieldStatus, MISSING_TIME, categorization_status, day_key, merchant_status,
    };

    fn calendar() -> Calendar {
        // 2024-01-10 is a Wednesday.
        Calendar::new(LocalZone::default(), date!(2024 - 01 - 10))
    }

    #[test]
    fn labels_today_and_yesterday() {
        let calendar = calendar();

        assert_eq!(calendar.day_label(date!(2024 - 01 - 10)), "today");
        assert_eq!(calendar.day_label(date!(2024 - 01 - 09)), "yesterday");
    }

    #[test]
    fn labels_last_week_with_weekday_names() {
        let calendar = calendar();

        assert_eq!(calendar.day_label(date!(2024 - 01 - 08)), "monday");
        assert_eq!(calendar.day_label(date!(2024 - 01 - 04)), "thursday");
    }

    #[test]
    fn labels_older_days_with_month_and_day() {
        let calendar = calendar();

        assert_eq!(calendar.day_label(date!(2024 - 01 - 03)), "january 3");
        assert_eq!(calendar.day_label(date!(2023 - 12 - 25)), "december 25, 2023");
    }

    #[test]
    fn labels_future_days_with_month_and_day() {
        let calendar = calendar();

        assert_eq!(calendar.day_label(date!(2024 - 01 - 11)), "january 11");
    }

    #[test]
    fn local_date_uses_zone_offset() {
        let calendar = Calendar::new(
            LocalZone::Fixed(UtcOffset::from_hms(13, 0, 0).unwrap()),
            date!(2024 - 01 - 10),
        );
        let timestamp = Timestamp::from(datetime!(2024-01-05 12:00 UTC));

        assert_eq!(calendar.local_date(&timestamp), Some(date!(2024 - 01 - 06)));
    }

    #[test]
    fn formats_time_of_day() {
        let calendar = calendar();
        let timestamp = Timestamp::from(datetime!(2024-01-05 07:04 UTC));

        assert_eq!(calendar.format_time(Some(&timestamp)), "07:04");
        assert_eq!(calendar.format_time(None), "—");
    }

    #[test]
    fn local_time_out_of_range_is_missing() {
        let calendar = Calendar::new(
            LocalZone::from_name("Pacific/Auckland").unwrap(),
            date!(2024 - 01 - 10),
        );
        let timestamp = Timestamp::from(datetime!(9999-12-31 23:30 UTC));

        assert_eq!(calendar.local_date(&timestamp), None);
        assert_eq!(calendar.format_time(Some(&timestamp)), MISSING_TIME);
    }

    #[test]
    fn day_key_is_iso_date() {
        assert_eq!(day_key(date!(2024 - 01 - 05)), "2024-01-05");
    }

    #[test]
    fn status_reflects_manual_flags() {
        let mut transaction = transaction(1, datetime!(2024-01-05 12:00 UTC), Direction::Outgoing, 5);
        assert_eq!(categorization_status(&transaction), FieldStatus::None);

        transaction.category_id = Some(3);
        assert_eq!(categorization_status(&transaction), FieldStatus::Auto);

        transaction.merchant = Some("Bakery".to_owned());
        transaction.merchant_manually_set = true;
        assert_eq!(merchant_status(&transaction), FieldStatus::Manual);
    }
}
