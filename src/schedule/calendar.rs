//! Calendar arithmetic for Sunday-first weeks.
//!
//! Everything here works on plain calendar dates (`time::Date`). Timestamps coming
//! from the data layer are reduced to the date they were written with; they are
//! never shifted to UTC first, so a record stamped `2025-10-06T00:00:00-03:00`
//! belongs to the 6th.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

pub const DAYS_PER_WEEK: usize = 7;

/// The week holding a date cannot be represented in full by `time::Date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the week containing {0} falls outside the supported calendar")]
pub struct WeekOutOfRange(pub Date);

/// A Sunday-first week whose seven days all exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Week {
    days: [Date; DAYS_PER_WEEK],
}

impl Week {
    pub fn containing(date: Date) -> Result<Self, WeekOutOfRange> {
        let back = i64::from(date.weekday().number_days_from_sunday());
        let start = date
            .checked_sub(Duration::days(back))
            .ok_or(WeekOutOfRange(date))?;
        let mut days = [start; DAYS_PER_WEEK];
        for (offset, day) in days.iter_mut().enumerate().skip(1) {
            *day = start
                .checked_add(Duration::days(offset as i64))
                .ok_or(WeekOutOfRange(date))?;
        }
        Ok(Self { days })
    }

    pub fn start(&self) -> Date {
        self.days[0]
    }

    pub fn end(&self) -> Date {
        self.days[DAYS_PER_WEEK - 1]
    }

    /// Sunday through Saturday.
    pub fn dates(&self) -> [Date; DAYS_PER_WEEK] {
        self.days
    }
}

/// Sunday on or before `date`.
pub fn week_start(date: Date) -> Result<Date, WeekOutOfRange> {
    Week::containing(date).map(|w| w.start())
}

/// Canonical zero-padded `YYYY-MM-DD` key.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Strict `YYYY-MM-DD`, as used in paths and request bodies.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Calendar date of a record as the data layer sent it.
///
/// Accepts a bare `YYYY-MM-DD`, an RFC 3339 timestamp, or a timestamp without
/// offset (`T` or space separated, with or without fractional seconds), as
/// Postgres prints them. Returns `None` for anything else.
pub fn parse_record_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if let Some(date) = parse_date(raw) {
        return Some(date);
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts.date());
    }
    let local = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    local
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(raw, *fmt).ok())
        .map(|ts| ts.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::Weekday;

    fn start_of(date: Date) -> Date {
        week_start(date).unwrap()
    }

    #[test]
    fn wednesday_normalizes_to_preceding_sunday() {
        let week = Week::containing(date!(2025 - 10 - 08)).unwrap();
        assert_eq!(week.start(), date!(2025 - 10 - 05));
        assert_eq!(week.end(), date!(2025 - 10 - 11));
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        assert_eq!(start_of(date!(2025 - 10 - 05)), date!(2025 - 10 - 05));
        // Saturday stays in the week that began six days earlier.
        assert_eq!(start_of(date!(2025 - 10 - 11)), date!(2025 - 10 - 05));
    }

    #[test]
    fn week_crosses_month_and_year_boundaries() {
        let days = Week::containing(date!(2026 - 01 - 01)).unwrap().dates();
        assert_eq!(days[0], date!(2025 - 12 - 28));
        assert_eq!(days[6], date!(2026 - 01 - 03));
        assert_eq!(days[0].weekday(), Weekday::Sunday);
        for pair in days.windows(2) {
            assert_eq!(pair[0].next_day(), Some(pair[1]));
        }
    }

    #[test]
    fn normalization_is_stable() {
        let mut day = date!(2024 - 02 - 20);
        for _ in 0..60 {
            let start = start_of(day);
            assert_eq!(start_of(start), start);
            let key = format_date(start);
            assert_eq!(parse_date(&key).map(start_of), Some(start));
            day = day.next_day().unwrap();
        }
    }

    #[test]
    fn last_representable_week_is_refused_when_incomplete() {
        assert_eq!(Week::containing(Date::MAX), Err(WeekOutOfRange(Date::MAX)));

        // The latest full week ends on the Saturday before Date::MAX's week.
        let mut last = Date::MAX;
        while Week::containing(last).is_err() {
            last = last.previous_day().unwrap();
        }
        let week = Week::containing(last).unwrap();
        assert_eq!(week.end(), last);
        assert_eq!(week.end().weekday(), Weekday::Saturday);
    }

    #[test]
    fn first_representable_week_is_refused_when_incomplete() {
        assert!(Week::containing(Date::MIN).is_err());

        let mut first = Date::MIN;
        while first.weekday() != Weekday::Sunday {
            assert!(Week::containing(first).is_err());
            first = first.next_day().unwrap();
        }
        let week = Week::containing(first).unwrap();
        assert_eq!(week.start(), first);
        assert_eq!(week.dates().len(), DAYS_PER_WEEK);
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_date(date!(2025 - 03 - 07)), "2025-03-07");
        let early = Date::from_calendar_date(987, time::Month::November, 30).unwrap();
        assert_eq!(format_date(early), "0987-11-30");
    }

    #[test]
    fn record_dates_keep_their_written_calendar_day() {
        assert_eq!(parse_record_date("2025-10-06"), Some(date!(2025 - 10 - 06)));
        assert_eq!(parse_record_date("2025-10-06T00:00:00.000Z"), Some(date!(2025 - 10 - 06)));
        // Late evening west of UTC would be the 7th in UTC; the record still says the 6th.
        assert_eq!(parse_record_date("2025-10-06T22:30:00-03:00"), Some(date!(2025 - 10 - 06)));
        assert_eq!(parse_record_date("2025-10-06T08:15:00"), Some(date!(2025 - 10 - 06)));
        assert_eq!(parse_record_date("2025-10-06T08:15:00.250"), Some(date!(2025 - 10 - 06)));
        assert_eq!(parse_record_date("2025-10-06 08:15:00"), Some(date!(2025 - 10 - 06)));
        assert_eq!(parse_record_date("2025-10-06 23:59:59.999999"), Some(date!(2025 - 10 - 06)));
    }

    #[test]
    fn malformed_record_dates_are_rejected() {
        for raw in ["not-a-date", "", "2025-13-01", "2025-02-30", "06/10/2025", "2025-10-06Tnoon"] {
            assert_eq!(parse_record_date(raw), None, "{raw}");
        }
    }
}
