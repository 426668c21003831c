use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

use super::{Error, RtResult};

// e.g. "13:05 изчислено в: 12:58 10.01.2024"
static RE_ARRIVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+):(\d+) изчислено в. (\d+:\d+ \d+\.\d+\.\d+)").unwrap()
});

const REFERENCE_FORMAT: &str = "%H:%M %d.%m.%Y";

fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> RtResult<DateTime<Tz>> {
    tz.from_local_datetime(&NaiveDateTime::new(date, time))
        .earliest()
        .ok_or_else(|| Error::InvalidTime(format!("{} {} doesn't exist in {}", date, time, tz)))
}

/// Dates an "HH:MM" reading taken at `reference`. Readings earlier in the day
/// than the reference are for the next day.
///
/// Returns the arrival and the reference, in the reference's zone.
pub fn resolve_arrival_time(
    clock: &str,
    reference: DateTime<Tz>,
) -> RtResult<(DateTime<Tz>, DateTime<Tz>)> {
    let time = NaiveTime::parse_from_str(clock.trim(), "%H:%M")
        .map_err(|_| Error::InvalidTime(clock.to_string()))?;
    let tz = reference.timezone();
    let date = reference.date_naive();

    let mut arrival = localize(tz, date, time)?;
    if arrival < reference {
        let next_day = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| Error::InvalidTime(clock.to_string()))?;
        arrival = localize(tz, next_day, time)?;
    }

    Ok((arrival, reference))
}

/// Parses an arrival cell of the virtual board, as in
/// "13:05 изчислено в: 12:58 10.01.2024"
pub fn parse_arrival_time(text: &str, tz: Tz) -> RtResult<(DateTime<Tz>, DateTime<Tz>)> {
    let captures = RE_ARRIVAL
        .captures(text)
        .ok_or_else(|| Error::InvalidTime(text.trim().to_string()))?;

    let reference = NaiveDateTime::parse_from_str(&captures[3], REFERENCE_FORMAT)
        .map_err(|e| Error::InvalidTime(format!("{}: {}", &captures[3], e)))?;
    let reference = localize(tz, reference.date(), reference.time())?;

    let clock = format!("{}:{}", &captures[1], &captures[2]);
    resolve_arrival_time(&clock, reference)
}

#[cfg(test)]
mod test {
    use chrono_tz::Europe::Sofia;

    use super::*;

    fn sofia(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        Sofia.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_rolls_over_midnight() {
        let reference = sofia(2024, 1, 10, 23, 58);

        let (arrival, returned) = resolve_arrival_time("00:03", reference).unwrap();

        assert_eq!(arrival, sofia(2024, 1, 11, 0, 3));
        assert_eq!(returned, reference);
    }

    #[test]
    fn test_same_day() {
        let reference = sofia(2024, 1, 10, 10, 0);

        let (arrival, _) = resolve_arrival_time("10:30", reference).unwrap();
        assert_eq!(arrival, sofia(2024, 1, 10, 10, 30));

        // equal to the reference is not earlier
        let (arrival, _) = resolve_arrival_time("10:00", reference).unwrap();
        assert_eq!(arrival, reference);
    }

    #[test]
    fn test_month_and_year_end() {
        let (arrival, _) = resolve_arrival_time("00:01", sofia(2023, 12, 31, 23, 50)).unwrap();
        assert_eq!(arrival, sofia(2024, 1, 1, 0, 1));
    }

    #[test]
    fn test_invalid_clock() {
        let reference = sofia(2024, 1, 10, 10, 0);
        assert!(resolve_arrival_time("25:00", reference).is_err());
        assert!(resolve_arrival_time("soon", reference).is_err());
    }

    #[test]
    fn test_parse_arrival_time() {
        let (arrival, reference) =
            parse_arrival_time("\n 00:03 изчислено в: 23:58 10.01.2024 ", Sofia).unwrap();

        assert_eq!(reference, sofia(2024, 1, 10, 23, 58));
        assert_eq!(arrival, sofia(2024, 1, 11, 0, 3));

        assert!(parse_arrival_time("няма данни", Sofia).is_err());
    }

    #[test]
    fn test_zone_is_configurable() {
        let (_, reference) =
            parse_arrival_time("10:30 изчислено в: 10:00 10.01.2024", chrono_tz::UTC).unwrap();
        assert_eq!(reference.to_rfc3339(), "2024-01-10T10:00:00+00:00");
    }
}
