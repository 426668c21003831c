//! Decoding of day type headers and course cells.

use std::sync::LazyLock;

use regex::Regex;

use super::{Course, Error, ScheduleResult, ScheduleType, TimeOfDay};

// A course cell's onclick looks like
// Raz.exec ('show_course', ['9caca5ad9', '4,761,763,765,766,767']); return false;
// the second string holds the run id followed by one time per stop
static RE_COURSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*'\w+'\s*,\s*'([0-9, ]*)'\s*\]").unwrap());

/// Parses a day type header such as "делник - 05.03.2024"
pub fn parse_schedule_type(label: &str) -> ScheduleResult<ScheduleType> {
    let name = label.split('-').next().unwrap_or_default().trim();

    match name {
        "делник" => Ok(ScheduleType::Workday),
        "предпразник, празник" => Ok(ScheduleType::HolidayAndPreHoliday),
        "предпразник" => Ok(ScheduleType::PreHoliday),
        "празник" => Ok(ScheduleType::Holiday),
        "делник, предпразник, празник" => Ok(ScheduleType::All),
        _ => Err(Error::UnknownScheduleType(label.to_string())),
    }
}

/// Decodes the javascript of a course cell into one time per stop
pub fn parse_course(js_call: &str, stop_count: usize) -> ScheduleResult<Course> {
    let captures = RE_COURSE
        .captures(js_call)
        .ok_or_else(|| Error::MalformedCourse(js_call.to_string()))?;

    let course = captures[1]
        .split(',')
        // the first number identifies the run, it isn't a time
        .skip(1)
        .map(parse_time)
        .collect::<ScheduleResult<Course>>()?;

    if course.len() != stop_count {
        return Err(Error::StopCountMismatch {
            expected: stop_count,
            actual: course.len(),
        });
    }

    Ok(course)
}

/// Parses minutes since midnight; empty means the stop is skipped
pub fn parse_time(value: &str) -> ScheduleResult<Option<TimeOfDay>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let minutes = value
        .parse::<i32>()
        .map_err(|_| Error::InvalidTime(value.to_string()))?;

    TimeOfDay::from_minutes(minutes)
        .map(Some)
        .ok_or_else(|| Error::InvalidTime(value.to_string()))
}
