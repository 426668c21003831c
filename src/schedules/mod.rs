//! Static timetables, as published on the schedules site.

mod all;
mod lines;
pub mod parse;
mod timetable;

use std::{collections::BTreeMap, fmt::Display};

use serde::{Serialize, Serializer};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{page, transit::Line};

pub use all::acquire_all_timetables;
pub use lines::all_lines;
pub use timetable::get_timetable;

pub const SCHEDULES_URL: &str = "https://schedules.sofiatraffic.bg/";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page error: {0}")]
    Page(#[from] page::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Line(#[from] crate::transit::Error),

    #[error("unknown schedule type: {0}")]
    UnknownScheduleType(String),

    #[error("unable to find time list in this javascript code: {0}")]
    MalformedCourse(String),

    #[error("invalid time [{0}]")]
    InvalidTime(String),

    #[error("course has {actual} times but the route has {expected} stops")]
    StopCountMismatch { expected: usize, actual: usize },

    #[error("stops for the same route are different on different days ({line}, {direction}): {first:?}, {second:?}")]
    InconsistentStops {
        line: Line,
        direction: String,
        first: Vec<i64>,
        second: Vec<i64>,
    },

    #[error("invalid line link [{0}]")]
    InvalidLineLink(String),

    #[error("invalid stop id [{0}]")]
    InvalidStopId(String),

    #[error("unable to get timetable for {line}: {source}")]
    Timetable {
        line: Line,
        #[source]
        source: Box<Error>,
    },
}

pub type ScheduleResult<T> = Result<T, Error>;

/// A time at which a vehicle stops, stored as minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hours: u8,
    pub minutes: u8,
}

impl TimeOfDay {
    pub const MINUTES_PER_DAY: i32 = 24 * 60;

    pub fn new(hours: u8, minutes: u8) -> Option<Self> {
        (hours < 24 && minutes < 60).then_some(Self { hours, minutes })
    }

    pub fn from_minutes(minutes: i32) -> Option<Self> {
        if !(0..Self::MINUTES_PER_DAY).contains(&minutes) {
            return None;
        }
        Self::new((minutes / 60) as u8, (minutes % 60) as u8)
    }

    pub fn minutes_since_midnight(self) -> i32 {
        self.hours as i32 * 60 + self.minutes as i32
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One run of a vehicle: the time it calls at each stop of the route, in
/// route order. `None` means the run skips that stop.
pub type Course = Vec<Option<TimeOfDay>>;

/// Day categories a course table applies to, as a bitmask
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize_repr, Deserialize_repr,
)]
#[repr(i32)]
pub enum ScheduleType {
    None = 0,
    /// Usually monday to friday
    Workday = 1,
    /// National holidays and sundays
    Holiday = 2,
    /// Days around national holidays and saturdays
    PreHoliday = 4,
    HolidayAndPreHoliday = 6,
    All = 7,
}

impl ScheduleType {
    const ALL_TYPES: [ScheduleType; 6] = [
        ScheduleType::None,
        ScheduleType::Workday,
        ScheduleType::Holiday,
        ScheduleType::PreHoliday,
        ScheduleType::HolidayAndPreHoliday,
        ScheduleType::All,
    ];

    pub fn bits(self) -> i32 {
        self as i32
    }

    pub fn from_bits(bits: i32) -> Option<Self> {
        Self::ALL_TYPES.into_iter().find(|t| t.bits() == bits)
    }

    /// Whether courses of this type run on days of type `day`
    pub fn covers(self, day: ScheduleType) -> bool {
        day != ScheduleType::None && self.bits() & day.bits() == day.bits()
    }
}

/// One direction of a line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Human readable, usually the two ends of the route
    pub direction: String,
    /// Stop ids, in the order they are visited
    pub stops: Vec<i64>,
    pub schedules: BTreeMap<ScheduleType, Vec<Course>>,
}

impl Route {
    pub fn new(direction: impl Into<String>, stops: Vec<i64>) -> Self {
        Self {
            direction: direction.into(),
            stops,
            schedules: BTreeMap::new(),
        }
    }

    /// Checks every course has exactly one entry per stop
    pub fn check_courses(&self) -> ScheduleResult<()> {
        let expected = self.stops.len();
        for course in self.schedules.values().flatten() {
            if course.len() != expected {
                return Err(Error::StopCountMismatch {
                    expected,
                    actual: course.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timetable {
    pub line: Line,
    pub routes: Vec<Route>,
}
