use std::{fmt::Display, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\S+)\s+(.+?)\s*$").unwrap());

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown vehicle kind: {0}")]
    UnknownVehicle(String),

    #[error("unable to parse line label [{0}]")]
    InvalidLabel(String),
}

/// Kind of vehicle serving a line. The discriminant is what gets stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Bus = 0,
    Tram = 1,
    Trolley = 2,
    Subway = 3,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Bus,
        VehicleKind::Tram,
        VehicleKind::Trolley,
        VehicleKind::Subway,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::Bus => "bus",
            VehicleKind::Tram => "tram",
            VehicleKind::Trolley => "trolley",
            VehicleKind::Subway => "subway",
        }
    }
}

impl From<VehicleKind> for i32 {
    fn from(kind: VehicleKind) -> Self {
        kind as i32
    }
}

impl TryFrom<i32> for VehicleKind {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        VehicleKind::ALL
            .into_iter()
            .find(|kind| *kind as i32 == value)
            .ok_or_else(|| Error::UnknownVehicle(value.to_string()))
    }
}

impl FromStr for VehicleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownVehicle(s.to_string()))
    }
}

impl Display for VehicleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A transit line, e.g. tram 10 or bus 94
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Line {
    pub vehicle: VehicleKind,
    // not a number: lines such as "4 ТМ" exist
    pub number: String,
}

impl Line {
    pub fn new(vehicle: VehicleKind, number: impl Into<String>) -> Self {
        Self {
            vehicle,
            number: number.into(),
        }
    }

    /// Parses a label as shown on the virtual board, such as "трамвай 10"
    pub fn parse_label(label: &str) -> Result<Self, Error> {
        let captures = RE_LABEL
            .captures(label)
            .ok_or_else(|| Error::InvalidLabel(label.to_string()))?;

        let vehicle = match &captures[1] {
            "трамвай" => VehicleKind::Tram,
            "тролей" => VehicleKind::Trolley,
            "автобус" => VehicleKind::Bus,
            other => return Err(Error::UnknownVehicle(other.to_string())),
        };

        Ok(Line::new(vehicle, &captures[2]))
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.vehicle, self.number)
    }
}

/// A physical stop, identified by the id the transit site assigns to it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stop {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Stop {
    pub fn named(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A stop id and the name it was listed under on a schedule page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopName {
    pub id: i64,
    pub name: String,
}
