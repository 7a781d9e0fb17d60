//! Time zone used for time-of-day decisions and photo names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::Error;

/// The zone in which the greenhouse lives.
///
/// Sleep windows are written in local time, so the pump scheduler converts
/// clock readings through this before comparing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// Whatever the host is configured with.
    #[default]
    System,
    /// An IANA zone, e.g. `Europe/Berlin`.
    Named(Tz),
}

impl LocalZone {
    pub fn time_of_day(&self, t: DateTime<Utc>) -> NaiveTime {
        match self {
            LocalZone::System => t.with_timezone(&Local).time(),
            LocalZone::Named(tz) => t.with_timezone(tz).time(),
        }
    }

    pub fn format(&self, t: DateTime<Utc>, fmt: &str) -> String {
        match self {
            LocalZone::System => t.with_timezone(&Local).format(fmt).to_string(),
            LocalZone::Named(tz) => t.with_timezone(tz).format(fmt).to_string(),
        }
    }
}

impl FromStr for LocalZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("local") {
            return Ok(LocalZone::System);
        }
        s.parse::<Tz>()
            .map(LocalZone::Named)
            .map_err(|e| Error::config(format!("unknown timezone '{}': {}", s, e)))
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalZone::System => write!(f, "local"),
            LocalZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}
