use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

static WINDOW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\d):(\d\d)-(\d\d):(\d\d)$").unwrap());

/// Time-of-day range during which the pump must stay off.
///
/// Written as `HH:MM-HH:MM`. The start is inclusive and the end exclusive;
/// a window whose end is before its start wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SleepWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl SleepWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Whether `t` falls inside the window.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.wraps_midnight() {
            t >= self.start || t < self.end
        } else {
            self.start <= t && t < self.end
        }
    }
}

fn parse_time(hour: &str, minute: &str, raw: &str) -> Result<NaiveTime, Error> {
    let hour: u32 = hour
        .parse()
        .map_err(|_| Error::config(format!("invalid hour in sleep window '{}'", raw)))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| Error::config(format!("invalid minute in sleep window '{}'", raw)))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::config(format!("time out of range in sleep window '{}'", raw)))
}

impl FromStr for SleepWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let caps = WINDOW_REGEX.captures(raw).ok_or_else(|| {
            Error::config(format!(
                "invalid sleep window '{}': expected HH:MM-HH:MM",
                raw
            ))
        })?;
        let start = parse_time(&caps[1], &caps[2], raw)?;
        let end = parse_time(&caps[3], &caps[4], raw)?;
        Ok(Self { start, end })
    }
}

impl TryFrom<String> for SleepWindow {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SleepWindow> for String {
    fn from(value: SleepWindow) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SleepWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}
