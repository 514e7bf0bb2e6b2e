// PortCrab - GPL-3.0-or-later
// This file is part of PortCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// PortCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// PortCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with PortCrab.  If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use fancy_regex::Regex;
use std::sync::LazyLock;

// Capture-time prefix written in front of every line: [HH:MM:SS/mmm]
static LINE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}):(\d{2}):(\d{2})/(\d{3})\]").expect("valid regex literal")
});

/// Source of wall-clock time for capture timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Format the token inserted before each captured line, including the trailing space
pub fn format_token(at: &DateTime<Local>) -> String {
    at.format("[%H:%M:%S/%3f] ").to_string()
}

/// Parse the leading `[HH:MM:SS/mmm]` token of a line.
///
/// The token must open the line; an indented token does not count. Returns
/// `None` when the prefix is missing or names an impossible time of day.
pub fn parse_line_time(line: &str) -> Option<NaiveTime> {
    let caps = LINE_TIMESTAMP.captures(line).ok()??;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    NaiveTime::from_hms_milli_opt(field(1)?, field(2)?, field(3)?, field(4)?)
}

/// Place a parsed time of day on the given date, as epoch milliseconds.
///
/// The token carries no date, so the capture day is taken from the clock.
/// Times skipped by a DST jump fall back to the UTC interpretation.
pub fn epoch_millis_on(date: NaiveDate, time: NaiveTime) -> i64 {
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc().timestamp_millis(), |dt| dt.timestamp_millis())
}

#[cfg(test)]
pub mod test_clock {
    use super::Clock;
    use chrono::{DateTime, Local, NaiveDate, TimeZone};
    use std::sync::{Arc, Mutex};

    /// Manually driven clock for deterministic tests
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        now: Arc<Mutex<DateTime<Local>>>,
    }

    impl FixedClock {
        pub fn at(h: u32, m: u32, s: u32, ms: u32) -> Self {
            let naive = NaiveDate::from_ymd_opt(2025, 6, 2)
                .and_then(|d| d.and_hms_milli_opt(h, m, s, ms))
                .expect("valid test time");
            let now = Local
                .from_local_datetime(&naive)
                .earliest()
                .expect("representable test time");
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub fn advance_millis(&self, ms: i64) {
            let mut now = self.now.lock().expect("clock lock");
            *now += chrono::Duration::milliseconds(ms);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            *self.now.lock().expect("clock lock")
        }
    }
}
