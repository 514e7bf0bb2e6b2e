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

use serde::{Deserialize, Serialize};

/// Coarse classification of the gap to the previous timestamped line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBucket {
    /// Under 100 ms, or unknown
    #[default]
    Normal,
    /// 100 ms up to 300 ms
    Low,
    /// 300 ms up to 1 s
    Medium,
    /// 1 s up to 2 s
    High,
    /// 2 s and more
    Critical,
}

impl SeverityBucket {
    /// Bucket for a gap in milliseconds (inclusive lower bounds)
    pub const fn from_gap_millis(gap: i64) -> Self {
        if gap >= 2000 {
            Self::Critical
        } else if gap >= 1000 {
            Self::High
        } else if gap >= 300 {
            Self::Medium
        } else if gap >= 100 {
            Self::Low
        } else {
            Self::Normal
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One captured line of stream output with its timing annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Dense, strictly increasing within a session (starts at 1)
    pub sequence: u64,
    /// Line text as captured, including its timestamp token; never the decoration
    pub raw_text: String,
    /// Capture time as epoch milliseconds
    pub captured_at_millis: i64,
    pub delta_from_start_millis: Option<i64>,
    pub delta_from_prev_millis: Option<i64>,
    pub severity: SeverityBucket,
    /// Set once timing has been computed; annotating again is a no-op
    #[serde(skip)]
    pub annotated: bool,
}

impl LogLine {
    pub const fn new(sequence: u64, raw_text: String, captured_at_millis: i64) -> Self {
        Self {
            sequence,
            raw_text,
            captured_at_millis,
            delta_from_start_millis: None,
            delta_from_prev_millis: None,
            severity: SeverityBucket::Normal,
            annotated: false,
        }
    }

    /// Display decoration, present only for lines that went through timing
    pub fn decoration(&self) -> Option<Decoration> {
        if !self.annotated {
            return None;
        }
        Some(Decoration {
            start_label: self
                .delta_from_start_millis
                .map_or_else(|| "T+0.000s".to_string(), format_start),
            delta_label: self
                .delta_from_prev_millis
                .map_or_else(|| "+0ms".to_string(), format_delta),
            severity: self.severity,
        })
    }
}

/// Rendered timing labels shown in front of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub start_label: String,
    pub delta_label: String,
    pub severity: SeverityBucket,
}

impl Decoration {
    /// Fixed-width prefix so that line contents stay aligned
    pub fn prefix(&self) -> String {
        format!("{:<10} | {:<7}   ", self.start_label, self.delta_label)
    }
}

/// `T+S.mmms` elapsed since session start
fn format_start(millis: i64) -> String {
    format!("T+{}.{:03}s", millis / 1000, millis % 1000)
}

/// `+Nms` below one second, `+S.SSs` from one second on
fn format_delta(millis: i64) -> String {
    if millis >= 1000 {
        format!("+{:.2}s", millis as f64 / 1000.0)
    } else {
        format!("+{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(SeverityBucket::from_gap_millis(0), SeverityBucket::Normal);
        assert_eq!(SeverityBucket::from_gap_millis(99), SeverityBucket::Normal);
        assert_eq!(SeverityBucket::from_gap_millis(100), SeverityBucket::Low);
        assert_eq!(SeverityBucket::from_gap_millis(299), SeverityBucket::Low);
        assert_eq!(SeverityBucket::from_gap_millis(300), SeverityBucket::Medium);
        assert_eq!(SeverityBucket::from_gap_millis(999), SeverityBucket::Medium);
        assert_eq!(SeverityBucket::from_gap_millis(1000), SeverityBucket::High);
        assert_eq!(SeverityBucket::from_gap_millis(1999), SeverityBucket::High);
        assert_eq!(SeverityBucket::from_gap_millis(2000), SeverityBucket::Critical);
    }

    #[test]
    fn test_plain_line_has_no_decoration() {
        let line = LogLine::new(1, "no timestamp".to_string(), 0);
        assert!(line.decoration().is_none());
    }

    #[test]
    fn test_decoration_labels() {
        let mut line = LogLine::new(3, "[09:00:02/500] C".to_string(), 0);
        line.delta_from_start_millis = Some(2500);
        line.delta_from_prev_millis = Some(2000);
        line.severity = SeverityBucket::Critical;
        line.annotated = true;

        let deco = line.decoration().expect("timed line is decorated");
        assert_eq!(deco.start_label, "T+2.500s");
        assert_eq!(deco.delta_label, "+2.00s");
        assert_eq!(deco.prefix(), "T+2.500s   | +2.00s    ");
    }

    #[test]
    fn test_first_line_decoration_defaults() {
        let mut line = LogLine::new(1, "[09:00:00/000] A".to_string(), 0);
        line.delta_from_start_millis = Some(0);
        line.annotated = true;

        let deco = line.decoration().expect("decorated");
        assert_eq!(deco.start_label, "T+0.000s");
        assert_eq!(deco.delta_label, "+0ms");
        assert_eq!(deco.severity, SeverityBucket::Normal);
    }

    #[test]
    fn test_sub_second_delta_label() {
        assert_eq!(format_delta(500), "+500ms");
        assert_eq!(format_delta(1234), "+1.23s");
    }
}
