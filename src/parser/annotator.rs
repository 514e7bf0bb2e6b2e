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

use super::timestamp::format_token;
use chrono::{DateTime, Local};

/// Inserts a capture-time token at the start of every new logical line.
///
/// The token is written lazily, right before the first non-newline character
/// of a line. A fragment ending in `\n` therefore never produces a trailing
/// token, and runs of empty lines stay empty instead of becoming
/// timestamp-only lines.
#[derive(Debug)]
pub struct TimestampAnnotator {
    pending_newline: bool,
}

impl TimestampAnnotator {
    pub const fn new() -> Self {
        Self {
            pending_newline: true,
        }
    }

    /// True if the previous fragment ended exactly on a line boundary
    pub const fn pending_newline(&self) -> bool {
        self.pending_newline
    }

    /// Treat the next character as the start of a new line
    pub fn reset(&mut self) {
        self.pending_newline = true;
    }

    /// Keep the pending flag in sync while timestamps are switched off
    pub fn track(&mut self, fragment: &str) {
        if let Some(last) = fragment.chars().last() {
            self.pending_newline = last == '\n';
        }
    }

    pub fn annotate(&mut self, fragment: &str, captured_at: &DateTime<Local>) -> String {
        if fragment.is_empty() {
            return String::new();
        }

        let token = format_token(captured_at);
        let mut out = String::with_capacity(fragment.len() + token.len());
        for c in fragment.chars() {
            if c == '\n' {
                out.push(c);
                self.pending_newline = true;
                continue;
            }
            if self.pending_newline {
                out.push_str(&token);
                self.pending_newline = false;
            }
            out.push(c);
        }
        out
    }
}

impl Default for TimestampAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::timestamp::test_clock::FixedClock;
    use crate::parser::timestamp::Clock;

    fn now() -> DateTime<Local> {
        FixedClock::at(10, 0, 0, 0).now()
    }

    #[test]
    fn test_first_fragment_gets_token() {
        let mut annotator = TimestampAnnotator::new();
        assert_eq!(annotator.annotate("hello", &now()), "[10:00:00/000] hello");
        assert!(!annotator.pending_newline());
    }

    #[test]
    fn test_continuation_fragment_has_no_token() {
        let mut annotator = TimestampAnnotator::new();
        annotator.annotate("he", &now());
        assert_eq!(annotator.annotate("llo", &now()), "llo");
    }

    #[test]
    fn test_embedded_newline_starts_new_line() {
        let mut annotator = TimestampAnnotator::new();
        annotator.annotate("he", &now());
        assert_eq!(
            annotator.annotate("llo\nworld", &now()),
            "llo\n[10:00:00/000] world"
        );
    }

    #[test]
    fn test_trailing_newline_defers_token() {
        let mut annotator = TimestampAnnotator::new();
        assert_eq!(annotator.annotate("a\n", &now()), "[10:00:00/000] a\n");
        assert!(annotator.pending_newline());
        assert_eq!(annotator.annotate("b", &now()), "[10:00:00/000] b");
    }

    #[test]
    fn test_blank_lines_stay_blank() {
        let mut annotator = TimestampAnnotator::new();
        let out = annotator.annotate("a\n\n\nb\n", &now());
        assert_eq!(out, "[10:00:00/000] a\n\n\n[10:00:00/000] b\n");
        for line in out.lines() {
            assert_ne!(line.trim_end(), "[10:00:00/000]");
        }
    }

    #[test]
    fn test_empty_fragment_is_noop() {
        let mut annotator = TimestampAnnotator::new();
        annotator.annotate("x", &now());
        assert_eq!(annotator.annotate("", &now()), "");
        assert!(!annotator.pending_newline());
    }

    #[test]
    fn test_track_follows_line_boundaries() {
        let mut annotator = TimestampAnnotator::new();
        annotator.track("partial");
        assert!(!annotator.pending_newline());
        annotator.track("");
        assert!(!annotator.pending_newline());
        annotator.track("end\n");
        assert!(annotator.pending_newline());
    }
}
