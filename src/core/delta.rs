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

//! Delta-time bookkeeping between timestamped lines.

use super::line::{LogLine, SeverityBucket};

/// Gaps of an hour or more are treated as a session break, not a delay
pub const MAX_PREV_DELTA_MILLIS: i64 = 3_600_000;

/// Timestamp bookkeeping for one contiguous capture or import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub start: Option<i64>,
    pub last: Option<i64>,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            start: None,
            last: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Forget the previous line, keep the start (used on reconnect)
    pub fn break_chain(&mut self) {
        self.last = None;
    }

    /// Compute timing for `line` captured at `captured_millis`.
    ///
    /// `last` always advances to the captured time, even when the previous
    /// delta is out of range and suppressed.
    pub fn annotate(&mut self, line: &mut LogLine, captured_millis: i64) {
        if line.annotated {
            return;
        }

        let start = *self.start.get_or_insert(captured_millis);
        let from_start = captured_millis - start;
        line.delta_from_start_millis = (from_start >= 0).then_some(from_start);

        let gap = self.last.map(|last| captured_millis - last);
        line.delta_from_prev_millis = gap.filter(|g| (0..MAX_PREV_DELTA_MILLIS).contains(g));
        line.severity = line
            .delta_from_prev_millis
            .map_or(SeverityBucket::Normal, SeverityBucket::from_gap_millis);

        if let (Some(g), None) = (gap, line.delta_from_prev_millis) {
            tracing::trace!("Suppressed out-of-range delta for line {}: {g} ms", line.sequence);
        }

        self.last = Some(captured_millis);
        line.captured_at_millis = captured_millis;
        line.annotated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(seq: u64) -> LogLine {
        LogLine::new(seq, format!("line {seq}"), 0)
    }

    #[test]
    fn test_first_line_starts_session() {
        let mut session = Session::new();
        let mut first = line(1);
        session.annotate(&mut first, 1_000);

        assert_eq!(session.start, Some(1_000));
        assert_eq!(session.last, Some(1_000));
        assert_eq!(first.delta_from_start_millis, Some(0));
        assert_eq!(first.delta_from_prev_millis, None);
        assert_eq!(first.severity, SeverityBucket::Normal);
        assert_eq!(first.captured_at_millis, 1_000);
    }

    #[test]
    fn test_deltas_and_buckets() {
        let mut session = Session::new();
        let mut a = line(1);
        let mut b = line(2);
        let mut c = line(3);
        session.annotate(&mut a, 0);
        session.annotate(&mut b, 500);
        session.annotate(&mut c, 2_500);

        assert_eq!(b.delta_from_prev_millis, Some(500));
        assert_eq!(b.severity, SeverityBucket::Medium);
        assert_eq!(c.delta_from_prev_millis, Some(2_000));
        assert_eq!(c.delta_from_start_millis, Some(2_500));
        assert_eq!(c.severity, SeverityBucket::Critical);
    }

    #[test]
    fn test_clock_rollback_is_unknown_but_recorded() {
        let mut session = Session::new();
        let mut a = line(1);
        let mut b = line(2);
        let mut c = line(3);
        session.annotate(&mut a, 10_000);
        session.annotate(&mut b, 9_000);
        session.annotate(&mut c, 9_150);

        assert_eq!(b.delta_from_prev_millis, None);
        assert_eq!(b.delta_from_start_millis, None);
        assert_eq!(b.severity, SeverityBucket::Normal);
        // The suppressed time still serves as the next comparison point
        assert_eq!(c.delta_from_prev_millis, Some(150));
        assert_eq!(c.severity, SeverityBucket::Low);
    }

    #[test]
    fn test_hour_gap_is_unknown() {
        let mut session = Session::new();
        let mut a = line(1);
        let mut b = line(2);
        session.annotate(&mut a, 0);
        session.annotate(&mut b, MAX_PREV_DELTA_MILLIS);
        assert_eq!(b.delta_from_prev_millis, None);
        assert_eq!(b.severity, SeverityBucket::Normal);
        assert_eq!(b.delta_from_start_millis, Some(MAX_PREV_DELTA_MILLIS));
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let mut session = Session::new();
        let mut a = line(1);
        let mut b = line(2);
        session.annotate(&mut a, 0);
        session.annotate(&mut b, 400);
        let before = (b.clone(), session);

        session.annotate(&mut b, 5_000);
        assert_eq!(b, before.0);
        assert_eq!(session, before.1);
    }

    #[test]
    fn test_break_chain_keeps_start() {
        let mut session = Session::new();
        let mut a = line(1);
        let mut b = line(2);
        session.annotate(&mut a, 0);
        session.break_chain();
        session.annotate(&mut b, 200);
        assert_eq!(b.delta_from_prev_millis, None);
        assert_eq!(b.delta_from_start_millis, Some(200));
    }
}
