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

use crate::config::ConfigError;
use crate::core::delta::Session;
use crate::core::line::LogLine;
use crate::parser::timestamp::{epoch_millis_on, parse_line_time, Clock};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_MAX_LINES: usize = 1000;

/// Minimum slack before a batch eviction
const MIN_HYSTERESIS_LINES: usize = 10;

/// Append-only line store capped at `max_lines`, evicting oldest lines first.
///
/// Eviction is batched: the store may run up to `hysteresis()` lines over the
/// cap before trimming back to exactly `max_lines`.
pub struct LogStore {
    lines: VecDeque<LogLine>,
    next_sequence: u64,
    max_lines: usize,
    session: Session,
    clock: Arc<dyn Clock>,
    /// Bumped on every mutation so viewers can tell when to redraw
    version: u64,
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("len", &self.lines.len())
            .field("next_sequence", &self.next_sequence)
            .field("max_lines", &self.max_lines)
            .field("session", &self.session)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl LogStore {
    /// Create an empty store with the default cap
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            lines: VecDeque::new(),
            next_sequence: 1,
            max_lines: DEFAULT_MAX_LINES,
            session: Session::new(),
            clock,
            version: 1,
        }
    }

    /// Append one complete line.
    ///
    /// Lines starting with a `[HH:MM:SS/mmm]` token are timed against the
    /// current session; other lines keep empty deltas.
    pub fn append(&mut self, raw: impl Into<String>) -> LogLine {
        profiling::scope!("LogStore::append");
        let raw = raw.into();
        let now = self.clock.now();

        let mut line = LogLine::new(self.next_sequence, raw, now.timestamp_millis());
        if let Some(time) = parse_line_time(&line.raw_text) {
            let captured = epoch_millis_on(now.date_naive(), time);
            self.session.annotate(&mut line, captured);
        }

        self.next_sequence += 1;
        self.lines.push_back(line.clone());
        self.bump_version();
        self.enforce_limit(false);
        line
    }

    /// Change the cap and trim down to it immediately.
    ///
    /// Returns the number of evicted lines. Zero is rejected and the
    /// previous cap is kept.
    pub fn set_max_lines(&mut self, max_lines: usize) -> Result<usize, ConfigError> {
        if max_lines == 0 {
            tracing::warn!("Rejected max_lines=0, keeping {}", self.max_lines);
            return Err(ConfigError::InvalidMaxLines(max_lines));
        }
        self.max_lines = max_lines;
        Ok(self.enforce_limit(true))
    }

    /// Remove all lines and start a fresh session
    pub fn clear(&mut self) {
        self.lines.clear();
        self.session.reset();
        self.next_sequence = 1;
        self.bump_version();
    }

    /// Lines in ascending sequence order
    pub fn get_all(&self) -> impl ExactSizeIterator<Item = &LogLine> + '_ {
        self.lines.iter()
    }

    pub fn get_by_sequence(&self, sequence: u64) -> Option<&LogLine> {
        let first = self.lines.front()?.sequence;
        let offset = usize::try_from(sequence.checked_sub(first)?).ok()?;
        self.lines.get(offset)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub const fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Slack allowed over `max_lines` before a batch eviction
    pub fn hysteresis(&self) -> usize {
        MIN_HYSTERESIS_LINES.max(self.max_lines / 10)
    }

    pub fn first_sequence(&self) -> Option<u64> {
        self.lines.front().map(|l| l.sequence)
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Forget the previous timestamp so the next line starts a new delta chain
    pub fn break_delta_chain(&mut self) {
        self.session.break_chain();
    }

    pub const fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }

    fn enforce_limit(&mut self, force: bool) -> usize {
        let threshold = if force { 0 } else { self.hysteresis() };
        if self.lines.len() <= self.max_lines.saturating_add(threshold) {
            return 0;
        }

        profiling::scope!("LogStore::evict");
        let excess = self.lines.len() - self.max_lines;
        self.lines.drain(..excess);
        self.bump_version();
        tracing::debug!(
            "Evicted {excess} oldest lines (max_lines={}, forced={force})",
            self.max_lines
        );
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::line::SeverityBucket;
    use crate::parser::timestamp::test_clock::FixedClock;

    fn store() -> LogStore {
        LogStore::new(Arc::new(FixedClock::at(12, 0, 0, 0)))
    }

    #[test]
    fn test_sequences_are_dense() {
        let mut store = store();
        let a = store.append("one");
        let b = store.append("two");
        let c = store.append("three");
        assert_eq!((a.sequence, b.sequence, c.sequence), (1, 2, 3));

        let seqs: Vec<u64> = store.get_all().map(|l| l.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_hysteresis_batch_eviction() {
        let mut store = store();
        store.set_max_lines(100).expect("valid cap");
        assert_eq!(store.hysteresis(), 10);

        for i in 1..=110 {
            store.append(format!("line {i}"));
        }
        assert_eq!(store.len(), 110);

        // The 111th append crosses max_lines + hysteresis and trims in one batch
        store.append("line 111");
        assert_eq!(store.len(), 100);
        assert_eq!(store.first_sequence(), Some(12));

        for i in 112..=115 {
            store.append(format!("line {i}"));
            assert!(store.len() <= store.max_lines() + store.hysteresis());
        }
        assert_eq!(store.len(), 104);

        let evicted = store.set_max_lines(100).expect("valid cap");
        assert_eq!(evicted, 4);
        assert_eq!(store.len(), 100);
        let seqs: Vec<u64> = store.get_all().map(|l| l.sequence).collect();
        assert_eq!(seqs, (16..=115).collect::<Vec<_>>());
    }

    #[test]
    fn test_hysteresis_scales_with_cap() {
        let mut store = store();
        store.set_max_lines(5000).expect("valid cap");
        assert_eq!(store.hysteresis(), 500);
        store.set_max_lines(20).expect("valid cap");
        assert_eq!(store.hysteresis(), 10);
    }

    #[test]
    fn test_set_max_lines_forces_exact_cap() {
        let mut store = store();
        for i in 0..50 {
            store.append(format!("{i}"));
        }
        store.set_max_lines(7).expect("valid cap");
        assert_eq!(store.len(), 7);
        assert_eq!(store.first_sequence(), Some(44));
    }

    #[test]
    fn test_zero_max_lines_rejected() {
        let mut store = store();
        store.set_max_lines(50).expect("valid cap");
        assert!(matches!(
            store.set_max_lines(0),
            Err(ConfigError::InvalidMaxLines(0))
        ));
        assert_eq!(store.max_lines(), 50);
    }

    #[test]
    fn test_huge_cap_does_not_overflow() {
        let mut store = store();
        store.set_max_lines(usize::MAX).expect("valid cap");
        assert_eq!(store.hysteresis(), usize::MAX / 10);
        store.append("one");
        store.append("two");
        assert_eq!(store.len(), 2);
        assert_eq!(store.set_max_lines(usize::MAX).expect("valid cap"), 0);
    }

    #[test]
    fn test_clear_resets_session_and_sequence() {
        let mut store = store();
        store.append("[12:00:00/000] a");
        store.append("b");
        assert!(store.session().start.is_some());

        store.clear();
        assert!(store.is_empty());
        assert_eq!(*store.session(), Session::new());
        assert_eq!(store.append("c").sequence, 1);
    }

    #[test]
    fn test_timestamped_lines_get_deltas() {
        let mut store = store();
        let a = store.append("[09:00:00/000] A");
        let plain = store.append("no time here");
        let b = store.append("[09:00:00/150] B");

        assert_eq!(a.delta_from_start_millis, Some(0));
        assert_eq!(a.delta_from_prev_millis, None);
        assert_eq!(plain.delta_from_prev_millis, None);
        assert!(!plain.annotated);
        assert_eq!(b.delta_from_prev_millis, Some(150));
        assert_eq!(b.severity, SeverityBucket::Low);
        assert_eq!(b.captured_at_millis - a.captured_at_millis, 150);
    }

    #[test]
    fn test_get_all_is_restartable() {
        let mut store = store();
        store.append("x");
        store.append("y");
        let first: Vec<_> = store.get_all().cloned().collect();
        let second: Vec<_> = store.get_all().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_by_sequence_after_eviction() {
        let mut store = store();
        for i in 0..30 {
            store.append(format!("{i}"));
        }
        store.set_max_lines(10).expect("valid cap");
        assert!(store.get_by_sequence(20).is_none());
        assert_eq!(
            store.get_by_sequence(21).map(|l| l.raw_text.as_str()),
            Some("20")
        );
        assert!(store.get_by_sequence(31).is_none());
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let mut store = store();
        let v0 = store.version();
        store.append("x");
        let v1 = store.version();
        assert!(v1 > v0);
        store.clear();
        assert!(store.version() > v1);
    }
}
