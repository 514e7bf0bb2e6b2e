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

use crate::core::line::LogLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// Receiver for everything a running console produces.
///
/// Lines arrive in sequence order. `cleared` means previously delivered lines
/// are gone (clear or import); a full replay of the store may follow.
pub trait LineSink {
    fn line(&mut self, line: &LogLine);

    /// Called after every chunk with the current unterminated text
    fn pending(&mut self, _text: &str) {}

    fn cleared(&mut self);

    fn status(&mut self, level: StatusLevel, message: &str);
}

#[cfg(test)]
pub mod test_sink {
    use super::{LineSink, StatusLevel};
    use crate::core::line::LogLine;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Line(String),
        Cleared,
        Status(StatusLevel, String),
    }

    /// Records every event; optionally forwards line text so a test can wait on it
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub events: Vec<Event>,
        pub last_pending: String,
        pub line_tx: Option<tokio::sync::mpsc::UnboundedSender<String>>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Line(text) => Some(text.as_str()),
                    Event::Cleared | Event::Status(..) => None,
                })
                .collect()
        }

        pub fn statuses(&self, level: StatusLevel) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Status(l, msg) if *l == level => Some(msg.as_str()),
                    Event::Line(_) | Event::Cleared | Event::Status(..) => None,
                })
                .collect()
        }
    }

    impl LineSink for RecordingSink {
        fn line(&mut self, line: &LogLine) {
            self.events.push(Event::Line(line.raw_text.clone()));
            if let Some(tx) = &self.line_tx {
                let _ = tx.send(line.raw_text.clone());
            }
        }

        fn pending(&mut self, text: &str) {
            text.clone_into(&mut self.last_pending);
        }

        fn cleared(&mut self) {
            self.events.push(Event::Cleared);
        }

        fn status(&mut self, level: StatusLevel, message: &str) {
            self.events.push(Event::Status(level, message.to_string()));
        }
    }
}
