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

//! Outbound side of a console: payload encoding and the write half of the
//! stream, if the source has one.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Suffix added to text payloads when the newline option is on
pub const LINE_ENDING: &str = "\r\n";

pub const MIN_REPEAT_MILLIS: u64 = 50;
pub const MAX_REPEAT_MILLIS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Nothing to send")]
    Empty,
    #[error("Hex input needs an even number of digits, got {0}")]
    OddHexLength(usize),
    #[error("Source is read-only, there is nothing to send to")]
    ReadOnly,
    #[error("Nothing has been sent yet, so there is nothing to repeat")]
    NothingToRepeat,
    #[error("Repeat period must be 50-60000 ms, got {0}")]
    InvalidPeriod(u64),
    #[error("Send failed: {0}")]
    Write(#[from] std::io::Error),
}

/// How user input is turned into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// UTF-8 text, optionally followed by CRLF
    Text,
    /// Hex digits; everything else in the input is ignored
    Hex,
}

/// Encode user input for sending.
///
/// `append_newline` only applies to text; hex input is sent exactly as typed.
pub fn encode_payload(
    input: &str,
    kind: PayloadKind,
    append_newline: bool,
) -> Result<Vec<u8>, SendError> {
    match kind {
        PayloadKind::Hex => parse_hex(input),
        PayloadKind::Text if input.is_empty() => Err(SendError::Empty),
        PayloadKind::Text => {
            let mut bytes = input.as_bytes().to_vec();
            if append_newline {
                bytes.extend_from_slice(LINE_ENDING.as_bytes());
            }
            Ok(bytes)
        }
    }
}

/// Parse hex digit pairs, skipping separators and any other non-hex characters
pub fn parse_hex(input: &str) -> Result<Vec<u8>, SendError> {
    let digits: Vec<u8> = input
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|d| d as u8)
        .collect();
    if digits.is_empty() {
        return Err(SendError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(SendError::OddHexLength(digits.len()));
    }
    Ok(digits
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// Writes payloads to the stream and drives the optional repeat timer
pub struct Transmitter {
    writer: Option<Writer>,
    append_newline: bool,
    last_payload: Option<Vec<u8>>,
    repeat: Option<Interval>,
    bytes_sent: u64,
}

impl fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmitter")
            .field("writable", &self.writer.is_some())
            .field("append_newline", &self.append_newline)
            .field("repeating", &self.repeat.is_some())
            .field("bytes_sent", &self.bytes_sent)
            .finish_non_exhaustive()
    }
}

impl Transmitter {
    /// A transmitter for a source with no write half (stdin, plain files)
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            writer: None,
            append_newline: false,
            last_payload: None,
            repeat: None,
            bytes_sent: 0,
        }
    }

    #[must_use]
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            writer: Some(Box::new(writer)),
            ..Self::read_only()
        }
    }

    pub const fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub const fn append_newline(&self) -> bool {
        self.append_newline
    }

    pub fn set_append_newline(&mut self, append: bool) {
        self.append_newline = append;
    }

    pub const fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Encode and write `input`. The payload is kept for `repeat`.
    pub async fn send(&mut self, input: &str, kind: PayloadKind) -> Result<usize, SendError> {
        if self.writer.is_none() {
            return Err(SendError::ReadOnly);
        }
        let payload = encode_payload(input, kind, self.append_newline)?;
        let sent = self.write(&payload).await?;
        self.last_payload = Some(payload);
        Ok(sent)
    }

    /// Write the last payload again
    pub async fn resend(&mut self) -> Result<usize, SendError> {
        let payload = self.last_payload.take().ok_or(SendError::NothingToRepeat)?;
        let result = self.write(&payload).await;
        self.last_payload = Some(payload);
        result
    }

    /// Resend the last payload every `period_millis`, starting one period from now
    pub fn start_repeat(&mut self, period_millis: u64) -> Result<(), SendError> {
        if !(MIN_REPEAT_MILLIS..=MAX_REPEAT_MILLIS).contains(&period_millis) {
            return Err(SendError::InvalidPeriod(period_millis));
        }
        if self.writer.is_none() {
            return Err(SendError::ReadOnly);
        }
        if self.last_payload.is_none() {
            return Err(SendError::NothingToRepeat);
        }
        let period = Duration::from_millis(period_millis);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.repeat = Some(interval);
        tracing::debug!("Repeating last payload every {period_millis} ms");
        Ok(())
    }

    /// Returns whether a repeat was running
    pub fn stop_repeat(&mut self) -> bool {
        self.repeat.take().is_some()
    }

    pub const fn is_repeating(&self) -> bool {
        self.repeat.is_some()
    }

    /// Resolves on the next repeat tick. Never resolves while repeat is off.
    pub async fn repeat_tick(&mut self) {
        match self.repeat.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    async fn write(&mut self, payload: &[u8]) -> Result<usize, SendError> {
        let writer = self.writer.as_mut().ok_or(SendError::ReadOnly)?;
        writer.write_all(payload).await?;
        writer.flush().await?;
        self.bytes_sent += payload.len() as u64;
        tracing::trace!("Sent {} bytes", payload.len());
        Ok(payload.len())
    }
}
