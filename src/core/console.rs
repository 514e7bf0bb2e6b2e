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

//! One serial console instance: decoder, annotator, line splitter and store.
//!
//! Every chunk runs synchronously through the whole pipeline. Nothing here
//! is shared; multiple consoles are simply multiple values.

use crate::config::{ConfigError, ConsoleSettings};
use crate::core::line::LogLine;
use crate::core::log_file::{
    export_lines, import_into, read_log_file, write_log_file, ImportSummary, LogFileError,
};
use crate::core::log_store::LogStore;
use crate::parser::{ByteDecoder, Clock, DisplayMode, TimestampAnnotator};
use std::path::Path;
use std::sync::Arc;

/// Bytes per row in hex mode
pub const HEX_ROW_BYTES: usize = 16;

/// Per-connection decoding state
#[derive(Debug, Default)]
pub struct StreamState {
    /// Text received after the last newline
    pub pending_partial_line: String,
    decoder: ByteDecoder,
    annotator: TimestampAnnotator,
    /// Bytes already rendered into the current hex row
    hex_row_len: usize,
}

impl StreamState {
    pub fn reset(&mut self) {
        self.pending_partial_line.clear();
        self.decoder.reset();
        self.annotator.reset();
        self.hex_row_len = 0;
    }

    pub fn decoder_carry(&self) -> &[u8] {
        self.decoder.carry()
    }
}

pub struct SerialConsole {
    store: LogStore,
    stream: StreamState,
    clock: Arc<dyn Clock>,
    display_mode: DisplayMode,
    show_timestamps: bool,
    byte_count: u64,
    connected: bool,
}

impl SerialConsole {
    pub fn new(settings: &ConsoleSettings, clock: Arc<dyn Clock>) -> Self {
        let mut store = LogStore::new(Arc::clone(&clock));
        if let Err(e) = store.set_max_lines(settings.max_lines) {
            tracing::warn!("{e}, using {} lines", store.max_lines());
        }
        Self {
            store,
            stream: StreamState::default(),
            clock,
            display_mode: settings.display_mode,
            show_timestamps: settings.show_timestamps,
            byte_count: 0,
            connected: false,
        }
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Start a fresh stream. Carry bytes from an earlier connection are never reused.
    pub fn connect(&mut self) {
        self.stream.reset();
        self.store.break_delta_chain();
        self.connected = true;
        tracing::info!("Console connected");
    }

    /// End the stream, keeping whatever partial line was buffered.
    ///
    /// Returns the line forced out of the pending buffer, if any.
    pub fn disconnect(&mut self) -> Option<LogLine> {
        let tail = self.stream.decoder.finish();
        self.push_text(&tail);
        let flushed = self.flush_partial();
        self.stream.reset();
        if self.connected {
            tracing::info!("Console disconnected after {} bytes", self.byte_count);
        }
        self.connected = false;
        flushed
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    // ========================================================================
    // Data path
    // ========================================================================

    /// Run one chunk through decode, timestamping and line assembly.
    ///
    /// Returns the lines completed by this chunk, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LogLine> {
        profiling::scope!("SerialConsole::feed");
        self.byte_count += chunk.len() as u64;

        let decoded = match self.display_mode {
            DisplayMode::Hex => self.decode_hex_rows(chunk),
            DisplayMode::Text => self.stream.decoder.decode(chunk, DisplayMode::Text),
        };
        if self.show_timestamps {
            let now = self.clock.now();
            let annotated = self.stream.annotator.annotate(&decoded, &now);
            self.push_text(&annotated)
        } else {
            self.stream.annotator.track(&decoded);
            self.push_text(&decoded)
        }
    }

    /// Force the pending partial line into the store
    pub fn flush_partial(&mut self) -> Option<LogLine> {
        if self.stream.pending_partial_line.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.stream.pending_partial_line);
        self.stream.annotator.reset();
        self.stream.hex_row_len = 0;
        Some(self.store.append(text))
    }

    /// Hex bytes never contain a line break, so rows are cut every
    /// `HEX_ROW_BYTES` bytes to keep the store bounded.
    fn decode_hex_rows(&mut self, chunk: &[u8]) -> String {
        let mut out = String::with_capacity(chunk.len() * 3 + chunk.len() / HEX_ROW_BYTES + 1);
        let mut rest = chunk;
        while !rest.is_empty() {
            let take = (HEX_ROW_BYTES - self.stream.hex_row_len).min(rest.len());
            let (row, tail) = rest.split_at(take);
            out.push_str(&self.stream.decoder.decode(row, DisplayMode::Hex));
            self.stream.hex_row_len += take;
            if self.stream.hex_row_len == HEX_ROW_BYTES {
                // Full row: the separator after the last byte becomes the line break
                out.pop();
                out.push('\n');
                self.stream.hex_row_len = 0;
            }
            rest = tail;
        }
        out
    }

    fn push_text(&mut self, text: &str) -> Vec<LogLine> {
        let mut completed = Vec::new();
        let mut rest = text;
        while let Some(idx) = rest.find('\n') {
            self.stream.pending_partial_line.push_str(&rest[..idx]);
            let line = std::mem::take(&mut self.stream.pending_partial_line);
            completed.push(self.store.append(line));
            rest = &rest[idx + 1..];
        }
        self.stream.pending_partial_line.push_str(rest);
        completed
    }

    // ========================================================================
    // User actions
    // ========================================================================

    pub fn clear(&mut self) {
        self.store.clear();
        self.stream.reset();
        self.byte_count = 0;
        tracing::debug!("Console cleared");
    }

    /// Replace the log with an imported blob and recompute its timing
    pub fn import(&mut self, blob: &[u8]) -> ImportSummary {
        self.stream.reset();
        self.byte_count = blob.len() as u64;
        import_into(&mut self.store, blob)
    }

    /// Everything currently shown, including an unfinished last line
    pub fn export(&self) -> Vec<u8> {
        let mut bytes = export_lines(self.store.get_all());
        if !self.stream.pending_partial_line.is_empty() {
            bytes.extend_from_slice(self.stream.pending_partial_line.as_bytes());
            bytes.push(b'\n');
        }
        bytes
    }

    /// Import a file from disk. On a read error the current log is left alone.
    pub async fn import_from_file(&mut self, path: &Path) -> Result<ImportSummary, LogFileError> {
        let blob = read_log_file(path).await?;
        Ok(self.import(&blob))
    }

    pub async fn export_to_file(&self, path: &Path) -> Result<(), LogFileError> {
        write_log_file(path, &self.export()).await
    }

    pub fn set_max_lines(&mut self, max_lines: usize) -> Result<usize, ConfigError> {
        self.store.set_max_lines(max_lines)
    }

    /// Switch hex/text display. A half-received character is flushed first.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Vec<LogLine> {
        if mode == self.display_mode {
            return Vec::new();
        }
        let tail = self.stream.decoder.finish();
        let completed = self.push_text(&tail);
        self.stream.hex_row_len = 0;
        self.display_mode = mode;
        tracing::debug!("Display mode set to {}", mode.name());
        completed
    }

    pub fn set_show_timestamps(&mut self, show: bool) {
        self.show_timestamps = show;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub const fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn pending_line(&self) -> &str {
        &self.stream.pending_partial_line
    }

    pub const fn stream(&self) -> &StreamState {
        &self.stream
    }

    pub const fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub const fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub const fn show_timestamps(&self) -> bool {
        self.show_timestamps
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Current live settings, for persisting
    pub fn settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            max_lines: self.store.max_lines(),
            display_mode: self.display_mode,
            show_timestamps: self.show_timestamps,
        }
    }
}
