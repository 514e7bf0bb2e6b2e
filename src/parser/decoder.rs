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

//! Streaming byte decoder for incoming serial chunks.
//!
//! Chunks arrive with arbitrary boundaries, so a multi-byte UTF-8 character
//! may be split across two reads. The decoder keeps the undecoded tail and
//! prepends it to the next chunk.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const REPLACEMENT: char = '\u{FFFD}';

/// How raw bytes are turned into display text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Every byte as two uppercase hex digits followed by a space
    Hex,
    /// Streaming UTF-8 decode
    #[default]
    Text,
}

impl DisplayMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hex" => Some(Self::Hex),
            "text" | "utf8" | "utf-8" => Some(Self::Text),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Text => "text",
        }
    }
}

/// Byte-to-text decoder with carry state for split UTF-8 sequences
#[derive(Debug, Default)]
pub struct ByteDecoder {
    carry: Vec<u8>,
}

impl ByteDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk. Carriage returns are dropped from the output.
    pub fn decode(&mut self, chunk: &[u8], mode: DisplayMode) -> String {
        let mut out = match mode {
            DisplayMode::Hex => encode_hex(chunk),
            DisplayMode::Text => self.decode_text(chunk),
        };
        out.retain(|c| c != '\r');
        out
    }

    /// Bytes held back because the last chunk ended mid-character
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Flush a dangling partial character as a single replacement character
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            String::new()
        } else {
            tracing::trace!(
                "Flushing {} undecodable carry bytes as replacement",
                self.carry.len()
            );
            self.carry.clear();
            REPLACEMENT.to_string()
        }
    }

    /// Drop carry state without emitting anything
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    fn decode_text(&mut self, chunk: &[u8]) -> String {
        let input: Vec<u8> = if self.carry.is_empty() {
            chunk.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(chunk);
            joined
        };

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // Prefix up to valid_up_to() is known to be valid
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            rest = &after[bad..];
                        }
                        None => {
                            // Incomplete sequence at the end: keep it for the next chunk
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

fn encode_hex(chunk: &[u8]) -> String {
    let mut out = String::with_capacity(chunk.len() * 3);
    for byte in chunk {
        let _ = write!(out, "{byte:02X} ");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_mode() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(&[0x0a, 0xff, 0x00], DisplayMode::Hex), "0A FF 00 ");
        assert_eq!(decoder.decode(&[0x41], DisplayMode::Hex), "41 ");
        assert!(decoder.carry().is_empty());
    }

    #[test]
    fn test_hex_keeps_carriage_return_byte() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(b"\r\n", DisplayMode::Hex), "0D 0A ");
    }

    #[test]
    fn test_split_three_byte_character() {
        // "€" is E2 82 AC
        let whole = "a€b".as_bytes();
        let mut unsplit = ByteDecoder::new();
        let expected = unsplit.decode(whole, DisplayMode::Text);

        let mut split = ByteDecoder::new();
        let mut got = split.decode(&whole[..2], DisplayMode::Text);
        assert_eq!(split.carry(), &[0xE2]);
        got.push_str(&split.decode(&whole[2..], DisplayMode::Text));

        assert_eq!(got, expected);
        assert_eq!(got, "a€b");
        assert!(split.carry().is_empty());
    }

    #[test]
    fn test_split_byte_by_byte() {
        let whole = "日本語 ok".as_bytes();
        let mut decoder = ByteDecoder::new();
        let got: String = whole
            .iter()
            .map(|b| decoder.decode(std::slice::from_ref(b), DisplayMode::Text))
            .collect();
        assert_eq!(got, "日本語 ok");
    }

    #[test]
    fn test_malformed_bytes_are_replaced() {
        let mut decoder = ByteDecoder::new();
        let got = decoder.decode(&[b'a', 0xFF, b'b', 0xC3, 0x28], DisplayMode::Text);
        assert_eq!(got, "a\u{FFFD}b\u{FFFD}(");
        assert!(decoder.carry().is_empty());
    }

    #[test]
    fn test_finish_flushes_dangling_carry() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x82], DisplayMode::Text), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        let mut decoder = ByteDecoder::new();
        assert_eq!(decoder.decode(b"ok\r\nnext\r", DisplayMode::Text), "ok\nnext");
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(DisplayMode::from_name("HEX"), Some(DisplayMode::Hex));
        assert_eq!(DisplayMode::from_name("utf8"), Some(DisplayMode::Text));
        assert_eq!(DisplayMode::from_name("binary"), None);
        assert_eq!(DisplayMode::Hex.name(), "hex");
    }
}
