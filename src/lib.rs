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


//! `PortCrab` - a streaming serial log console.
//!
//! Bytes from a serial device, socket or pipe are decoded, optionally
//! timestamped, split into lines and kept in a bounded store. Lines that
//! carry a `[HH:MM:SS/mmm]` token get timing deltas and a severity bucket
//! for the gap since the previous line.

pub mod app;
pub mod config;
pub mod core;
pub mod input;
pub mod parser;
pub mod ui;
