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

pub mod console;
pub mod delta;
pub mod line;
pub mod log_file;
pub mod log_store;
pub mod reader;
pub mod sink;
pub mod transmit;

pub use console::SerialConsole;
pub use line::{Decoration, LogLine, SeverityBucket};
pub use log_file::{ImportSummary, LogFileError};
pub use log_store::LogStore;
pub use reader::{run_read_loop, SessionEnd};
pub use sink::{LineSink, StatusLevel};
pub use transmit::{PayloadKind, SendError, Transmitter};
