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

//! The read loop: one cooperative task interleaving chunk reads and actions.
//!
//! A chunk is always processed to completion before the next read or action,
//! so the console never sees a half-applied chunk.

use crate::core::console::SerialConsole;
use crate::core::log_file::default_export_name;
use crate::core::sink::{LineSink, StatusLevel};
use crate::core::transmit::{PayloadKind, SendError, Transmitter};
use crate::input::actions::{help_text, ConsoleAction};
use std::fmt;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

pub const READ_CHUNK_SIZE: usize = 4096;

/// Why a read loop stopped
#[derive(Debug)]
pub enum SessionEnd {
    EndOfStream,
    Disconnected,
    ReadFailed(std::io::Error),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => write!(f, "end of stream"),
            Self::Disconnected => write!(f, "disconnected by user"),
            Self::ReadFailed(e) => write!(f, "read error: {e}"),
        }
    }
}

/// Connect `console`, then read `reader` until EOF, a read error or a
/// disconnect action.
///
/// Send actions go out through `transmitter`, and a running repeat fires
/// between chunks like any other action. The decoder carry and any partial
/// line are flushed into the store before returning. A closed action channel
/// stops action polling only.
pub async fn run_read_loop<R>(
    mut reader: R,
    console: &mut SerialConsole,
    transmitter: &mut Transmitter,
    actions: &mut mpsc::Receiver<ConsoleAction>,
    sink: &mut dyn LineSink,
) -> SessionEnd
where
    R: AsyncRead + Unpin,
{
    console.connect();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut actions_open = true;

    let end = loop {
        tokio::select! {
            biased;

            action = actions.recv(), if actions_open => {
                if let Some(action) = action {
                    let flow = dispatch(console, transmitter, action, sink).await;
                    if let ControlFlow::Break(end) = flow {
                        break end;
                    }
                } else {
                    tracing::debug!("Action channel closed, reading until end of stream");
                    actions_open = false;
                }
            }

            () = transmitter.repeat_tick(), if transmitter.is_repeating() => {
                if let Err(e) = transmitter.resend().await {
                    transmitter.stop_repeat();
                    tracing::warn!("Repeat stopped: {e}");
                    sink.status(StatusLevel::Error, &format!("{e}, repeat stopped"));
                }
            }

            read = reader.read(&mut buf) => {
                match read {
                    Ok(0) => break SessionEnd::EndOfStream,
                    Ok(n) => {
                        profiling::scope!("read_loop::chunk");
                        for line in console.feed(&buf[..n]) {
                            sink.line(&line);
                        }
                        sink.pending(console.pending_line());
                    }
                    Err(e) => {
                        tracing::warn!("Read failed: {e}");
                        sink.status(StatusLevel::Error, &format!("Read failed: {e}"));
                        break SessionEnd::ReadFailed(e);
                    }
                }
            }
        }
    };

    transmitter.stop_repeat();
    if let Some(line) = console.disconnect() {
        sink.line(&line);
    }
    sink.pending("");
    tracing::info!("Read loop finished: {end}");
    sink.status(StatusLevel::Info, &format!("Stream closed ({end})"));
    end
}

/// Apply one action to `console`, reporting results through `sink`
pub async fn dispatch(
    console: &mut SerialConsole,
    transmitter: &mut Transmitter,
    action: ConsoleAction,
    sink: &mut dyn LineSink,
) -> ControlFlow<SessionEnd> {
    tracing::debug!("Dispatching {action:?}");
    match action {
        ConsoleAction::Clear => {
            console.clear();
            sink.cleared();
            sink.pending("");
        }
        ConsoleAction::Import(path) => match console.import_from_file(&path).await {
            Ok(summary) => {
                sink.cleared();
                for line in console.store().get_all() {
                    sink.line(line);
                }
                sink.pending("");
                sink.status(
                    StatusLevel::Info,
                    &format!(
                        "Imported {} lines from {} ({} timestamped)",
                        summary.lines,
                        path.display(),
                        summary.timestamped
                    ),
                );
            }
            Err(e) => sink.status(StatusLevel::Error, &e.to_string()),
        },
        ConsoleAction::Export(path) => {
            let path = path
                .unwrap_or_else(|| PathBuf::from(default_export_name(&console.clock().now())));
            match console.export_to_file(&path).await {
                Ok(()) => sink.status(
                    StatusLevel::Info,
                    &format!("Exported log to {}", path.display()),
                ),
                Err(e) => sink.status(StatusLevel::Error, &e.to_string()),
            }
        }
        ConsoleAction::SetMaxLines(max_lines) => match console.set_max_lines(max_lines) {
            Ok(evicted) => sink.status(
                StatusLevel::Info,
                &format!("Keeping at most {max_lines} lines ({evicted} evicted)"),
            ),
            Err(e) => sink.status(StatusLevel::Warn, &e.to_string()),
        },
        ConsoleAction::SetDisplayMode(mode) => {
            for line in console.set_display_mode(mode) {
                sink.line(&line);
            }
            sink.pending(console.pending_line());
            sink.status(
                StatusLevel::Info,
                &format!("Display mode: {}", mode.name()),
            );
        }
        ConsoleAction::SetTimestamps(show) => {
            console.set_show_timestamps(show);
            sink.status(
                StatusLevel::Info,
                &format!("Timestamps {}", if show { "on" } else { "off" }),
            );
        }
        ConsoleAction::Send(text) => {
            let result = transmitter.send(&text, PayloadKind::Text).await;
            report_send(&result, sink);
        }
        ConsoleAction::SendHex(hex) => {
            let result = transmitter.send(&hex, PayloadKind::Hex).await;
            report_send(&result, sink);
        }
        ConsoleAction::SetAppendNewline(append) => {
            transmitter.set_append_newline(append);
            sink.status(
                StatusLevel::Info,
                &format!("CRLF suffix {}", if append { "on" } else { "off" }),
            );
        }
        ConsoleAction::Repeat(Some(period)) => match transmitter.start_repeat(period) {
            Ok(()) => sink.status(
                StatusLevel::Info,
                &format!("Repeating last payload every {period} ms"),
            ),
            Err(e) => sink.status(StatusLevel::Warn, &e.to_string()),
        },
        ConsoleAction::Repeat(None) => {
            let message = if transmitter.stop_repeat() {
                "Repeat stopped"
            } else {
                "Repeat was not running"
            };
            sink.status(StatusLevel::Info, message);
        }
        ConsoleAction::Status => {
            sink.status(StatusLevel::Info, &status_line(console, transmitter));
        }
        ConsoleAction::Help => sink.status(StatusLevel::Info, &help_text()),
        ConsoleAction::Disconnect => return ControlFlow::Break(SessionEnd::Disconnected),
    }
    ControlFlow::Continue(())
}

fn report_send(result: &Result<usize, SendError>, sink: &mut dyn LineSink) {
    match result {
        Ok(sent) => sink.status(StatusLevel::Info, &format!("Sent {sent} bytes")),
        Err(e @ SendError::Write(_)) => {
            tracing::warn!("{e}");
            sink.status(StatusLevel::Error, &e.to_string());
        }
        Err(e) => sink.status(StatusLevel::Warn, &e.to_string()),
    }
}

fn status_line(console: &SerialConsole, transmitter: &Transmitter) -> String {
    let store = console.store();
    format!(
        "{} lines (max {}), {} bytes in, {} bytes out, mode {}, timestamps {}, {}",
        store.len(),
        store.max_lines(),
        console.byte_count(),
        transmitter.bytes_sent(),
        console.display_mode().name(),
        if console.show_timestamps() { "on" } else { "off" },
        if console.is_connected() {
            "connected"
        } else {
            "disconnected"
        }
    )
}
