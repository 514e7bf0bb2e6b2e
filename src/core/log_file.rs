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

//! Plain-text import and export of captured logs.
//!
//! Export writes the raw line text only. Timing decorations are never part
//! of the file; they are recomputed from the `[HH:MM:SS/mmm]` tokens when the
//! file is imported again.

use crate::core::line::LogLine;
use crate::core::log_store::LogStore;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of an import, for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub lines: usize,
    pub timestamped: usize,
}

/// Raw text of `lines`, each terminated by `\n`.
///
/// Terminating the last line too keeps a trailing blank line intact across an
/// export/import cycle.
pub fn export_lines<'a>(lines: impl IntoIterator<Item = &'a LogLine>) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(line.raw_text.as_bytes());
        out.push(b'\n');
    }
    out
}

pub fn export_store(store: &LogStore) -> Vec<u8> {
    profiling::scope!("export_store");
    export_lines(store.get_all())
}

/// Split an imported blob into lines.
///
/// CRLF is accepted. The empty piece after a final newline is dropped, but
/// blank lines inside the text are kept so a re-export matches the input.
pub fn split_lines(text: &str) -> Vec<&str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Replace the store contents with the lines of `blob`.
///
/// The store is cleared first, so timing starts from a fresh session: the
/// first timestamp found in the blob becomes the new session start.
pub fn import_into(store: &mut LogStore, blob: &[u8]) -> ImportSummary {
    profiling::scope!("import_into");
    let text = String::from_utf8_lossy(blob);
    store.clear();

    let mut summary = ImportSummary::default();
    for raw in split_lines(&text) {
        let line = store.append(raw);
        summary.lines += 1;
        if line.annotated {
            summary.timestamped += 1;
        }
    }
    tracing::info!(
        "Imported {} lines ({} timestamped)",
        summary.lines,
        summary.timestamped
    );
    summary
}

pub async fn read_log_file(path: &Path) -> Result<Vec<u8>, LogFileError> {
    tokio::fs::read(path).await.map_err(|source| LogFileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn write_log_file(path: &Path, bytes: &[u8]) -> Result<(), LogFileError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| LogFileError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// File name used when the user does not pick one
pub fn default_export_name(now: &DateTime<Local>) -> String {
    format!("serial_log_{}.txt", now.format("%Y-%m-%dT%H-%M-%S"))
}
