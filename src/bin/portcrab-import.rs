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

//! Re-time an exported serial log without opening a stream.
//!
//! Prints every line with its timing decoration, or one JSON object per line.

use anyhow::Context;
use clap::Parser;
use portcrab::core::log_file::{import_into, read_log_file};
use portcrab::core::{LogStore, SeverityBucket};
use portcrab::parser::SystemClock;
use portcrab::ui::render_line;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portcrab-import")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
#[command(about = "Recompute timing deltas for an exported serial log", long_about = None)]
struct Args {
    /// Exported log file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Emit JSON lines instead of decorated text
    #[arg(long)]
    json: bool,

    /// Disable colours
    #[arg(long)]
    plain: bool,

    /// Only keep the newest N lines
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Print per-bucket gap counts to stderr
    #[arg(long)]
    summary: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let blob = read_log_file(&args.file).await?;
    let mut store = LogStore::new(Arc::new(SystemClock));
    // Without a cap the whole file is kept
    let cap = args.max_lines.unwrap_or(usize::MAX / 2);
    store.set_max_lines(cap)?;
    let imported = import_into(&mut store, &blob);
    // Import trims with slack; settle on the exact cap
    store.set_max_lines(cap)?;

    let stdout = std::io::stdout();
    let color = !args.plain && stdout.is_terminal();
    let mut out = stdout.lock();
    for line in store.get_all() {
        if args.json {
            let json = serde_json::to_string(line).context("Failed to serialize line")?;
            writeln!(out, "{json}")?;
        } else {
            writeln!(out, "{}", render_line(line, color))?;
        }
    }
    out.flush()?;

    if args.summary {
        let mut counts = [0usize; 5];
        for line in store.get_all().filter(|l| l.delta_from_prev_millis.is_some()) {
            counts[line.severity as usize] += 1;
        }
        eprintln!(
            "{} lines, {} timestamped",
            imported.lines, imported.timestamped
        );
        for bucket in [
            SeverityBucket::Normal,
            SeverityBucket::Low,
            SeverityBucket::Medium,
            SeverityBucket::High,
            SeverityBucket::Critical,
        ] {
            eprintln!("  {:<9} {}", bucket.name(), counts[bucket as usize]);
        }
    }
    Ok(())
}
