/// `PortCrab` - A streaming serial log console
///
/// Copyright (C) 2025 Daniel Freiermuth
///
/// This program is free software: you can redistribute it and/or modify
/// it under the terms of the GNU General Public License as published by
/// the Free Software Foundation, either version 3 of the License, or
/// (at your option) any later version.
///
/// This program is distributed in the hope that it will be useful,
/// but WITHOUT ANY WARRANTY; without even the implied warranty of
/// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
/// GNU General Public License for more details.
///
/// You should have received a copy of the GNU General Public License
/// along with this program.  If not, see <https://www.gnu.org/licenses/>.
use anyhow::Context;
use clap::Parser;
use portcrab::app::{builtin_apps, AppRegistry, SERIAL_APP_ID};
use portcrab::config::{ConfigError, GlobalConfig};
use portcrab::core::reader::dispatch;
use portcrab::core::{run_read_loop, SerialConsole, SessionEnd, Transmitter};
use portcrab::input::ConsoleAction;
use portcrab::parser::{Clock, DisplayMode, SystemClock};
use portcrab::ui::TerminalView;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ram-profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "portcrab")]
#[command(author = "PortCrab Team")]
#[command(version = VERSION)]
#[command(about = "Timestamp and inspect serial logs from a device, socket or pipe", long_about = None)]
struct Args {
    /// Serial device or file to read (e.g. /dev/ttyUSB0), `-` for stdin
    #[arg(value_name = "SOURCE", conflicts_with = "connect")]
    source: Option<PathBuf>,

    /// Read from a TCP serial bridge such as ser2net
    #[arg(long, value_name = "HOST:PORT")]
    connect: Option<String>,

    /// Show received bytes as hex
    #[arg(long)]
    hex: bool,

    /// Do not prefix lines with their capture time
    #[arg(long)]
    no_timestamps: bool,

    /// Number of lines to keep
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Load a previously exported log before reading
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Write the log to FILE when the stream ends
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Disable colours
    #[arg(long)]
    plain: bool,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,

    /// Path for the DHAT heap profiling output (only used when built with --features ram-profiling)
    #[cfg(feature = "ram-profiling")]
    #[arg(
        long = "profile-output",
        value_name = "PROFILE_FILE",
        default_value = "dhat-heap.json"
    )]
    profile_output: PathBuf,
}

/// Where the byte stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    Path(PathBuf),
    Tcp(String),
    /// Only work on an imported file
    Offline,
}

impl Args {
    /// Fold command line overrides into the loaded configuration
    fn apply_to(&self, config: &mut GlobalConfig) -> Result<(), ConfigError> {
        if let Some(max_lines) = self.max_lines {
            config.console.max_lines = max_lines;
        }
        if self.hex {
            config.console.display_mode = DisplayMode::Hex;
        }
        if self.no_timestamps {
            config.console.show_timestamps = false;
        }
        if self.plain {
            config.color = false;
        }
        config.console.validate()
    }

    fn source(&self) -> Source {
        if let Some(addr) = &self.connect {
            return Source::Tcp(addr.clone());
        }
        match &self.source {
            Some(path) if path.as_os_str() == "-" => Source::Stdin,
            Some(path) => Source::Path(path.clone()),
            None if self.import.is_some() => Source::Offline,
            None => Source::Stdin,
        }
    }
}

fn init_logging() {
    // RUST_LOG overrides, e.g. RUST_LOG=portcrab=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Forward commands typed on stdin to the read loop
fn spawn_command_reader(tx: mpsc::Sender<ConsoleAction>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match ConsoleAction::parse(&line) {
                Ok(action) => {
                    if tx.send(action).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("{e}"),
            }
        }
        tracing::debug!("Command input closed");
    });
}

/// Devices and FIFOs get a second handle for sending; regular files stay read-only
async fn open_write_half(path: &Path) -> Transmitter {
    let is_regular_file = tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file());
    if is_regular_file {
        return Transmitter::read_only();
    }
    match tokio::fs::OpenOptions::new().write(true).open(path).await {
        Ok(file) => Transmitter::new(file),
        Err(e) => {
            tracing::warn!("{} is read-only ({e}), sending disabled", path.display());
            Transmitter::read_only()
        }
    }
}

async fn run(args: Args, mut config: GlobalConfig) -> anyhow::Result<()> {
    let mut registry = AppRegistry::new();
    for app in builtin_apps() {
        registry.register_app(app)?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = config.console.clone();
    let id = registry.open(SERIAL_APP_ID, |id| {
        tracing::debug!("Creating serial console {id}");
        SerialConsole::new(&settings, Arc::clone(&clock))
    })?;
    let console = registry
        .get_mut(id)
        .context("Serial console instance disappeared")?;

    let stdout_is_tty = std::io::stdout().is_terminal();
    let mut view = TerminalView::stdio(config.color && stdout_is_tty).with_live_pending(stdout_is_tty);

    let mut offline = Transmitter::read_only();
    if let Some(path) = &args.import {
        let import = ConsoleAction::Import(path.clone());
        let _ = dispatch(console, &mut offline, import, &mut view).await;
    }

    let source = args.source();
    let (tx, mut rx) = mpsc::channel(32);
    if matches!(source, Source::Path(_) | Source::Tcp(_)) {
        spawn_command_reader(tx);
    } else {
        // stdin carries data, so there is no command input
        drop(tx);
    }

    let end = match source {
        Source::Stdin => {
            tracing::info!("Reading from stdin");
            let stdin = tokio::io::stdin();
            Some(run_read_loop(stdin, console, &mut offline, &mut rx, &mut view).await)
        }
        Source::Path(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Cannot open {}", path.display()))?;
            let mut link = open_write_half(&path).await;
            tracing::info!("Reading from {}", path.display());
            Some(run_read_loop(file, console, &mut link, &mut rx, &mut view).await)
        }
        Source::Tcp(addr) => {
            let stream = tokio::net::TcpStream::connect(&addr)
                .await
                .with_context(|| format!("Cannot connect to {addr}"))?;
            tracing::info!("Connected to {addr}");
            let (read_half, write_half) = stream.into_split();
            let mut link = Transmitter::new(write_half);
            Some(run_read_loop(read_half, console, &mut link, &mut rx, &mut view).await)
        }
        Source::Offline => None,
    };

    if let Some(path) = args.export {
        let export = ConsoleAction::Export(Some(path));
        let _ = dispatch(console, &mut offline, export, &mut view).await;
    }

    if args.save_config {
        config.console = console.settings();
        let path = config.save()?;
        tracing::info!("Settings saved to {}", path.display());
    }

    registry.close(id);

    match end {
        Some(SessionEnd::ReadFailed(e)) => Err(e).context("Serial stream failed"),
        Some(SessionEnd::EndOfStream | SessionEnd::Disconnected) | None => Ok(()),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    tracing::info!("PortCrab starting up (version {VERSION})");

    let args = Args::parse();

    #[cfg(feature = "ram-profiling")]
    let _profiler = {
        tracing::info!("RAM profiling enabled, output: {:?}", args.profile_output);
        dhat::Profiler::builder()
            .file_name(args.profile_output.clone())
            .build()
    };

    #[cfg(feature = "cpu-profiling")]
    {
        tracing::info!("CPU profiling enabled with Tracy - run Tracy profiler to connect");
    }

    let mut config = GlobalConfig::load();
    args.apply_to(&mut config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(args, config));
    // A pending blocking read on stdin cannot be cancelled
    runtime.shutdown_background();
    result
}
