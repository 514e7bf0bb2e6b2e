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

use crate::core::line::{LogLine, SeverityBucket};
use crate::core::sink::{LineSink, StatusLevel};
use owo_colors::{OwoColorize, Style};
use std::borrow::Cow;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

/// Erase the current terminal row
const CLEAR_ROW: &str = "\r\x1b[2K";

/// Shown in front of a preview that lost its head to clipping
const CLIP_MARKER: char = '…';

/// Columns a tab may take up at most
const TAB_CELLS: usize = 8;

/// Room for the in-place pending preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewWidth {
    Unbounded,
    Columns(usize),
    /// Ask the terminal before every redraw, so resizes are picked up
    Terminal,
}

fn cell_width(ch: char) -> usize {
    if ch == '\t' {
        TAB_CELLS
    } else {
        ch.width().unwrap_or(0)
    }
}

/// Keep the tail of `text` that fits on one row of `columns` cells.
///
/// The last column stays free so the cursor never wraps; a single-row
/// preview is what `CLEAR_ROW` can erase.
pub fn clip_to_width(text: &str, columns: usize) -> Cow<'_, str> {
    let room = columns.saturating_sub(1);
    if text.chars().map(cell_width).sum::<usize>() <= room {
        return Cow::Borrowed(text);
    }
    let budget = room.saturating_sub(CLIP_MARKER.width().unwrap_or(1));
    let mut used = 0;
    let mut start = text.len();
    for (idx, ch) in text.char_indices().rev() {
        used += cell_width(ch);
        if used > budget {
            break;
        }
        start = idx;
    }
    Cow::Owned(format!("{CLIP_MARKER}{}", &text[start..]))
}

/// Colour for the timing decoration of a bucket
pub fn bucket_style(bucket: SeverityBucket) -> Style {
    match bucket {
        SeverityBucket::Normal => Style::new().truecolor(153, 153, 153),
        SeverityBucket::Low => Style::new().truecolor(33, 150, 243).bold(),
        SeverityBucket::Medium => Style::new().truecolor(255, 152, 0).bold(),
        SeverityBucket::High => Style::new().truecolor(244, 67, 54).bold(),
        SeverityBucket::Critical => Style::new().truecolor(156, 39, 176).bold(),
    }
}

/// One display row: timing decoration (if any) followed by the raw text
pub fn render_line(line: &LogLine, color: bool) -> String {
    match line.decoration() {
        Some(decoration) if color => format!(
            "{}{}",
            decoration.prefix().style(bucket_style(decoration.severity)),
            line.raw_text
        ),
        Some(decoration) => format!("{}{}", decoration.prefix(), line.raw_text),
        None => line.raw_text.clone(),
    }
}

/// Renders console output to a pair of writers: log rows to `out`, status
/// messages to `status_out`.
pub struct TerminalView<W: Write, S: Write> {
    out: W,
    status_out: S,
    color: bool,
    /// Redraw the unterminated line in place after every chunk
    live_pending: bool,
    preview_width: PreviewWidth,
    pending_drawn: bool,
    write_failed: bool,
}

impl TerminalView<io::Stdout, io::Stderr> {
    pub fn stdio(color: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), color).with_preview_width(PreviewWidth::Terminal)
    }
}

impl<W: Write, S: Write> TerminalView<W, S> {
    pub const fn new(out: W, status_out: S, color: bool) -> Self {
        Self {
            out,
            status_out,
            color,
            live_pending: false,
            preview_width: PreviewWidth::Unbounded,
            pending_drawn: false,
            write_failed: false,
        }
    }

    #[must_use]
    pub const fn with_live_pending(mut self, live_pending: bool) -> Self {
        self.live_pending = live_pending;
        self
    }

    #[must_use]
    pub const fn with_preview_width(mut self, preview_width: PreviewWidth) -> Self {
        self.preview_width = preview_width;
        self
    }

    fn preview_columns(&self) -> Option<usize> {
        match self.preview_width {
            PreviewWidth::Unbounded => None,
            PreviewWidth::Columns(columns) => Some(columns),
            PreviewWidth::Terminal => crossterm::terminal::size()
                .ok()
                .map(|(columns, _)| usize::from(columns)),
        }
    }

    pub fn into_writers(self) -> (W, S) {
        (self.out, self.status_out)
    }

    fn erase_pending(&mut self) {
        if self.pending_drawn {
            self.write_out(CLEAR_ROW);
            self.pending_drawn = false;
        }
    }

    fn write_out(&mut self, text: &str) {
        if self.write_failed {
            return;
        }
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            // Typically a closed pipe; stop writing rather than failing every line
            tracing::warn!("Output closed: {e}");
            self.write_failed = true;
        }
    }
}

impl<W: Write, S: Write> LineSink for TerminalView<W, S> {
    fn line(&mut self, line: &LogLine) {
        self.erase_pending();
        let mut row = render_line(line, self.color);
        row.push('\n');
        self.write_out(&row);
    }

    fn pending(&mut self, text: &str) {
        if !self.live_pending {
            return;
        }
        self.erase_pending();
        if !text.is_empty() {
            let shown = match self.preview_columns() {
                Some(columns) => clip_to_width(text, columns),
                None => Cow::Borrowed(text),
            };
            self.write_out(&shown);
            self.pending_drawn = true;
        }
    }

    fn cleared(&mut self) {
        self.erase_pending();
        self.status(StatusLevel::Info, "Log cleared");
    }

    fn status(&mut self, level: StatusLevel, message: &str) {
        let tag = match level {
            StatusLevel::Info => "info",
            StatusLevel::Warn => "warn",
            StatusLevel::Error => "error",
        };
        let result = if self.color {
            let style = match level {
                StatusLevel::Info => Style::new().dimmed(),
                StatusLevel::Warn => Style::new().yellow().bold(),
                StatusLevel::Error => Style::new().red().bold(),
            };
            writeln!(self.status_out, "{} {message}", format!("[{tag}]").style(style))
        } else {
            writeln!(self.status_out, "[{tag}] {message}")
        };
        if let Err(e) = result {
            tracing::warn!("Cannot write status message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(raw: &str, start: i64, prev: Option<i64>) -> LogLine {
        let mut line = LogLine::new(1, raw.to_string(), 0);
        line.delta_from_start_millis = Some(start);
        line.delta_from_prev_millis = prev;
        line.severity = prev.map_or(SeverityBucket::Normal, SeverityBucket::from_gap_millis);
        line.annotated = true;
        line
    }

    fn plain_view() -> TerminalView<Vec<u8>, Vec<u8>> {
        TerminalView::new(Vec::new(), Vec::new(), false)
    }

    fn output(view: TerminalView<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, status) = view.into_writers();
        (
            String::from_utf8(out).expect("utf8 output"),
            String::from_utf8(status).expect("utf8 status"),
        )
    }

    #[test]
    fn test_plain_rendering() {
        let line = timed("[10:00:01/500] boot", 1500, Some(1500));
        assert_eq!(
            render_line(&line, false),
            "T+1.500s   | +1.50s    [10:00:01/500] boot"
        );
        let untimed = LogLine::new(2, "no stamp".to_string(), 0);
        assert_eq!(render_line(&untimed, false), "no stamp");
    }

    #[test]
    fn test_color_only_on_decoration() {
        let line = timed("[10:00:00/350] x", 350, Some(350));
        let rendered = render_line(&line, true);
        assert!(rendered.starts_with("\x1b["));
        assert!(rendered.ends_with("[10:00:00/350] x"));
        assert!(rendered.contains("T+0.350s"));
    }

    #[test]
    fn test_bucket_styles_differ() {
        let buckets = [
            SeverityBucket::Normal,
            SeverityBucket::Low,
            SeverityBucket::Medium,
            SeverityBucket::High,
            SeverityBucket::Critical,
        ];
        let rendered: Vec<String> = buckets
            .iter()
            .map(|b| "x".style(bucket_style(*b)).to_string())
            .collect();
        for (i, a) in rendered.iter().enumerate() {
            for b in &rendered[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_sink_writes_lines_and_status_separately() {
        let mut view = plain_view();
        view.line(&LogLine::new(1, "hello".to_string(), 0));
        view.status(StatusLevel::Error, "Read failed");
        view.cleared();

        let (out, status) = output(view);
        assert_eq!(out, "hello\n");
        assert_eq!(status, "[error] Read failed\n[info] Log cleared\n");
    }

    #[test]
    fn test_live_pending_is_redrawn_in_place() {
        let mut view = plain_view().with_live_pending(true);
        view.pending("par");
        view.pending("partial");
        view.line(&LogLine::new(1, "partial line".to_string(), 0));

        let (out, _) = output(view);
        assert_eq!(out, "par\r\x1b[2Kpartial\r\x1b[2Kpartial line\n");
    }

    #[test]
    fn test_clip_keeps_the_newest_text() {
        assert_eq!(clip_to_width("short", 80), "short");
        assert_eq!(clip_to_width("0123456789abcdef", 10), "…89abcdef");
        // Wide characters take two cells each
        assert_eq!(clip_to_width("日本語テキスト", 7), "…スト");
        assert_eq!(clip_to_width("a\tb", 4), "…b");
    }

    #[test]
    fn test_long_pending_line_never_wraps() {
        let mut view = plain_view()
            .with_live_pending(true)
            .with_preview_width(PreviewWidth::Columns(12));
        let long = "41 ".repeat(40);
        view.pending(&long);
        view.pending(&format!("{long}42 "));
        view.line(&LogLine::new(1, format!("{long}42"), 0));

        let (out, _) = output(view);
        let rows: Vec<&str> = out.split(CLEAR_ROW).collect();
        assert_eq!(rows.len(), 3);
        for preview in &rows[..2] {
            assert!(preview.chars().count() < 12, "{preview:?} would wrap");
            assert!(preview.starts_with(CLIP_MARKER));
        }
        assert!(rows[1].ends_with("42 "));
        // Finished lines are printed in full
        assert_eq!(rows[2].len(), long.len() + 3);
    }

    #[test]
    fn test_pending_ignored_without_live_mode() {
        let mut view = plain_view();
        view.pending("partial");
        let (out, _) = output(view);
        assert!(out.is_empty());
    }
}
