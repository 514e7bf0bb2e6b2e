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

use crate::core::transmit::{MAX_REPEAT_MILLIS, MIN_REPEAT_MILLIS};
use crate::parser::DisplayMode;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of argument an action takes on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    /// Optional file path
    OptionalPath,
    /// Required file path
    Path,
    /// Positive integer
    Count,
    /// `hex` or `text`
    Mode,
    /// `on` or `off`
    Toggle,
    /// The rest of the line, surrounding whitespace trimmed
    Data,
    /// Period in milliseconds, or `off`
    Period,
}

/// Console actions that can be triggered by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    Clear,
    Export,
    Import,
    MaxLines,
    Mode,
    Timestamps,
    Status,
    Send,
    SendHex,
    AppendNewline,
    Repeat,
    Disconnect,
    Help,
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy)]
pub struct ActionEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub action: ActionName,
    pub arg: ArgKind,
    pub description: &'static str,
}

/// Every console action, keyed by name
pub const ACTION_TABLE: &[ActionEntry] = &[
    ActionEntry {
        name: "clear",
        aliases: &["cls"],
        action: ActionName::Clear,
        arg: ArgKind::None,
        description: "Remove all captured lines and restart the session",
    },
    ActionEntry {
        name: "export",
        aliases: &["save"],
        action: ActionName::Export,
        arg: ArgKind::OptionalPath,
        description: "Write the log as plain text (default: serial_log_<time>.txt)",
    },
    ActionEntry {
        name: "import",
        aliases: &["load"],
        action: ActionName::Import,
        arg: ArgKind::Path,
        description: "Replace the log with a text file and recompute its timing",
    },
    ActionEntry {
        name: "max-lines",
        aliases: &["max"],
        action: ActionName::MaxLines,
        arg: ArgKind::Count,
        description: "Set the line cap and trim immediately",
    },
    ActionEntry {
        name: "mode",
        aliases: &[],
        action: ActionName::Mode,
        arg: ArgKind::Mode,
        description: "Display incoming bytes as hex or text",
    },
    ActionEntry {
        name: "timestamps",
        aliases: &["ts"],
        action: ActionName::Timestamps,
        arg: ArgKind::Toggle,
        description: "Prefix each new line with its capture time",
    },
    ActionEntry {
        name: "status",
        aliases: &["stat"],
        action: ActionName::Status,
        arg: ArgKind::None,
        description: "Show line count, byte count and settings",
    },
    ActionEntry {
        name: "send",
        aliases: &["tx"],
        action: ActionName::Send,
        arg: ArgKind::Data,
        description: "Send text to the device",
    },
    ActionEntry {
        name: "send-hex",
        aliases: &["txh"],
        action: ActionName::SendHex,
        arg: ArgKind::Data,
        description: "Send hex bytes, e.g. 'send-hex 0D 0A' (non-hex characters are skipped)",
    },
    ActionEntry {
        name: "crlf",
        aliases: &["append-newline"],
        action: ActionName::AppendNewline,
        arg: ArgKind::Toggle,
        description: "Append CR LF to text sent with 'send'",
    },
    ActionEntry {
        name: "repeat",
        aliases: &["loop"],
        action: ActionName::Repeat,
        arg: ArgKind::Period,
        description: "Resend the last payload every <ms> (50-60000), or stop with 'off'",
    },
    ActionEntry {
        name: "disconnect",
        aliases: &["quit", "exit"],
        action: ActionName::Disconnect,
        arg: ArgKind::None,
        description: "Stop reading and close the stream",
    },
    ActionEntry {
        name: "help",
        aliases: &["?"],
        action: ActionName::Help,
        arg: ArgKind::None,
        description: "List available commands",
    },
];

/// Look up a table row by name or alias (case-insensitive, leading ':' allowed)
pub fn lookup(name: &str) -> Option<&'static ActionEntry> {
    let name = name.trim_start_matches(':').to_ascii_lowercase();
    ACTION_TABLE
        .iter()
        .find(|entry| entry.name == name || entry.aliases.contains(&name.as_str()))
}

/// A fully parsed console action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    Clear,
    Export(Option<PathBuf>),
    Import(PathBuf),
    SetMaxLines(usize),
    SetDisplayMode(DisplayMode),
    SetTimestamps(bool),
    Status,
    Send(String),
    SendHex(String),
    SetAppendNewline(bool),
    /// Start repeating every N ms, or stop with `None`
    Repeat(Option<u64>),
    Disconnect,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{name}' expects {expected}")]
    BadArgument {
        name: &'static str,
        expected: &'static str,
    },
}

impl ConsoleAction {
    /// Parse a command line such as `max-lines 500` or `:export out.txt`
    pub fn parse(input: &str) -> Result<Self, ActionParseError> {
        let input = input.trim();
        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map_or((input, ""), |(w, r)| (w, r.trim()));
        if word.is_empty() || word == ":" {
            return Err(ActionParseError::Empty);
        }

        let entry = lookup(word).ok_or_else(|| ActionParseError::Unknown(word.to_string()))?;
        let bad = |expected| ActionParseError::BadArgument {
            name: entry.name,
            expected,
        };

        let arg = match entry.arg {
            ArgKind::None if rest.is_empty() => Arg::None,
            ArgKind::None => return Err(bad("no argument")),
            ArgKind::OptionalPath | ArgKind::Path if !rest.is_empty() => {
                Arg::Path(PathBuf::from(rest))
            }
            ArgKind::Path => return Err(bad("a file path")),
            ArgKind::OptionalPath => Arg::None,
            ArgKind::Count => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Arg::Count(n),
                _ => return Err(bad("a positive integer")),
            },
            ArgKind::Mode => DisplayMode::from_name(rest)
                .map(Arg::Mode)
                .ok_or_else(|| bad("'hex' or 'text'"))?,
            ArgKind::Toggle => match rest.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" | "yes" => Arg::Toggle(true),
                "off" | "false" | "0" | "no" => Arg::Toggle(false),
                _ => return Err(bad("'on' or 'off'")),
            },
            ArgKind::Data if !rest.is_empty() => Arg::Data(rest.to_string()),
            ArgKind::Data => return Err(bad("something to send")),
            ArgKind::Period => match rest.to_ascii_lowercase().as_str() {
                "off" | "stop" => Arg::Period(None),
                period => match period.parse::<u64>() {
                    Ok(ms) if (MIN_REPEAT_MILLIS..=MAX_REPEAT_MILLIS).contains(&ms) => {
                        Arg::Period(Some(ms))
                    }
                    _ => return Err(bad("'off' or a period of 50-60000 ms")),
                },
            },
        };

        Ok(match (entry.action, arg) {
            (ActionName::Clear, _) => Self::Clear,
            (ActionName::Export, Arg::Path(path)) => Self::Export(Some(path)),
            (ActionName::Export, _) => Self::Export(None),
            (ActionName::Import, Arg::Path(path)) => Self::Import(path),
            (ActionName::MaxLines, Arg::Count(n)) => Self::SetMaxLines(n),
            (ActionName::Mode, Arg::Mode(mode)) => Self::SetDisplayMode(mode),
            (ActionName::Timestamps, Arg::Toggle(on)) => Self::SetTimestamps(on),
            (ActionName::Status, _) => Self::Status,
            (ActionName::Send, Arg::Data(text)) => Self::Send(text),
            (ActionName::SendHex, Arg::Data(hex)) => Self::SendHex(hex),
            (ActionName::AppendNewline, Arg::Toggle(on)) => Self::SetAppendNewline(on),
            (ActionName::Repeat, Arg::Period(period)) => Self::Repeat(period),
            (ActionName::Disconnect, _) => Self::Disconnect,
            (ActionName::Help, _) => Self::Help,
            (
                ActionName::Import
                | ActionName::MaxLines
                | ActionName::Mode
                | ActionName::Timestamps
                | ActionName::Send
                | ActionName::SendHex
                | ActionName::AppendNewline
                | ActionName::Repeat,
                _,
            ) => return Err(bad("a valid argument")),
        })
    }

    pub const fn name(&self) -> ActionName {
        match self {
            Self::Clear => ActionName::Clear,
            Self::Export(_) => ActionName::Export,
            Self::Import(_) => ActionName::Import,
            Self::SetMaxLines(_) => ActionName::MaxLines,
            Self::SetDisplayMode(_) => ActionName::Mode,
            Self::SetTimestamps(_) => ActionName::Timestamps,
            Self::Status => ActionName::Status,
            Self::Send(_) => ActionName::Send,
            Self::SendHex(_) => ActionName::SendHex,
            Self::SetAppendNewline(_) => ActionName::AppendNewline,
            Self::Repeat(_) => ActionName::Repeat,
            Self::Disconnect => ActionName::Disconnect,
            Self::Help => ActionName::Help,
        }
    }
}

enum Arg {
    None,
    Path(PathBuf),
    Count(usize),
    Mode(DisplayMode),
    Toggle(bool),
    Data(String),
    Period(Option<u64>),
}

/// Help text generated from the table
pub fn help_text() -> String {
    ACTION_TABLE
        .iter()
        .map(|entry| {
            let arg = match entry.arg {
                ArgKind::None => "",
                ArgKind::OptionalPath => " [path]",
                ArgKind::Path => " <path>",
                ArgKind::Count => " <n>",
                ArgKind::Mode => " hex|text",
                ArgKind::Toggle => " on|off",
                ArgKind::Data => " <data>",
                ArgKind::Period => " <ms>|off",
            };
            format!("  {:<24} {}", format!("{}{arg}", entry.name), entry.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ConsoleAction::parse("clear"), Ok(ConsoleAction::Clear));
        assert_eq!(ConsoleAction::parse(":CLS"), Ok(ConsoleAction::Clear));
        assert_eq!(ConsoleAction::parse("quit"), Ok(ConsoleAction::Disconnect));
        assert_eq!(ConsoleAction::parse("  status  "), Ok(ConsoleAction::Status));
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            ConsoleAction::parse("max-lines 500"),
            Ok(ConsoleAction::SetMaxLines(500))
        );
        assert_eq!(
            ConsoleAction::parse("mode hex"),
            Ok(ConsoleAction::SetDisplayMode(DisplayMode::Hex))
        );
        assert_eq!(
            ConsoleAction::parse("ts off"),
            Ok(ConsoleAction::SetTimestamps(false))
        );
        assert_eq!(
            ConsoleAction::parse("export my log.txt"),
            Ok(ConsoleAction::Export(Some(PathBuf::from("my log.txt"))))
        );
        assert_eq!(ConsoleAction::parse("export"), Ok(ConsoleAction::Export(None)));
        assert_eq!(
            ConsoleAction::parse("import capture.txt"),
            Ok(ConsoleAction::Import(PathBuf::from("capture.txt")))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(ConsoleAction::parse(""), Err(ActionParseError::Empty));
        assert!(matches!(
            ConsoleAction::parse("reboot"),
            Err(ActionParseError::Unknown(_))
        ));
        assert!(matches!(
            ConsoleAction::parse("max-lines 0"),
            Err(ActionParseError::BadArgument { name: "max-lines", .. })
        ));
        assert!(matches!(
            ConsoleAction::parse("max-lines -3"),
            Err(ActionParseError::BadArgument { .. })
        ));
        assert!(matches!(
            ConsoleAction::parse("import"),
            Err(ActionParseError::BadArgument { name: "import", .. })
        ));
        assert!(matches!(
            ConsoleAction::parse("clear now"),
            Err(ActionParseError::BadArgument { .. })
        ));
        assert!(matches!(
            ConsoleAction::parse("mode binary"),
            Err(ActionParseError::BadArgument { .. })
        ));
    }

    #[test]
    fn test_parse_send_commands() {
        assert_eq!(
            ConsoleAction::parse("send AT+RST"),
            Ok(ConsoleAction::Send("AT+RST".to_string()))
        );
        assert_eq!(
            ConsoleAction::parse("txh 0D 0A"),
            Ok(ConsoleAction::SendHex("0D 0A".to_string()))
        );
        assert_eq!(
            ConsoleAction::parse("crlf on"),
            Ok(ConsoleAction::SetAppendNewline(true))
        );
        assert_eq!(
            ConsoleAction::parse("repeat 1000"),
            Ok(ConsoleAction::Repeat(Some(1000)))
        );
        assert_eq!(ConsoleAction::parse("loop off"), Ok(ConsoleAction::Repeat(None)));
        assert!(matches!(
            ConsoleAction::parse("send"),
            Err(ActionParseError::BadArgument { name: "send", .. })
        ));
        assert!(matches!(
            ConsoleAction::parse("repeat 10"),
            Err(ActionParseError::BadArgument { name: "repeat", .. })
        ));
    }

    #[test]
    fn test_table_names_are_unique() {
        let mut names: Vec<&str> = ACTION_TABLE
            .iter()
            .flat_map(|s| std::iter::once(s.name).chain(s.aliases.iter().copied()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_parsed_action_maps_back_to_table() {
        for entry in ACTION_TABLE {
            if entry.arg == ArgKind::None || entry.arg == ArgKind::OptionalPath {
                let action = ConsoleAction::parse(entry.name).expect("argument-free parse");
                assert_eq!(action.name(), entry.action);
            }
        }
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for entry in ACTION_TABLE {
            assert!(help.contains(entry.name));
        }
    }
}
