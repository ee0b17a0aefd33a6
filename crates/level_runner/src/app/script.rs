use std::str::FromStr;

use scene_core::{GridPos, ObjectId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptCommand {
    Activate(ObjectId),
    Deactivate(ObjectId),
    Interact(ObjectId),
    Enter(ObjectId),
    Exit(ObjectId),
    Tile { tile: GridPos, layer: usize },
    /// `None` means one configured tick step.
    Tick(Option<f32>),
    Path {
        layer: usize,
        from: GridPos,
        to: GridPos,
    },
    FinishAll,
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: ScriptCommand,
}

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{word}'")]
    UnknownCommand { line: usize, word: String },
    #[error("line {line}: '{command}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        line: usize,
        command: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("line {line}: '{value}' is not a valid {what}")]
    InvalidArgument {
        line: usize,
        what: &'static str,
        value: String,
    },
}

pub fn parse_script(source: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    source
        .lines()
        .enumerate()
        .map(|(index, raw)| (index + 1, strip_comment(raw).trim()))
        .filter(|(_, text)| !text.is_empty())
        .map(|(line, text)| {
            parse_line(line, text).map(|command| ScriptLine { line, command })
        })
        .collect()
}

fn strip_comment(raw: &str) -> &str {
    raw.split_once('#').map_or(raw, |(before, _)| before)
}

fn parse_line(line: usize, text: &str) -> Result<ScriptCommand, ScriptError> {
    let mut words = text.split_whitespace();
    let word = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let args = Args { line, args: &args };

    let command = match word {
        "activate" => ScriptCommand::Activate(args.object("activate")?),
        "deactivate" => ScriptCommand::Deactivate(args.object("deactivate")?),
        "interact" => ScriptCommand::Interact(args.object("interact")?),
        "enter" => ScriptCommand::Enter(args.object("enter")?),
        "exit" => ScriptCommand::Exit(args.object("exit")?),
        "tile" => {
            args.require_count("tile", 3)?;
            ScriptCommand::Tile {
                tile: GridPos::new(args.value(0, "tile x")?, args.value(1, "tile y")?),
                layer: args.value(2, "layer index")?,
            }
        }
        "tick" => match args.args.len() {
            0 => ScriptCommand::Tick(None),
            1 => {
                let seconds: f32 = args.value(0, "duration in seconds")?;
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err(args.invalid(0, "duration in seconds"));
                }
                ScriptCommand::Tick(Some(seconds))
            }
            actual => {
                return Err(ScriptError::ArgumentCount {
                    line,
                    command: "tick",
                    expected: 1,
                    actual,
                })
            }
        },
        "path" => {
            args.require_count("path", 5)?;
            ScriptCommand::Path {
                layer: args.value(0, "layer index")?,
                from: GridPos::new(args.value(1, "tile x")?, args.value(2, "tile y")?),
                to: GridPos::new(args.value(3, "tile x")?, args.value(4, "tile y")?),
            }
        }
        "finish-all" => {
            args.require_count("finish-all", 0)?;
            ScriptCommand::FinishAll
        }
        "save" => {
            args.require_count("save", 0)?;
            ScriptCommand::Save
        }
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                word: other.to_string(),
            })
        }
    };
    Ok(command)
}

struct Args<'a> {
    line: usize,
    args: &'a [&'a str],
}

impl Args<'_> {
    fn require_count(&self, command: &'static str, expected: usize) -> Result<(), ScriptError> {
        if self.args.len() == expected {
            Ok(())
        } else {
            Err(ScriptError::ArgumentCount {
                line: self.line,
                command,
                expected,
                actual: self.args.len(),
            })
        }
    }

    fn object(&self, command: &'static str) -> Result<ObjectId, ScriptError> {
        self.require_count(command, 1)?;
        self.value(0, "object id").map(ObjectId)
    }

    fn value<T: FromStr>(&self, index: usize, what: &'static str) -> Result<T, ScriptError> {
        self.args
            .get(index)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| self.invalid(index, what))
    }

    fn invalid(&self, index: usize, what: &'static str) -> ScriptError {
        ScriptError::InvalidArgument {
            line: self.line,
            what,
            value: self.args.get(index).copied().unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped_and_lines_keep_numbers() {
        let script = "# warm up\n\nactivate 3\n  interact 3   # the switch\ntick\ntick 0.5\n";
        let lines = parse_script(script).expect("parse");
        assert_eq!(
            lines,
            vec![
                ScriptLine {
                    line: 3,
                    command: ScriptCommand::Activate(ObjectId(3)),
                },
                ScriptLine {
                    line: 4,
                    command: ScriptCommand::Interact(ObjectId(3)),
                },
                ScriptLine {
                    line: 5,
                    command: ScriptCommand::Tick(None),
                },
                ScriptLine {
                    line: 6,
                    command: ScriptCommand::Tick(Some(0.5)),
                },
            ]
        );
    }

    #[test]
    fn positional_commands_parse_their_coordinates() {
        let lines = parse_script("tile 4 -1 2\npath 0 1 1 7 6\nfinish-all\nsave\nexit 9")
            .expect("parse");
        let commands: Vec<ScriptCommand> = lines.into_iter().map(|line| line.command).collect();
        assert_eq!(
            commands,
            vec![
                ScriptCommand::Tile {
                    tile: GridPos::new(4, -1),
                    layer: 2,
                },
                ScriptCommand::Path {
                    layer: 0,
                    from: GridPos::new(1, 1),
                    to: GridPos::new(7, 6),
                },
                ScriptCommand::FinishAll,
                ScriptCommand::Save,
                ScriptCommand::Exit(ObjectId(9)),
            ]
        );
    }

    #[test]
    fn malformed_lines_report_where_and_why() {
        assert_eq!(
            parse_script("activate 1\njump 2"),
            Err(ScriptError::UnknownCommand {
                line: 2,
                word: "jump".to_string(),
            })
        );
        assert_eq!(
            parse_script("interact"),
            Err(ScriptError::ArgumentCount {
                line: 1,
                command: "interact",
                expected: 1,
                actual: 0,
            })
        );
        assert_eq!(
            parse_script("enter 70000"),
            Err(ScriptError::InvalidArgument {
                line: 1,
                what: "object id",
                value: "70000".to_string(),
            })
        );
        assert!(matches!(
            parse_script("tick -2"),
            Err(ScriptError::InvalidArgument { line: 1, .. })
        ));
    }
}
