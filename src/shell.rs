//! Line-oriented command shell for driving a [`Game`].
//!
//! The protocol follows GTP conventions: each line is an optional numeric id
//! followed by a command and its arguments. Successful responses start with
//! `=`, failures with `?`, and every response ends with a blank line.
//!
//! ## Commands
//!
//! - `name`, `version`, `list_commands`, `known_command <cmd>`, `quit`
//! - `new [size] [handicap] [komi]` - Start a new game
//! - `open <file>`, `save [file]`, `save_flipped <file>` - Game records
//! - `play <vertex>|pass` - Play for the side to move (an optional color
//!   argument before the vertex must match it)
//! - `undo`, `redo`, `start`, `end` - Navigate the current line
//! - `branch [index]`, `branch_up`, `branch_down` - Inspect and edit branches
//! - `cut`, `paste` - Move subtrees around
//! - `mark <kind> <vertex>`, `unmark <kind> <vertex>`, `marks` - Adornments
//! - `comment [text]` - Show or replace the comment at the cursor
//! - `game_info [field value]` - Show the game information, or set one of
//!   `black`, `white`, `komi` or `comment`
//! - `path`, `goto <i,j,...>` - Address positions by branch indices
//! - `showboard`, `status`, `tree`, `sgf` - Display state

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};

use crate::adornments::{Adornment, AdornmentKind, Mark};
use crate::board::{Color, parse_vertex, vertex_name};
use crate::constants::{APP_NAME, DEFAULT_KOMI};
use crate::game::{Game, GameOptions, ReplayOutcome};
use crate::layout::TreeLayout;
use crate::path::MovePath;
use crate::tree::NodeRef;

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "branch",
    "branch_down",
    "branch_up",
    "comment",
    "cut",
    "end",
    "game_info",
    "goto",
    "known_command",
    "list_commands",
    "mark",
    "marks",
    "name",
    "new",
    "open",
    "paste",
    "path",
    "play",
    "quit",
    "redo",
    "save",
    "save_flipped",
    "sgf",
    "showboard",
    "start",
    "status",
    "tree",
    "undo",
    "unmark",
    "version",
];

pub struct Shell {
    game: Game,
}

impl Shell {
    pub fn new(game: Game) -> Self {
        Self { game }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
        for line in input.lines() {
            let line = line.context("reading command")?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let (command, rest) = match command_line.split_once(char::is_whitespace) {
                Some((command, rest)) => (command.to_lowercase(), rest.trim()),
                None => (command_line.to_lowercase(), ""),
            };
            if command.is_empty() {
                continue;
            }

            let (success, message) = self.execute(&command, rest);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(trimmed.len(), |(i, _)| i);
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a command and return (success, response).
    ///
    /// `rest` is the unsplit argument text, which `comment` keeps verbatim.
    pub fn execute(&mut self, command: &str, rest: &str) -> (bool, String) {
        match self.dispatch(command, rest) {
            Ok(message) => (true, message),
            Err(e) => (false, format!("{e:#}")),
        }
    }

    fn dispatch(&mut self, command: &str, rest: &str) -> anyhow::Result<String> {
        let args: Vec<&str> = rest.split_whitespace().collect();
        let game = &mut self.game;
        let reply = match command {
            "name" => APP_NAME.to_string(),

            "version" => env!("CARGO_PKG_VERSION").to_string(),

            "list_commands" => KNOWN_COMMANDS.join("\n"),

            "known_command" => {
                let Some(name) = args.first() else {
                    bail!("missing argument");
                };
                let known = KNOWN_COMMANDS.contains(&name.to_lowercase().as_str());
                known.to_string()
            }

            "quit" => String::new(),

            "new" => {
                let mut options = GameOptions::default();
                if let Some(size) = args.first() {
                    options.size = size.parse().context("invalid size")?;
                }
                if let Some(handicap) = args.get(1) {
                    options.handicap = handicap.parse().context("invalid handicap")?;
                }
                options.komi = args.get(2).copied().unwrap_or(DEFAULT_KOMI).to_string();
                *game = Game::new(options)?;
                String::new()
            }

            "open" => {
                let Some(path) = args.first() else {
                    bail!("missing argument");
                };
                let opened = Game::open(path).with_context(|| format!("cannot open {path}"))?;
                *game = opened;
                game.status().to_string()
            }

            "save" => {
                let path = match args.first() {
                    Some(path) => PathBuf::from(path),
                    None => match game.filename() {
                        Some(path) => path.to_path_buf(),
                        None => bail!("no file name"),
                    },
                };
                game.write_game(&path)
                    .with_context(|| format!("cannot save {}", path.display()))?;
                String::new()
            }

            "save_flipped" => {
                let Some(path) = args.first() else {
                    bail!("missing argument");
                };
                game.write_flipped_game(path)
                    .with_context(|| format!("cannot save {path}"))?;
                String::new()
            }

            "play" => {
                let (color, vertex) = match args.as_slice() {
                    [vertex] => (None, *vertex),
                    [color, vertex] => (Some(parse_color(color)?), *vertex),
                    _ => bail!("expected a vertex"),
                };
                if let Some(color) = color {
                    if color != game.next_color() {
                        bail!("it is {:?}'s turn", game.next_color());
                    }
                }
                if vertex.eq_ignore_ascii_case("pass") {
                    game.make_pass()?;
                } else {
                    let point = parse_vertex(vertex, game.size()).context("invalid vertex")?;
                    game.make_move(point)?;
                }
                String::new()
            }

            "undo" => {
                game.unwind_move()?;
                String::new()
            }

            "redo" => match game.replay_move()? {
                ReplayOutcome::Moved(_) => String::new(),
                ReplayOutcome::Blocked { point } => {
                    bail!("blocked by a stone at {}", vertex_name(point, game.size()))
                }
            },

            "start" => {
                game.goto_start();
                String::new()
            }

            "end" => match game.goto_last_move()? {
                None => String::new(),
                Some(point) => format!("blocked by a stone at {}", vertex_name(point, game.size())),
            },

            "branch" => match args.first() {
                Some(index) => {
                    game.set_current_branch(index.parse().context("invalid branch index")?)?;
                    String::new()
                }
                None => {
                    let (count, active) = game.current_branches();
                    match active {
                        Some(active) => format!("{active} of {count}"),
                        None => "none".to_string(),
                    }
                }
            },

            "branch_up" => {
                game.move_branch_up()?;
                String::new()
            }

            "branch_down" => {
                game.move_branch_down()?;
                String::new()
            }

            "cut" => {
                game.cut_move()?;
                String::new()
            }

            "paste" => {
                game.paste_move()?;
                String::new()
            }

            "mark" | "unmark" => {
                let [kind, vertex] = args.as_slice() else {
                    bail!("expected a kind and a vertex");
                };
                let kind = parse_kind(kind)?;
                let point = parse_vertex(vertex, game.size()).context("invalid vertex")?;
                if command == "mark" {
                    describe(&game.add_adornment(point, kind)?, game.size())
                } else {
                    match game.remove_adornment(point, kind) {
                        Some(_) => String::new(),
                        None => bail!("no such mark"),
                    }
                }
            }

            "marks" => game
                .current_adornments()
                .iter()
                .map(|a| describe(a, game.size()))
                .collect::<Vec<_>>()
                .join("\n"),

            "comment" => {
                if !rest.is_empty() {
                    game.save_current_comment(rest);
                }
                game.current_comment().to_string()
            }

            "game_info" => match rest.split_once(char::is_whitespace) {
                None if rest.is_empty() => {
                    let info = game.info();
                    format!(
                        "Size: {}\nHandicap: {}\nKomi: {}\nBlack: {}\nWhite: {}",
                        info.size, info.handicap, info.komi, info.player_black, info.player_white
                    )
                }
                None => bail!("missing value"),
                Some((field, value)) => {
                    let mut info = game.info().clone();
                    let value = value.trim().to_string();
                    match field.to_lowercase().as_str() {
                        "black" | "pb" => info.player_black = value,
                        "white" | "pw" => info.player_white = value,
                        "komi" | "km" => info.komi = value,
                        "comment" | "c" => info.comment = value,
                        _ => bail!("unknown game info field: {field}"),
                    }
                    game.set_game_info(info)?;
                    String::new()
                }
            },

            "path" => match game.current_move() {
                Some(id) => game
                    .get_path_to_move(NodeRef::Move(id))
                    .map(|p| p.to_string())
                    .context("current move is not in the tree")?,
                None => MovePath::default().to_string(),
            },

            "goto" => {
                let steps = args
                    .first()
                    .map(|s| s.trim_matches(|c| c == '[' || c == ']'))
                    .unwrap_or_default()
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::parse)
                    .collect::<Result<Vec<usize>, _>>()
                    .context("invalid path")?;
                game.advance_to_move_path(&MovePath::new(steps))?;
                String::new()
            }

            "showboard" => format!("\n{}", game.board()),

            "status" => game.status().to_string(),

            "tree" => format!("\n{}", TreeLayout::compute(game)),

            "sgf" => format!("\n{}", game.to_sgf()),

            _ => bail!("unknown command: {command}"),
        };
        Ok(reply)
    }
}

fn parse_color(s: &str) -> anyhow::Result<Color> {
    match s.to_lowercase().as_str() {
        "b" | "black" => Ok(Color::Black),
        "w" | "white" => Ok(Color::White),
        _ => bail!("invalid color: {s}"),
    }
}

fn parse_kind(s: &str) -> anyhow::Result<AdornmentKind> {
    match s.to_lowercase().as_str() {
        "square" | "sq" => Ok(AdornmentKind::Square),
        "triangle" | "tr" => Ok(AdornmentKind::Triangle),
        "letter" | "lb" => Ok(AdornmentKind::Letter),
        _ => bail!("invalid mark kind: {s}"),
    }
}

fn describe(adornment: &Adornment, size: usize) -> String {
    let vertex = vertex_name(adornment.point, size);
    match adornment.mark {
        Mark::Square => format!("{vertex} square"),
        Mark::Triangle => format!("{vertex} triangle"),
        Mark::Letter(c) => format!("{vertex} letter {c}"),
        Mark::CurrentMove => format!("{vertex} current"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(size: usize) -> Shell {
        Shell::new(
            Game::new(GameOptions {
                size,
                ..GameOptions::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = Shell::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = Shell::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_name_and_known_command() {
        let mut sh = shell(9);
        assert_eq!(sh.execute("name", ""), (true, "sgfed".to_string()));
        assert_eq!(sh.execute("known_command", "cut"), (true, "true".to_string()));
        assert_eq!(sh.execute("known_command", "genmove"), (true, "false".to_string()));
        assert!(!sh.execute("known_command", "").0);
        assert!(!sh.execute("genmove", "b").0);
    }

    #[test]
    fn test_play_undo_redo() {
        let mut sh = shell(9);
        assert!(sh.execute("play", "D4").0);
        assert!(sh.execute("play", "w pass").0);
        assert!(!sh.execute("play", "w E5").0);
        assert!(!sh.execute("play", "D4").0);
        assert!(!sh.execute("play", "Z99").0);
        assert_eq!(sh.execute("status", "").1, "[*] Move 2 (pass)   B captures: 0   W captures: 0");
        assert!(sh.execute("undo", "").0);
        assert!(sh.execute("undo", "").0);
        assert!(!sh.execute("undo", "").0);
        assert!(sh.execute("redo", "").0);
        assert_eq!(sh.game().status().move_number, 1);
    }

    #[test]
    fn test_branches_and_paths() {
        let mut sh = shell(9);
        sh.execute("play", "D4");
        sh.execute("undo", "");
        sh.execute("play", "E5");
        assert_eq!(sh.execute("path", ""), (true, "[1]".to_string()));
        sh.execute("undo", "");
        assert_eq!(sh.execute("branch", ""), (true, "1 of 2".to_string()));
        assert!(sh.execute("goto", "[0]").0);
        assert_eq!(sh.execute("path", ""), (true, "[0]".to_string()));
        assert!(sh.execute("branch_down", "").0);
        assert_eq!(sh.execute("path", ""), (true, "[1]".to_string()));
        assert!(!sh.execute("goto", "0,x").0);
    }

    #[test]
    fn test_marks_and_comments() {
        let mut sh = shell(9);
        sh.execute("play", "C3");
        assert_eq!(sh.execute("mark", "letter D4"), (true, "D4 letter A".to_string()));
        assert_eq!(sh.execute("mark", "tr E5"), (true, "E5 triangle".to_string()));
        assert_eq!(
            sh.execute("marks", "").1,
            "D4 letter A\nE5 triangle\nC3 current"
        );
        assert!(sh.execute("unmark", "tr E5").0);
        assert!(!sh.execute("unmark", "tr E5").0);
        assert!(!sh.execute("mark", "circle E5").0);
        assert_eq!(
            sh.execute("comment", "a  spaced   note"),
            (true, "a  spaced   note".to_string())
        );
    }

    #[test]
    fn test_game_info() {
        let mut sh = shell(9);
        assert!(sh.execute("game_info", "black Go Seigen").0);
        assert!(sh.execute("game_info", "km 5.5").0);
        assert_eq!(
            sh.execute("game_info", ""),
            (
                true,
                "Size: 9\nHandicap: 0\nKomi: 5.5\nBlack: Go Seigen\nWhite: ".to_string()
            )
        );
        assert!(sh.game().is_dirty());
        assert!(!sh.execute("game_info", "black").0);
        assert!(!sh.execute("game_info", "size 13").0);
    }

    #[test]
    fn test_run_protocol() {
        let mut sh = shell(9);
        let input = b"1 name\n# comment\n\nplay D4\n2 bogus\nquit\nname\n";
        let mut output = Vec::new();
        sh.run(&input[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "=1 sgfed\n\n= \n\n?2 unknown command: bogus\n\n= \n\n");
    }
}
