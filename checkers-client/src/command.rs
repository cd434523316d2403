//! 终端命令解析

use protocol::{CheckersError, Coord, GameEvent, Move, MoveSequence};
use thiserror::Error;

/// 命令帮助文本
pub const HELP: &str = "\
commands:
  select <square>     select one of your pieces
  deselect            drop the current selection
  move <a-b>          basic move of the selected piece
  jump <a-b[,b-c..]>  capture; during a chain give the whole sequence so far
  board               print the board
  forfeit             give up the game
  quit                forfeit (if playing) and exit
  help                show this text";

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(Coord),
    Deselect,
    Move(Move),
    Jump(MoveSequence),
    Board,
    Forfeit,
    Quit,
    Help,
}

/// 命令解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Invalid(#[from] CheckersError),
}

impl Command {
    /// 解析一行输入，空行返回 None
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match word.to_ascii_lowercase().as_str() {
            "select" | "s" => Command::Select(require(arg, "select")?.parse()?),
            "deselect" | "d" => Command::Deselect,
            "move" | "m" => Command::Move(require(arg, "move")?.parse()?),
            "jump" | "j" => Command::Jump(require(arg, "jump")?.parse()?),
            "board" | "b" => Command::Board,
            "forfeit" => Command::Forfeit,
            "quit" | "q" | "exit" => Command::Quit,
            "help" | "h" | "?" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// 对应的本地输入事件
    pub fn to_event(&self) -> Option<GameEvent> {
        match self {
            Command::Select(pos) => Some(GameEvent::SelectPiece(*pos)),
            Command::Deselect => Some(GameEvent::DeselectPiece),
            Command::Move(mv) => Some(GameEvent::BasicMove(*mv)),
            Command::Jump(seq) => Some(GameEvent::CaptureMove(seq.clone())),
            Command::Board | Command::Forfeit | Command::Quit | Command::Help => None,
        }
    }
}

fn require<'a>(arg: Option<&'a str>, command: &'static str) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument(command))
}
