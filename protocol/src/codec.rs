//! 行文本编解码
//!
//! 每条消息是一行文本：命令关键字后跟以空格分隔的参数，以换行结尾。
//! 编解码本身无状态、不做 I/O。

use std::fmt;
use std::str::{FromStr, SplitAsciiWhitespace};

use crate::error::{ProtocolError, Result};
use crate::message::{ClientMessage, GameOutcome, ServerMessage};
use crate::piece::Piece;

/// 命令关键字（双向共用一张表）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // === 客户端 -> 服务端 ===
    Connect,
    Move,
    Resign,

    // === 服务端 -> 客户端 ===
    GameStart,
    YourTurn,
    OpponentTurn,
    MoveAccepted,
    Pass,
    GameOver,
    OpponentResigned,
    OpponentDisconnected,
    Error,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Connect,
        Command::Move,
        Command::Resign,
        Command::GameStart,
        Command::YourTurn,
        Command::OpponentTurn,
        Command::MoveAccepted,
        Command::Pass,
        Command::GameOver,
        Command::OpponentResigned,
        Command::OpponentDisconnected,
        Command::Error,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Move => "MOVE",
            Command::Resign => "RESIGN",
            Command::GameStart => "GAME_START",
            Command::YourTurn => "YOUR_TURN",
            Command::OpponentTurn => "OPPONENT_TURN",
            Command::MoveAccepted => "MOVE_ACCEPTED",
            Command::Pass => "PASS",
            Command::GameOver => "GAME_OVER",
            Command::OpponentResigned => "OPPONENT_RESIGNED",
            Command::OpponentDisconnected => "OPPONENT_DISCONNECTED",
            Command::Error => "ERROR",
        }
    }

    /// 关键字区分大小写
    pub fn from_keyword(keyword: &str) -> Option<Command> {
        Self::ALL.into_iter().find(|c| c.keyword() == keyword)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 行编解码 trait
pub trait LineCodec: Sized {
    /// 编码为一行（不含换行符）
    fn encode(&self) -> String;

    /// 从一行解码（可带结尾的 `\r` / `\n`）
    fn decode(line: &str) -> Result<Self>;
}

/// 拆出关键字和剩余部分
fn split_keyword(line: &str) -> Result<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.is_empty() {
        return Err(ProtocolError::EmptyLine);
    }
    Ok(line
        .split_once(|c: char| c.is_ascii_whitespace())
        .unwrap_or((line, "")))
}

/// 参数读取器
struct Args<'a> {
    command: &'static str,
    tokens: SplitAsciiWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn new(command: Command, rest: &'a str) -> Self {
        Self {
            command: command.keyword(),
            tokens: rest.split_ascii_whitespace(),
        }
    }

    fn next(&mut self, arg: &'static str) -> Result<&'a str> {
        self.tokens.next().ok_or(ProtocolError::MissingArgument {
            command: self.command,
            arg,
        })
    }

    fn number(&mut self, arg: &'static str) -> Result<usize> {
        let token = self.next(arg)?;
        token
            .parse()
            .map_err(|_| ProtocolError::InvalidNumber(token.to_string()))
    }

    fn color(&mut self, arg: &'static str) -> Result<Piece> {
        let color: Piece = self.next(arg)?.parse()?;
        if color.is_empty() {
            return Err(ProtocolError::InvalidColor(color.token().to_string()));
        }
        Ok(color)
    }

    /// 确认没有多余参数
    fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            Some(token) => Err(ProtocolError::UnexpectedArgument {
                command: self.command,
                token: token.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl FromStr for GameOutcome {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WIN" => Ok(GameOutcome::Win),
            "LOSE" => Ok(GameOutcome::Lose),
            "DRAW" => Ok(GameOutcome::Draw),
            other => Err(ProtocolError::InvalidOutcome(other.to_string())),
        }
    }
}

impl ClientMessage {
    pub fn command(&self) -> Command {
        match self {
            ClientMessage::Connect { .. } => Command::Connect,
            ClientMessage::Move { .. } => Command::Move,
            ClientMessage::Resign => Command::Resign,
        }
    }
}

impl LineCodec for ClientMessage {
    fn encode(&self) -> String {
        match self {
            ClientMessage::Connect { name, board_size } => {
                format!("{} {} {}", Command::Connect, name, board_size)
            }
            ClientMessage::Move { row, col } => format!("{} {} {}", Command::Move, row, col),
            ClientMessage::Resign => Command::Resign.to_string(),
        }
    }

    fn decode(line: &str) -> Result<Self> {
        let (keyword, rest) = split_keyword(line)?;
        let command = Command::from_keyword(keyword)
            .ok_or_else(|| ProtocolError::UnknownCommand(keyword.to_string()))?;

        let mut args = Args::new(command, rest);
        let msg = match command {
            Command::Connect => ClientMessage::Connect {
                name: args.next("name")?.to_string(),
                board_size: args.number("board_size")?,
            },
            Command::Move => ClientMessage::Move {
                row: args.number("row")?,
                col: args.number("col")?,
            },
            Command::Resign => ClientMessage::Resign,
            _ => return Err(ProtocolError::UnknownCommand(keyword.to_string())),
        };
        args.finish()?;

        Ok(msg)
    }
}

impl ServerMessage {
    pub fn command(&self) -> Command {
        match self {
            ServerMessage::GameStart { .. } => Command::GameStart,
            ServerMessage::YourTurn => Command::YourTurn,
            ServerMessage::OpponentTurn => Command::OpponentTurn,
            ServerMessage::MoveAccepted { .. } => Command::MoveAccepted,
            ServerMessage::Pass { .. } => Command::Pass,
            ServerMessage::GameOver { .. } => Command::GameOver,
            ServerMessage::OpponentResigned => Command::OpponentResigned,
            ServerMessage::OpponentDisconnected => Command::OpponentDisconnected,
            ServerMessage::Error { .. } => Command::Error,
        }
    }
}

impl LineCodec for ServerMessage {
    fn encode(&self) -> String {
        let command = self.command();
        match self {
            ServerMessage::GameStart { color } | ServerMessage::Pass { color } => {
                format!("{} {}", command, color)
            }
            ServerMessage::MoveAccepted { row, col } => format!("{} {} {}", command, row, col),
            ServerMessage::GameOver {
                outcome,
                black_count,
                white_count,
            } => format!(
                "{} {} {} {}",
                command,
                outcome.token(),
                black_count,
                white_count
            ),
            ServerMessage::Error { message } => format!("{} {}", command, message),
            ServerMessage::YourTurn
            | ServerMessage::OpponentTurn
            | ServerMessage::OpponentResigned
            | ServerMessage::OpponentDisconnected => command.to_string(),
        }
    }

    fn decode(line: &str) -> Result<Self> {
        let (keyword, rest) = split_keyword(line)?;
        let command = Command::from_keyword(keyword)
            .ok_or_else(|| ProtocolError::UnknownCommand(keyword.to_string()))?;

        // 错误文本可以包含空格，取整行剩余部分
        if command == Command::Error {
            let message = rest.trim();
            if message.is_empty() {
                return Err(ProtocolError::MissingArgument {
                    command: command.keyword(),
                    arg: "text",
                });
            }
            return Ok(ServerMessage::Error {
                message: message.to_string(),
            });
        }

        let mut args = Args::new(command, rest);
        let msg = match command {
            Command::GameStart => ServerMessage::GameStart {
                color: args.color("color")?,
            },
            Command::YourTurn => ServerMessage::YourTurn,
            Command::OpponentTurn => ServerMessage::OpponentTurn,
            Command::MoveAccepted => ServerMessage::MoveAccepted {
                row: args.number("row")?,
                col: args.number("col")?,
            },
            Command::Pass => ServerMessage::Pass {
                color: args.color("color")?,
            },
            Command::GameOver => ServerMessage::GameOver {
                outcome: args.next("result")?.parse()?,
                black_count: args.number("black_count")?,
                white_count: args.number("white_count")?,
            },
            Command::OpponentResigned => ServerMessage::OpponentResigned,
            Command::OpponentDisconnected => ServerMessage::OpponentDisconnected,
            _ => return Err(ProtocolError::UnknownCommand(keyword.to_string())),
        };
        args.finish()?;

        Ok(msg)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        for command in Command::ALL {
            assert_eq!(Command::from_keyword(command.keyword()), Some(command));
        }
        assert_eq!(Command::from_keyword("move"), None);
        assert_eq!(Command::from_keyword("UNKNOWN"), None);
    }

    #[test]
    fn test_decode_client_messages() {
        assert_eq!(
            ClientMessage::decode("CONNECT alice 8").unwrap(),
            ClientMessage::Connect {
                name: "alice".to_string(),
                board_size: 8
            }
        );
        assert_eq!(
            ClientMessage::decode("MOVE 2 3\r\n").unwrap(),
            ClientMessage::Move { row: 2, col: 3 }
        );
        assert_eq!(
            ClientMessage::decode("  RESIGN  ").unwrap(),
            ClientMessage::Resign
        );
    }

    #[test]
    fn test_decode_rejects_malformed_client_lines() {
        assert!(matches!(ClientMessage::decode(""), Err(ProtocolError::EmptyLine)));
        assert!(matches!(ClientMessage::decode("\r\n"), Err(ProtocolError::EmptyLine)));
        assert!(matches!(
            ClientMessage::decode("HELLO"),
            Err(ProtocolError::UnknownCommand(k)) if k == "HELLO"
        ));
        assert!(matches!(
            ClientMessage::decode("move 1 2"),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert!(matches!(
            ClientMessage::decode("MOVE 1"),
            Err(ProtocolError::MissingArgument { arg: "col", .. })
        ));
        assert!(matches!(
            ClientMessage::decode("MOVE a 1"),
            Err(ProtocolError::InvalidNumber(t)) if t == "a"
        ));
        assert!(matches!(
            ClientMessage::decode("MOVE -1 1"),
            Err(ProtocolError::InvalidNumber(_))
        ));
        assert!(matches!(
            ClientMessage::decode("MOVE 1 2 3"),
            Err(ProtocolError::UnexpectedArgument { .. })
        ));
        assert!(matches!(
            ClientMessage::decode("CONNECT alice"),
            Err(ProtocolError::MissingArgument { arg: "board_size", .. })
        ));
        // 服务端命令不能由客户端发送
        assert!(matches!(
            ClientMessage::decode("YOUR_TURN"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_encode_server_messages() {
        assert_eq!(
            ServerMessage::GameStart { color: Piece::Black }.encode(),
            "GAME_START BLACK"
        );
        assert_eq!(ServerMessage::YourTurn.encode(), "YOUR_TURN");
        assert_eq!(
            ServerMessage::MoveAccepted { row: 2, col: 4 }.encode(),
            "MOVE_ACCEPTED 2 4"
        );
        assert_eq!(ServerMessage::Pass { color: Piece::White }.encode(), "PASS WHITE");
        assert_eq!(
            ServerMessage::GameOver {
                outcome: GameOutcome::Win,
                black_count: 40,
                white_count: 24
            }
            .encode(),
            "GAME_OVER WIN 40 24"
        );
        assert_eq!(
            ServerMessage::OpponentDisconnected.to_string(),
            "OPPONENT_DISCONNECTED"
        );
    }

    #[test]
    fn test_decode_server_messages() {
        assert_eq!(
            ServerMessage::decode("GAME_OVER DRAW 32 32").unwrap(),
            ServerMessage::GameOver {
                outcome: GameOutcome::Draw,
                black_count: 32,
                white_count: 32
            }
        );
        assert_eq!(
            ServerMessage::decode("ERROR Illegal move: (0, 0)").unwrap(),
            ServerMessage::Error {
                message: "Illegal move: (0, 0)".to_string()
            }
        );
        assert!(matches!(
            ServerMessage::decode("GAME_START EMPTY"),
            Err(ProtocolError::InvalidColor(_))
        ));
        assert!(matches!(
            ServerMessage::decode("GAME_START RED"),
            Err(ProtocolError::InvalidColor(_))
        ));
        assert!(matches!(
            ServerMessage::decode("GAME_OVER VICTORY 1 2"),
            Err(ProtocolError::InvalidOutcome(_))
        ));
        assert!(matches!(
            ServerMessage::decode("ERROR"),
            Err(ProtocolError::MissingArgument { .. })
        ));
        assert!(matches!(
            ServerMessage::decode("YOUR_TURN now"),
            Err(ProtocolError::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_connect_line_matches_client_encoding() {
        let msg = ClientMessage::Connect {
            name: "bob".to_string(),
            board_size: 10,
        };
        assert_eq!(msg.encode(), "CONNECT bob 10");
        assert_eq!(ClientMessage::decode(&msg.encode()).unwrap(), msg);
    }
}
