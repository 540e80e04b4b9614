//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::piece::Piece;

/// 玩家（会话）ID
pub type PlayerId = u64;

/// 对局 ID
pub type MatchId = u64;

/// 对局结果（相对于接收方）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// 胜
    Win,
    /// 负
    Lose,
    /// 和棋
    Draw,
}

impl GameOutcome {
    /// 根据双方棋子数判定 `color` 一方的结果（多者胜，相等为和棋）
    pub fn for_color(color: Piece, black_count: usize, white_count: usize) -> Self {
        let (mine, theirs) = match color {
            Piece::White => (white_count, black_count),
            _ => (black_count, white_count),
        };
        match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => GameOutcome::Win,
            std::cmp::Ordering::Less => GameOutcome::Lose,
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        }
    }

    /// 协议中使用的标记
    pub fn token(&self) -> &'static str {
        match self {
            GameOutcome::Win => "WIN",
            GameOutcome::Lose => "LOSE",
            GameOutcome::Draw => "DRAW",
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// 加入匹配
    Connect { name: String, board_size: usize },
    /// 落子
    Move { row: usize, col: usize },
    /// 认输
    Resign,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// 匹配成功，告知执子颜色
    GameStart { color: Piece },
    /// 轮到你
    YourTurn,
    /// 轮到对手
    OpponentTurn,
    /// 落子成功（任意一方）
    MoveAccepted { row: usize, col: usize },
    /// 该颜色无处可下，跳过
    Pass { color: Piece },
    /// 游戏结束，附带最终黑白棋子数
    GameOver {
        outcome: GameOutcome,
        black_count: usize,
        white_count: usize,
    },
    /// 对手认输
    OpponentResigned,
    /// 对手断线
    OpponentDisconnected,
    /// 请求被拒绝
    Error { message: String },
}

impl ServerMessage {
    /// 由任意错误构造错误消息
    pub fn error(err: impl std::fmt::Display) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_by_count() {
        assert_eq!(GameOutcome::for_color(Piece::Black, 40, 24), GameOutcome::Win);
        assert_eq!(GameOutcome::for_color(Piece::White, 40, 24), GameOutcome::Lose);
        assert_eq!(GameOutcome::for_color(Piece::White, 10, 26), GameOutcome::Win);
        assert_eq!(GameOutcome::for_color(Piece::Black, 32, 32), GameOutcome::Draw);
        assert_eq!(GameOutcome::for_color(Piece::White, 32, 32), GameOutcome::Draw);
    }

    #[test]
    fn test_error_message() {
        let msg = ServerMessage::error(crate::ReversiError::NotYourTurn);
        assert_eq!(
            msg,
            ServerMessage::Error {
                message: "Not your turn".to_string()
            }
        );
    }
}
