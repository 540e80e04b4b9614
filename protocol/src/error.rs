//! 错误类型定义

use thiserror::Error;

/// 黑白棋规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReversiError {
    /// 无效的棋盘边长（必须为不小于 6 的偶数）
    #[error("Invalid board size: {size}")]
    InvalidSize { size: usize },

    /// 无效的落子
    #[error("Illegal move: ({row}, {col})")]
    IllegalMove { row: usize, col: usize },

    /// 无效的棋盘文本布局
    #[error("Invalid board layout: {reason}")]
    InvalidLayout { reason: String },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 空行
    #[error("Empty line")]
    EmptyLine,

    /// 未知命令
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// 缺少参数
    #[error("Missing argument `{arg}` for {command}")]
    MissingArgument {
        command: &'static str,
        arg: &'static str,
    },

    /// 多余参数
    #[error("Unexpected argument for {command}: {token}")]
    UnexpectedArgument { command: &'static str, token: String },

    /// 无效数字
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    /// 无效颜色
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// 无效对局结果
    #[error("Invalid game outcome: {0}")]
    InvalidOutcome(String),

    /// 行过长
    #[error("Line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 昵称为空
    #[error("Nickname is empty")]
    NicknameEmpty,

    /// 昵称过长
    #[error("Nickname too long: {len} chars (max: {max})")]
    NicknameTooLong { len: usize, max: usize },

    /// 已在匹配队列中
    #[error("Already waiting for an opponent")]
    AlreadyWaiting,

    /// 当前状态不允许该命令
    #[error("{0} is not allowed now")]
    NotAllowed(&'static str),

    /// 黑白棋规则错误
    #[error(transparent)]
    Reversi(#[from] ReversiError),
}

impl ProtocolError {
    /// 是否为连接层面的错误（读取失败后应视为断线）
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::ConnectionClosed
                | ProtocolError::ConnectionTimeout
        )
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversi_error_display() {
        let err = ProtocolError::from(ReversiError::NotYourTurn);
        assert_eq!(err.to_string(), "Not your turn");

        let err = ProtocolError::from(ReversiError::IllegalMove { row: 2, col: 3 });
        assert_eq!(err.to_string(), "Illegal move: (2, 3)");
    }

    #[test]
    fn test_disconnect_classification() {
        assert!(ProtocolError::ConnectionClosed.is_disconnect());
        assert!(ProtocolError::ConnectionTimeout.is_disconnect());
        // 过长的行已被整行丢弃，连接可以继续使用
        assert!(!ProtocolError::LineTooLong { len: 2000, max: 1024 }.is_disconnect());
        assert!(!ProtocolError::UnknownCommand("FOO".to_string()).is_disconnect());
        assert!(!ProtocolError::EmptyLine.is_disconnect());
    }
}
