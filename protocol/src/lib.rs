//! 黑白棋共享协议库
//!
//! 包含:
//! - 棋子、坐标、棋盘等核心数据结构
//! - 可落子计算和落子翻转规则
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 行文本编解码 (LineCodec)
//! - 传输层抽象 (Connector, Connection, Listener traits)

mod board;
mod codec;
mod constants;
mod error;
mod message;
mod piece;
mod transport;

pub use board::{Board, LegalMoves, MoveOutcome};
pub use codec::{Command, LineCodec};
pub use constants::*;
pub use error::{ProtocolError, Result, ReversiError};
pub use message::{ClientMessage, GameOutcome, MatchId, PlayerId, ServerMessage};
pub use piece::{Piece, Position};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    NetworkConfig,
    LineReader, LineWriter,
};
