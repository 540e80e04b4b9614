//! 黑白棋服务端
//!
//! 包含:
//! - 匹配系统
//! - 对局控制
//! - 客户端会话
//! - 服务端配置

pub mod config;
pub mod game;
pub mod matchmaker;
pub mod player;
pub mod server;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use game::{GameHandle, Match, MatchState};
pub use matchmaker::Matchmaker;
pub use player::{PlayerHandle, SessionEvent};
pub use server::Server;
pub use session::ClientSession;
