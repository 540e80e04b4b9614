//! 协议常量定义

use std::time::Duration;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 10000;

/// 最小棋盘边长
pub const MIN_BOARD_SIZE: usize = 6;

/// 默认棋盘边长
pub const DEFAULT_BOARD_SIZE: usize = 8;

/// 服务端默认允许的最大棋盘边长
pub const DEFAULT_MAX_BOARD_SIZE: usize = 20;

/// 昵称最大长度（字符数）
pub const MAX_NICKNAME_LEN: usize = 20;

/// 单行消息最大字节数（不含换行符）
pub const MAX_LINE_LEN: usize = 1024;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
