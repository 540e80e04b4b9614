//! 玩家句柄
//!
//! 对局和匹配器不直接接触连接，只持有玩家句柄，
//! 通过句柄把事件投递到会话的事件队列中。

use tokio::sync::mpsc;
use tracing::debug;

use protocol::{ClientMessage, Piece, PlayerId, ProtocolError, ServerMessage, MAX_NICKNAME_LEN};

use crate::game::GameHandle;

/// 会话事件（会话任务是唯一的消费者）
#[derive(Debug)]
pub enum SessionEvent {
    /// 从连接读到并解码的一行
    Inbound(Result<ClientMessage, ProtocolError>),
    /// 连接已断开
    Disconnected,
    /// 匹配成功
    Matched { game: GameHandle, color: Piece },
    /// 待发送给客户端的消息
    Outbound(ServerMessage),
    /// 对局结束，发送完剩余消息后关闭连接
    Close,
}

/// 玩家句柄
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub name: String,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl PlayerHandle {
    pub fn new(id: PlayerId, name: String, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { id, name, tx }
    }

    /// 发送一条协议消息
    pub fn send(&self, msg: ServerMessage) {
        self.deliver(SessionEvent::Outbound(msg));
    }

    /// 通知会话已加入对局
    pub fn assign(&self, game: GameHandle, color: Piece) {
        self.deliver(SessionEvent::Matched { game, color });
    }

    /// 通知会话关闭连接
    pub fn close(&self) {
        self.deliver(SessionEvent::Close);
    }

    /// 会话是否仍在运行
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    fn deliver(&self, event: SessionEvent) {
        // 会话已结束时丢弃
        if self.tx.send(event).is_err() {
            debug!(player_id = self.id, "会话已结束，丢弃事件");
        }
    }
}

/// 验证昵称
pub fn validate_nickname(nickname: &str) -> Result<(), ProtocolError> {
    if nickname.is_empty() {
        return Err(ProtocolError::NicknameEmpty);
    }
    let len = nickname.chars().count();
    if len > MAX_NICKNAME_LEN {
        return Err(ProtocolError::NicknameTooLong {
            len,
            max: MAX_NICKNAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = PlayerHandle::new(1, "alice".to_string(), tx);

        player.send(ServerMessage::YourTurn);
        player.send(ServerMessage::MoveAccepted { row: 2, col: 4 });
        player.close();

        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::Outbound(ServerMessage::YourTurn))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::Outbound(ServerMessage::MoveAccepted { row: 2, col: 4 }))
        ));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Close)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_session_ended() {
        let (tx, rx) = mpsc::unbounded_channel();
        let player = PlayerHandle::new(1, "alice".to_string(), tx);
        assert!(player.is_connected());

        drop(rx);
        assert!(!player.is_connected());
        // 不会 panic
        player.send(ServerMessage::OpponentTurn);
    }

    #[test]
    fn test_validate_nickname() {
        assert!(validate_nickname("玩家1").is_ok());
        assert!(matches!(validate_nickname(""), Err(ProtocolError::NicknameEmpty)));

        let long_name = "a".repeat(MAX_NICKNAME_LEN + 1);
        assert!(matches!(
            validate_nickname(&long_name),
            Err(ProtocolError::NicknameTooLong { .. })
        ));
        // 按字符计数而不是字节
        assert!(validate_nickname(&"棋".repeat(MAX_NICKNAME_LEN)).is_ok());
    }
}
