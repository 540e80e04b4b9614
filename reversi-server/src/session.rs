//! 客户端会话
//!
//! 每个连接一个会话任务。读取由单独的任务完成，解码后的消息和
//! 对局推送的消息都进入同一个事件队列，由会话任务按顺序处理。

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, LineReader, LineWriter, Piece, PlayerId, ProtocolError, ServerMessage,
};

use crate::game::GameHandle;
use crate::matchmaker::Matchmaker;
use crate::player::{validate_nickname, PlayerHandle, SessionEvent};

/// 会话状态
#[derive(Debug)]
enum SessionState {
    /// 已连接，尚未发送 CONNECT
    Idle,
    /// 在等待队列中
    Waiting { board_size: usize },
    /// 对局中
    Playing { game: GameHandle, color: Piece },
    /// 已结束
    Finished,
}

/// 客户端会话
pub struct ClientSession {
    id: PlayerId,
    peer: String,
    matchmaker: Arc<Matchmaker>,
    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    state: SessionState,
    name: Option<String>,
}

impl ClientSession {
    pub fn new(id: PlayerId, peer: String, matchmaker: Arc<Matchmaker>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            id,
            peer,
            matchmaker,
            tx,
            rx,
            state: SessionState::Idle,
            name: None,
        }
    }

    /// 运行会话直到连接断开或对局结束
    pub async fn run<R, W>(
        mut self,
        reader: LineReader<R>,
        mut writer: LineWriter<W>,
        idle_timeout: Option<Duration>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send,
    {
        info!(player_id = self.id, peer = %self.peer, "客户端已连接");
        let read_task = tokio::spawn(read_loop(reader, self.tx.clone(), idle_timeout));

        while let Some(event) = self.rx.recv().await {
            match event {
                SessionEvent::Inbound(Ok(msg)) => {
                    debug!(player_id = self.id, "收到: {}", msg);
                    if let Some(reply) = self.handle(msg).await {
                        if let Err(e) = writer.write_message(&reply).await {
                            warn!(player_id = self.id, "发送失败: {}", e);
                            break;
                        }
                    }
                }
                SessionEvent::Inbound(Err(e)) => {
                    warn!(player_id = self.id, "忽略无效消息: {}", e);
                }
                SessionEvent::Matched { game, color } => {
                    debug!(player_id = self.id, %color, "已加入对局");
                    self.state = SessionState::Playing { game, color };
                }
                SessionEvent::Outbound(msg) => {
                    debug!(player_id = self.id, "发送: {}", msg);
                    if let Err(e) = writer.write_message(&msg).await {
                        warn!(player_id = self.id, "发送失败: {}", e);
                        break;
                    }
                }
                SessionEvent::Close => {
                    debug!(player_id = self.id, "对局结束，关闭连接");
                    break;
                }
                SessionEvent::Disconnected => break,
            }
        }

        read_task.abort();
        self.cleanup().await;
        let _ = writer.shutdown().await;

        info!(
            player_id = self.id,
            peer = %self.peer,
            name = self.name.as_deref().unwrap_or("-"),
            "客户端已断开"
        );
    }

    /// 处理客户端消息，返回需要直接回复的消息
    async fn handle(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Connect { name, board_size } => {
                self.handle_connect(name, board_size).await
            }
            ClientMessage::Move { row, col } => self.handle_move(row, col).await,
            ClientMessage::Resign => self.handle_resign().await,
        }
    }

    async fn handle_connect(&mut self, name: String, board_size: usize) -> Option<ServerMessage> {
        if !matches!(self.state, SessionState::Idle) {
            return Some(ServerMessage::error(ProtocolError::NotAllowed("CONNECT")));
        }
        if let Err(e) = validate_nickname(&name) {
            return Some(ServerMessage::error(e));
        }

        let player = PlayerHandle::new(self.id, name.clone(), self.tx.clone());
        match self.matchmaker.add_waiting(player, board_size).await {
            Ok(_) => {
                // 即使已经配对，Matched 事件也会随后把状态切换为对局中
                self.state = SessionState::Waiting { board_size };
                self.name = Some(name);
                None
            }
            Err(e) => {
                warn!(player_id = self.id, board_size, "加入等待队列失败: {}", e);
                Some(ServerMessage::error(e))
            }
        }
    }

    async fn handle_move(&mut self, row: usize, col: usize) -> Option<ServerMessage> {
        let SessionState::Playing { game, color } = &self.state else {
            return Some(ServerMessage::error(ProtocolError::NotAllowed("MOVE")));
        };

        let result = game.lock().await.process_move(*color, row, col);
        result.err().map(ServerMessage::error)
    }

    async fn handle_resign(&mut self) -> Option<ServerMessage> {
        let SessionState::Playing { game, color } = &self.state else {
            return Some(ServerMessage::error(ProtocolError::NotAllowed("RESIGN")));
        };

        let result = game.lock().await.resign(*color);
        result.err().map(ServerMessage::error)
    }

    /// 会话结束时清理：离开等待队列，或以断线结束对局
    async fn cleanup(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Finished) {
            SessionState::Playing { game, color } => {
                game.lock().await.handle_disconnect(color);
            }
            SessionState::Waiting { board_size } => {
                if self.matchmaker.remove_waiting(self.id).await {
                    return;
                }
                // 已被配对但 Matched 事件尚未处理
                debug!(player_id = self.id, board_size, "断开时已被配对");
                while let Ok(event) = self.rx.try_recv() {
                    if let SessionEvent::Matched { game, color } = event {
                        game.lock().await.handle_disconnect(color);
                        break;
                    }
                }
            }
            SessionState::Idle | SessionState::Finished => {}
        }
    }
}

/// 读取循环：把每一行解码后投递到会话事件队列
async fn read_loop<R>(
    mut reader: LineReader<R>,
    tx: mpsc::UnboundedSender<SessionEvent>,
    idle_timeout: Option<Duration>,
) where
    R: AsyncRead + Unpin + Send,
{
    loop {
        let result = match idle_timeout {
            Some(limit) => timeout(limit, reader.read_message::<ClientMessage>())
                .await
                .unwrap_or(Err(ProtocolError::ConnectionTimeout)),
            None => reader.read_message::<ClientMessage>().await,
        };

        match result {
            Err(e) if e.is_disconnect() => {
                debug!("读取结束: {}", e);
                let _ = tx.send(SessionEvent::Disconnected);
                break;
            }
            result => {
                if tx.send(SessionEvent::Inbound(result)).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{LineCodec, DEFAULT_MAX_BOARD_SIZE, MAX_LINE_LEN, MAX_NICKNAME_LEN};
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    struct TestClient {
        reader: LineReader<ReadHalf<DuplexStream>>,
        writer: LineWriter<WriteHalf<DuplexStream>>,
    }

    impl TestClient {
        async fn send_line(&mut self, line: &str) {
            self.writer.write_line(line).await.unwrap();
        }

        async fn expect(&mut self, expected: ServerMessage) {
            let msg: ServerMessage = timeout(Duration::from_secs(5), self.reader.read_message())
                .await
                .expect("timed out waiting for message")
                .unwrap();
            assert_eq!(msg, expected);
        }

        async fn expect_closed(&mut self) {
            let result = timeout(Duration::from_secs(5), self.reader.read_line())
                .await
                .expect("timed out waiting for close");
            assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
        }
    }

    /// 在内存管道上启动一个会话
    fn spawn_session(
        id: PlayerId,
        matchmaker: Arc<Matchmaker>,
        idle_timeout: Option<Duration>,
    ) -> (TestClient, tokio::task::JoinHandle<()>) {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let session = ClientSession::new(id, format!("test-{}", id), matchmaker);
        let task = tokio::spawn(session.run(
            LineReader::new(server_read),
            LineWriter::new(server_write),
            idle_timeout,
        ));

        let (client_read, client_write) = tokio::io::split(client);
        let client = TestClient {
            reader: LineReader::new(client_read),
            writer: LineWriter::new(client_write),
        };
        (client, task)
    }

    async fn wait_for_queue(matchmaker: &Matchmaker, board_size: usize, expected: usize) {
        for _ in 0..100 {
            if matchmaker.waiting_count(board_size).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never reached {} players", expected);
    }

    #[tokio::test]
    async fn test_commands_before_connect_are_rejected() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, _task) = spawn_session(1, matchmaker, None);

        client.send_line("MOVE 2 3").await;
        client
            .expect(ServerMessage::error(ProtocolError::NotAllowed("MOVE")))
            .await;
        client.send_line("RESIGN").await;
        client
            .expect(ServerMessage::error(ProtocolError::NotAllowed("RESIGN")))
            .await;
    }

    #[tokio::test]
    async fn test_malformed_lines_are_ignored() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, _task) = spawn_session(1, matchmaker, None);

        client.send_line("HELLO").await;
        client.send_line("MOVE x y").await;
        client.send_line("").await;
        client.send_line("RESIGN").await;

        // 第一条回复来自 RESIGN，前面的无效行没有任何回复
        client
            .expect(ServerMessage::error(ProtocolError::NotAllowed("RESIGN")))
            .await;
    }

    #[tokio::test]
    async fn test_invalid_connect_can_be_retried() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, _task) = spawn_session(1, matchmaker.clone(), None);

        let long_name = "a".repeat(MAX_NICKNAME_LEN + 1);
        client.send_line(&format!("CONNECT {} 8", long_name)).await;
        client
            .expect(ServerMessage::error(ProtocolError::NicknameTooLong {
                len: MAX_NICKNAME_LEN + 1,
                max: MAX_NICKNAME_LEN,
            }))
            .await;

        client.send_line("CONNECT alice 7").await;
        client
            .expect(ServerMessage::error(protocol::ReversiError::InvalidSize {
                size: 7,
            }))
            .await;

        client
            .send_line(
                &ClientMessage::Connect {
                    name: "alice".to_string(),
                    board_size: 8,
                }
                .encode(),
            )
            .await;
        wait_for_queue(&matchmaker, 8, 1).await;

        // 已在等待中，不能再次 CONNECT
        client.send_line("CONNECT alice 8").await;
        client
            .expect(ServerMessage::error(ProtocolError::NotAllowed("CONNECT")))
            .await;
    }

    #[tokio::test]
    async fn test_disconnect_while_waiting_leaves_queue() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, task) = spawn_session(1, matchmaker.clone(), None);

        client.send_line("CONNECT alice 8").await;
        wait_for_queue(&matchmaker, 8, 1).await;

        drop(client);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(matchmaker.waiting_count(8).await, 0);
    }

    #[tokio::test]
    async fn test_paired_sessions_play_and_close() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut alice, alice_task) = spawn_session(1, matchmaker.clone(), None);
        let (mut bob, bob_task) = spawn_session(2, matchmaker.clone(), None);

        alice.send_line("CONNECT alice 6").await;
        wait_for_queue(&matchmaker, 6, 1).await;
        bob.send_line("CONNECT bob 6").await;

        alice.expect(ServerMessage::GameStart { color: Piece::Black }).await;
        alice.expect(ServerMessage::YourTurn).await;
        bob.expect(ServerMessage::GameStart { color: Piece::White }).await;
        bob.expect(ServerMessage::OpponentTurn).await;

        // 6x6 初始局面中黑方可下 (1, 3)
        alice.send_line("MOVE 1 3").await;
        alice.expect(ServerMessage::MoveAccepted { row: 1, col: 3 }).await;
        alice.expect(ServerMessage::OpponentTurn).await;
        bob.expect(ServerMessage::MoveAccepted { row: 1, col: 3 }).await;
        bob.expect(ServerMessage::YourTurn).await;

        bob.send_line("RESIGN").await;
        bob.expect(ServerMessage::GameOver {
            outcome: protocol::GameOutcome::Lose,
            black_count: 4,
            white_count: 1,
        })
        .await;
        bob.expect_closed().await;

        alice.expect(ServerMessage::OpponentResigned).await;
        alice
            .expect(ServerMessage::GameOver {
                outcome: protocol::GameOutcome::Win,
                black_count: 4,
                white_count: 1,
            })
            .await;
        alice.expect_closed().await;

        timeout(Duration::from_secs(5), alice_task).await.unwrap().unwrap();
        timeout(Duration::from_secs(5), bob_task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_overlong_line_is_ignored() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, _task) = spawn_session(1, matchmaker, None);

        client.send_line(&"X".repeat(MAX_LINE_LEN * 2)).await;
        client.send_line("RESIGN").await;

        // 连接保持打开，下一行照常处理
        client
            .expect(ServerMessage::error(ProtocolError::NotAllowed("RESIGN")))
            .await;
    }

    #[tokio::test]
    async fn test_disconnect_after_pairing_before_matched_is_handled() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let mut session = ClientSession::new(1, "test-1".to_string(), matchmaker.clone());

        let alice = PlayerHandle::new(1, "alice".to_string(), session.tx.clone());
        matchmaker.add_waiting(alice, 8).await.unwrap();
        session.state = SessionState::Waiting { board_size: 8 };

        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        let bob = PlayerHandle::new(2, "bob".to_string(), bob_tx);
        let games = matchmaker.add_waiting(bob, 8).await.unwrap();
        assert_eq!(games.len(), 1);

        // Matched 事件仍在队列中，会话以等待状态结束
        session.cleanup().await;
        assert!(games[0].lock().await.is_over());

        let mut messages = Vec::new();
        let mut closed = false;
        while let Ok(event) = bob_rx.try_recv() {
            match event {
                SessionEvent::Outbound(msg) => messages.push(msg),
                SessionEvent::Close => closed = true,
                SessionEvent::Matched { .. } => {}
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(
            messages,
            vec![
                ServerMessage::GameStart { color: Piece::White },
                ServerMessage::OpponentTurn,
                ServerMessage::OpponentDisconnected,
                ServerMessage::GameOver {
                    outcome: protocol::GameOutcome::Win,
                    black_count: 2,
                    white_count: 2,
                },
            ]
        );
        assert!(closed);
        assert_eq!(matchmaker.waiting_count(8).await, 0);
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_session() {
        let matchmaker = Arc::new(Matchmaker::new(DEFAULT_MAX_BOARD_SIZE));
        let (mut client, task) =
            spawn_session(1, matchmaker.clone(), Some(Duration::from_millis(200)));

        client.send_line("CONNECT alice 8").await;
        wait_for_queue(&matchmaker, 8, 1).await;

        client.expect_closed().await;
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(matchmaker.waiting_count(8).await, 0);
    }
}
