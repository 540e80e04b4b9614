//! 匹配系统
//!
//! 按棋盘大小分组的先到先得等待队列。同一大小的队列凑齐两人即开局，
//! 先到者执黑。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info};

use protocol::{MatchId, Piece, PlayerId, ProtocolError, ReversiError, ServerMessage, MIN_BOARD_SIZE};

use crate::game::{GameHandle, Match};
use crate::player::PlayerHandle;

/// 匹配器
pub struct Matchmaker {
    /// 棋盘大小 -> 等待队列（所有队列共用一把锁）
    queues: Mutex<HashMap<usize, VecDeque<PlayerHandle>>>,
    next_id: AtomicU64,
    max_board_size: usize,
}

impl Matchmaker {
    pub fn new(max_board_size: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_board_size,
        }
    }

    /// 生成新的对局 ID
    fn generate_id(&self) -> MatchId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 检查棋盘大小（偶数，且在允许范围内）
    pub fn validate_board_size(&self, size: usize) -> Result<(), ReversiError> {
        if size < MIN_BOARD_SIZE || size % 2 != 0 || size > self.max_board_size {
            return Err(ReversiError::InvalidSize { size });
        }
        Ok(())
    }

    /// 加入等待队列，可以配对时立即开局
    ///
    /// 返回本次创建的对局。双方先收到 `Matched` 事件，再收到开局消息；
    /// 开局消息全部入队之前对局一直处于锁定状态。
    pub async fn add_waiting(
        &self,
        player: PlayerHandle,
        board_size: usize,
    ) -> Result<Vec<GameHandle>, ProtocolError> {
        self.validate_board_size(board_size)?;

        let mut queues = self.queues.lock().await;
        if queues
            .values()
            .any(|queue| queue.iter().any(|p| p.id == player.id))
        {
            return Err(ProtocolError::AlreadyWaiting);
        }

        info!(player_id = player.id, name = %player.name, board_size, "玩家进入等待队列");
        let queue = queues.entry(board_size).or_default();
        queue.push_back(player);

        let mut games = Vec::new();
        while queue.len() >= 2 {
            let (Some(black), Some(white)) = (queue.pop_front(), queue.pop_front()) else {
                break;
            };
            if let Some(game) = self.create_match(black, white, board_size).await {
                games.push(game);
            }
        }
        if queue.is_empty() {
            queues.remove(&board_size);
        }

        Ok(games)
    }

    /// 从等待队列移除玩家，玩家不在任何队列中时返回 false
    pub async fn remove_waiting(&self, player_id: PlayerId) -> bool {
        let mut queues = self.queues.lock().await;

        let mut removed = false;
        for queue in queues.values_mut() {
            if let Some(pos) = queue.iter().position(|p| p.id == player_id) {
                queue.remove(pos);
                removed = true;
                break;
            }
        }
        queues.retain(|_, queue| !queue.is_empty());

        if removed {
            info!(player_id, "玩家离开等待队列");
        }
        removed
    }

    /// 指定棋盘大小的等待人数
    pub async fn waiting_count(&self, board_size: usize) -> usize {
        self.queues
            .lock()
            .await
            .get(&board_size)
            .map_or(0, VecDeque::len)
    }

    async fn create_match(
        &self,
        black: PlayerHandle,
        white: PlayerHandle,
        board_size: usize,
    ) -> Option<GameHandle> {
        let id = self.generate_id();
        let game = match Match::new(id, board_size, black.clone(), white.clone()) {
            Ok(game) => game.into_handle(),
            Err(e) => {
                error!(match_id = id, "创建对局失败: {}", e);
                black.send(ServerMessage::error(&e));
                white.send(ServerMessage::error(&e));
                return None;
            }
        };

        // 开局消息发出前不允许其他会话进入对局
        let guard = game.lock().await;
        black.assign(game.clone(), Piece::Black);
        white.assign(game.clone(), Piece::White);
        guard.start();
        drop(guard);

        Some(game)
    }
}
