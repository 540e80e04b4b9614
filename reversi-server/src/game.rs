//! 对局控制
//!
//! 一局游戏的回合状态机：校验回合与落子、广播结果、处理跳过、
//! 认输和断线，并在结束时释放双方句柄。
//! 所有状态转换都在对局锁内执行，同一对局的转换不会并发。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use protocol::{Board, GameOutcome, MatchId, MoveOutcome, Piece, ReversiError, ServerMessage};

use crate::player::PlayerHandle;

/// 共享的对局句柄
pub type GameHandle = Arc<Mutex<Match>>;

/// 对局生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    /// 进行中
    Active,
    /// 已结束（终态）
    Over,
}

/// 对局
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    board: Board,
    /// 黑方（先手），结束后释放
    black: Option<PlayerHandle>,
    /// 白方，结束后释放
    white: Option<PlayerHandle>,
    black_name: String,
    white_name: String,
    current_turn: Piece,
    state: MatchState,
    started_at: DateTime<Utc>,
}

impl Match {
    /// 创建新对局
    pub fn new(
        id: MatchId,
        board_size: usize,
        black: PlayerHandle,
        white: PlayerHandle,
    ) -> Result<Self, ReversiError> {
        Ok(Self::with_board(id, Board::new(board_size)?, black, white))
    }

    /// 从指定棋盘创建对局（黑方先走）
    pub fn with_board(id: MatchId, board: Board, black: PlayerHandle, white: PlayerHandle) -> Self {
        Self {
            id,
            board,
            black_name: black.name.clone(),
            white_name: white.name.clone(),
            black: Some(black),
            white: Some(white),
            current_turn: Piece::Black,
            state: MatchState::Active,
            started_at: Utc::now(),
        }
    }

    pub fn into_handle(self) -> GameHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_turn(&self) -> Piece {
        self.current_turn
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state == MatchState::Over
    }

    /// 通知双方开始游戏
    pub fn start(&self) {
        self.send_to(Piece::Black, ServerMessage::GameStart { color: Piece::Black });
        self.send_to(Piece::White, ServerMessage::GameStart { color: Piece::White });
        self.notify_turn();

        info!(
            match_id = self.id,
            black = %self.black_name,
            white = %self.white_name,
            size = self.board.size(),
            "对局开始"
        );
    }

    /// 处理落子
    ///
    /// 失败时不修改任何状态，也不发送任何消息，由调用方回复错误。
    pub fn process_move(
        &mut self,
        mover: Piece,
        row: usize,
        col: usize,
    ) -> Result<MoveOutcome, ReversiError> {
        if self.is_over() {
            return Err(ReversiError::GameOver);
        }
        if mover != self.current_turn {
            warn!(match_id = self.id, %mover, "不是该玩家的回合");
            return Err(ReversiError::NotYourTurn);
        }
        if !self.board.can_play(mover, row, col) {
            warn!(match_id = self.id, %mover, row, col, "无效落子");
            return Err(ReversiError::IllegalMove { row, col });
        }

        let outcome = self.board.apply_move(mover, row, col)?;
        self.broadcast(ServerMessage::MoveAccepted { row, col });
        debug!(
            "对局 {} {} 落子 ({}, {})，翻转 {} 子\n{}",
            self.id,
            mover,
            row,
            col,
            outcome.flipped.len(),
            self.board
        );

        let next = mover.opponent();
        if self.board.has_legal_move(next) {
            self.current_turn = next;
            self.notify_turn();
        } else if self.board.has_legal_move(mover) {
            info!(match_id = self.id, color = %next, "无处可下，跳过");
            self.broadcast(ServerMessage::Pass { color: next });
            self.current_turn = mover;
            self.notify_turn();
        } else {
            self.end_game();
        }

        Ok(outcome)
    }

    /// 认输
    pub fn resign(&mut self, resigner: Piece) -> Result<(), ReversiError> {
        if self.is_over() {
            return Err(ReversiError::GameOver);
        }

        let (black_count, white_count) = self.counts();
        let opponent = resigner.opponent();

        self.send_to(
            resigner,
            ServerMessage::GameOver {
                outcome: GameOutcome::Lose,
                black_count,
                white_count,
            },
        );
        self.send_to(opponent, ServerMessage::OpponentResigned);
        self.send_to(
            opponent,
            ServerMessage::GameOver {
                outcome: GameOutcome::Win,
                black_count,
                white_count,
            },
        );

        info!(match_id = self.id, %resigner, "玩家认输");
        self.finish();
        Ok(())
    }

    /// 处理断线，对局已结束时不做任何事
    pub fn handle_disconnect(&mut self, color: Piece) {
        if self.is_over() {
            return;
        }

        // 断线方不再接收任何消息
        let _ = self.slot_mut(color).take();

        let (black_count, white_count) = self.counts();
        let remaining = color.opponent();
        self.send_to(remaining, ServerMessage::OpponentDisconnected);
        self.send_to(
            remaining,
            ServerMessage::GameOver {
                outcome: GameOutcome::Win,
                black_count,
                white_count,
            },
        );

        info!(match_id = self.id, %color, "玩家断线，对手获胜");
        self.finish();
    }

    /// 双方都无处可下，按棋子数判定胜负
    fn end_game(&mut self) {
        let (black_count, white_count) = self.counts();

        for color in [Piece::Black, Piece::White] {
            self.send_to(
                color,
                ServerMessage::GameOver {
                    outcome: GameOutcome::for_color(color, black_count, white_count),
                    black_count,
                    white_count,
                },
            );
        }

        info!(
            match_id = self.id,
            black_count,
            white_count,
            result = GameOutcome::for_color(Piece::Black, black_count, white_count).token(),
            "对局结束（黑方视角）"
        );
        self.finish();
    }

    /// 进入终态并释放双方句柄
    fn finish(&mut self) {
        self.state = MatchState::Over;
        for player in [self.black.take(), self.white.take()].into_iter().flatten() {
            player.close();
        }

        let elapsed = Utc::now() - self.started_at;
        debug!(match_id = self.id, secs = elapsed.num_seconds(), "对局资源已释放");
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.board.stone_count(Piece::Black),
            self.board.stone_count(Piece::White),
        )
    }

    fn slot_mut(&mut self, color: Piece) -> &mut Option<PlayerHandle> {
        match color {
            Piece::White => &mut self.white,
            _ => &mut self.black,
        }
    }

    fn player(&self, color: Piece) -> Option<&PlayerHandle> {
        match color {
            Piece::Black => self.black.as_ref(),
            Piece::White => self.white.as_ref(),
            Piece::Empty => None,
        }
    }

    fn send_to(&self, color: Piece, msg: ServerMessage) {
        if let Some(player) = self.player(color) {
            player.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        self.send_to(Piece::Black, msg.clone());
        self.send_to(Piece::White, msg);
    }

    /// 通知双方当前回合
    fn notify_turn(&self) {
        let waiting = self.current_turn.opponent();
        self.send_to(self.current_turn, ServerMessage::YourTurn);
        self.send_to(waiting, ServerMessage::OpponentTurn);
    }
}
