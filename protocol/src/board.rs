//! 棋盘状态与规则引擎
//!
//! 棋盘只负责规则：可落子位置计算、落子翻转、棋子计数。
//! 它不知道当前轮到谁走，回合归属由调用方（对局）负责校验。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MIN_BOARD_SIZE;
use crate::error::ReversiError;
use crate::piece::{Piece, Position};

/// 八个方向 (行偏移, 列偏移)
const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1), (1, 1),   // 左上-右下
    (-1, 1), (1, -1),   // 右上-左下
    (0, -1), (0, 1),    // 左-右
    (-1, 0), (1, 0),    // 上-下
];

/// 可落子表：落子位置索引 -> 落子后被翻转的位置索引
pub type LegalMoves = BTreeMap<usize, Vec<usize>>;

static NO_MOVES: LegalMoves = BTreeMap::new();

/// 一次落子造成的棋盘变化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// 落子方
    pub color: Piece,
    /// 落子位置
    pub position: Position,
    /// 被翻转的棋子位置
    pub flipped: Vec<Position>,
}

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// 边长
    size: usize,
    /// size x size 格子，索引为 row * size + col
    cells: Vec<Piece>,
    /// 黑方可落子表
    black_moves: LegalMoves,
    /// 白方可落子表
    white_moves: LegalMoves,
    black_count: usize,
    white_count: usize,
    empty_count: usize,
}

impl Board {
    /// 创建初始棋盘（中心四子交叉摆放）
    pub fn new(size: usize) -> Result<Self, ReversiError> {
        Self::validate_size(size)?;

        let mut board = Self::blank(size);
        let half = size / 2;
        board.place(Piece::Black, Position::new(half - 1, half - 1).index(size));
        board.place(Piece::White, Position::new(half - 1, half).index(size));
        board.place(Piece::White, Position::new(half, half - 1).index(size));
        board.place(Piece::Black, Position::new(half, half).index(size));
        board.refresh_legal_moves();

        Ok(board)
    }

    /// 从文本布局创建棋盘
    ///
    /// 每行一排，`B` 为黑、`W` 为白、`.` 为空，忽略空白字符。
    pub fn from_layout(layout: &str) -> Result<Self, ReversiError> {
        let mut rows = Vec::new();
        for line in layout.lines() {
            let row: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if !row.is_empty() {
                rows.push(row);
            }
        }

        let size = rows.len();
        Self::validate_size(size)?;

        let mut board = Self::blank(size);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(ReversiError::InvalidLayout {
                    reason: format!("row {} has {} cells, expected {}", r, row.len(), size),
                });
            }
            for (c, &ch) in row.iter().enumerate() {
                let piece = Piece::from_char(ch).ok_or_else(|| ReversiError::InvalidLayout {
                    reason: format!("unexpected character '{}' at ({}, {})", ch, r, c),
                })?;
                if !piece.is_empty() {
                    board.place(piece, r * size + c);
                }
            }
        }
        board.refresh_legal_moves();

        Ok(board)
    }

    fn validate_size(size: usize) -> Result<(), ReversiError> {
        if size < MIN_BOARD_SIZE || size % 2 != 0 {
            return Err(ReversiError::InvalidSize { size });
        }
        Ok(())
    }

    fn blank(size: usize) -> Self {
        Self {
            size,
            cells: vec![Piece::Empty; size * size],
            black_moves: LegalMoves::new(),
            white_moves: LegalMoves::new(),
            black_count: 0,
            white_count: 0,
            empty_count: size * size,
        }
    }

    /// 棋盘边长
    pub fn size(&self) -> usize {
        self.size
    }

    /// 获取指定格子的内容，越界返回 None
    pub fn get(&self, row: usize, col: usize) -> Option<Piece> {
        let pos = Position::new(row, col);
        pos.is_valid(self.size).then(|| self.cells[pos.index(self.size)])
    }

    /// 指定颜色的可落子表（空格返回空表）
    pub fn legal_moves(&self, color: Piece) -> &LegalMoves {
        match color {
            Piece::Black => &self.black_moves,
            Piece::White => &self.white_moves,
            Piece::Empty => &NO_MOVES,
        }
    }

    /// 指定颜色能否在 (row, col) 落子
    pub fn can_play(&self, color: Piece, row: usize, col: usize) -> bool {
        let pos = Position::new(row, col);
        pos.is_valid(self.size) && self.legal_moves(color).contains_key(&pos.index(self.size))
    }

    pub fn has_legal_move(&self, color: Piece) -> bool {
        !self.legal_moves(color).is_empty()
    }

    pub fn legal_move_count(&self, color: Piece) -> usize {
        self.legal_moves(color).len()
    }

    /// 双方都无处可下时对局结束
    pub fn is_game_over(&self) -> bool {
        self.black_moves.is_empty() && self.white_moves.is_empty()
    }

    /// 棋子数（传入 `Piece::Empty` 返回空格数）
    pub fn stone_count(&self, color: Piece) -> usize {
        match color {
            Piece::Black => self.black_count,
            Piece::White => self.white_count,
            Piece::Empty => self.empty_count,
        }
    }

    pub fn empty_count(&self) -> usize {
        self.empty_count
    }

    /// 扫描整个棋盘重新计数 (黑, 白, 空)，仅用于校验缓存计数
    pub fn scan_counts(&self) -> (usize, usize, usize) {
        self.cells.iter().fold((0, 0, 0), |(b, w, e), piece| match piece {
            Piece::Black => (b + 1, w, e),
            Piece::White => (b, w + 1, e),
            Piece::Empty => (b, w, e + 1),
        })
    }

    /// 落子并翻转
    ///
    /// 调用方应先用 [`Board::can_play`] 检查，这里仍会再校验一次。
    pub fn apply_move(
        &mut self,
        color: Piece,
        row: usize,
        col: usize,
    ) -> Result<MoveOutcome, ReversiError> {
        let pos = Position::new(row, col);
        if !pos.is_valid(self.size) {
            return Err(ReversiError::IllegalMove { row, col });
        }

        let index = pos.index(self.size);
        let flips = match self.legal_moves(color).get(&index) {
            Some(flips) => flips.clone(),
            None => return Err(ReversiError::IllegalMove { row, col }),
        };

        self.place(color, index);
        for &cell in &flips {
            self.place(color, cell);
        }
        self.refresh_legal_moves();

        debug_assert_eq!(
            self.scan_counts(),
            (self.black_count, self.white_count, self.empty_count)
        );

        let size = self.size;
        Ok(MoveOutcome {
            color,
            position: pos,
            flipped: flips
                .into_iter()
                .filter_map(|cell| Position::from_index(cell, size))
                .collect(),
        })
    }

    /// 放置棋子并增量更新计数
    fn place(&mut self, color: Piece, index: usize) {
        let previous = self.cells[index];
        if previous == color {
            return;
        }
        match previous {
            Piece::Black => self.black_count -= 1,
            Piece::White => self.white_count -= 1,
            Piece::Empty => self.empty_count -= 1,
        }
        match color {
            Piece::Black => self.black_count += 1,
            Piece::White => self.white_count += 1,
            Piece::Empty => self.empty_count += 1,
        }
        self.cells[index] = color;
    }

    /// 全盘扫描，重新计算双方可落子表
    fn refresh_legal_moves(&mut self) {
        self.black_moves.clear();
        self.white_moves.clear();

        for index in 0..self.cells.len() {
            if !self.cells[index].is_empty() {
                continue;
            }
            let origin = Position::new(index / self.size, index % self.size);

            for (dr, dc) in DIRECTIONS {
                let Some(next) = origin.offset(dr, dc, self.size) else {
                    continue;
                };
                let neighbor = self.cells[next.index(self.size)];
                if neighbor.is_empty() {
                    continue;
                }

                // 相邻是对手棋子，则落子方为其对手
                let mover = neighbor.opponent();
                if let Some(run) = self.bracketed_run(next, dr, dc, mover) {
                    let table = match mover {
                        Piece::Black => &mut self.black_moves,
                        _ => &mut self.white_moves,
                    };
                    table.entry(index).or_default().extend(run);
                }
            }
        }
    }

    /// 从 `start` 沿方向收集对手棋子，直到遇到落子方棋子才算夹住
    fn bracketed_run(&self, start: Position, dr: isize, dc: isize, mover: Piece) -> Option<Vec<usize>> {
        let mut run = Vec::new();
        let mut pos = start;
        loop {
            let piece = self.cells[pos.index(self.size)];
            if mover.is_opponent_of(piece) {
                run.push(pos.index(self.size));
                // 走出棋盘则无效
                pos = pos.offset(dr, dc, self.size)?;
            } else if mover.is_same_color(piece) {
                return Some(run);
            } else {
                return None;
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            let line: String = row.iter().map(Piece::to_char).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
