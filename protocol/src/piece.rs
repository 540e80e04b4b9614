//! 棋子与坐标定义

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// 棋子（格子内容）
///
/// 黑白互为对手，`Empty` 既不是任何一方的棋子，也不是任何一方的对手。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    /// 黑方（先手）
    Black,
    /// 白方（后手）
    White,
    /// 空格
    Empty,
}

impl Piece {
    /// 获取对手颜色（空格的对手仍是空格）
    pub fn opponent(&self) -> Piece {
        match self {
            Piece::Black => Piece::White,
            Piece::White => Piece::Black,
            Piece::Empty => Piece::Empty,
        }
    }

    /// `other` 是否为本方的对手棋子
    pub fn is_opponent_of(&self, other: Piece) -> bool {
        !self.is_empty() && !other.is_empty() && *self != other
    }

    /// `other` 是否为本方棋子
    pub fn is_same_color(&self, other: Piece) -> bool {
        !self.is_empty() && *self == other
    }

    pub fn is_empty(&self) -> bool {
        *self == Piece::Empty
    }

    /// 协议中使用的颜色标记
    pub fn token(&self) -> &'static str {
        match self {
            Piece::Black => "BLACK",
            Piece::White => "WHITE",
            Piece::Empty => "EMPTY",
        }
    }

    /// 棋盘文本表示中使用的字符
    pub fn to_char(&self) -> char {
        match self {
            Piece::Black => 'B',
            Piece::White => 'W',
            Piece::Empty => '.',
        }
    }

    /// 从棋盘文本字符解析
    pub fn from_char(c: char) -> Option<Piece> {
        match c {
            'B' | 'b' => Some(Piece::Black),
            'W' | 'w' => Some(Piece::White),
            '.' | '-' => Some(Piece::Empty),
            _ => None,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Piece {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLACK" => Ok(Piece::Black),
            "WHITE" => Ok(Piece::White),
            "EMPTY" => Ok(Piece::Empty),
            other => Err(ProtocolError::InvalidColor(other.to_string())),
        }
    }
}

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 行
    pub row: usize,
    /// 列
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// 检查位置是否在 `size` x `size` 棋盘内
    pub fn is_valid(&self, size: usize) -> bool {
        self.row < size && self.col < size
    }

    /// 转换为线性索引（row * size + col）
    pub fn index(&self, size: usize) -> usize {
        self.row * size + self.col
    }

    /// 从线性索引转换
    pub fn from_index(index: usize, size: usize) -> Option<Self> {
        if size > 0 && index < size * size {
            Some(Self {
                row: index / size,
                col: index % size,
            })
        } else {
            None
        }
    }

    /// 获取偏移后的位置，越界返回 None
    pub fn offset(&self, dr: isize, dc: isize, size: usize) -> Option<Position> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let pos = Position { row, col };
        pos.is_valid(size).then_some(pos)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
