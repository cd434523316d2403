//! 棋盘坐标与 1..32 格号换算
//!
//! 格号按行优先编号，只数对角线编号（row + col）为奇数的深色格：
//! 格 1 = (0, 1)，格 32 = (7, 6)。

use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, COLUMN_SPACING, SQUARES_PER_ROW, SQUARE_COUNT};
use crate::error::CheckersError;

/// 棋盘坐标（行，列）
///
/// 也用作方向向量，所以分量是有符号的，允许暂时越界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: i8,
    pub col: i8,
}

impl Coord {
    /// 创建坐标（不检查边界）
    pub const fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    /// 对角线编号
    pub fn diagonal(&self) -> i8 {
        self.row + self.col
    }

    /// 是否在 8x8 棋盘内
    pub fn in_grid(&self) -> bool {
        let size = BOARD_SIZE as i8;
        (0..size).contains(&self.row) && (0..size).contains(&self.col)
    }

    /// 是否是可落子的格子：在棋盘内且位于奇数对角线
    pub fn is_valid(&self) -> bool {
        self.in_grid() && self.diagonal() % 2 == 1
    }

    /// 两点的中点（整除）
    ///
    /// 只有两点在两个方向上都相差偶数时结果才有意义，即跳吃走法。
    pub fn midpoint(a: Coord, b: Coord) -> Coord {
        (a + b) / 2
    }

    /// 格号转坐标，超出 1..=32 返回 None
    pub fn from_square_id(square_id: u8) -> Option<Coord> {
        if !(1..=SQUARE_COUNT).contains(&square_id) {
            return None;
        }
        let index = (square_id - 1) as i8;
        let row = index / SQUARES_PER_ROW;
        let mut col = COLUMN_SPACING * (index % SQUARES_PER_ROW);
        // 偶数行整体右移一列
        if row % 2 == 0 {
            col += 1;
        }
        Some(Coord::new(row, col))
    }

    /// 坐标转格号，非落子格返回 None
    pub fn to_square_id(&self) -> Option<u8> {
        if self.is_valid() {
            Some(self.square_id())
        } else {
            None
        }
    }

    /// 坐标转格号（调用方保证坐标合法）
    pub(crate) fn square_id(&self) -> u8 {
        let mut col = self.col;
        if self.row % 2 == 0 {
            col -= 1;
        }
        let index = self.row * SQUARES_PER_ROW + col / COLUMN_SPACING;
        (index + 1) as u8
    }

    /// 序列化为格号字符串
    pub fn serialize(&self) -> Result<String, CheckersError> {
        self.to_square_id()
            .map(|id| id.to_string())
            .ok_or(CheckersError::OutOfBounds {
                row: self.row,
                col: self.col,
            })
    }

    /// 从格号字符串解析
    pub fn deserialize(text: &str) -> Result<Coord, CheckersError> {
        // 只接受纯数字，不允许空白和符号
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CheckersError::format(text, "square id is not a number"));
        }
        let square_id: u8 = text
            .parse()
            .map_err(|_| CheckersError::format(text, "square id is not a number"))?;
        Coord::from_square_id(square_id)
            .ok_or_else(|| CheckersError::format(text, "square id must be within 1..=32"))
    }
}

impl FromStr for Coord {
    type Err = CheckersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coord::deserialize(s)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.row - rhs.row, self.col - rhs.col)
    }
}

impl Mul<i8> for Coord {
    type Output = Coord;

    fn mul(self, scalar: i8) -> Coord {
        Coord::new(self.row * scalar, self.col * scalar)
    }
}

impl Mul<Coord> for i8 {
    type Output = Coord;

    fn mul(self, coord: Coord) -> Coord {
        coord * self
    }
}

impl Div<i8> for Coord {
    type Output = Coord;

    fn div(self, divisor: i8) -> Coord {
        Coord::new(self.row / divisor, self.col / divisor)
    }
}
