//! 棋盘状态与走法查询
//!
//! 棋盘只负责"可能的走法"和无条件执行走法；强制连跳由上层回合状态机负责。

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, NORTH_START_SQUARES, SOUTH_START_SQUARES};
use crate::coord::Coord;
use crate::error::CheckersError;
use crate::moves::{Move, MoveKind};
use crate::piece::{Piece, Side};

/// 四个斜向单位偏移，顺序即走法列表的顺序
const OFFSETS: [Coord; 4] = [
    Coord::new(1, 1),
    Coord::new(1, -1),
    Coord::new(-1, 1),
    Coord::new(-1, -1),
];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，按 [row][col] 索引
    grid: [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            grid: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// 创建初始棋盘：北方占 1-12 格，南方占 21-32 格
    pub fn initial() -> Self {
        let mut board = Self::empty();
        for (squares, side) in [
            (NORTH_START_SQUARES, Side::North),
            (SOUTH_START_SQUARES, Side::South),
        ] {
            for square_id in squares {
                if let Some(pos) = Coord::from_square_id(square_id) {
                    board.grid[pos.row as usize][pos.col as usize] = Some(Piece::new(side));
                }
            }
        }
        board
    }

    /// 按 (格号, 棋子描述符) 列表摆放棋子
    pub fn from_description(description: &[(u8, char)]) -> Result<Self, CheckersError> {
        let mut board = Self::empty();
        for &(square_id, descriptor) in description {
            let pos = Coord::from_square_id(square_id).ok_or_else(|| {
                CheckersError::format(square_id.to_string(), "square id must be within 1..=32")
            })?;
            let piece = Piece::from_descriptor(descriptor).ok_or_else(|| {
                CheckersError::format(descriptor.to_string(), "descriptor must be one of n, N, s, S")
            })?;
            board.set(pos, Some(piece))?;
        }
        Ok(board)
    }

    /// 是否是可落子的格子
    pub fn is_valid(&self, pos: Coord) -> bool {
        pos.is_valid()
    }

    /// 指定格子是否为空，非落子格报错
    pub fn is_empty(&self, pos: Coord) -> Result<bool, CheckersError> {
        Ok(self.get(pos)?.is_none())
    }

    /// 获取指定位置的棋子，非落子格报错
    pub fn get(&self, pos: Coord) -> Result<Option<Piece>, CheckersError> {
        check_bounds(pos)?;
        Ok(self.cell(pos))
    }

    /// 设置指定位置的棋子，非落子格报错
    pub fn set(&mut self, pos: Coord, piece: Option<Piece>) -> Result<(), CheckersError> {
        check_bounds(pos)?;
        self.grid[pos.row as usize][pos.col as usize] = piece;
        Ok(())
    }

    /// 移除并返回指定位置的棋子，非落子格报错
    pub fn remove(&mut self, pos: Coord) -> Result<Option<Piece>, CheckersError> {
        check_bounds(pos)?;
        Ok(self.grid[pos.row as usize][pos.col as usize].take())
    }

    /// 走法生成内部使用的查询，棋盘外视为空
    fn cell(&self, pos: Coord) -> Option<Piece> {
        if pos.in_grid() {
            self.grid[pos.row as usize][pos.col as usize]
        } else {
            None
        }
    }

    /// 获取指定阵营的所有棋子位置（行优先顺序）
    pub fn find_piece_locations(&self, side: Side) -> Vec<Coord> {
        let mut result = Vec::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if let Some(piece) = self.grid[row][col] {
                    if piece.side == side {
                        result.push(Coord::new(row as i8, col as i8));
                    }
                }
            }
        }
        result
    }

    /// 获取所有棋子位置（先北方后南方）
    pub fn find_all_piece_locations(&self) -> Vec<Coord> {
        let mut locations = self.find_piece_locations(Side::North);
        locations.extend(self.find_piece_locations(Side::South));
        locations
    }

    /// 指定阵营的棋子数量
    pub fn piece_count(&self, side: Side) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|cell| matches!(cell, Some(piece) if piece.side == side))
            .count()
    }

    /// 执行走法（不检查规则）
    ///
    /// 跳吃时移除中间的棋子并返回它；落到底线的棋子升变为王。
    pub fn perform_move(&mut self, mv: &Move) -> Result<Option<Piece>, CheckersError> {
        let src = mv.src();
        let piece = self.remove(src)?.ok_or(CheckersError::EmptySquare {
            row: src.row,
            col: src.col,
        })?;

        let captured = match mv.captured_square() {
            Some(enemy_pos) => self.remove(enemy_pos)?,
            None => None,
        };

        let piece = if mv.is_crowning() {
            piece.promote()
        } else {
            piece
        };
        self.set(mv.dst(), Some(piece))?;

        Ok(captured)
    }

    /// 查找指定棋子的单步走法，空格返回空列表，非落子格报错
    pub fn find_basic_moves(&self, from: Coord) -> Result<Vec<Move>, CheckersError> {
        check_bounds(from)?;
        Ok(self.find_moves(from, MoveKind::Basic))
    }

    /// 查找指定棋子的跳吃走法，空格返回空列表，非落子格报错
    pub fn find_capture_moves(&self, from: Coord) -> Result<Vec<Move>, CheckersError> {
        check_bounds(from)?;
        Ok(self.find_moves(from, MoveKind::Capture))
    }

    /// 按偏移顺序生成走法：方向合法（或为王）、终点合法且为空；
    /// 跳吃还要求中间是对方棋子。
    fn find_moves(&self, from: Coord, kind: MoveKind) -> Vec<Move> {
        let Some(piece) = self.cell(from) else {
            return Vec::new();
        };
        let scale = match kind {
            MoveKind::Basic => 1,
            MoveKind::Capture => 2,
        };

        let mut moves = Vec::new();
        for offset in OFFSETS {
            let to = from + scale * offset;
            if !self.is_valid(to) || self.cell(to).is_some() {
                continue;
            }
            let Ok(mv) = Move::new(from, to) else {
                continue;
            };

            let direction_valid = mv.implied_mover() == piece.side || piece.is_king;
            if !direction_valid {
                continue;
            }

            if let Some(enemy_pos) = mv.captured_square() {
                let enemy_valid = matches!(self.cell(enemy_pos), Some(enemy) if enemy.side != piece.side);
                if !enemy_valid {
                    continue;
                }
            }

            moves.push(mv);
        }
        moves
    }

    /// 指定阵营的所有单步走法
    pub fn find_all_basic_moves(&self, side: Side) -> Vec<Move> {
        self.find_piece_locations(side)
            .into_iter()
            .flat_map(|pos| self.find_moves(pos, MoveKind::Basic))
            .collect()
    }

    /// 指定阵营的所有跳吃走法
    pub fn find_all_capture_moves(&self, side: Side) -> Vec<Move> {
        self.find_piece_locations(side)
            .into_iter()
            .flat_map(|pos| self.find_moves(pos, MoveKind::Capture))
            .collect()
    }

    /// 指定阵营的所有走法，单步在前，跳吃在后
    pub fn find_all_moves(&self, side: Side) -> Vec<Move> {
        let mut moves = self.find_all_basic_moves(side);
        moves.extend(self.find_all_capture_moves(side));
        moves
    }
}

fn check_bounds(pos: Coord) -> Result<(), CheckersError> {
    if pos.is_valid() {
        Ok(())
    } else {
        Err(CheckersError::OutOfBounds {
            row: pos.row,
            col: pos.col,
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  0 1 2 3 4 5 6 7")?;
        for (row, cells) in self.grid.iter().enumerate() {
            write!(f, "\n{} ", row)?;
            for cell in cells {
                match cell {
                    Some(piece) => write!(f, "{} ", piece)?,
                    None => write!(f, ". ")?,
                }
            }
        }
        Ok(())
    }
}
