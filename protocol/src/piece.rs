//! 棋子定义

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CheckersError;

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// 北方（先手，占据 1-12 格，向行号增大的方向走）
    North,
    /// 南方（后手，占据 21-32 格，向行号减小的方向走）
    South,
}

impl Side {
    /// 获取对方阵营
    pub fn opponent(&self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
        }
    }

    /// 协议中的单字符表示
    pub fn to_char(&self) -> char {
        match self {
            Side::North => 'N',
            Side::South => 'S',
        }
    }

    /// 从协议字符解析
    pub fn from_char(c: char) -> Option<Side> {
        match c {
            'N' | 'n' => Some(Side::North),
            'S' | 's' => Some(Side::South),
            _ => None,
        }
    }

    /// 中继服务端分配的会话 ID：奇数为北方，偶数为南方
    pub fn from_session_id(session_id: i64) -> Side {
        if session_id % 2 != 0 {
            Side::North
        } else {
            Side::South
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl FromStr for Side {
    type Err = CheckersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Side::from_char(c).ok_or_else(|| CheckersError::format(s, "side must be N or S"))
            }
            _ => Err(CheckersError::format(s, "side must be a single character")),
        }
    }
}

/// 棋子
///
/// 不可变的值：升变通过 [`Piece::promote`] 生成新棋子，由棋盘替换格子内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub side: Side,
    pub is_king: bool,
}

impl Piece {
    /// 创建普通棋子
    pub fn new(side: Side) -> Self {
        Self {
            side,
            is_king: false,
        }
    }

    /// 创建王棋
    pub fn king(side: Side) -> Self {
        Self {
            side,
            is_king: true,
        }
    }

    /// 升变为王
    #[must_use]
    pub fn promote(self) -> Self {
        Self {
            is_king: true,
            ..self
        }
    }

    /// 单字符描述：n/s 为普通棋子，N/S 为王
    pub fn descriptor(&self) -> char {
        let c = match self.side {
            Side::North => 'n',
            Side::South => 's',
        };
        if self.is_king {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// 从单字符描述解析
    pub fn from_descriptor(c: char) -> Option<Piece> {
        let side = match c.to_ascii_lowercase() {
            'n' => Side::North,
            's' => Side::South,
            _ => return None,
        };
        Some(Piece {
            side,
            is_king: c.is_ascii_uppercase(),
        })
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        assert_eq!(Piece::new(Side::North).descriptor(), 'n');
        assert_eq!(Piece::king(Side::North).descriptor(), 'N');
        assert_eq!(Piece::new(Side::South).descriptor(), 's');
        assert_eq!(Piece::king(Side::South).descriptor(), 'S');
    }

    #[test]
    fn test_from_descriptor() {
        assert_eq!(Piece::from_descriptor('n'), Some(Piece::new(Side::North)));
        assert_eq!(Piece::from_descriptor('S'), Some(Piece::king(Side::South)));
        assert_eq!(Piece::from_descriptor('x'), None);
        assert_eq!(Piece::from_descriptor('R'), None);
    }

    #[test]
    fn test_promote() {
        let piece = Piece::new(Side::South);
        let king = piece.promote();
        assert!(!piece.is_king);
        assert!(king.is_king);
        assert_eq!(king.side, Side::South);
        assert_eq!(king.promote(), king);
    }

    #[test]
    fn test_side() {
        assert_eq!(Side::North.opponent(), Side::South);
        assert_eq!(Side::South.opponent(), Side::North);
        assert_eq!("N".parse::<Side>().unwrap(), Side::North);
        assert_eq!("S".parse::<Side>().unwrap(), Side::South);
        assert!("X".parse::<Side>().is_err());
        assert!("NS".parse::<Side>().is_err());
        assert_eq!(Side::South.to_string(), "S");
    }

    #[test]
    fn test_side_from_session_id() {
        assert_eq!(Side::from_session_id(1), Side::North);
        assert_eq!(Side::from_session_id(2), Side::South);
        assert_eq!(Side::from_session_id(7), Side::North);
    }
}
