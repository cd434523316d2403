//! 走法与走法序列
//!
//! 文本格式：
//! - 走法：`<起点格号>-<终点格号>`，如 `9-14`
//! - 走法序列（一次连跳）：按跳跃顺序以逗号连接，如 `2-6,9-14`

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, MOVE_SEPARATOR, OFFSET_BASIC, OFFSET_CAPTURE, SEQUENCE_SEPARATOR};
use crate::coord::Coord;
use crate::error::CheckersError;
use crate::piece::Side;

/// 走法类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// 斜向单步
    Basic,
    /// 斜向跳吃
    Capture,
}

/// 走法
///
/// 只能通过 [`Move::new`] 构造，因此起点终点一定是合法格子，偏移一定是单步或跳吃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    src: Coord,
    dst: Coord,
}

impl Move {
    /// 创建走法并校验形状
    pub fn new(src: Coord, dst: Coord) -> Result<Self, CheckersError> {
        for pos in [src, dst] {
            if !pos.is_valid() {
                return Err(CheckersError::OutOfBounds {
                    row: pos.row,
                    col: pos.col,
                });
            }
        }

        let offset = dst - src;
        let rows = offset.row.abs();
        let cols = offset.col.abs();
        if rows != cols || (rows != OFFSET_BASIC && rows != OFFSET_CAPTURE) {
            return Err(CheckersError::InvalidMoveShape {
                src_row: src.row,
                src_col: src.col,
                dst_row: dst.row,
                dst_col: dst.col,
            });
        }

        Ok(Self { src, dst })
    }

    /// 按格号创建走法
    pub fn from_squares(src: u8, dst: u8) -> Result<Self, CheckersError> {
        let src_pos = Coord::from_square_id(src)
            .ok_or_else(|| CheckersError::format(src.to_string(), "square id must be within 1..=32"))?;
        let dst_pos = Coord::from_square_id(dst)
            .ok_or_else(|| CheckersError::format(dst.to_string(), "square id must be within 1..=32"))?;
        Self::new(src_pos, dst_pos)
    }

    /// 起点
    pub fn src(&self) -> Coord {
        self.src
    }

    /// 终点
    pub fn dst(&self) -> Coord {
        self.dst
    }

    /// 走法类型
    pub fn kind(&self) -> MoveKind {
        if (self.dst - self.src).row.abs() == OFFSET_BASIC {
            MoveKind::Basic
        } else {
            MoveKind::Capture
        }
    }

    /// 是否为跳吃
    pub fn is_capture(&self) -> bool {
        self.kind() == MoveKind::Capture
    }

    /// 按方向推断的走子方：行号增大为北方，减小为南方
    ///
    /// 王棋可以向任意方向走，所以这只说明方向，不说明棋子归属。
    pub fn implied_mover(&self) -> Side {
        if self.dst.row > self.src.row {
            Side::North
        } else {
            Side::South
        }
    }

    /// 是否落在底线（升变）
    pub fn is_crowning(&self) -> bool {
        self.dst.row == 0 || self.dst.row == BOARD_SIZE as i8 - 1
    }

    /// 被吃棋子所在格（仅跳吃走法）
    pub fn captured_square(&self) -> Option<Coord> {
        match self.kind() {
            MoveKind::Capture => Some(Coord::midpoint(self.src, self.dst)),
            MoveKind::Basic => None,
        }
    }

    /// 序列化为 `src-dst`
    pub fn serialize(&self) -> String {
        format!(
            "{}{}{}",
            self.src.square_id(),
            MOVE_SEPARATOR,
            self.dst.square_id()
        )
    }

    /// 从 `src-dst` 解析
    pub fn deserialize(text: &str) -> Result<Self, CheckersError> {
        let mut parts = text.split(MOVE_SEPARATOR);
        let (Some(src), Some(dst), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CheckersError::format(text, "move must be <src>-<dst>"));
        };
        Self::new(Coord::deserialize(src)?, Coord::deserialize(dst)?)
    }

    /// 将走法列表序列化为逗号分隔的序列
    pub fn serialize_seq(moves: &[Move]) -> String {
        moves
            .iter()
            .map(Move::serialize)
            .collect::<Vec<_>>()
            .join(&SEQUENCE_SEPARATOR.to_string())
    }

    /// 解析走法序列
    pub fn deserialize_seq(text: &str) -> Result<Vec<Move>, CheckersError> {
        Ok(MoveSequence::deserialize(text)?.into_moves())
    }

    /// 解析走法序列中的第一步
    pub fn deserialize_seq_first(text: &str) -> Result<Move, CheckersError> {
        Ok(MoveSequence::deserialize(text)?.first())
    }

    /// 解析走法序列中的最后一步
    pub fn deserialize_seq_last(text: &str) -> Result<Move, CheckersError> {
        Ok(MoveSequence::deserialize(text)?.last())
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Move {
    type Err = CheckersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::deserialize(s)
    }
}

impl TryFrom<String> for Move {
    type Error = CheckersError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Move::deserialize(&value)
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> Self {
        mv.serialize()
    }
}

/// 一个回合内的走法序列（非空，按实际跳跃顺序）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MoveSequence(Vec<Move>);

impl MoveSequence {
    /// 由走法列表创建，空列表返回 None
    pub fn new(moves: Vec<Move>) -> Option<Self> {
        if moves.is_empty() {
            None
        } else {
            Some(Self(moves))
        }
    }

    /// 只含一步的序列
    pub fn single(mv: Move) -> Self {
        Self(vec![mv])
    }

    /// 第一步
    pub fn first(&self) -> Move {
        self.0[0]
    }

    /// 最后一步
    pub fn last(&self) -> Move {
        self.0[self.0.len() - 1]
    }

    /// 追加一步，得到新的序列（`prev + "," + next`）
    #[must_use]
    pub fn extended(&self, next: Move) -> Self {
        let mut moves = self.0.clone();
        moves.push(next);
        Self(moves)
    }

    /// 去掉最后一步后的前缀，只有一步时返回 None
    pub fn prefix(&self) -> Option<MoveSequence> {
        Self::new(self.0[..self.0.len() - 1].to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.0.iter()
    }

    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    pub fn into_moves(self) -> Vec<Move> {
        self.0
    }

    /// 序列化
    pub fn serialize(&self) -> String {
        Move::serialize_seq(&self.0)
    }

    /// 解析，空字符串或任一走法格式错误都会失败
    pub fn deserialize(text: &str) -> Result<Self, CheckersError> {
        if text.trim().is_empty() {
            return Err(CheckersError::format(text, "move sequence is empty"));
        }
        let moves = text
            .split(SEQUENCE_SEPARATOR)
            .map(Move::deserialize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(moves))
    }
}

impl std::fmt::Display for MoveSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for MoveSequence {
    type Err = CheckersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveSequence::deserialize(s)
    }
}

impl TryFrom<String> for MoveSequence {
    type Error = CheckersError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MoveSequence::deserialize(&value)
    }
}

impl From<MoveSequence> for String {
    fn from(seq: MoveSequence) -> Self {
        seq.serialize()
    }
}

impl From<Move> for MoveSequence {
    fn from(mv: Move) -> Self {
        MoveSequence::single(mv)
    }
}

impl<'a> IntoIterator for &'a MoveSequence {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(src: u8, dst: u8) -> Move {
        Move::from_squares(src, dst).unwrap()
    }

    #[test]
    fn test_move_kind() {
        assert_eq!(mv(9, 14).kind(), MoveKind::Basic);
        assert_eq!(mv(18, 9).kind(), MoveKind::Capture);
        assert!(mv(18, 9).is_capture());
    }

    #[test]
    fn test_invalid_shape() {
        // 同一行
        let err = Move::new(Coord::new(0, 1), Coord::new(0, 3)).unwrap_err();
        assert!(matches!(err, CheckersError::InvalidMoveShape { .. }));

        // 三格斜跳
        let err = Move::new(Coord::new(0, 1), Coord::new(3, 4)).unwrap_err();
        assert!(matches!(err, CheckersError::InvalidMoveShape { .. }));

        // 非落子格
        let err = Move::new(Coord::new(0, 1), Coord::new(1, 1)).unwrap_err();
        assert!(matches!(err, CheckersError::OutOfBounds { .. }));

        // 格号合法但不相邻
        assert!(Move::from_squares(1, 32).is_err());
    }

    #[test]
    fn test_implied_mover() {
        assert_eq!(mv(9, 14).implied_mover(), Side::North);
        assert_eq!(mv(22, 18).implied_mover(), Side::South);
    }

    #[test]
    fn test_crowning() {
        assert!(mv(5, 1).is_crowning());
        assert!(mv(27, 32).is_crowning());
        assert!(!mv(9, 14).is_crowning());
    }

    #[test]
    fn test_captured_square() {
        assert_eq!(mv(18, 9).captured_square(), Coord::from_square_id(14));
        assert_eq!(mv(9, 14).captured_square(), None);
    }

    #[test]
    fn test_serialize_move() {
        let m = mv(9, 14);
        assert_eq!(m.serialize(), "9-14");
        assert_eq!(m.to_string(), "9-14");
        let parsed = Move::deserialize("9-14").unwrap();
        assert_eq!(parsed.src(), m.src());
        assert_eq!(parsed.dst(), m.dst());
    }

    #[test]
    fn test_deserialize_move_errors() {
        for bad in ["", "9", "9-", "-14", "9-14-18", "a-b", "9_14", "0-5", "9-40"] {
            assert!(
                matches!(Move::deserialize(bad), Err(CheckersError::Format { .. })),
                "{:?} should be a format error",
                bad
            );
        }
        assert!(matches!(
            Move::deserialize("9-10"),
            Err(CheckersError::InvalidMoveShape { .. })
        ));
    }

    #[test]
    fn test_sequence_round_trip() {
        let moves = vec![mv(2, 6), mv(9, 14)];
        let text = Move::serialize_seq(&moves);
        assert_eq!(text, "2-6,9-14");
        assert_eq!(Move::deserialize_seq(&text).unwrap(), moves);
        assert_eq!(Move::deserialize_seq_first(&text).unwrap(), moves[0]);
        assert_eq!(Move::deserialize_seq_last(&text).unwrap(), moves[1]);
    }

    #[test]
    fn test_sequence_single() {
        assert_eq!(Move::deserialize_seq("22-18").unwrap(), vec![mv(22, 18)]);
        assert_eq!(Move::deserialize_seq_first("22-18").unwrap(), mv(22, 18));
        assert_eq!(Move::deserialize_seq_last("22-18").unwrap(), mv(22, 18));
    }

    #[test]
    fn test_sequence_errors() {
        assert!(Move::deserialize_seq("").is_err());
        assert!(Move::deserialize_seq_first("").is_err());
        assert!(Move::deserialize_seq("9-14,").is_err());
        assert!(Move::deserialize_seq("9-14,,18-23").is_err());
        assert!(MoveSequence::new(Vec::new()).is_none());
    }

    #[test]
    fn test_sequence_extended() {
        let seq = MoveSequence::single(mv(18, 9));
        let longer = seq.extended(mv(9, 2));
        assert_eq!(longer.serialize(), "18-9,9-2");
        assert_eq!(longer.first(), mv(18, 9));
        assert_eq!(longer.last(), mv(9, 2));
        assert_eq!(longer.prefix(), Some(seq.clone()));
        assert_eq!(seq.prefix(), None);
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_serde_as_text() {
        let seq: MoveSequence = "18-9,9-2".parse().unwrap();
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, "\"18-9,9-2\"");
        let back: MoveSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);

        assert!(serde_json::from_str::<Move>("\"1-3\"").is_err());
    }

    #[test]
    fn test_every_move_round_trips() {
        let mut all = Vec::new();
        for id in 1..=32u8 {
            let src = Coord::from_square_id(id).unwrap();
            for (dr, dc) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                for scale in [1i8, 2] {
                    let Ok(m) = Move::new(src, src + scale * Coord::new(dr, dc)) else {
                        continue;
                    };
                    let text = m.serialize();
                    assert_eq!(Move::deserialize(&text).unwrap(), m, "{}", text);
                    all.push(m);
                }
            }
        }
        // 4 个方向上的一步和两步，除去出界的
        assert_eq!(all.len(), 98 + 72);

        for size in 1..=4 {
            for chunk in all.chunks(size) {
                let text = Move::serialize_seq(chunk);
                assert_eq!(Move::deserialize_seq(&text).unwrap(), chunk, "{}", text);
            }
        }
        let text = Move::serialize_seq(&all);
        assert_eq!(Move::deserialize_seq(&text).unwrap(), all);
    }

    #[test]
    fn test_deserialize_move_rejects_padding() {
        for bad in [" 9-14", "9-14 ", "9 - 14", "+9-14", "9-+14"] {
            assert!(
                matches!(Move::deserialize(bad), Err(CheckersError::Format { .. })),
                "{:?} should be a format error",
                bad
            );
        }
        assert!(Move::deserialize_seq("9-14, 18-23").is_err());
    }
}
