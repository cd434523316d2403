//! 消息类型定义
//!
//! 与中继服务端之间交换的都是 UTF-8 文本帧（由传输层以 NUL 结尾划分）：
//! - 入站：`start_game`、JSON 走法记录、`forfeit`、`win`、`lose`
//! - 出站：JSON 走法记录、游戏结果文本

use serde::{Deserialize, Serialize};

use crate::error::{CheckersError, ProtocolError, Result};
use crate::event::GameEvent;
use crate::moves::MoveSequence;
use crate::piece::Side;

/// 中继服务端分配的会话 ID
pub type SessionId = i64;

/// 游戏结果（从本地玩家的视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    Win,
    Lose,
    /// 一方认输或掉线
    Forfeit,
}

impl GameResult {
    /// 协议文本
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Win => "win",
            GameResult::Lose => "lose",
            GameResult::Forfeit => "forfeit",
        }
    }

    /// 解析协议文本（不区分大小写）
    pub fn parse(text: &str) -> std::result::Result<Self, CheckersError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(GameResult::Win),
            "lose" => Ok(GameResult::Lose),
            "forfeit" => Ok(GameResult::Forfeit),
            _ => Err(CheckersError::format(text, "result must be win, lose or forfeit")),
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 走法记录（JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 本回合的走法序列
    #[serde(rename = "movesString")]
    pub moves: MoveSequence,
    /// 发送方会话 ID
    #[serde(rename = "UID")]
    pub uid: SessionId,
}

/// 中继服务端发给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// 双方就位，游戏开始
    StartGame,
    /// 对手的走法
    Moves(MoveRecord),
    /// 对手认输或掉线
    Forfeit,
    /// 服务端判定本方获胜
    Win,
    /// 服务端判定本方失败
    Lose,
}

impl InboundMessage {
    /// 按前缀标签解析一帧文本
    pub fn parse(frame: &str) -> Result<Self> {
        let text = frame.trim_matches(|c: char| c == '\0' || c.is_whitespace());

        if text.starts_with("start_game") {
            Ok(InboundMessage::StartGame)
        } else if text.starts_with('{') {
            let record: MoveRecord = serde_json::from_str(text)?;
            Ok(InboundMessage::Moves(record))
        } else if text.starts_with("forfeit") {
            Ok(InboundMessage::Forfeit)
        } else if text.starts_with("win") {
            Ok(InboundMessage::Win)
        } else if text.starts_with("lose") {
            Ok(InboundMessage::Lose)
        } else {
            Err(ProtocolError::UnknownMessage(text.to_string()))
        }
    }

    /// 解析连接建立后的第一帧：会话 ID（纯数字或带 `UID` 字段的 JSON）
    pub fn parse_session_id(frame: &str) -> Result<SessionId> {
        #[derive(Deserialize)]
        struct Handshake {
            #[serde(rename = "UID")]
            uid: SessionId,
        }

        let text = frame.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if text.starts_with('{') {
            let handshake: Handshake = serde_json::from_str(text)?;
            return Ok(handshake.uid);
        }
        text.parse()
            .map_err(|_| ProtocolError::UnknownMessage(text.to_string()))
    }

    /// 转换为游戏事件
    ///
    /// 北方总是先手；走法记录按第一步是否为跳吃区分普通走子和连跳。
    pub fn into_event(self, user_side: Side) -> std::result::Result<GameEvent, CheckersError> {
        match self {
            InboundMessage::StartGame => Ok(GameEvent::StartGame {
                user_side,
                first_player: Side::North,
            }),
            InboundMessage::Moves(record) => {
                let first = record.moves.first();
                if first.is_capture() {
                    Ok(GameEvent::OpponentCaptureMove(record.moves))
                } else if record.moves.len() == 1 {
                    Ok(GameEvent::OpponentBasicMove(first))
                } else {
                    Err(CheckersError::ProtocolDesync(format!(
                        "basic move {} cannot be followed by further moves",
                        record.moves
                    )))
                }
            }
            InboundMessage::Forfeit => Ok(GameEvent::GameOver(GameResult::Forfeit)),
            InboundMessage::Win => Ok(GameEvent::GameOver(GameResult::Win)),
            InboundMessage::Lose => Ok(GameEvent::GameOver(GameResult::Lose)),
        }
    }
}

/// 客户端发给中继服务端的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// 本方一个回合的走法
    Moves(MoveRecord),
    /// 本地判定的游戏结果
    GameOver(GameResult),
}

impl OutboundMessage {
    /// 从本地事件生成出站消息，与网络无关的事件返回 None
    pub fn from_event(event: &GameEvent, uid: SessionId) -> Option<Self> {
        match event {
            GameEvent::SendMoves(moves) => Some(OutboundMessage::Moves(MoveRecord {
                moves: moves.clone(),
                uid,
            })),
            GameEvent::GameOver(result) => Some(OutboundMessage::GameOver(*result)),
            _ => None,
        }
    }

    /// 编码为帧文本（不含结尾的 NUL）
    pub fn encode(&self) -> Result<String> {
        match self {
            OutboundMessage::Moves(record) => Ok(serde_json::to_string(record)?),
            OutboundMessage::GameOver(result) => Ok(result.as_str().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Move;

    #[test]
    fn test_parse_tags() {
        assert_eq!(InboundMessage::parse("start_game").unwrap(), InboundMessage::StartGame);
        assert_eq!(InboundMessage::parse("forfeit\0").unwrap(), InboundMessage::Forfeit);
        assert_eq!(InboundMessage::parse("win").unwrap(), InboundMessage::Win);
        assert_eq!(InboundMessage::parse(" lose\n").unwrap(), InboundMessage::Lose);
        assert!(matches!(
            InboundMessage::parse("hello"),
            Err(ProtocolError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_parse_move_record() {
        let msg = InboundMessage::parse(r#"{"movesString":"18-9,9-2","UID":4}"#).unwrap();
        let InboundMessage::Moves(record) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(record.uid, 4);
        assert_eq!(record.moves.serialize(), "18-9,9-2");
    }

    #[test]
    fn test_parse_bad_move_record() {
        assert!(matches!(
            InboundMessage::parse(r#"{"movesString":"18-","UID":4}"#),
            Err(ProtocolError::Json(_))
        ));
        assert!(InboundMessage::parse("{not json").is_err());
    }

    #[test]
    fn test_into_event() {
        let record = MoveRecord {
            moves: "9-14".parse().unwrap(),
            uid: 1,
        };
        assert_eq!(
            InboundMessage::Moves(record).into_event(Side::South).unwrap(),
            GameEvent::OpponentBasicMove(Move::from_squares(9, 14).unwrap())
        );

        let record = MoveRecord {
            moves: "18-9,9-2".parse().unwrap(),
            uid: 2,
        };
        assert!(matches!(
            InboundMessage::Moves(record).into_event(Side::North).unwrap(),
            GameEvent::OpponentCaptureMove(_)
        ));

        assert_eq!(
            InboundMessage::StartGame.into_event(Side::South).unwrap(),
            GameEvent::StartGame {
                user_side: Side::South,
                first_player: Side::North,
            }
        );
        assert_eq!(
            InboundMessage::Forfeit.into_event(Side::South).unwrap(),
            GameEvent::GameOver(GameResult::Forfeit)
        );
    }

    #[test]
    fn test_into_event_rejects_chained_basic_moves() {
        let record = MoveRecord {
            moves: "9-14,14-18".parse().unwrap(),
            uid: 1,
        };
        assert!(matches!(
            InboundMessage::Moves(record).into_event(Side::South),
            Err(CheckersError::ProtocolDesync(_))
        ));
    }

    #[test]
    fn test_encode_outbound() {
        let event = GameEvent::SendMoves("22-18".parse().unwrap());
        let msg = OutboundMessage::from_event(&event, 7).unwrap();
        assert_eq!(msg.encode().unwrap(), r#"{"movesString":"22-18","UID":7}"#);

        let msg = OutboundMessage::from_event(&GameEvent::GameOver(GameResult::Lose), 7).unwrap();
        assert_eq!(msg.encode().unwrap(), "lose");

        assert!(OutboundMessage::from_event(&GameEvent::DeselectPiece, 7).is_none());
    }

    #[test]
    fn test_session_id() {
        assert_eq!(InboundMessage::parse_session_id("3\0").unwrap(), 3);
        assert_eq!(InboundMessage::parse_session_id(r#"{"UID":8}"#).unwrap(), 8);
        assert!(InboundMessage::parse_session_id("x").is_err());
    }

    #[test]
    fn test_game_result_text() {
        assert_eq!(GameResult::parse("Lose").unwrap(), GameResult::Lose);
        assert_eq!(GameResult::parse("WIN").unwrap(), GameResult::Win);
        assert_eq!(GameResult::Forfeit.to_string(), "forfeit");
        assert!(GameResult::parse("draw").is_err());
    }
}
