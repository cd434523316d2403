//! 游戏事件与会话内的事件分发
//!
//! 事件是封闭的枚举，每个事件有固定的名称和文本载荷（与线上格式一致），
//! 由 [`EventBus`] 按先进先出顺序逐个交给 [`GameSession`] 处理。

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::coord::Coord;
use crate::error::CheckersError;
use crate::message::GameResult;
use crate::moves::{Move, MoveSequence};
use crate::piece::Side;
use crate::session::GameSession;

/// 游戏事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    // === 回合流程 ===
    /// 开始游戏：本地玩家阵营与先手方
    StartGame { user_side: Side, first_player: Side },
    /// 回合开始
    StartPly { user_side: Side, current_player: Side },
    /// 回合结束，携带本回合的完整走法序列
    EndPly(MoveSequence),
    /// 游戏结束
    GameOver(GameResult),

    // === 发给界面与网络 ===
    /// 该格棋子可以被选中
    EnablePiece(Coord),
    /// 选中棋子或连跳中可选的后续走法
    MovesOffered {
        basic: Vec<Move>,
        captures: Vec<MoveSequence>,
    },
    /// 棋盘上执行了一步走法
    MoveApplied {
        mv: Move,
        captured: Option<Coord>,
        crowned: bool,
    },
    /// 需要发送给对手的走法序列
    SendMoves(MoveSequence),

    // === 本地输入 ===
    SelectPiece(Coord),
    DeselectPiece,
    BasicMove(Move),
    CaptureMove(MoveSequence),

    // === 对手输入 ===
    OpponentBasicMove(Move),
    OpponentCaptureMove(MoveSequence),
}

impl GameEvent {
    /// 事件名称
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::StartGame { .. } => "start_game",
            GameEvent::StartPly { .. } => "start_ply",
            GameEvent::EndPly(_) => "end_ply",
            GameEvent::GameOver(_) => "game_over",
            GameEvent::EnablePiece(_) => "enable_piece",
            GameEvent::MovesOffered { .. } => "moves_offered",
            GameEvent::MoveApplied { .. } => "move_applied",
            GameEvent::SendMoves(_) => "send_moves",
            GameEvent::SelectPiece(_) => "select_piece",
            GameEvent::DeselectPiece => "deselect_piece",
            GameEvent::BasicMove(_) => "basic_move",
            GameEvent::CaptureMove(_) => "capture_move",
            GameEvent::OpponentBasicMove(_) => "opponent_basic_move",
            GameEvent::OpponentCaptureMove(_) => "opponent_capture_move",
        }
    }

    /// 事件的文本载荷
    pub fn payload(&self) -> String {
        match self {
            GameEvent::StartGame {
                user_side,
                first_player,
            } => format!("{},{}", user_side, first_player),
            GameEvent::StartPly {
                user_side,
                current_player,
            } => format!("{},{}", user_side, current_player),
            GameEvent::EndPly(seq)
            | GameEvent::SendMoves(seq)
            | GameEvent::CaptureMove(seq)
            | GameEvent::OpponentCaptureMove(seq) => seq.serialize(),
            GameEvent::GameOver(result) => result.to_string(),
            GameEvent::EnablePiece(pos) | GameEvent::SelectPiece(pos) => {
                pos.serialize().unwrap_or_default()
            }
            GameEvent::MovesOffered { basic, captures } => basic
                .iter()
                .map(Move::serialize)
                .chain(captures.iter().map(MoveSequence::serialize))
                .collect::<Vec<_>>()
                .join(" "),
            GameEvent::MoveApplied { mv, .. }
            | GameEvent::BasicMove(mv)
            | GameEvent::OpponentBasicMove(mv) => mv.serialize(),
            GameEvent::DeselectPiece => String::new(),
        }
    }

    /// 按名称和文本载荷解析事件
    ///
    /// `moves_offered` 与 `move_applied` 只由会话产生，不能从文本构造。
    pub fn parse(name: &str, payload: &str) -> Result<Self, CheckersError> {
        let event = match name {
            "start_game" => {
                let (user_side, first_player) = parse_side_pair(payload)?;
                GameEvent::StartGame {
                    user_side,
                    first_player,
                }
            }
            "start_ply" => {
                let (user_side, current_player) = parse_side_pair(payload)?;
                GameEvent::StartPly {
                    user_side,
                    current_player,
                }
            }
            "end_ply" => GameEvent::EndPly(payload.parse()?),
            "game_over" => GameEvent::GameOver(GameResult::parse(payload)?),
            "enable_piece" => GameEvent::EnablePiece(payload.parse()?),
            "send_moves" => GameEvent::SendMoves(payload.parse()?),
            "select_piece" => GameEvent::SelectPiece(payload.parse()?),
            "deselect_piece" => GameEvent::DeselectPiece,
            "basic_move" => GameEvent::BasicMove(payload.parse()?),
            "capture_move" => GameEvent::CaptureMove(payload.parse()?),
            "opponent_basic_move" => GameEvent::OpponentBasicMove(payload.parse()?),
            "opponent_capture_move" => GameEvent::OpponentCaptureMove(payload.parse()?),
            _ => return Err(CheckersError::format(name, "unknown event name")),
        };
        Ok(event)
    }
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let payload = self.payload();
        if payload.is_empty() {
            f.write_str(self.name())
        } else {
            write!(f, "{} {}", self.name(), payload)
        }
    }
}

/// 解析 `N,S` 形式的阵营对
fn parse_side_pair(payload: &str) -> Result<(Side, Side), CheckersError> {
    let mut parts = payload.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Ok((first.parse()?, second.parse()?)),
        _ => Err(CheckersError::format(payload, "expected <side>,<side>")),
    }
}

/// 事件观察者
pub type Listener = Box<dyn FnMut(&GameEvent) + Send>;

/// 单个对局的事件队列
///
/// 事件按发布顺序逐个处理：先交给会话，会话接受后再通知观察者，
/// 会话产生的新事件追加到队尾。某个事件被拒绝只影响它本身。
#[derive(Default)]
pub struct EventBus {
    queue: VecDeque<GameEvent>,
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布事件（加入队尾）
    pub fn publish(&mut self, event: GameEvent) {
        debug!("publish {}", event);
        self.queue.push_back(event);
    }

    /// 注册观察者，它会收到每个被会话接受的事件
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// 待处理事件数量
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 处理队首的一个事件，队列为空时返回 None
    pub fn dispatch_next(
        &mut self,
        session: &mut GameSession,
    ) -> Option<Result<(), CheckersError>> {
        let event = self.queue.pop_front()?;
        if session.ignores(&event) {
            debug!("ignored {} after game over", event);
            return Some(Ok(()));
        }

        let emitted = match session.handle(&event) {
            Ok(emitted) => emitted,
            Err(e) => {
                warn!("rejected {}: {}", event, e);
                return Some(Err(e));
            }
        };

        for listener in &mut self.listeners {
            listener(&event);
        }
        self.queue.extend(emitted);
        Some(Ok(()))
    }

    /// 处理到队列为空，返回期间被拒绝的事件产生的错误
    pub fn run_until_idle(&mut self, session: &mut GameSession) -> Vec<CheckersError> {
        let mut errors = Vec::new();
        while let Some(result) = self.dispatch_next(session) {
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue", &self.queue)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
