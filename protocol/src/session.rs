//! 回合与连跳状态机
//!
//! 在棋盘之上管理一个回合（ply）：选子、走子、连跳续跳、交换走子方和终局判定。
//! 本地与对手的输入最终都落到同一组棋盘操作上。

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::coord::Coord;
use crate::error::CheckersError;
use crate::event::GameEvent;
use crate::message::GameResult;
use crate::moves::{Move, MoveSequence};
use crate::piece::Side;

/// 回合状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlyState {
    /// 尚未收到开始游戏
    NotStarted,
    /// 上一回合已交接，等待回合开始
    PlyPending,
    /// 回合进行中，尚未选子（对手回合时等待对手走法）
    AwaitingSelection,
    /// 已选中棋子，候选走法已给出
    PieceSelected {
        from: Coord,
        basic: Vec<Move>,
        captures: Vec<Move>,
    },
    /// 本回合已跳吃至少一次，且必须继续跳
    CaptureChainInProgress {
        chain: MoveSequence,
        continuations: Vec<Move>,
    },
    /// 本回合走完，等待交接
    PlyComplete,
    /// 游戏结束
    GameOver(GameResult),
}

/// 一局游戏的会话状态
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    /// 本地玩家阵营，整局不变
    user_side: Side,
    /// 当前走子方
    current_player: Side,
    state: PlyState,
    /// 终局时记录的负方（认输/掉线时未知）
    loser: Option<Side>,
}

impl GameSession {
    /// 使用初始棋盘创建会话
    pub fn new() -> Self {
        Self::with_board(Board::initial())
    }

    /// 使用指定棋盘创建会话
    pub fn with_board(board: Board) -> Self {
        Self {
            board,
            user_side: Side::North,
            current_player: Side::North,
            state: PlyState::NotStarted,
            loser: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn user_side(&self) -> Side {
        self.user_side
    }

    pub fn current_player(&self) -> Side {
        self.current_player
    }

    pub fn state(&self) -> &PlyState {
        &self.state
    }

    pub fn loser(&self) -> Option<Side> {
        self.loser
    }

    /// 游戏结果（未结束时为 None）
    pub fn result(&self) -> Option<GameResult> {
        match self.state {
            PlyState::GameOver(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, PlyState::GameOver(_))
    }

    /// 终局后再到达的终局事件不再生效，也不应通知观察者
    pub fn ignores(&self, event: &GameEvent) -> bool {
        self.is_over() && matches!(event, GameEvent::GameOver(_))
    }

    /// 是否轮到本地玩家
    pub fn is_user_turn(&self) -> bool {
        self.current_player == self.user_side
    }

    /// 是否处于连跳中
    pub fn is_capture_chain_active(&self) -> bool {
        matches!(self.state, PlyState::CaptureChainInProgress { .. })
    }

    /// 处理一个事件，返回需要继续分发的新事件
    pub fn handle(&mut self, event: &GameEvent) -> Result<Vec<GameEvent>, CheckersError> {
        debug!("handle {} in {:?}", event, self.state);

        // 只发给界面和网络的事件，会话不关心
        if matches!(
            event,
            GameEvent::EnablePiece(_)
                | GameEvent::MovesOffered { .. }
                | GameEvent::MoveApplied { .. }
                | GameEvent::SendMoves(_)
        ) {
            return Ok(Vec::new());
        }

        match self.state {
            PlyState::GameOver(_) => {
                return match event {
                    // 终局只通知一次，重复的结果直接忽略
                    GameEvent::GameOver(_) => Ok(Vec::new()),
                    _ => Err(CheckersError::GameOver),
                };
            }
            PlyState::NotStarted => {
                if !matches!(event, GameEvent::StartGame { .. } | GameEvent::GameOver(_)) {
                    return Err(CheckersError::GameNotStarted);
                }
            }
            _ => {}
        }

        match event {
            GameEvent::StartGame {
                user_side,
                first_player,
            } => self.start_game(*user_side, *first_player),
            GameEvent::StartPly {
                user_side,
                current_player,
            } => self.start_ply(*user_side, *current_player),
            GameEvent::EndPly(seq) => self.end_ply(seq),
            GameEvent::GameOver(result) => Ok(self.finish(*result)),
            GameEvent::SelectPiece(pos) => self.select_piece(*pos),
            GameEvent::DeselectPiece => self.deselect_piece(),
            GameEvent::BasicMove(mv) => self.basic_move(mv),
            GameEvent::CaptureMove(seq) => self.capture_move(seq),
            GameEvent::OpponentBasicMove(mv) => self.opponent_basic_move(mv),
            GameEvent::OpponentCaptureMove(seq) => self.opponent_capture_move(seq),
            GameEvent::EnablePiece(_)
            | GameEvent::MovesOffered { .. }
            | GameEvent::MoveApplied { .. }
            | GameEvent::SendMoves(_) => Ok(Vec::new()),
        }
    }

    fn start_game(
        &mut self,
        user_side: Side,
        first_player: Side,
    ) -> Result<Vec<GameEvent>, CheckersError> {
        if self.state != PlyState::NotStarted {
            return Err(CheckersError::IllegalMove("game already started".to_string()));
        }

        info!("game started: user plays {:?}, {:?} moves first", user_side, first_player);
        self.user_side = user_side;
        self.current_player = first_player;
        self.state = PlyState::PlyPending;
        Ok(vec![self.start_ply_event()])
    }

    /// 回合开始：没有任何走法的一方判负，否则为本地玩家标出可选棋子
    fn start_ply(
        &mut self,
        user_side: Side,
        current_player: Side,
    ) -> Result<Vec<GameEvent>, CheckersError> {
        if self.state != PlyState::PlyPending {
            return Err(CheckersError::IllegalMove(
                "ply already in progress".to_string(),
            ));
        }
        if user_side != self.user_side || current_player != self.current_player {
            return Err(CheckersError::ProtocolDesync(format!(
                "start_ply {},{} does not match session {},{}",
                user_side, current_player, self.user_side, self.current_player
            )));
        }

        if self.board.find_all_moves(self.current_player).is_empty() {
            let result = if self.is_user_turn() {
                GameResult::Lose
            } else {
                GameResult::Win
            };
            info!("{:?} has no moves left", self.current_player);
            self.loser = Some(self.current_player);
            self.state = PlyState::GameOver(result);
            return Ok(vec![GameEvent::GameOver(result)]);
        }

        self.state = PlyState::AwaitingSelection;
        Ok(self.enable_pieces())
    }

    /// 回合交接：本地回合的走法发给对手，然后换对方走
    fn end_ply(&mut self, seq: &MoveSequence) -> Result<Vec<GameEvent>, CheckersError> {
        if self.state != PlyState::PlyComplete {
            return Err(CheckersError::IllegalMove(
                "no completed ply to hand off".to_string(),
            ));
        }

        let mut emitted = Vec::new();
        if self.is_user_turn() {
            emitted.push(GameEvent::SendMoves(seq.clone()));
        }

        info!("{:?} played {}", self.current_player, seq);
        self.current_player = self.current_player.opponent();
        self.state = PlyState::PlyPending;
        emitted.push(self.start_ply_event());
        Ok(emitted)
    }

    /// 来自网络的终局信号
    fn finish(&mut self, result: GameResult) -> Vec<GameEvent> {
        self.loser = match result {
            GameResult::Win => Some(self.user_side.opponent()),
            GameResult::Lose => Some(self.user_side),
            GameResult::Forfeit => None,
        };
        info!("game over: {}", result);
        self.state = PlyState::GameOver(result);
        Vec::new()
    }

    fn select_piece(&mut self, from: Coord) -> Result<Vec<GameEvent>, CheckersError> {
        self.ensure_user_turn()?;
        match self.state {
            PlyState::AwaitingSelection | PlyState::PieceSelected { .. } => {}
            PlyState::CaptureChainInProgress { .. } => {
                return Err(CheckersError::CaptureChainActive)
            }
            _ => return Err(CheckersError::IllegalMove("ply has not started".to_string())),
        }

        let piece = self.board.get(from)?.ok_or(CheckersError::EmptySquare {
            row: from.row,
            col: from.col,
        })?;
        if piece.side != self.user_side {
            return Err(CheckersError::NotYourPiece {
                row: from.row,
                col: from.col,
            });
        }

        let basic = self.board.find_basic_moves(from)?;
        let captures = self.board.find_capture_moves(from)?;
        if basic.is_empty() && captures.is_empty() {
            return Err(CheckersError::IllegalMove(format!(
                "piece at {} has no moves",
                from
            )));
        }

        let offered = GameEvent::MovesOffered {
            basic: basic.clone(),
            captures: captures.iter().copied().map(MoveSequence::single).collect(),
        };
        self.state = PlyState::PieceSelected {
            from,
            basic,
            captures,
        };
        Ok(vec![offered])
    }

    fn deselect_piece(&mut self) -> Result<Vec<GameEvent>, CheckersError> {
        match self.state {
            PlyState::CaptureChainInProgress { .. } => Err(CheckersError::CaptureChainActive),
            PlyState::PieceSelected { .. } | PlyState::AwaitingSelection => {
                self.state = PlyState::AwaitingSelection;
                Ok(self.enable_pieces())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn basic_move(&mut self, mv: &Move) -> Result<Vec<GameEvent>, CheckersError> {
        self.ensure_user_turn()?;
        let PlyState::PieceSelected { basic, .. } = &self.state else {
            return Err(CheckersError::IllegalMove(format!(
                "{} requires a selected piece",
                mv
            )));
        };
        if !basic.contains(mv) {
            return Err(CheckersError::IllegalMove(format!("{} is not offered", mv)));
        }

        let applied = self.apply(mv)?;
        self.state = PlyState::PlyComplete;
        Ok(vec![applied, GameEvent::EndPly(MoveSequence::single(*mv))])
    }

    /// 本地跳吃：序列必须是当前连跳加上一步候选跳吃
    fn capture_move(&mut self, seq: &MoveSequence) -> Result<Vec<GameEvent>, CheckersError> {
        self.ensure_user_turn()?;
        let last = seq.last();

        let offered = match &self.state {
            PlyState::PieceSelected { captures, .. } => seq.len() == 1 && captures.contains(&last),
            PlyState::CaptureChainInProgress {
                chain,
                continuations,
            } => seq.prefix().as_ref() == Some(chain) && continuations.contains(&last),
            _ => false,
        };
        if !offered {
            return Err(CheckersError::IllegalMove(format!("{} is not offered", seq)));
        }

        let mut emitted = vec![self.apply(&last)?];

        // 落到底线即结束回合，王也一样
        let further = self.board.find_capture_moves(last.dst())?;
        if last.is_crowning() || further.is_empty() {
            self.state = PlyState::PlyComplete;
            emitted.push(GameEvent::EndPly(seq.clone()));
        } else {
            debug!("capture chain continues from {}", last.dst());
            emitted.push(GameEvent::MovesOffered {
                basic: Vec::new(),
                captures: further.iter().map(|next| seq.extended(*next)).collect(),
            });
            self.state = PlyState::CaptureChainInProgress {
                chain: seq.clone(),
                continuations: further,
            };
        }
        Ok(emitted)
    }

    fn opponent_basic_move(&mut self, mv: &Move) -> Result<Vec<GameEvent>, CheckersError> {
        self.ensure_opponent_turn()?;

        let opponent = self.current_player;
        match self.board.get(mv.src())? {
            Some(piece) if piece.side == opponent => {}
            _ => {
                return Err(CheckersError::ProtocolDesync(format!(
                    "no {:?} piece at the source of {}",
                    opponent, mv
                )))
            }
        }
        if !self.board.find_basic_moves(mv.src())?.contains(mv) {
            return Err(CheckersError::ProtocolDesync(format!(
                "{} is not a legal basic move",
                mv
            )));
        }

        let applied = self.apply(mv)?;
        self.state = PlyState::PlyComplete;
        Ok(vec![applied, GameEvent::EndPly(MoveSequence::single(*mv))])
    }

    /// 对手的完整连跳：先在副本上校验整段序列，再逐步执行
    fn opponent_capture_move(
        &mut self,
        seq: &MoveSequence,
    ) -> Result<Vec<GameEvent>, CheckersError> {
        self.ensure_opponent_turn()?;
        self.validate_capture_sequence(seq, self.current_player)?;

        let mut emitted = Vec::with_capacity(seq.len() + 1);
        for mv in seq {
            emitted.push(self.apply(mv)?);
        }
        self.state = PlyState::PlyComplete;
        emitted.push(GameEvent::EndPly(seq.clone()));
        Ok(emitted)
    }

    fn validate_capture_sequence(
        &self,
        seq: &MoveSequence,
        mover: Side,
    ) -> Result<(), CheckersError> {
        let desync = |reason: String| {
            warn!("rejecting opponent sequence {}: {}", seq, reason);
            CheckersError::ProtocolDesync(reason)
        };

        let mut scratch = self.board.clone();
        let mut previous: Option<Move> = None;

        for mv in seq {
            if let Some(prev) = previous {
                if prev.dst() != mv.src() {
                    return Err(desync(format!("{} does not continue from {}", mv, prev)));
                }
                if prev.is_crowning() {
                    return Err(desync(format!("{} continues after crowning", mv)));
                }
            } else if !matches!(scratch.get(mv.src())?, Some(piece) if piece.side == mover) {
                return Err(desync(format!("no {:?} piece at the source of {}", mover, mv)));
            }

            if !scratch.find_capture_moves(mv.src())?.contains(mv) {
                return Err(desync(format!("{} is not a legal capture", mv)));
            }
            scratch.perform_move(mv)?;
            previous = Some(*mv);
        }

        let last = seq.last();
        if !last.is_crowning() && !scratch.find_capture_moves(last.dst())?.is_empty() {
            return Err(desync(format!(
                "sequence {} stops while further captures exist",
                seq
            )));
        }
        Ok(())
    }

    /// 在棋盘上执行一步并生成对应事件
    fn apply(&mut self, mv: &Move) -> Result<GameEvent, CheckersError> {
        let crowned = promotes(&self.board, mv);
        self.board.perform_move(mv)?;
        debug!("applied {}\n{}", mv, self.board);
        Ok(GameEvent::MoveApplied {
            mv: *mv,
            captured: mv.captured_square(),
            crowned,
        })
    }

    /// 本地回合时每个有走法的棋子发一次可选事件（按走法逐条，可能重复）
    fn enable_pieces(&self) -> Vec<GameEvent> {
        if !self.is_user_turn() {
            return Vec::new();
        }
        self.board
            .find_all_moves(self.user_side)
            .into_iter()
            .map(|mv| GameEvent::EnablePiece(mv.src()))
            .collect()
    }

    fn start_ply_event(&self) -> GameEvent {
        GameEvent::StartPly {
            user_side: self.user_side,
            current_player: self.current_player,
        }
    }

    fn ensure_user_turn(&self) -> Result<(), CheckersError> {
        if self.is_user_turn() {
            Ok(())
        } else {
            Err(CheckersError::NotYourTurn)
        }
    }

    /// 对手走法只能在对手回合开始后、本地没有待处理状态时到达
    fn ensure_opponent_turn(&self) -> Result<(), CheckersError> {
        if self.is_user_turn() {
            return Err(CheckersError::ProtocolDesync(
                "opponent moved during our ply".to_string(),
            ));
        }
        if self.state != PlyState::AwaitingSelection {
            return Err(CheckersError::ProtocolDesync(format!(
                "opponent moved in state {:?}",
                self.state
            )));
        }
        Ok(())
    }
}

/// 走法是否会让普通棋子升变为王（只影响 `MoveApplied` 的标记）
fn promotes(board: &Board, mv: &Move) -> bool {
    mv.is_crowning() && matches!(board.get(mv.src()), Ok(Some(piece)) if !piece.is_king)
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}
