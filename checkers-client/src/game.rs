//! 对局驱动
//!
//! 把终端命令和网络消息转换成事件，交给事件队列和回合状态机处理，
//! 并收集需要发往对端的消息和需要显示给玩家的提示。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use protocol::{
    CheckersError, EventBus, GameEvent, GameResult, GameSession, InboundMessage,
    OutboundMessage, SessionId, Side,
};
use tracing::{info, warn};

/// 一局游戏的客户端状态
pub struct GameClient {
    session: GameSession,
    bus: EventBus,
    uid: SessionId,
    user_side: Side,
    outbox: Arc<Mutex<Vec<OutboundMessage>>>,
    notices: Arc<Mutex<Vec<String>>>,
    /// 当前终局来自对端，不需要再发回去
    remote_game_over: Arc<AtomicBool>,
}

impl GameClient {
    /// 按中继分配的会话 ID 创建，奇数执北方
    pub fn new(uid: SessionId) -> Self {
        Self::with_session(uid, GameSession::new())
    }

    /// 使用指定会话创建
    pub fn with_session(uid: SessionId, session: GameSession) -> Self {
        let user_side = Side::from_session_id(uid);
        let outbox = Arc::new(Mutex::new(Vec::new()));
        let notices = Arc::new(Mutex::new(Vec::new()));
        let remote_game_over = Arc::new(AtomicBool::new(false));

        let mut bus = EventBus::new();

        let sink = Arc::clone(&outbox);
        let remote = Arc::clone(&remote_game_over);
        bus.subscribe(move |event| {
            if matches!(event, GameEvent::GameOver(_)) && remote.load(Ordering::SeqCst) {
                return;
            }
            if let Some(msg) = OutboundMessage::from_event(event, uid) {
                if let Ok(mut queue) = sink.lock() {
                    queue.push(msg);
                }
            }
        });

        let sink = Arc::clone(&notices);
        bus.subscribe(move |event| {
            if let Some(line) = describe(event, user_side) {
                if let Ok(mut queue) = sink.lock() {
                    queue.push(line);
                }
            }
        });

        info!("session {} plays {:?}", uid, user_side);
        Self {
            session,
            bus,
            uid,
            user_side,
            outbox,
            notices,
            remote_game_over,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn uid(&self) -> SessionId {
        self.uid
    }

    pub fn user_side(&self) -> Side {
        self.user_side
    }

    pub fn is_over(&self) -> bool {
        self.session.is_over()
    }

    /// 处理一条对端消息
    pub fn handle_inbound(&mut self, msg: InboundMessage) -> Vec<CheckersError> {
        if matches!(
            msg,
            InboundMessage::Win | InboundMessage::Lose | InboundMessage::Forfeit
        ) {
            self.remote_game_over.store(true, Ordering::SeqCst);
        }

        match msg.into_event(self.user_side) {
            Ok(event) => self.dispatch(event),
            Err(e) => {
                warn!("dropping inbound message: {}", e);
                vec![e]
            }
        }
    }

    /// 处理一个本地输入事件
    pub fn handle_local(&mut self, event: GameEvent) -> Vec<CheckersError> {
        self.dispatch(event)
    }

    /// 本方认输
    pub fn forfeit(&mut self) -> Vec<CheckersError> {
        if self.is_over() {
            return Vec::new();
        }
        self.dispatch(GameEvent::GameOver(GameResult::Forfeit))
    }

    fn dispatch(&mut self, event: GameEvent) -> Vec<CheckersError> {
        self.bus.publish(event);
        self.bus.run_until_idle(&mut self.session)
    }

    /// 取出待发送的消息
    pub fn take_outbound(&self) -> Vec<OutboundMessage> {
        self.outbox
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }

    /// 取出待显示的提示
    pub fn take_notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }
}

/// 给玩家看的事件描述
fn describe(event: &GameEvent, user_side: Side) -> Option<String> {
    let line = match event {
        GameEvent::StartGame { .. } => format!("game started, you play {:?}", user_side),
        GameEvent::StartPly { current_player, .. } if *current_player == user_side => {
            "your turn".to_string()
        }
        GameEvent::StartPly { current_player, .. } => {
            format!("waiting for {:?}", current_player)
        }
        GameEvent::MovesOffered { basic, captures } => {
            let options: Vec<String> = basic
                .iter()
                .map(|mv| format!("move {}", mv))
                .chain(captures.iter().map(|seq| format!("jump {}", seq)))
                .collect();
            format!("options: {}", options.join(" | "))
        }
        GameEvent::MoveApplied {
            mv,
            captured,
            crowned,
        } => {
            let mut line = format!("played {}", mv);
            if let Some(pos) = captured.and_then(|pos| pos.to_square_id()) {
                line.push_str(&format!(", captured {}", pos));
            }
            if *crowned {
                line.push_str(", crowned");
            }
            line
        }
        GameEvent::GameOver(result) => format!("game over: {}", result),
        _ => return None,
    };
    Some(line)
}
