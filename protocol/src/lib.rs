//! 跳棋共享协议库
//!
//! 包含:
//! - 坐标、棋子、棋盘等核心数据结构
//! - 走法生成与走法序列的文本格式
//! - 回合状态机 (GameSession) 与事件队列 (EventBus)
//! - 与中继服务端交换的消息 (InboundMessage, OutboundMessage)
//! - 传输层抽象 (Connector, Connection traits) 与 NUL 分帧

mod board;
mod constants;
mod coord;
mod error;
mod event;
mod message;
mod moves;
mod piece;
mod session;
mod transport;

pub use board::Board;
pub use constants::*;
pub use coord::Coord;
pub use error::{CheckersError, ProtocolError, Result};
pub use event::{EventBus, GameEvent, Listener};
pub use message::{GameResult, InboundMessage, MoveRecord, OutboundMessage, SessionId};
pub use moves::{Move, MoveKind, MoveSequence};
pub use piece::{Piece, Side};
pub use session::{GameSession, PlyState};
pub use transport::{
    Connection, Connector,
    TcpConnection, TcpConnector,
    NetworkConfig,
    FrameReader, FrameWriter,
};
