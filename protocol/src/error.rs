//! 错误类型定义

use thiserror::Error;

/// 跳棋规则与回合状态错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckersError {
    /// 序列化文本格式错误（格号、走法或走法序列）
    #[error("Malformed input {input:?}: {reason}")]
    Format { input: String, reason: String },

    /// 走法偏移既不是单步也不是跳吃，或没有纵向位移
    #[error("Invalid move shape: ({src_row}, {src_col}) -> ({dst_row}, {dst_col})")]
    InvalidMoveShape {
        src_row: i8,
        src_col: i8,
        dst_row: i8,
        dst_col: i8,
    },

    /// 坐标不是可落子的格子
    #[error("Square out of bounds: ({row}, {col})")]
    OutOfBounds { row: i8, col: i8 },

    /// 起点没有棋子
    #[error("No piece at square ({row}, {col})")]
    EmptySquare { row: i8, col: i8 },

    /// 选中的不是本方棋子
    #[error("The piece at ({row}, {col}) does not belong to you")]
    NotYourPiece { row: i8, col: i8 },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 连跳进行中，不能取消选择或另选棋子
    #[error("A capture chain is in progress")]
    CaptureChainActive,

    /// 当前状态下不允许的走法
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// 对端发来的走法与本地棋盘不一致
    #[error("Protocol desync: {0}")]
    ProtocolDesync(String),

    /// 游戏尚未开始
    #[error("Game has not started")]
    GameNotStarted,

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

impl CheckersError {
    /// 构造格式错误
    pub fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CheckersError::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 帧内容不是合法 UTF-8
    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 无法识别的消息
    #[error("Unknown message: {0:?}")]
    UnknownMessage(String),

    /// 跳棋规则错误
    #[error("Checkers error: {0}")]
    Checkers(#[from] CheckersError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
