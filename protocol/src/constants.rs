//! 协议常量定义

use std::time::Duration;

/// 棋盘边长（8x8）
pub const BOARD_SIZE: usize = 8;

/// 可落子的深色格子数量
pub const SQUARE_COUNT: u8 = 32;

/// 每行可落子格数
pub const SQUARES_PER_ROW: i8 = 4;

/// 同一行相邻可落子格之间的列间距
pub const COLUMN_SPACING: i8 = 2;

/// 北方初始棋子所在格号范围
pub const NORTH_START_SQUARES: std::ops::RangeInclusive<u8> = 1..=12;

/// 南方初始棋子所在格号范围
pub const SOUTH_START_SQUARES: std::ops::RangeInclusive<u8> = 21..=32;

/// 单步走子偏移
pub const OFFSET_BASIC: i8 = 1;

/// 吃子跳跃偏移
pub const OFFSET_CAPTURE: i8 = 2;

/// 走法序列中各走法的分隔符
pub const SEQUENCE_SEPARATOR: char = ',';

/// 走法起点与终点之间的分隔符
pub const MOVE_SEPARATOR: char = '-';

/// 帧结束符（对端以 NUL 划分消息边界）
pub const FRAME_DELIMITER: u8 = 0;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 4096;

/// 默认中继服务端端口
pub const DEFAULT_PORT: u16 = 1234;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
