//! 跳棋终端客户端
//!
//! 通过中继服务端与对手对局，棋盘与回合逻辑来自 protocol 库。

pub mod command;
pub mod game;
pub mod network;
pub mod settings;
