//! 网络中继任务
//!
//! 独立的 tokio 任务读取对端的帧，解析后通过 mpsc 通道交给主循环。
//! 任务只负责入队，不接触会话状态。

use protocol::{FrameReader, InboundMessage, ProtocolError};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 中继任务交给主循环的输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// 解析成功的消息
    Message(InboundMessage),
    /// 连接已断开或不可用
    Closed,
}

/// 启动中继任务
pub fn spawn_relay<R>(reader: FrameReader<R>, tx: mpsc::Sender<RelayEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(relay_loop(reader, tx))
}

async fn relay_loop<R>(mut reader: FrameReader<R>, tx: mpsc::Sender<RelayEvent>)
where
    R: AsyncRead + Unpin + Send,
{
    loop {
        let event = match reader.recv().await {
            Ok(msg) => {
                debug!("relay received {:?}", msg);
                RelayEvent::Message(msg)
            }
            // 单条坏消息不影响后续帧
            Err(e @ (ProtocolError::UnknownMessage(_) | ProtocolError::Json(_))) => {
                warn!("ignoring malformed frame: {}", e);
                continue;
            }
            Err(ProtocolError::ConnectionClosed) => {
                info!("peer closed the connection");
                RelayEvent::Closed
            }
            Err(e) => {
                warn!("relay stopped: {}", e);
                RelayEvent::Closed
            }
        };

        let closed = event == RelayEvent::Closed;
        if tx.send(event).await.is_err() || closed {
            break;
        }
    }
}
