//! 传输层抽象
//!
//! 中继服务端只转发以 NUL 结尾的 UTF-8 文本帧。
//! Connector/Connection traits 使上层对局逻辑与具体传输实现解耦。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::constants::{CONNECT_TIMEOUT, DEFAULT_PORT, FRAME_DELIMITER, MAX_FRAME_SIZE};
use crate::error::{ProtocolError, Result};
use crate::message::{InboundMessage, OutboundMessage, SessionId};

/// 网络配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl NetworkConfig {
    /// `host:port` 形式的地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// 连接抽象 trait（核心抽象，用于业务层）
#[async_trait]
pub trait Connection: Send + Sync {
    /// 发送消息
    async fn send(&mut self, msg: &OutboundMessage) -> Result<()>;

    /// 接收消息（跳过空帧）
    async fn recv(&mut self) -> Result<InboundMessage>;

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, addr: &str) -> Result<Self::Conn>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, addr: &str) -> Result<Self::Conn> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?
            .map_err(ProtocolError::Io)?;

        debug!("connected to {}", addr);
        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }

    /// 读取中继分配的会话 ID（连接后的第一帧）
    pub async fn read_session_id(&mut self) -> Result<SessionId> {
        self.reader.read_session_id().await
    }

    /// 分离读写端
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, msg: &OutboundMessage) -> Result<()> {
        self.writer.send(msg).await
    }

    async fn recv(&mut self) -> Result<InboundMessage> {
        self.reader.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

// ============================================================================
// 帧编解码
// ============================================================================

/// 帧读取器：按 NUL 切分字节流
pub struct FrameReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// 读取一帧文本（不含结尾的 NUL）
    pub async fn read_frame(&mut self) -> Result<String> {
        self.buffer.clear();

        // 多读一个字节，用来区分恰好满长的帧和超长帧
        let limit = MAX_FRAME_SIZE as u64 + 1;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(FRAME_DELIMITER, &mut self.buffer)
            .await?;
        if read == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        if self.buffer.last() == Some(&FRAME_DELIMITER) {
            self.buffer.pop();
        } else if self.buffer.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: self.buffer.len(),
                max: MAX_FRAME_SIZE,
            });
        } else {
            // 帧未结束连接就断开了
            return Err(ProtocolError::ConnectionClosed);
        }

        let frame = String::from_utf8(std::mem::take(&mut self.buffer))?;
        trace!("frame in: {:?}", frame);
        Ok(frame)
    }

    /// 读取下一个非空帧
    async fn read_non_empty(&mut self) -> Result<String> {
        loop {
            let frame = self.read_frame().await?;
            if !frame.trim().is_empty() {
                return Ok(frame);
            }
        }
    }

    /// 接收并解析一条消息
    pub async fn recv(&mut self) -> Result<InboundMessage> {
        let frame = self.read_non_empty().await?;
        InboundMessage::parse(&frame)
    }

    /// 读取会话 ID 帧
    pub async fn read_session_id(&mut self) -> Result<SessionId> {
        let frame = self.read_non_empty().await?;
        InboundMessage::parse_session_id(&frame)
    }
}

/// 帧写入器：每帧末尾追加 NUL
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一帧文本
    pub async fn write_frame(&mut self, text: &str) -> Result<()> {
        if text.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: text.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        trace!("frame out: {:?}", text);
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(&[FRAME_DELIMITER]).await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// 编码并发送消息
    pub async fn send(&mut self, msg: &OutboundMessage) -> Result<()> {
        let text = msg.encode()?;
        self.write_frame(&text).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{GameResult, MoveRecord};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_frames_split_on_nul() {
        let (mut client, server) = duplex(256);
        client.write_all(b"5\0start_game\0win\0").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert_eq!(reader.read_session_id().await.unwrap(), 5);
        assert_eq!(reader.recv().await.unwrap(), InboundMessage::StartGame);
        assert_eq!(reader.recv().await.unwrap(), InboundMessage::Win);
        assert!(matches!(
            reader.recv().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_empty_frames_skipped() {
        let (mut client, server) = duplex(256);
        client.write_all(b"\0\0lose\0").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert_eq!(reader.recv().await.unwrap(), InboundMessage::Lose);
    }

    #[tokio::test]
    async fn test_partial_frame_is_closed() {
        let (mut client, server) = duplex(256);
        client.write_all(b"forf").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let (mut client, server) = duplex(MAX_FRAME_SIZE * 2);
        let oversized = vec![b'a'; MAX_FRAME_SIZE + 10];
        client.write_all(&oversized).await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));

        let (writer_end, _reader_end) = duplex(64);
        let mut writer = FrameWriter::new(writer_end);
        let text = "a".repeat(MAX_FRAME_SIZE + 1);
        assert!(matches!(
            writer.write_frame(&text).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let (mut client, server) = duplex(64);
        client.write_all(&[0xff, 0xfe, 0x00]).await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::Utf8(_))
        ));
    }

    #[tokio::test]
    async fn test_writer_appends_nul() {
        let (client, server) = duplex(256);
        let mut writer = FrameWriter::new(client);
        let record = MoveRecord {
            moves: "22-18".parse().unwrap(),
            uid: 2,
        };
        writer.send(&OutboundMessage::Moves(record.clone())).await.unwrap();
        writer
            .send(&OutboundMessage::GameOver(GameResult::Forfeit))
            .await
            .unwrap();
        drop(writer);

        let mut reader = FrameReader::new(server);
        assert_eq!(
            reader.read_frame().await.unwrap(),
            r#"{"movesString":"22-18","UID":2}"#
        );
        assert_eq!(reader.read_frame().await.unwrap(), "forfeit");

        let (client, server) = duplex(256);
        let mut writer = FrameWriter::new(client);
        writer.send(&OutboundMessage::Moves(record.clone())).await.unwrap();
        drop(writer);
        let mut reader = FrameReader::new(server);
        assert_eq!(reader.recv().await.unwrap(), InboundMessage::Moves(record));
    }

    #[tokio::test]
    async fn test_tcp_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        // 模拟中继：先发会话 ID，再发开始游戏，然后回显收到的帧
        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, write_half) = stream.into_split();
            let mut reader = FrameReader::new(read_half);
            let mut writer = FrameWriter::new(write_half);
            writer.write_frame("1").await.unwrap();
            writer.write_frame("start_game").await.unwrap();
            let frame = reader.read_frame().await.unwrap();
            assert_eq!(frame, "lose");
        });

        let mut conn = TcpConnector.connect(&addr).await.unwrap();
        assert!(conn.peer_addr().is_some());
        assert_eq!(conn.read_session_id().await.unwrap(), 1);
        assert_eq!(conn.recv().await.unwrap(), InboundMessage::StartGame);
        conn.send(&OutboundMessage::GameOver(GameResult::Lose))
            .await
            .unwrap();
        conn.close().await.unwrap();
        relay.await.unwrap();
    }

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.addr(), "127.0.0.1:1234");
    }
}
