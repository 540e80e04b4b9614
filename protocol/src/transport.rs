//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 消息以换行分隔，没有长度前缀。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::error::{ProtocolError, Result};
use crate::{CONNECT_TIMEOUT, DEFAULT_PORT, MAX_LINE_LEN};

/// 网络配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl NetworkConfig {
    /// "host:port" 形式的地址
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
    async fn send<M: LineCodec + Send + Sync>(&mut self, msg: &M) -> Result<()>;

    /// 接收消息
    async fn recv<M: LineCodec + Send>(&mut self) -> Result<M>;

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

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
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

        debug!("已连接到 {}", addr);
        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send<M: LineCodec + Send + Sync>(&mut self, msg: &M) -> Result<()> {
        self.writer.write_message(msg).await
    }

    async fn recv<M: LineCodec + Send>(&mut self) -> Result<M> {
        self.reader.read_message().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 行读写
// ============================================================================

/// 行读取器
pub struct LineReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    /// 创建新的行读取器
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(256),
        }
    }

    /// 读取一行（去掉结尾的 `\r\n` / `\n`）
    ///
    /// 对端关闭且没有剩余数据时返回 `ConnectionClosed`；
    /// 最后一行没有换行符也会被返回。
    pub async fn read_line(&mut self) -> Result<String> {
        self.buffer.clear();

        // 多留两个字节给 "\r\n"
        let limit = (MAX_LINE_LEN + 2) as u64;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buffer)
            .await?;

        if read == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        let terminated = self.buffer.last() == Some(&b'\n');
        if !terminated && read as u64 >= limit {
            let len = read + self.discard_line(limit).await?;
            warn!(len, max = MAX_LINE_LEN, "行过长，已丢弃");
            return Err(ProtocolError::LineTooLong {
                len,
                max: MAX_LINE_LEN,
            });
        }

        while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
            self.buffer.pop();
        }
        if self.buffer.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                len: self.buffer.len(),
                max: MAX_LINE_LEN,
            });
        }

        Ok(String::from_utf8_lossy(&self.buffer).into_owned())
    }

    /// 丢弃当前行的剩余部分（直到换行符或对端关闭），返回丢弃的字节数
    async fn discard_line(&mut self, chunk: u64) -> Result<usize> {
        let mut discarded = 0;
        loop {
            self.buffer.clear();
            let read = (&mut self.reader)
                .take(chunk)
                .read_until(b'\n', &mut self.buffer)
                .await?;
            discarded += read;
            if read == 0 || self.buffer.last() == Some(&b'\n') {
                return Ok(discarded);
            }
        }
    }

    /// 读取并解码一条消息
    pub async fn read_message<M: LineCodec>(&mut self) -> Result<M> {
        let line = self.read_line().await?;
        M::decode(&line)
    }
}

/// 行写入器
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    /// 创建新的行写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一行并刷新
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        self.writer.write_all(&data).await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// 编码并写入一条消息
    pub async fn write_message<M: LineCodec>(&mut self, msg: &M) -> Result<()> {
        self.write_line(&msg.encode()).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
