//! 服务器主逻辑
//!
//! 接受连接并为每个连接启动一个会话任务。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use protocol::{Connection, Listener, PlayerId, TcpConnection, TcpListener};

use crate::config::ServerConfig;
use crate::matchmaker::Matchmaker;
use crate::session::ClientSession;

/// 服务器
pub struct Server {
    config: ServerConfig,
    matchmaker: Arc<Matchmaker>,
    next_id: AtomicU64,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let matchmaker = Arc::new(Matchmaker::new(config.max_board_size));
        Self {
            config,
            matchmaker,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn matchmaker(&self) -> &Arc<Matchmaker> {
        &self.matchmaker
    }

    /// 生成新的会话 ID
    fn generate_id(&self) -> PlayerId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 绑定配置中的监听地址
    pub async fn bind(&self) -> protocol::Result<TcpListener> {
        TcpListener::bind(&self.config.network.addr()).await
    }

    /// 绑定并运行服务器
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// 在已绑定的监听器上接受连接，单个连接出错不影响服务
    pub async fn serve(self, mut listener: TcpListener) -> Result<()> {
        info!(
            addr = listener.local_addr().as_deref().unwrap_or("?"),
            max_board_size = self.config.max_board_size,
            "黑白棋服务端已启动"
        );

        loop {
            match listener.accept().await {
                Ok(conn) => self.spawn_session(conn),
                Err(e) => error!("接受连接失败: {}", e),
            }
        }
    }

    fn spawn_session(&self, conn: TcpConnection) {
        let id = self.generate_id();
        let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());
        let session = ClientSession::new(id, peer, self.matchmaker.clone());
        let idle_timeout = self.config.idle_timeout();

        let (reader, writer) = conn.split();
        tokio::spawn(session.run(reader, writer, idle_timeout));
    }
}
