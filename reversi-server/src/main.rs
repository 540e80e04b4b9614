use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reversi_server::{Server, ServerConfig};

/// 黑白棋对战服务端
#[derive(Parser, Debug)]
#[command(name = "reversi-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 监听端口（默认 10000）
    port: Option<u16>,

    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// JSON 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 允许的最大棋盘边长
    #[arg(long)]
    max_board_size: Option<usize>,

    /// 读空闲超时（秒），0 表示不超时
    #[arg(long)]
    idle_timeout: Option<u64>,
}

impl Cli {
    /// 命令行参数优先于配置文件，配置文件优先于默认值
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(host) = self.host {
            config.network.host = host;
        }
        if let Some(max_board_size) = self.max_board_size {
            config.max_board_size = max_board_size;
        }
        if let Some(secs) = self.idle_timeout {
            config.idle_timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("reversi_server=debug".parse()?))
        .init();

    let config = Cli::parse().into_config()?;
    info!("黑白棋服务端启动中，监听 {}", config.network.addr());

    Server::new(config).run().await
}
