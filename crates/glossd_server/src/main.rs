//! glossd server entry point.
//!
//! Starts the HTTP/JSON gateway and the binary RPC server bound to one
//! shared store and runs until interrupted.

use clap::Parser;
use glossd_core::{
    default_log_level, init_logging, ConnectionPool, DbSettings, GlossaryService, PoolConfig,
    RetryPolicy, SqliteTermRepository,
};
use glossd_server::config::{HttpConfig, RpcConfig, ServerConfig};
use glossd_server::http::HttpGateway;
use glossd_server::rpc::RpcServer;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "glossd", version, about = "Glossary term store with HTTP and binary RPC front-ends")]
struct Args {
    /// Path of the shared SQLite database file.
    #[arg(long, default_value = "glossary.db")]
    db: PathBuf,

    /// HTTP gateway bind address.
    #[arg(long, default_value = "127.0.0.1")]
    http_bind: String,

    /// HTTP gateway port.
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Binary RPC bind address.
    #[arg(long, default_value = "127.0.0.1")]
    rpc_bind: String,

    /// Binary RPC port.
    #[arg(long, default_value_t = 50051)]
    rpc_port: u16,

    /// Busy timeout for write-lock waits, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    busy_timeout_ms: u64,

    /// Base connection pool size.
    #[arg(long, default_value_t = 20)]
    pool_size: usize,

    /// Additional pool connections allowed under bursts.
    #[arg(long, default_value_t = 50)]
    pool_overflow: usize,

    /// Absolute directory for rolling log files. Logging to file is
    /// disabled when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let settings = DbSettings {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        };
        ServerConfig::default()
            .with_db_path(self.db)
            .with_http(
                HttpConfig::default()
                    .with_bind(self.http_bind)
                    .with_port(self.http_port),
            )
            .with_rpc(
                RpcConfig::default()
                    .with_bind(self.rpc_bind)
                    .with_port(self.rpc_port),
            )
            .with_pool(
                PoolConfig::default()
                    .with_max_size(self.pool_size)
                    .with_max_overflow(self.pool_overflow)
                    .with_settings(settings),
            )
            .with_retry(RetryPolicy::default())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(log_dir) = args.log_dir.clone() {
        let level = args
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        if let Err(err) = init_logging(&level, &log_dir.to_string_lossy()) {
            eprintln!("glossd: {err}");
            return ExitCode::FAILURE;
        }
    }

    let config = args.into_config();

    let pool = match ConnectionPool::open(&config.db_path, config.pool) {
        Ok(pool) => pool,
        Err(err) => {
            error!("event=server_start module=server status=error error_code=pool_open error={err}");
            eprintln!("glossd: failed to open database: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Both adapters share this one service; divergent per-protocol stores
    // are a deployment bug this binary cannot express.
    let service = Arc::new(
        GlossaryService::new(SqliteTermRepository::new(pool)).with_retry_policy(config.retry),
    );

    let http = match HttpGateway::bind(config.http.clone(), Arc::clone(&service)).await {
        Ok(gateway) => gateway,
        Err(err) => {
            eprintln!("glossd: {err}");
            return ExitCode::FAILURE;
        }
    };
    let rpc = match RpcServer::bind(&config.rpc, Arc::clone(&service)).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("glossd: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "event=server_start module=server status=ok db={} http={} rpc={}",
        config.db_path.display(),
        config.http.addr(),
        config.rpc.addr()
    );

    tokio::select! {
        _ = http.run() => {}
        _ = rpc.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("event=server_stop module=server status=ok reason=interrupt");
        }
    }

    ExitCode::SUCCESS
}
