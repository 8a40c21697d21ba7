//! Server configuration.
//!
//! # Responsibility
//! - Collect the knobs for the database, the pool, the retry schedule and
//!   both listeners in one explicitly constructed value.
//!
//! # Invariants
//! - Both adapters always share one database path; there is deliberately
//!   no way to configure a second store per protocol.

use glossd_core::{PoolConfig, RetryPolicy};
use std::path::PathBuf;

/// HTTP gateway listener settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind on.
    pub bind: String,
    /// Port number.
    pub port: u16,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            max_body_size: 1_048_576,
        }
    }
}

impl HttpConfig {
    /// Sets the bind address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request body cap.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// `bind:port` as a socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Binary RPC listener settings.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Address to bind on.
    pub bind: String,
    /// Port number.
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 50051,
        }
    }
}

impl RpcConfig {
    /// Sets the bind address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `bind:port` as a socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the single shared database file.
    pub db_path: PathBuf,
    /// HTTP gateway settings.
    pub http: HttpConfig,
    /// Binary RPC settings.
    pub rpc: RpcConfig,
    /// Connection pool settings.
    pub pool: PoolConfig,
    /// Retry schedule for mutating operations.
    pub retry: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("glossary.db"),
            http: HttpConfig::default(),
            rpc: RpcConfig::default(),
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Sets the database path.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Sets the HTTP listener settings.
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Sets the RPC listener settings.
    pub fn with_rpc(mut self, rpc: RpcConfig) -> Self {
        self.rpc = rpc;
        self
    }

    /// Sets the pool settings.
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpConfig, RpcConfig, ServerConfig};

    #[test]
    fn builder_chains_compose() {
        let config = ServerConfig::default()
            .with_db_path("/tmp/glossary.db")
            .with_http(HttpConfig::default().with_port(0))
            .with_rpc(RpcConfig::default().with_bind("0.0.0.0").with_port(0));

        assert_eq!(config.db_path.to_str(), Some("/tmp/glossary.db"));
        assert_eq!(config.http.addr(), "127.0.0.1:0");
        assert_eq!(config.rpc.addr(), "0.0.0.0:0");
    }

    #[test]
    fn defaults_match_the_documented_ports() {
        let config = ServerConfig::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.rpc.port, 50051);
        assert_eq!(config.http.max_body_size, 1_048_576);
    }
}
