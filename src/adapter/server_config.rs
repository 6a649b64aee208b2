use crate::adapter::database_config::ConfigError;
use crate::domain::model::UserId;
use std::env;
use std::net::SocketAddr;
use tokio::net::lookup_host;

/// 永続化のバックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    Memory,
}

impl StorageBackend {
    pub fn from_string(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid STORAGE_BACKEND: {} (expected mysql or memory)",
                other
            ))),
        }
    }
}

/// HTTPサーバー設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    /// `memory` バックエンドで起動時にプラットフォーム管理者として登録するユーザー
    pub bootstrap_admin: Option<UserId>,
}

impl ServerConfig {
    /// 環境変数から設定を読み取る
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid SERVER_PORT: {}", e)))?;
        let storage_backend = StorageBackend::from_string(
            &env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mysql".to_string()),
        )?;
        let bootstrap_admin = match env::var("BOOTSTRAP_ADMIN_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(UserId::from_string(raw.trim()).map_err(
                |e| ConfigError::InvalidValue(format!("Invalid BOOTSTRAP_ADMIN_USER_ID: {}", e)),
            )?),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            storage_backend,
            bootstrap_admin,
        })
    }

    /// バインドするソケットアドレス
    /// `SERVER_HOST` にはIPアドレスのほかホスト名も指定できる
    pub async fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid SERVER_HOST: {}", e)))?;
        addrs.next().ok_or_else(|| {
            ConfigError::InvalidValue(format!("SERVER_HOST resolved to nothing: {}", self.host))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults() {
        let _lock = crate::adapter::env_test_lock();
        env::remove_var("SERVER_HOST");
        env::remove_var("SERVER_PORT");
        env::remove_var("STORAGE_BACKEND");
        env::remove_var("BOOTSTRAP_ADMIN_USER_ID");

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.storage_backend, StorageBackend::MySql);
        assert!(config.bootstrap_admin.is_none());
        assert_eq!(
            config.socket_addr().await.unwrap().to_string(),
            "0.0.0.0:3000"
        );
    }

    #[test]
    fn test_memory_backend() {
        let _lock = crate::adapter::env_test_lock();
        env::set_var("STORAGE_BACKEND", "Memory");

        let config = ServerConfig::from_env();
        env::remove_var("STORAGE_BACKEND");

        assert_eq!(config.unwrap().storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_bootstrap_admin_is_rejected() {
        let _lock = crate::adapter::env_test_lock();
        env::set_var("BOOTSTRAP_ADMIN_USER_ID", "admin");

        let config = ServerConfig::from_env();
        env::remove_var("BOOTSTRAP_ADMIN_USER_ID");

        assert!(matches!(config, Err(ConfigError::InvalidValue(_))));
    }

    #[tokio::test]
    async fn test_socket_addr_resolves_hostname() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            bootstrap_admin: None,
        };

        let addr = config.socket_addr().await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_lock_recovers_after_panicking_test() {
        let _ = std::panic::catch_unwind(|| {
            let _lock = crate::adapter::env_test_lock();
            panic!("config test failed while holding the lock");
        });

        let _lock = crate::adapter::env_test_lock();
        env::set_var("STORAGE_BACKEND", "memory");
        let config = ServerConfig::from_env();
        env::remove_var("STORAGE_BACKEND");

        assert_eq!(config.unwrap().storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(StorageBackend::from_string("postgres").is_err());
    }
}
