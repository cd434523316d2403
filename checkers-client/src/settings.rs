//! 客户端设置
//!
//! 设置保存在 `<config_dir>/checkers/settings.json`，文件缺失或无效时使用默认值。

use std::path::{Path, PathBuf};

use anyhow::Context;
use protocol::NetworkConfig;
use serde::{Deserialize, Serialize};

/// 覆盖服务端地址的环境变量（`host:port` 或 `host`）
pub const SERVER_ENV: &str = "CHECKERS_SERVER";

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 中继服务端地址
    pub server: NetworkConfig,
    /// 日志过滤（`RUST_LOG` 未设置时使用）
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server: NetworkConfig::default(),
            log_level: "checkers_client=info,protocol=info".to_string(),
        }
    }
}

impl ClientSettings {
    /// 获取设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("checkers");
            path.push("settings.json");
            path
        })
    }

    /// 从默认位置加载设置
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            tracing::warn!("无法获取配置目录，使用默认设置");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// 从指定文件加载设置
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("设置文件不存在，使用默认设置");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    tracing::info!("已加载设置: {:?}", path);
                    settings
                }
                Err(e) => {
                    tracing::warn!("设置文件格式无效: {}，使用默认设置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取设置文件: {}，使用默认设置", e);
                Self::default()
            }
        }
    }

    /// 保存设置到指定文件
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录 {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化设置失败")?;
        std::fs::write(path, content).with_context(|| format!("写入设置文件失败 {:?}", path))?;

        tracing::info!("设置已保存: {:?}", path);
        Ok(())
    }

    /// 用 `host:port`（或只有 `host`）覆盖服务端地址
    pub fn with_server_override(mut self, value: Option<&str>) -> anyhow::Result<Self> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(self);
        };

        match value.rsplit_once(':') {
            Some((host, port)) => {
                self.server.host = host.to_string();
                self.server.port = port
                    .parse()
                    .with_context(|| format!("{} 中的端口无效: {}", SERVER_ENV, value))?;
            }
            None => self.server.host = value.to_string(),
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("checkers-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.server.addr(), "127.0.0.1:1234");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = ClientSettings::load_from(&temp_path("missing"));
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut settings = ClientSettings::default();
        settings.server.host = "relay.local".to_string();
        settings.server.port = 4000;
        settings.save_to(&path).unwrap();

        assert_eq!(ClientSettings::load_from(&path), settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"log_level":"debug"}"#).unwrap();

        let settings = ClientSettings::load_from(&path);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.server, NetworkConfig::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let path = temp_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(ClientSettings::load_from(&path), ClientSettings::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_server_override() {
        let settings = ClientSettings::default()
            .with_server_override(Some("10.0.0.2:5555"))
            .unwrap();
        assert_eq!(settings.server.addr(), "10.0.0.2:5555");

        let settings = ClientSettings::default()
            .with_server_override(Some("example.org"))
            .unwrap();
        assert_eq!(settings.server.addr(), "example.org:1234");

        let settings = ClientSettings::default().with_server_override(None).unwrap();
        assert_eq!(settings, ClientSettings::default());

        assert!(ClientSettings::default()
            .with_server_override(Some("host:port"))
            .is_err());
    }
}
