use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{ClientSettings, ClientSettingsUpdate};

/// 覆盖接口地址的环境变量
pub const API_URL_ENV: &str = "ACTIVITY_API_URL";

pub struct SettingsManager {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsManager {
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice::<ClientSettings>(&bytes).unwrap_or_else(|e| {
                    warn!("配置文件 {:?} 解析失败，使用默认配置: {}", path, e);
                    ClientSettings::default()
                })
            }
            _ => {
                let default = ClientSettings::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(initial),
        })
    }

    pub async fn get(&self) -> ClientSettings {
        self.data.read().await.clone()
    }

    /// 实际使用的接口地址（环境变量优先）
    pub async fn api_base_url(&self) -> String {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.data.read().await.api_base_url.clone(),
        }
    }

    pub async fn update(&self, update: ClientSettingsUpdate) -> Result<ClientSettings> {
        let mut config = self.data.write().await;

        if let Some(url) = update.api_base_url {
            config.api_base_url = url;
        }
        if let Some(timeout) = update.request_timeout_secs {
            config.request_timeout_secs = timeout;
        }
        if let Some(capacity) = update.event_capacity {
            config.event_capacity = capacity;
        }
        if let Some(level) = update.log_level {
            config.log_level = level;
        }
        if let Some(dir) = update.log_dir {
            config.log_dir = Some(dir);
        }
        if let Some(viewer) = update.viewer {
            config.viewer = Some(viewer);
        }

        self.save(&config).await?;
        Ok(config.clone())
    }

    async fn save(&self, config: &ClientSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
