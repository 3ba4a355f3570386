//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Local cache configuration / 本地缓存配置
    pub cache: CacheConfig,
    /// Offline index synchronization / 离线索引同步配置
    pub offline: OfflineConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Cache configuration / 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory path / 缓存目录路径
    pub dir: String,
    /// Raw dataset blob file name / 数据集文件名
    pub dataset_file: String,
    /// Version marker file name / 版本标记文件名
    pub version_file: String,
}

/// Offline index configuration / 离线索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Run the background refresh scheduler / 是否启用后台刷新
    pub enabled: bool,
    /// Remote version endpoint (returns `{"commit": {"sha": ...}}`) / 远程版本接口
    pub version_url: String,
    /// Remote dataset blob / 远程数据集地址
    pub dataset_url: String,
    /// Seconds between refresh cycles / 刷新间隔（秒）
    pub refresh_interval_secs: u64,
    /// Timeout for the version check request / 版本检查超时（秒）
    pub request_timeout_secs: u64,
    /// Timeout for the whole dataset download / 数据集下载超时（秒）
    pub download_timeout_secs: u64,
    /// User-Agent sent with every request (GitHub rejects requests without one)
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8190,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "cache".to_string(),
            dataset_file: "anime-offline-database.json".to_string(),
            version_file: "anime-offline-database-version".to_string(),
        }
    }
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            version_url: "https://api.github.com/repos/manami-project/anime-offline-database/branches/master".to_string(),
            dataset_url: "https://github.com/manami-project/anime-offline-database/raw/master/anime-offline-database-minified.json".to_string(),
            refresh_interval_secs: 12 * 60 * 60,
            request_timeout_secs: 30,
            download_timeout_secs: 600,
            user_agent: concat!("saika-index/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl OfflineConfig {
    pub fn refresh_interval(&self) -> Duration {
        // A zero interval would spin the timer / 间隔为0时会空转
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl AppConfig {
    /// Get the cache directory, `CACHE_DIR` wins over the file / 获取缓存目录
    pub fn get_cache_dir(&self) -> PathBuf {
        std::env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&self.cache.dir))
    }

    /// Get the full dataset blob path / 获取数据集文件完整路径
    pub fn get_dataset_path(&self) -> PathBuf {
        self.get_cache_dir().join(&self.cache.dataset_file)
    }

    /// Get the full version marker path / 获取版本标记文件完整路径
    pub fn get_version_path(&self) -> PathBuf {
        self.get_cache_dir().join(&self.cache.version_file)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        return PathBuf::from(path);
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config() -> Result<Arc<RwLock<AppConfig>>, String> {
    let config = load_config()?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG.set(config_arc.clone())
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(config_arc)
}
