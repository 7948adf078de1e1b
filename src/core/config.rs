//! 内核配置
//!
//! 定义内核的配置结构和加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::{CoreError, Result};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 顺序分配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
    /// 默认顺序区间上界（含）
    ///
    /// 自定义顺序应保留在该值之外，避免与默认顺序池重叠。
    #[serde(default = "default_last_default_order")]
    pub last_default_order: i32,
}

fn default_last_default_order() -> i32 {
    crate::order::DEFAULT_LAST_DEFAULT_ORDER
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            last_default_order: default_last_default_order(),
        }
    }
}

/// 设置资源配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// 设置文件根目录（None 表示不启用文件设置加载器）
    #[serde(default)]
    pub settings_dir: Option<PathBuf>,
}

/// 内核配置
///
/// 对应 config.yaml 文件中的配置。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 顺序分配配置
    #[serde(default)]
    pub orders: OrderConfig,

    /// 设置资源配置
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl CoreConfig {
    /// 创建配置构建器
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// 从 YAML 文件加载配置
    ///
    /// # Errors
    ///
    /// 文件不存在、不可读或格式无效时返回错误。
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::ConfigLoadFailed(format!("{:?}: {}", path, e)))?;
        Self::from_yaml(&text)
    }

    /// 从 YAML 字符串解析配置
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: CoreConfig = serde_yaml::from_str(text)
            .map_err(|e| CoreError::ConfigLoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// 支持的变量：
    /// - `JIMU_LOG_LEVEL` - 日志级别
    /// - `JIMU_LAST_DEFAULT_ORDER` - 默认顺序区间上界
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("JIMU_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(bound) = std::env::var("JIMU_LAST_DEFAULT_ORDER") {
            if let Ok(value) = bound.parse::<i32>() {
                self.orders.last_default_order = value;
            }
        }
        self
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.orders.last_default_order < 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "orders.last_default_order".to_string(),
                reason: format!("必须为非负数，当前值 {}", self.orders.last_default_order),
            });
        }

        if self.logging.file_output && self.logging.log_dir.is_none() {
            return Err(CoreError::InvalidConfigValue {
                key: "logging.log_dir".to_string(),
                reason: "启用文件输出时必须指定日志目录".to_string(),
            });
        }

        Ok(())
    }
}

/// 内核配置构建器
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志输出
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logs(mut self, enable: bool) -> Self {
        self.config.logging.json_format = enable;
        self
    }

    /// 设置默认顺序区间上界
    pub fn last_default_order(mut self, order: i32) -> Self {
        self.config.orders.last_default_order = order;
        self
    }

    /// 设置文件根目录
    pub fn settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.settings.settings_dir = Some(dir.into());
        self
    }

    /// 构建配置
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
