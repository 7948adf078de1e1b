//! 日志系统模块
//!
//! 本模块基于 tracing 生态实现内核的日志系统，包括：
//!
//! - 多级别日志支持（TRACE, DEBUG, INFO, WARN, ERROR）
//! - 结构化日志（可选 JSON 格式输出）
//! - 文件日志输出（异步非阻塞）
//! - 日志轮转（每天、每小时）
//! - 日志过滤（按模块、按级别，EnvFilter 指令）
//!
//! # 示例
//!
//! ```rust,no_run
//! use jimu_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//! use std::path::PathBuf;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoggerConfig::builder()
//!         .level("debug")
//!         .file_output(PathBuf::from("./logs"))
//!         .rotation(RotationStrategy::Daily)
//!         .build();
//!
//!     let _guard = Logger::init(config)?;
//!
//!     tracing::info!(module = "combat", instance_id = "a1B2c3D4e5", "模块已加载");
//!     Ok(())
//! }
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::utils::{CoreError, Result};

// ============================================================================
// 日志轮转策略
// ============================================================================

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转（单个日志文件）
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转（默认）
    #[default]
    Daily,
}

impl RotationStrategy {
    /// 转换为 tracing-appender 的 Rotation 类型
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略，未识别时回落到每天轮转
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::Never => write!(f, "never"),
            RotationStrategy::Hourly => write!(f, "hourly"),
            RotationStrategy::Daily => write!(f, "daily"),
        }
    }
}

// ============================================================================
// 日志配置
// ============================================================================

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别（"trace", "debug", "info", "warn", "error"）
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块路径
    pub show_target: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 自定义过滤指令（EnvFilter 格式）
    ///
    /// 例如："jimu_core=debug,jimu_core::module=trace"
    pub filter_directives: Option<String>,

    /// 是否启用 ANSI 颜色（仅控制台输出）
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: "jimu-core".to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从内核配置的日志段创建
    pub fn from_log_config(log_config: &crate::core::config::LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }

    /// 构造 EnvFilter
    fn build_filter(&self) -> EnvFilter {
        let base = match &self.filter_directives {
            Some(directives) => format!("{},{}", self.level, directives),
            None => self.level.clone(),
        };
        EnvFilter::try_new(base).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 设置控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 设置日志文件前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    /// 显示目标模块路径
    pub fn show_target(mut self, enable: bool) -> Self {
        self.config.show_target = enable;
        self
    }

    /// 显示文件名和行号
    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 启用 ANSI 颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

// ============================================================================
// 日志守卫
// ============================================================================

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard。守卫被丢弃时，
/// 会等待所有挂起的日志写入完成，因此应在 main 中持有到进程结束。
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LogGuard {
    fn empty() -> Self {
        Self { _file_guard: None }
    }

    fn with_file_guard(mut self, guard: WorkerGuard) -> Self {
        self._file_guard = Some(guard);
        self
    }
}

// ============================================================================
// 日志系统
// ============================================================================

/// 全局日志初始化标记
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 日志系统
///
/// 提供日志系统的初始化入口。
pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// 根据配置初始化 tracing-subscriber，支持控制台和文件输出。
    /// 重复初始化会返回错误（全局 subscriber 只能设置一次）。
    ///
    /// # Errors
    ///
    /// - 文件输出目录无法创建
    /// - 日志系统已经初始化
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(CoreError::InitFailed("日志系统已初始化".to_string()));
        }

        let filter = config.build_filter();
        let mut guard = LogGuard::empty();

        // 控制台层
        let console_layer = if config.console_output {
            let layer = fmt::layer()
                .with_writer(io::stdout)
                .with_target(config.show_target)
                .with_file(config.show_file_line)
                .with_line_number(config.show_file_line)
                .with_ansi(config.ansi_colors);
            if config.json_format {
                Some(layer.json().boxed())
            } else {
                Some(layer.boxed())
            }
        } else {
            None
        };

        // 文件层（异步非阻塞）
        let file_layer = match &config.file_output {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    CoreError::InitFailed(format!("无法创建日志目录 {:?}: {}", dir, e))
                })?;

                let appender = RollingFileAppender::new(
                    config.rotation.to_rotation(),
                    dir,
                    format!("{}.log", config.file_prefix),
                );
                let (writer, file_guard) = tracing_appender::non_blocking(appender);
                guard = guard.with_file_guard(file_guard);

                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(config.show_target)
                    .with_ansi(false);
                if config.json_format {
                    Some(layer.json().boxed())
                } else {
                    Some(layer.boxed())
                }
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        tracing::debug!(
            level = %config.level,
            json = config.json_format,
            rotation = %config.rotation,
            "日志系统初始化完成"
        );

        Ok(guard)
    }
}

// ============================================================================
// 结构化字段名约定
// ============================================================================

/// 结构化日志字段名常量
///
/// 统一各处日志的字段命名，方便按字段检索。
pub mod fields {
    /// 模块名称（行为类型名）
    pub const MODULE: &str = "module";
    /// 模块实例 ID
    pub const INSTANCE_ID: &str = "instance_id";
    /// 执行顺序
    pub const ORDER: &str = "order";
    /// 错误信息
    pub const ERROR: &str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_strategy_parse() {
        assert_eq!(RotationStrategy::parse("never"), RotationStrategy::Never);
        assert_eq!(RotationStrategy::parse("hourly"), RotationStrategy::Hourly);
        assert_eq!(RotationStrategy::parse("daily"), RotationStrategy::Daily);
        assert_eq!(RotationStrategy::parse("bogus"), RotationStrategy::Daily);
    }

    #[test]
    fn test_logger_config_builder() {
        let config = LoggerConfig::builder()
            .level("debug")
            .json_format(true)
            .file_output("/tmp/logs")
            .file_prefix("test")
            .rotation(RotationStrategy::Hourly)
            .build();

        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.file_output, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.file_prefix, "test");
        assert_eq!(config.rotation, RotationStrategy::Hourly);
    }

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(config.file_output.is_none());
    }

    #[test]
    fn test_build_filter_with_directives() {
        let config = LoggerConfig::builder()
            .level("info")
            .filter_directives("jimu_core::module=trace")
            .build();
        // 指令非法时回落到 info，不应 panic
        let _ = config.build_filter();
    }
}
