//! 工具模块
//!
//! 包含错误类型、实例 ID 生成、日志系统、生命周期指标等通用工具。

pub mod error;
pub mod id;
pub mod logger;
pub mod metrics;

// 重导出常用类型
pub use error::{error_code, CoreError, Result};
pub use id::{generate_id, is_valid_id};
pub use logger::{fields, LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
pub use metrics::{LifecycleMetrics, LifecycleReport};
