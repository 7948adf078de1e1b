//! 核心配置和上下文
//!
//! 包含内核配置结构与模块协作者句柄（上下文）。

pub mod config;
pub mod context;

// 重导出常用类型
pub use config::{CoreConfig, CoreConfigBuilder, LogConfig, OrderConfig, SettingsConfig};
pub use context::KernelContext;
