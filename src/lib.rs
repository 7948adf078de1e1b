//! # Jimu Core - 积木内核
//!
//! 积木内核是积木生态的模块化骨架，提供以下核心功能：
//!
//! - **模块树管理**: 层级模块的加载、激活、停用、卸载与级联传播
//! - **能力作用域**: 显式注册、按类型标识去重的能力解析
//! - **执行顺序分配**: 默认顺序池的分配/回收与自定义顺序查询
//! - **执行引擎**: 系统组按顺序升序逐帧执行
//! - **配置管理**: 统一的配置加载和管理
//! - **日志系统**: 结构化日志记录
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use jimu_core::{CoreConfig, JimuCore};
//! use jimu_core::module::ModuleBehavior;
//!
//! struct AppBehavior;
//! impl ModuleBehavior for AppBehavior {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut core = JimuCore::new(CoreConfig::default()).await?;
//!     core.start().await?;
//!
//!     // 加载并激活根模块
//!     let app = core.load_module(AppBehavior, true).await?;
//!     assert!(app.is_active());
//!
//!     // 宿主循环逐帧驱动
//!     core.tick(0.016);
//!
//!     core.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `module` - 模块树、能力作用域与设置资源
//! - `order` - 顺序仓库与顺序分配器
//! - `engine` - 执行引擎与系统组
//! - `core` - 核心配置和上下文
//! - `api` - 公共 API 接口
//! - `utils` - 工具函数和错误类型

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod core;
pub mod engine;
pub mod module;
pub mod order;
pub mod utils;

// 重导出常用类型，方便使用
pub use api::sdk::{CoreState, JimuCore};

pub use module::{
    CapabilitySet, Module, ModuleActivationListener, ModuleBehavior, ModuleDeactivationListener,
    ModuleLoadListener, ModuleUnloadListener, Scope, ScopeBuilder, SettingsLoader, WithSettings,
};

pub use engine::{ExecutionEngine, GroupHandle, System, TickEngine};

pub use order::{OrderRepository, OrderResolver, StaticOrderRepository};

pub use self::core::config::{CoreConfig, CoreConfigBuilder, LogConfig, OrderConfig, SettingsConfig};
pub use self::core::context::KernelContext;

pub use utils::{error_code, generate_id, CoreError, Result};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
