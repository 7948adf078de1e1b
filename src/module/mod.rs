//! 模块管理模块
//!
//! 包含模块树的核心组件：
//! - 生命周期节点与行为接口
//! - 能力作用域与监听器接口
//! - 设置资源支持

pub mod lifecycle;
pub mod scope;
pub mod settings;

// 重导出常用类型
pub use lifecycle::{Module, ModuleBehavior};
pub use scope::{
    CapabilitySet, ModuleActivationListener, ModuleDeactivationListener, ModuleLoadListener,
    ModuleUnloadListener, Scope, ScopeBuilder,
};
pub use settings::{FileSettingsLoader, NullSettingsLoader, SettingsLoader, WithSettings};
