//! 积木内核错误类型定义
//!
//! 本模块定义了内核中使用的所有错误类型。

use thiserror::Error;

/// 积木内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 顺序分配错误 ====================

    /// 默认顺序池耗尽
    ///
    /// 慢路径扫描 `[0, last_default_order)` 未找到空闲槽位。
    /// 这是致命错误，说明默认顺序区间配置不足，需要调大 `last_default_order`。
    #[error("没有可用的默认顺序槽位，容量 = {capacity}，请增大默认顺序区间")]
    OrderExhausted {
        /// 默认顺序区间上界（`last_default_order`）
        capacity: i32,
    },

    // ==================== 模块生命周期错误 ====================

    /// 模块加载失败
    #[error("模块加载失败: '{module}' - {reason}")]
    ModuleLoadFailed {
        /// 模块名称
        module: String,
        /// 失败原因
        reason: String,
    },

    /// 模块卸载失败
    #[error("模块卸载失败: '{module}' - {reason}")]
    ModuleUnloadFailed {
        /// 模块名称
        module: String,
        /// 失败原因
        reason: String,
    },

    /// 生命周期钩子执行失败
    #[error("钩子 '{hook}' 执行失败 (模块 '{module}'): {reason}")]
    HookFailed {
        /// 模块名称
        module: String,
        /// 钩子名称（on_load / on_activate / on_deactivate / on_unload）
        hook: String,
        /// 失败原因
        reason: String,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        /// 配置项键名
        key: String,
        /// 无效原因
        reason: String,
    },

    // ==================== 设置资源错误 ====================

    /// 设置资源加载失败
    #[error("设置资源加载失败: '{path}' - {reason}")]
    SettingsLoadFailed {
        /// 资源路径
        path: String,
        /// 失败原因
        reason: String,
    },

    /// 设置资源格式无效
    #[error("设置资源格式无效: '{path}' - {reason}")]
    InvalidSettings {
        /// 资源路径
        path: String,
        /// 无效原因
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 顺序分配错误 (ORDER-xxx)
    /// 默认顺序池耗尽
    pub const ORDER_EXHAUSTED: &str = "ORDER-001";

    // 模块错误 (MODULE-xxx)
    /// 模块加载失败
    pub const MODULE_LOAD_FAILED: &str = "MODULE-001";
    /// 模块卸载失败
    pub const MODULE_UNLOAD_FAILED: &str = "MODULE-002";
    /// 生命周期钩子失败
    pub const MODULE_HOOK_FAILED: &str = "MODULE-003";

    // 配置错误 (CONFIG-xxx)
    /// 配置加载失败
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    /// 配置值无效
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 设置资源错误 (SETTINGS-xxx)
    /// 设置资源加载失败
    pub const SETTINGS_LOAD_FAILED: &str = "SETTINGS-001";
    /// 设置资源格式无效
    pub const SETTINGS_INVALID: &str = "SETTINGS-002";

    // 核心错误 (CORE-xxx)
    /// 初始化失败
    pub const CORE_INIT_FAILED: &str = "CORE-001";
    /// 内部错误
    pub const CORE_INTERNAL: &str = "CORE-002";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::OrderExhausted { .. } => error_code::ORDER_EXHAUSTED,
            CoreError::ModuleLoadFailed { .. } => error_code::MODULE_LOAD_FAILED,
            CoreError::ModuleUnloadFailed { .. } => error_code::MODULE_UNLOAD_FAILED,
            CoreError::HookFailed { .. } => error_code::MODULE_HOOK_FAILED,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::SettingsLoadFailed { .. } => error_code::SETTINGS_LOAD_FAILED,
            CoreError::InvalidSettings { .. } => error_code::SETTINGS_INVALID,
            CoreError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            CoreError::Internal(_) => error_code::CORE_INTERNAL,
            _ => "UNKNOWN",
        }
    }

    /// 是否为致命错误（调用方不可恢复）
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::OrderExhausted { .. })
    }
}
