//! 设置资源支持
//!
//! 部分模块在构造作用域之前需要先异步取得类型化的设置对象。
//! 本模块提供：
//!
//! - [`SettingsLoader`] - 设置资源加载器接口（异步加载 + 显式释放）
//! - [`FileSettingsLoader`] - 从目录读取 YAML/JSON 设置文件的实现
//! - [`NullSettingsLoader`] - 未配置加载器时的占位实现
//! - [`WithSettings`] - 行为包装器：加载设置、注册为作用域值、
//!   在卸载时恰好释放一次
//!
//! # 示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use jimu_core::module::{ModuleBehavior, WithSettings};
//!
//! #[derive(Deserialize)]
//! struct CombatSettings {
//!     max_units: u32,
//! }
//!
//! struct CombatBehavior;
//! impl ModuleBehavior for CombatBehavior {}
//!
//! // 从加载器的 "CombatSettings.yaml" 读取设置
//! let behavior = WithSettings::<CombatSettings, _>::with_default_path(CombatBehavior);
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::lifecycle::ModuleBehavior;
use super::scope::ScopeBuilder;
use crate::core::context::KernelContext;
use crate::utils::{CoreError, Result};

// ============================================================================
// SettingsLoader - 加载器接口
// ============================================================================

/// 设置资源加载器接口
///
/// `load` 异步取得原始设置值；`release` 归还一次先前的加载。
/// 基于句柄的实现（远端资源、引用计数资产）依赖成对的
/// load/release 调用，文件实现可以把 `release` 实现为无操作。
#[async_trait]
pub trait SettingsLoader: Send + Sync {
    /// 按路径加载设置资源
    async fn load(&self, path: &str) -> Result<serde_json::Value>;

    /// 释放一次先前的加载
    fn release(&self, path: &str);
}

// ============================================================================
// NullSettingsLoader - 占位实现
// ============================================================================

/// 占位加载器
///
/// 上下文未配置加载器时使用；任何加载都会失败。
#[derive(Debug, Default)]
pub struct NullSettingsLoader;

#[async_trait]
impl SettingsLoader for NullSettingsLoader {
    async fn load(&self, path: &str) -> Result<serde_json::Value> {
        Err(CoreError::SettingsLoadFailed {
            path: path.to_string(),
            reason: "内核上下文未配置设置加载器".to_string(),
        })
    }

    fn release(&self, _path: &str) {}
}

// ============================================================================
// FileSettingsLoader - 文件实现
// ============================================================================

/// 文件设置加载器
///
/// 在根目录下按相对路径读取设置文件，`.yaml`/`.yml` 用 YAML 解析，
/// 其余按 JSON 解析。文件没有需要归还的句柄，`release` 只留痕。
#[derive(Debug)]
pub struct FileSettingsLoader {
    root: PathBuf,
}

impl FileSettingsLoader {
    /// 创建加载器
    ///
    /// # Arguments
    ///
    /// * `root` - 设置文件根目录
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 设置文件根目录
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl SettingsLoader for FileSettingsLoader {
    async fn load(&self, path: &str) -> Result<serde_json::Value> {
        let full_path = self.root.join(path);
        debug!(path = %full_path.display(), "读取设置文件");

        let text = tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| CoreError::SettingsLoadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let is_yaml = full_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| CoreError::InvalidSettings {
                path: path.to_string(),
                reason: e.to_string(),
            })
        } else {
            serde_json::from_str(&text).map_err(|e| CoreError::InvalidSettings {
                path: path.to_string(),
                reason: e.to_string(),
            })
        }
    }

    fn release(&self, path: &str) {
        trace!(path, "释放设置资源（文件无句柄，无操作）");
    }
}

// ============================================================================
// WithSettings - 设置模块行为包装器
// ============================================================================

/// 设置模块行为包装器
///
/// 包装任意 [`ModuleBehavior`]，在其生命周期上叠加设置语义：
///
/// 1. `before_scope_create`：内层准备完成后，从上下文的加载器
///    取得原始设置并反序列化为 `T`
/// 2. `install`：把 `Arc<T>` 注册为作用域值（后代作用域同样可见），
///    再委托内层注册
/// 3. `on_unload`：内层钩子完成后，若发生过加载则恰好释放一次
///
/// 其余钩子全部透传给内层行为。
pub struct WithSettings<T, B> {
    inner: B,
    path: String,
    settings: RwLock<Option<Arc<T>>>,
    loader: RwLock<Option<Arc<dyn SettingsLoader>>>,
    loaded: AtomicBool,
}

impl<T, B> WithSettings<T, B>
where
    T: DeserializeOwned + Send + Sync + 'static,
    B: ModuleBehavior,
{
    /// 指定设置路径创建包装器
    pub fn new(inner: B, path: impl Into<String>) -> Self {
        Self {
            inner,
            path: path.into(),
            settings: RwLock::new(None),
            loader: RwLock::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    /// 使用缺省路径创建包装器
    ///
    /// 缺省路径为 `{设置类型短名}.yaml`，相对加载器根目录。
    pub fn with_default_path(inner: B) -> Self {
        let short_name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Settings");
        Self::new(inner, format!("{}.yaml", short_name))
    }

    /// 设置路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 已加载的设置对象
    pub fn settings(&self) -> Option<Arc<T>> {
        self.settings.read().expect("设置锁中毒").clone()
    }
}

#[async_trait]
impl<T, B> ModuleBehavior for WithSettings<T, B>
where
    T: DeserializeOwned + Send + Sync + 'static,
    B: ModuleBehavior,
{
    fn install(&self, builder: &mut ScopeBuilder) {
        if let Some(settings) = self.settings() {
            builder.register_value(settings);
        }
        self.inner.install(builder);
    }

    async fn before_scope_create(&self, ctx: &KernelContext) -> Result<()> {
        self.inner.before_scope_create(ctx).await?;

        let loader = ctx.settings_loader();
        let raw = loader.load(&self.path).await?;
        let value: T = serde_json::from_value(raw).map_err(|e| CoreError::InvalidSettings {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        *self.settings.write().expect("设置锁中毒") = Some(Arc::new(value));
        *self.loader.write().expect("设置锁中毒") = Some(loader);
        self.loaded.store(true, Ordering::SeqCst);

        debug!(path = %self.path, "设置资源加载完成");
        Ok(())
    }

    async fn on_load(&self) -> Result<()> {
        self.inner.on_load().await
    }

    async fn on_activate(&self) -> Result<()> {
        self.inner.on_activate().await
    }

    async fn on_deactivate(&self) -> Result<()> {
        self.inner.on_deactivate().await
    }

    async fn on_unload(&self) -> Result<()> {
        self.inner.on_unload().await?;

        // 只有发生过加载才释放，且恰好释放一次
        if self.loaded.swap(false, Ordering::SeqCst) {
            if let Some(loader) = self.loader.write().expect("设置锁中毒").take() {
                loader.release(&self.path);
            }
        }
        Ok(())
    }
}
