//! JimuCore SDK
//!
//! 积木内核的主要对外接口。提供统一的 API 来装配和驱动内核：
//!
//! - 模块管理：加载根模块、级联卸载
//! - 执行驱动：逐帧运行已注册的系统组
//! - 配置管理：从配置装配顺序仓库与设置加载器
//! - 指标导出：生命周期计数与顺序池占用
//!
//! # 示例
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
//!     let config = CoreConfig::builder()
//!         .log_level("info")
//!         .last_default_order(9_999)
//!         .build();
//!
//!     let mut core = JimuCore::new(config).await?;
//!     core.start().await?;
//!
//!     let app = core.load_module(AppBehavior, true).await?;
//!     core.tick(0.016);
//!
//!     assert!(app.is_active());
//!     core.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::config::CoreConfig;
use crate::core::context::KernelContext;
use crate::engine::{ExecutionEngine, TickEngine};
use crate::module::lifecycle::{Module, ModuleBehavior};
use crate::module::settings::FileSettingsLoader;
use crate::order::{OrderRepository, StaticOrderRepository};
use crate::utils::{CoreError, LifecycleReport, Result};

// ============================================================================
// 内核状态
// ============================================================================

/// 内核状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    /// 已初始化
    Initialized,
    /// 运行中
    Running,
    /// 正在关闭
    ShuttingDown,
    /// 已关闭
    Shutdown,
}

impl CoreState {
    /// 检查是否可以启动
    pub fn can_start(&self) -> bool {
        matches!(self, CoreState::Initialized)
    }

    /// 检查是否可以关闭
    pub fn can_shutdown(&self) -> bool {
        matches!(self, CoreState::Running)
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        matches!(self, CoreState::Running)
    }
}

// ============================================================================
// JimuCore 主结构体
// ============================================================================

/// 积木内核主结构体
///
/// 内核的入口点，负责装配顺序仓库、执行引擎、设置加载器和
/// 内核上下文，并管理根模块的生命周期。
///
/// # 生命周期
///
/// 1. `new()` - 从配置装配内核
/// 2. `start()` - 进入运行状态
/// 3. `load_module()` / `tick()` - 加载根模块、驱动执行
/// 4. `shutdown()` - 卸载全部根模块并关闭
pub struct JimuCore {
    /// 内核配置
    config: CoreConfig,

    /// 内核状态
    state: Arc<RwLock<CoreState>>,

    /// 执行引擎（具体类型保留，`tick` 需要驱动它）
    engine: Arc<TickEngine>,

    /// 内核上下文
    context: Arc<KernelContext>,

    /// 根模块列表
    roots: Arc<RwLock<Vec<Arc<Module>>>>,

    /// 启动时间
    started_at: Option<Instant>,
}

impl JimuCore {
    /// 从配置装配内核
    ///
    /// 顺序仓库按配置的区间上界建立，不含自定义顺序保留；
    /// 需要保留自定义顺序时用 [`with_repository`](Self::with_repository)。
    ///
    /// # Errors
    ///
    /// 配置无效时返回错误。
    pub async fn new(config: CoreConfig) -> Result<Self> {
        let repository = StaticOrderRepository::builder()
            .last_default_order(config.orders.last_default_order)
            .build();
        Self::with_repository(config, Arc::new(repository)).await
    }

    /// 使用自定义顺序仓库装配内核
    ///
    /// 仓库的区间上界以传入的仓库为准，配置中的值不再生效。
    pub async fn with_repository(
        config: CoreConfig,
        repository: Arc<dyn OrderRepository>,
    ) -> Result<Self> {
        config.validate()?;

        info!("初始化积木内核 v{}", crate::VERSION);

        let engine = Arc::new(TickEngine::new());
        let mut context =
            KernelContext::new(Arc::clone(&engine) as Arc<dyn ExecutionEngine>, repository);

        if let Some(dir) = &config.settings.settings_dir {
            debug!(dir = %dir.display(), "启用文件设置加载器");
            context = context.with_settings_loader(Arc::new(FileSettingsLoader::new(dir)));
        }

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(CoreState::Initialized)),
            engine,
            context: Arc::new(context),
            roots: Arc::new(RwLock::new(Vec::new())),
            started_at: None,
        })
    }

    /// 启动内核
    pub async fn start(&mut self) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_start() {
            return Err(CoreError::InitFailed(format!(
                "内核状态 {:?} 不允许启动",
                *state
            )));
        }

        *state = CoreState::Running;
        self.started_at = Some(Instant::now());
        info!("内核已启动");
        Ok(())
    }

    /// 关闭内核
    ///
    /// 按加载的逆序卸载全部根模块（每个根模块级联卸载自己的子树），
    /// 然后进入已关闭状态。重复关闭是无操作。
    pub async fn shutdown(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if !state.can_shutdown() {
                warn!(state = ?*state, "内核不在运行状态，跳过关闭");
                return Ok(());
            }
            *state = CoreState::ShuttingDown;
        }

        info!("关闭内核");

        let roots: Vec<Arc<Module>> = {
            let mut guard = self.roots.write().await;
            guard.drain(..).rev().collect()
        };
        for root in roots {
            root.unload().await?;
        }

        *self.state.write().await = CoreState::Shutdown;
        info!("内核已关闭");
        Ok(())
    }

    /// 加载一个根模块
    ///
    /// # Arguments
    ///
    /// * `behavior` - 模块行为
    /// * `activate_after_load` - 加载完成后是否立即激活
    ///
    /// # Errors
    ///
    /// 内核未运行或模块加载失败时返回错误。
    pub async fn load_module<B: ModuleBehavior>(
        &self,
        behavior: B,
        activate_after_load: bool,
    ) -> Result<Arc<Module>> {
        if !self.is_running().await {
            return Err(CoreError::Internal("内核未运行，无法加载模块".to_string()));
        }

        let module = Module::load(
            behavior,
            None,
            Arc::clone(&self.context),
            activate_after_load,
        )
        .await?;

        self.roots.write().await.push(Arc::clone(&module));
        Ok(module)
    }

    /// 执行一帧
    ///
    /// 按顺序升序运行所有已激活模块注册的系统组。
    pub fn tick(&self, delta: f32) {
        self.engine.tick(delta);
    }

    /// 内核是否正在运行
    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_running()
    }

    /// 当前内核状态
    pub async fn state(&self) -> CoreState {
        *self.state.read().await
    }

    /// 根模块数量
    pub async fn root_count(&self) -> usize {
        self.roots.read().await.len()
    }

    /// 内核上下文
    pub fn context(&self) -> Arc<KernelContext> {
        Arc::clone(&self.context)
    }

    /// 内核配置
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// 运行时长（未启动时为 None）
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// 导出生命周期指标报告
    pub fn metrics_report(&self) -> LifecycleReport {
        self.context
            .metrics()
            .export(self.context.resolver().occupied_count())
    }
}

impl std::fmt::Debug for JimuCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JimuCore")
            .field("engine", &self.engine)
            .field("started", &self.started_at.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyBehavior;
    impl ModuleBehavior for EmptyBehavior {}

    #[tokio::test]
    async fn test_core_state_transitions() {
        assert!(CoreState::Initialized.can_start());
        assert!(!CoreState::Running.can_start());
        assert!(CoreState::Running.can_shutdown());
        assert!(!CoreState::Shutdown.can_shutdown());
    }

    #[tokio::test]
    async fn test_core_lifecycle() {
        let mut core = JimuCore::new(CoreConfig::default()).await.unwrap();
        assert_eq!(core.state().await, CoreState::Initialized);

        core.start().await.unwrap();
        assert!(core.is_running().await);

        core.shutdown().await.unwrap();
        assert_eq!(core.state().await, CoreState::Shutdown);
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let mut core = JimuCore::new(CoreConfig::default()).await.unwrap();
        core.start().await.unwrap();
        assert!(core.start().await.is_err());
    }

    #[tokio::test]
    async fn test_load_module_requires_running() {
        let core = JimuCore::new(CoreConfig::default()).await.unwrap();
        let result = core.load_module(EmptyBehavior, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_unloads_roots() {
        let mut core = JimuCore::new(CoreConfig::default()).await.unwrap();
        core.start().await.unwrap();

        let module = core.load_module(EmptyBehavior, true).await.unwrap();
        assert_eq!(core.root_count().await, 1);
        assert!(module.is_active());

        core.shutdown().await.unwrap();

        assert!(!module.is_loaded());
        assert_eq!(core.root_count().await, 0);
    }

    #[tokio::test]
    async fn test_metrics_report() {
        let mut core = JimuCore::new(CoreConfig::default()).await.unwrap();
        core.start().await.unwrap();
        core.load_module(EmptyBehavior, false).await.unwrap();

        let report = core.metrics_report();
        assert_eq!(report.modules_loaded, 1);
        assert_eq!(report.live_modules, 1);
    }
}
