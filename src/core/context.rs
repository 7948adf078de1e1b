//! 内核上下文
//!
//! 模块加载时显式传入的协作者句柄集合：执行引擎、顺序分配器、
//! 设置加载器和指标收集器。不存在任何环境全局状态，
//! 同一进程可以并存多个互不相干的上下文（测试中尤其常用）。

use std::sync::Arc;

use crate::engine::ExecutionEngine;
use crate::module::settings::{NullSettingsLoader, SettingsLoader};
use crate::order::{OrderRepository, OrderResolver};
use crate::utils::LifecycleMetrics;

/// 内核上下文
///
/// 由外层（通常是 [`JimuCore`](crate::api::sdk::JimuCore)）装配，
/// 以 `Arc` 形式传给 [`Module::load`](crate::module::Module::load)。
/// 顺序分配器和引擎的注册表是上下文级共享状态，
/// 被该上下文下所有模块的加载/卸载与激活/停用修改。
pub struct KernelContext {
    /// 执行引擎
    engine: Arc<dyn ExecutionEngine>,

    /// 顺序分配器
    resolver: Arc<OrderResolver>,

    /// 设置资源加载器
    settings_loader: Arc<dyn SettingsLoader>,

    /// 生命周期指标
    metrics: Arc<LifecycleMetrics>,
}

impl KernelContext {
    /// 创建上下文
    ///
    /// 顺序分配器基于给定仓库建立；设置加载器缺省为占位实现，
    /// 需要时用 [`with_settings_loader`](Self::with_settings_loader) 替换。
    pub fn new(engine: Arc<dyn ExecutionEngine>, repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            engine,
            resolver: Arc::new(OrderResolver::new(repository)),
            settings_loader: Arc::new(NullSettingsLoader),
            metrics: Arc::new(LifecycleMetrics::new()),
        }
    }

    /// 替换设置资源加载器
    pub fn with_settings_loader(mut self, loader: Arc<dyn SettingsLoader>) -> Self {
        self.settings_loader = loader;
        self
    }

    /// 执行引擎
    pub fn engine(&self) -> Arc<dyn ExecutionEngine> {
        Arc::clone(&self.engine)
    }

    /// 顺序分配器
    pub fn resolver(&self) -> Arc<OrderResolver> {
        Arc::clone(&self.resolver)
    }

    /// 设置资源加载器
    pub fn settings_loader(&self) -> Arc<dyn SettingsLoader> {
        Arc::clone(&self.settings_loader)
    }

    /// 生命周期指标
    pub fn metrics(&self) -> Arc<LifecycleMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl std::fmt::Debug for KernelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelContext")
            .field("resolver", &self.resolver)
            .finish()
    }
}
