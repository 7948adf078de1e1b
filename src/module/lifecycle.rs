//! 模块生命周期
//!
//! 模块是层级树中的生命周期节点，持有子模块、能力集合（系统 + 四类
//! 监听器）和按顺序标记的系统组，对外提供四个生命周期动词：
//!
//! - **load** - 构造作用域、解析能力、祖先去重、划分系统组
//! - **activate** - 执行钩子、通知监听器、把系统组注册进引擎
//! - **deactivate** - 先停用全部后代，再执行自身停用逻辑
//! - **unload** - 终态；卸载全部子模块、脱离父节点、归还顺序槽位
//!
//! 所有动词都是协作式挂起任务。对同一模块并发调用同一动词，
//! 在布尔标志之外没有额外防护，属于未定义行为。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use tracing::{debug, info, trace};

use super::scope::{
    CapabilitySet, ModuleActivationListener, ModuleDeactivationListener, ModuleLoadListener,
    ModuleUnloadListener, Scope, ScopeBuilder,
};
use crate::core::context::KernelContext;
use crate::engine::{GroupHandle, System};
use crate::utils::{generate_id, Result};

// ============================================================================
// ModuleBehavior - 模块行为接口
// ============================================================================

/// 模块行为接口
///
/// 用户为每种模块实现此接口：`install` 登记模块提供的能力，
/// 四个钩子在生命周期转换点被调用。全部方法都有空缺省实现。
///
/// 钩子返回 `Err` 会中止当前动词，已产生的副作用不回滚
/// （已通知的监听器不会被撤销）。
#[async_trait]
pub trait ModuleBehavior: Send + Sync + 'static {
    /// 向作用域登记本模块的能力（系统、监听器、类型化值）
    fn install(&self, _builder: &mut ScopeBuilder) {}

    /// 作用域构造前的挂起点
    ///
    /// 设置资源等需要在能力注册之前就绪的异步准备在这里完成。
    async fn before_scope_create(&self, _ctx: &KernelContext) -> Result<()> {
        Ok(())
    }

    /// 加载钩子，在能力解析与去重之后、加载监听器通知之前调用
    async fn on_load(&self) -> Result<()> {
        Ok(())
    }

    /// 激活钩子，在激活监听器通知之前调用
    async fn on_activate(&self) -> Result<()> {
        Ok(())
    }

    /// 停用钩子，在停用监听器通知之后调用
    async fn on_deactivate(&self) -> Result<()> {
        Ok(())
    }

    /// 卸载钩子，在卸载监听器通知之后、脱离父节点之前调用
    async fn on_unload(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Module - 生命周期节点
// ============================================================================

/// 模块生命周期节点
///
/// 通过 [`Module::load`] 构造，以 `Arc<Module>` 形式在树中共享。
/// 父引用是弱引用，仅用于向上遍历，不构成所有权环。
///
/// 内部集合用同步锁保护，临界区不跨越挂起点；
/// 布尔状态用原子量，随时可从其他任务观察。
pub struct Module {
    /// 行为类型名（日志用）
    name: &'static str,

    /// 实例 ID（区分同一行为类型的多个实例）
    instance_id: String,

    /// 用户行为
    behavior: Box<dyn ModuleBehavior>,

    /// 内核上下文（引擎、顺序分配器、设置加载器、指标）
    context: Arc<KernelContext>,

    /// 指向自身的弱引用（生命周期动词递归时升级为强引用）
    self_weak: Weak<Module>,

    /// 父模块（非拥有）
    parent: Weak<Module>,

    /// 子模块（拥有，按加载先后排列）
    children: RwLock<Vec<Arc<Module>>>,

    /// 本模块的作用域，卸载时丢弃
    scope: RwLock<Option<Arc<Scope>>>,

    /// 去重后的系统集合
    systems: RwLock<CapabilitySet<dyn System>>,

    /// 去重后的加载监听器
    load_listeners: RwLock<CapabilitySet<dyn ModuleLoadListener>>,

    /// 去重后的卸载监听器
    unload_listeners: RwLock<CapabilitySet<dyn ModuleUnloadListener>>,

    /// 去重后的激活监听器
    activation_listeners: RwLock<CapabilitySet<dyn ModuleActivationListener>>,

    /// 去重后的停用监听器
    deactivation_listeners: RwLock<CapabilitySet<dyn ModuleDeactivationListener>>,

    /// 系统组及其执行顺序，卸载时逐一归还顺序槽位
    groups: RwLock<Vec<(GroupHandle, i32)>>,

    /// 是否已加载
    is_loaded: AtomicBool,

    /// 是否已激活（激活蕴含已加载）
    is_active: AtomicBool,

    /// 加载完成后立即激活（加载期间调用 activate 也会置位）
    activate_after_load: AtomicBool,

    /// 加载完成时间
    loaded_at: RwLock<Option<DateTime<Utc>>>,
}

impl Module {
    /// 加载一个模块
    ///
    /// 在父模块之下（`parent` 为 `None` 时作为根）构造新节点。
    /// 节点在第一个挂起点之前就挂入父节点的子列表，树形结构立即可见；
    /// 随后依次：`before_scope_create` 钩子 → 构造作用域 → 解析能力
    /// → 祖先去重 → `on_load` 钩子 → 通知加载监听器 → 划分系统组
    /// → 置位已加载 → 兑现延迟激活。
    ///
    /// # Errors
    ///
    /// 钩子失败或默认顺序池耗尽时中止加载，模块停留在未加载状态，
    /// 已产生的副作用不回滚。
    pub async fn load<B: ModuleBehavior>(
        behavior: B,
        parent: Option<&Arc<Module>>,
        context: Arc<KernelContext>,
        activate_after_load: bool,
    ) -> Result<Arc<Module>> {
        let module = Arc::new_cyclic(|self_weak| Module {
            name: std::any::type_name::<B>(),
            instance_id: generate_id(),
            behavior: Box::new(behavior),
            context,
            self_weak: self_weak.clone(),
            parent: parent.map_or_else(Weak::new, Arc::downgrade),
            children: RwLock::new(Vec::new()),
            scope: RwLock::new(None),
            systems: RwLock::new(CapabilitySet::new()),
            load_listeners: RwLock::new(CapabilitySet::new()),
            unload_listeners: RwLock::new(CapabilitySet::new()),
            activation_listeners: RwLock::new(CapabilitySet::new()),
            deactivation_listeners: RwLock::new(CapabilitySet::new()),
            groups: RwLock::new(Vec::new()),
            is_loaded: AtomicBool::new(false),
            is_active: AtomicBool::new(false),
            activate_after_load: AtomicBool::new(activate_after_load),
            loaded_at: RwLock::new(None),
        });

        debug!(
            module = module.name,
            instance_id = %module.instance_id,
            has_parent = parent.is_some(),
            "加载模块"
        );

        // 挂入父节点，必须在第一个挂起点之前完成
        if let Some(parent) = parent {
            parent
                .children
                .write()
                .expect("子模块列表锁中毒")
                .push(Arc::clone(&module));
        }

        module.behavior.before_scope_create(&module.context).await?;

        // 构造作用域（异步边界）
        let parent_scope = parent.and_then(|p| p.scope.read().expect("作用域锁中毒").clone());
        let scope = Scope::create(parent_scope, |builder| module.behavior.install(builder)).await;
        *module.scope.write().expect("作用域锁中毒") = Some(Arc::clone(&scope));

        // 解析能力集合（自身 ∪ 祖先）
        *module.systems.write().expect("系统集合锁中毒") = scope.resolve_systems();
        *module.load_listeners.write().expect("监听器锁中毒") = scope.resolve_load_listeners();
        *module.unload_listeners.write().expect("监听器锁中毒") = scope.resolve_unload_listeners();
        *module.activation_listeners.write().expect("监听器锁中毒") =
            scope.resolve_activation_listeners();
        *module.deactivation_listeners.write().expect("监听器锁中毒") =
            scope.resolve_deactivation_listeners();

        // 祖先去重：从最近的祖先到根，剔除祖先已持有的能力
        module.remove_ancestor_capabilities();

        module.behavior.on_load().await?;

        let listeners: Vec<_> = module
            .load_listeners
            .read()
            .expect("监听器锁中毒")
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener.on_module_load();
        }

        module.create_system_groups()?;

        *module.loaded_at.write().expect("时间戳锁中毒") = Some(Utc::now());
        module.is_loaded.store(true, Ordering::SeqCst);
        module.context.metrics().record_load();

        info!(
            module = module.name,
            instance_id = %module.instance_id,
            systems = module.system_count(),
            groups = module.groups.read().expect("系统组锁中毒").len(),
            "模块加载完成"
        );

        // 兑现加载期间收到的激活请求
        if module.activate_after_load.load(Ordering::SeqCst) {
            module.activate().await?;
        }

        Ok(module)
    }

    /// 激活模块
    ///
    /// 未加载完成时不会失败：记下激活请求并立即返回，
    /// 加载结束时自动兑现。已加载时依次执行 `on_activate` 钩子、
    /// 通知激活监听器、把全部系统组注册进引擎，最后置位激活。
    pub async fn activate(&self) -> Result<()> {
        if !self.is_loaded() {
            self.activate_after_load.store(true, Ordering::SeqCst);
            debug!(
                module = self.name,
                instance_id = %self.instance_id,
                "模块尚未加载，激活请求已延迟"
            );
            return Ok(());
        }

        self.behavior.on_activate().await?;

        let listeners: Vec<_> = self
            .activation_listeners
            .read()
            .expect("监听器锁中毒")
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener.on_module_activate();
        }

        let groups: Vec<(GroupHandle, i32)> = self.groups.read().expect("系统组锁中毒").clone();
        for (group, order) in groups {
            self.context.engine().add_group(order, group);
        }

        self.is_active.store(true, Ordering::SeqCst);
        self.context.metrics().record_activation();

        info!(module = self.name, instance_id = %self.instance_id, "模块已激活");
        Ok(())
    }

    /// 停用模块
    ///
    /// 未加载或未激活时是无操作。否则先并发停用全部子模块并等待
    /// 所有后代停用完成，再通知停用监听器、执行 `on_deactivate` 钩子、
    /// 清除激活位、从引擎注销全部系统组。自身的停用逻辑
    /// 绝不会观察到仍处于激活状态的后代。
    pub async fn deactivate(&self) -> Result<()> {
        self.deactivate_inner().await
    }

    /// 卸载模块（终态）
    ///
    /// 未加载时是无操作。已激活时先完整停用。随后并发卸载全部
    /// 子模块并等待子列表清空（每个子模块在自身卸载完成时从列表
    /// 中摘除自己），再通知卸载监听器、执行 `on_unload` 钩子、
    /// 脱离父节点、清除加载位、把全部顺序槽位归还给分配器、
    /// 清空能力集合并丢弃作用域。
    pub async fn unload(&self) -> Result<()> {
        self.unload_inner().await
    }

    // ========================================================================
    // 状态访问
    // ========================================================================

    /// 行为类型名
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 实例 ID
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// 是否已加载
    pub fn is_loaded(&self) -> bool {
        self.is_loaded.load(Ordering::SeqCst)
    }

    /// 是否已激活
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    /// 父模块（根模块为 `None`）
    pub fn parent(&self) -> Option<Arc<Module>> {
        self.parent.upgrade()
    }

    /// 子模块快照
    pub fn children(&self) -> Vec<Arc<Module>> {
        self.children.read().expect("子模块列表锁中毒").clone()
    }

    /// 子模块数量
    pub fn child_count(&self) -> usize {
        self.children.read().expect("子模块列表锁中毒").len()
    }

    /// 本模块的作用域（卸载后为 `None`）
    pub fn scope(&self) -> Option<Arc<Scope>> {
        self.scope.read().expect("作用域锁中毒").clone()
    }

    /// 去重后的系统数量
    pub fn system_count(&self) -> usize {
        self.systems.read().expect("系统集合锁中毒").len()
    }

    /// 系统组持有的执行顺序快照
    pub fn group_orders(&self) -> Vec<i32> {
        self.groups
            .read()
            .expect("系统组锁中毒")
            .iter()
            .map(|(_, order)| *order)
            .collect()
    }

    /// 加载完成时间
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        *self.loaded_at.read().expect("时间戳锁中毒")
    }

    /// 内核上下文
    pub fn context(&self) -> &Arc<KernelContext> {
        &self.context
    }

    // ========================================================================
    // 内部实现
    // ========================================================================

    /// 升级自身弱引用
    ///
    /// `&self` 必然借用自某个存活的 `Arc<Module>`，升级不会失败。
    fn self_arc(&self) -> Arc<Module> {
        self.self_weak.upgrade().expect("模块自引用失效")
    }

    /// 祖先去重扫描：从最近的祖先到根，逐层剔除祖先集合中的类型
    ///
    /// 祖先先于后代加载，其集合已完成各自的去重，因此逐层差集
    /// 之后，本模块的集合与所有祖先集合的并集不相交。
    fn remove_ancestor_capabilities(&self) {
        let mut next = self.parent.upgrade();
        while let Some(ancestor) = next {
            self.systems
                .write()
                .expect("系统集合锁中毒")
                .except_with(&ancestor.systems.read().expect("系统集合锁中毒"));
            self.load_listeners
                .write()
                .expect("监听器锁中毒")
                .except_with(&ancestor.load_listeners.read().expect("监听器锁中毒"));
            self.unload_listeners
                .write()
                .expect("监听器锁中毒")
                .except_with(&ancestor.unload_listeners.read().expect("监听器锁中毒"));
            self.activation_listeners
                .write()
                .expect("监听器锁中毒")
                .except_with(&ancestor.activation_listeners.read().expect("监听器锁中毒"));
            self.deactivation_listeners
                .write()
                .expect("监听器锁中毒")
                .except_with(&ancestor.deactivation_listeners.read().expect("监听器锁中毒"));

            next = ancestor.parent.upgrade();
        }
    }

    /// 划分系统组（仅在首次加载时执行一次）
    ///
    /// 保留了自定义顺序的系统独占一个组，在引擎执行序列中占据
    /// 独立位置；其余系统共享一个默认组，整组只消耗一个默认顺序
    /// 槽位。默认组只在确实有系统加入时才创建并分配顺序。
    fn create_system_groups(&self) -> Result<()> {
        let engine = self.context.engine();
        let resolver = self.context.resolver();

        let systems = self.systems.read().expect("系统集合锁中毒").clone();
        let mut groups: Vec<(GroupHandle, i32)> = Vec::with_capacity(1);
        let mut default_group: Option<GroupHandle> = None;

        for (type_id, system) in systems.iter() {
            if let Some(order) = resolver.custom_order(type_id) {
                let group = engine.create_group();
                engine.add_system(&group, Arc::clone(system));
                trace!(module = self.name, order, "系统使用自定义顺序，独占系统组");
                groups.push((group, order));
                continue;
            }

            let group = default_group.get_or_insert_with(|| engine.create_group());
            engine.add_system(group, Arc::clone(system));
        }

        if let Some(group) = default_group {
            let order = resolver.default_order()?;
            trace!(module = self.name, order, "默认系统组分配顺序");
            groups.push((group, order));
        }

        *self.groups.write().expect("系统组锁中毒") = groups;
        Ok(())
    }

    /// 停用实现，经 `BoxFuture` 擦除以支持递归
    fn deactivate_inner(&self) -> BoxFuture<'static, Result<()>> {
        let this = self.self_arc();
        Box::pin(async move {
            if !this.is_loaded() || !this.is_active() {
                return Ok(());
            }

            // 向全部子模块扇出停用，等待所有后代停用完成
            let children = this.children();
            let results = join_all(children.iter().map(|child| child.deactivate_inner())).await;
            for result in results {
                result?;
            }

            // 此刻所有后代均已停用
            let listeners: Vec<_> = this
                .deactivation_listeners
                .read()
                .expect("监听器锁中毒")
                .values()
                .cloned()
                .collect();
            for listener in listeners {
                listener.on_module_deactivate();
            }

            this.behavior.on_deactivate().await?;

            this.is_active.store(false, Ordering::SeqCst);

            let groups: Vec<(GroupHandle, i32)> = this.groups.read().expect("系统组锁中毒").clone();
            for (group, _) in &groups {
                this.context.engine().remove_group(group);
            }

            this.context.metrics().record_deactivation();
            info!(module = this.name, instance_id = %this.instance_id, "模块已停用");
            Ok(())
        })
    }

    /// 卸载实现，经 `BoxFuture` 擦除以支持递归
    fn unload_inner(&self) -> BoxFuture<'static, Result<()>> {
        let this = self.self_arc();
        Box::pin(async move {
            if !this.is_loaded() {
                return Ok(());
            }

            if this.is_active() {
                this.deactivate_inner().await?;
            }

            // 向全部子模块扇出卸载；每个子模块完成时从列表中摘除自己
            let children = this.children();
            let results = join_all(children.iter().map(|child| child.unload_inner())).await;
            for result in results {
                result?;
            }

            let listeners: Vec<_> = this
                .unload_listeners
                .read()
                .expect("监听器锁中毒")
                .values()
                .cloned()
                .collect();
            for listener in listeners {
                listener.on_module_unload();
            }

            this.behavior.on_unload().await?;

            // 脱离父节点
            if let Some(parent) = this.parent.upgrade() {
                parent
                    .children
                    .write()
                    .expect("子模块列表锁中毒")
                    .retain(|child| !Arc::ptr_eq(child, &this));
            }

            this.is_loaded.store(false, Ordering::SeqCst);

            // 归还全部顺序槽位（自定义顺序不在占用集合中，释放是无操作）
            let groups: Vec<(GroupHandle, i32)> = {
                let mut guard = this.groups.write().expect("系统组锁中毒");
                guard.drain(..).collect()
            };
            for (_, order) in &groups {
                this.context.resolver().release_order(*order);
            }

            // 清空能力集合，丢弃作用域
            this.systems.write().expect("系统集合锁中毒").clear();
            this.load_listeners.write().expect("监听器锁中毒").clear();
            this.unload_listeners.write().expect("监听器锁中毒").clear();
            this.activation_listeners
                .write()
                .expect("监听器锁中毒")
                .clear();
            this.deactivation_listeners
                .write()
                .expect("监听器锁中毒")
                .clear();
            *this.scope.write().expect("作用域锁中毒") = None;

            this.context.metrics().record_unload();
            info!(module = this.name, instance_id = %this.instance_id, "模块已卸载");
            Ok(())
        })
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("instance_id", &self.instance_id)
            .field("is_loaded", &self.is_loaded())
            .field("is_active", &self.is_active())
            .field("children", &self.child_count())
            .finish()
    }
}
