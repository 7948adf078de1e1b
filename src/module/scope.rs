//! 能力作用域
//!
//! 作用域是模块的能力解析上下文。每个模块在加载时构造自己的作用域，
//! 嵌套在父模块的作用域之下；解析某类能力时，得到自身注册与所有
//! 祖先注册的并集（随后由生命周期的去重扫描剔除祖先已持有的部分）。
//!
//! 能力的注册是显式的：模块行为在 `install` 钩子中向 [`ScopeBuilder`]
//! 登记系统、四类监听器和类型化单例值，不存在运行时类型扫描。
//!
//! 集合语义按类型标识（`TypeId`）去重，与注册顺序无关。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::System;

// ============================================================================
// 监听器能力接口
// ============================================================================

/// 模块加载监听器
///
/// 在所属模块的 `on_load` 钩子之后、系统组划分之前收到通知。
pub trait ModuleLoadListener: Any + Send + Sync {
    /// 模块加载通知
    fn on_module_load(&self);
}

/// 模块卸载监听器
///
/// 在所属模块的全部子模块卸载完成后、`on_unload` 钩子之前收到通知。
pub trait ModuleUnloadListener: Any + Send + Sync {
    /// 模块卸载通知
    fn on_module_unload(&self);
}

/// 模块激活监听器
///
/// 在所属模块的 `on_activate` 钩子之后、系统组注册进引擎之前收到通知。
pub trait ModuleActivationListener: Any + Send + Sync {
    /// 模块激活通知
    fn on_module_activate(&self);
}

/// 模块停用监听器
///
/// 在所属模块的全部后代停用完成后、`on_deactivate` 钩子之前收到通知。
pub trait ModuleDeactivationListener: Any + Send + Sync {
    /// 模块停用通知
    fn on_module_deactivate(&self);
}

// ============================================================================
// CapabilitySet - 按类型标识去重的能力集合
// ============================================================================

/// 能力集合
///
/// 以条目的具体类型标识为键，同一类型最多保留一个条目（先到先得）。
/// `except_with` 实现祖先去重扫描的差集语义。
pub struct CapabilitySet<T: ?Sized> {
    items: HashMap<TypeId, Arc<T>>,
}

impl<T: ?Sized> CapabilitySet<T> {
    /// 创建空集合
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// 插入条目；该类型已存在时不覆盖
    ///
    /// 返回是否实际插入。
    pub fn insert(&mut self, type_id: TypeId, item: Arc<T>) -> bool {
        if self.items.contains_key(&type_id) {
            return false;
        }
        self.items.insert(type_id, item);
        true
    }

    /// 移除 `other` 中出现过的所有类型（差集）
    pub fn except_with(&mut self, other: &CapabilitySet<T>) {
        for type_id in other.items.keys() {
            self.items.remove(type_id);
        }
    }

    /// 并入 `other` 的条目；已存在的类型保持不变
    pub fn union_with(&mut self, other: &CapabilitySet<T>) {
        for (type_id, item) in &other.items {
            self.insert(*type_id, Arc::clone(item));
        }
    }

    /// 是否包含某个类型
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.items.contains_key(&type_id)
    }

    /// 遍历 (类型标识, 条目)，顺序未定义
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Arc<T>)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    /// 遍历条目，顺序未定义
    pub fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.values()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 清空集合
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: ?Sized> Default for CapabilitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for CapabilitySet<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for CapabilitySet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("len", &self.items.len())
            .finish()
    }
}

// ============================================================================
// ScopeBuilder - 显式能力注册
// ============================================================================

/// 作用域构建器
///
/// 模块行为的 `install` 钩子通过它登记本模块提供的能力。
/// 同一个实例可以同时注册为系统和任意监听器（分别登记即可）。
#[derive(Default)]
pub struct ScopeBuilder {
    systems: CapabilitySet<dyn System>,
    load_listeners: CapabilitySet<dyn ModuleLoadListener>,
    unload_listeners: CapabilitySet<dyn ModuleUnloadListener>,
    activation_listeners: CapabilitySet<dyn ModuleActivationListener>,
    deactivation_listeners: CapabilitySet<dyn ModuleDeactivationListener>,
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ScopeBuilder {
    /// 创建空构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个系统
    pub fn register_system<S: System>(&mut self, system: Arc<S>) -> &mut Self {
        self.systems.insert(TypeId::of::<S>(), system);
        self
    }

    /// 注册加载监听器
    pub fn register_load_listener<L: ModuleLoadListener>(&mut self, listener: Arc<L>) -> &mut Self {
        self.load_listeners.insert(TypeId::of::<L>(), listener);
        self
    }

    /// 注册卸载监听器
    pub fn register_unload_listener<L: ModuleUnloadListener>(
        &mut self,
        listener: Arc<L>,
    ) -> &mut Self {
        self.unload_listeners.insert(TypeId::of::<L>(), listener);
        self
    }

    /// 注册激活监听器
    pub fn register_activation_listener<L: ModuleActivationListener>(
        &mut self,
        listener: Arc<L>,
    ) -> &mut Self {
        self.activation_listeners.insert(TypeId::of::<L>(), listener);
        self
    }

    /// 注册停用监听器
    pub fn register_deactivation_listener<L: ModuleDeactivationListener>(
        &mut self,
        listener: Arc<L>,
    ) -> &mut Self {
        self.deactivation_listeners
            .insert(TypeId::of::<L>(), listener);
        self
    }

    /// 注册类型化单例值
    ///
    /// 值可被本模块及后代模块的作用域解析到（如设置对象）。
    pub fn register_value<V: Send + Sync + 'static>(&mut self, value: Arc<V>) -> &mut Self {
        self.values.insert(TypeId::of::<V>(), value);
        self
    }
}

// ============================================================================
// Scope - 能力解析上下文
// ============================================================================

/// 能力作用域
///
/// 持有本模块的注册条目和指向父作用域的链。解析时返回
/// 自身与祖先注册的并集（同类型以最近的作用域为准）。
pub struct Scope {
    parent: Option<Arc<Scope>>,
    systems: CapabilitySet<dyn System>,
    load_listeners: CapabilitySet<dyn ModuleLoadListener>,
    unload_listeners: CapabilitySet<dyn ModuleUnloadListener>,
    activation_listeners: CapabilitySet<dyn ModuleActivationListener>,
    deactivation_listeners: CapabilitySet<dyn ModuleDeactivationListener>,
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Scope {
    /// 构造作用域
    ///
    /// `install` 回调向构建器登记本模块的能力；`parent` 为父模块的
    /// 作用域（根模块为 `None`）。构造是异步边界：调用方在此挂起，
    /// 直到能力注册完成。
    pub async fn create<F>(parent: Option<Arc<Scope>>, install: F) -> Arc<Scope>
    where
        F: FnOnce(&mut ScopeBuilder),
    {
        let mut builder = ScopeBuilder::new();
        install(&mut builder);

        Arc::new(Scope {
            parent,
            systems: builder.systems,
            load_listeners: builder.load_listeners,
            unload_listeners: builder.unload_listeners,
            activation_listeners: builder.activation_listeners,
            deactivation_listeners: builder.deactivation_listeners,
            values: builder.values,
        })
    }

    /// 解析系统集合（自身 ∪ 祖先）
    pub fn resolve_systems(&self) -> CapabilitySet<dyn System> {
        self.resolve_chain(|scope| &scope.systems)
    }

    /// 解析加载监听器集合（自身 ∪ 祖先）
    pub fn resolve_load_listeners(&self) -> CapabilitySet<dyn ModuleLoadListener> {
        self.resolve_chain(|scope| &scope.load_listeners)
    }

    /// 解析卸载监听器集合（自身 ∪ 祖先）
    pub fn resolve_unload_listeners(&self) -> CapabilitySet<dyn ModuleUnloadListener> {
        self.resolve_chain(|scope| &scope.unload_listeners)
    }

    /// 解析激活监听器集合（自身 ∪ 祖先）
    pub fn resolve_activation_listeners(&self) -> CapabilitySet<dyn ModuleActivationListener> {
        self.resolve_chain(|scope| &scope.activation_listeners)
    }

    /// 解析停用监听器集合（自身 ∪ 祖先）
    pub fn resolve_deactivation_listeners(&self) -> CapabilitySet<dyn ModuleDeactivationListener> {
        self.resolve_chain(|scope| &scope.deactivation_listeners)
    }

    /// 解析类型化单例值，沿作用域链向上查找
    pub fn value<V: Send + Sync + 'static>(&self) -> Option<Arc<V>> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.values.get(&TypeId::of::<V>()) {
                return Arc::clone(value).downcast::<V>().ok();
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// 沿作用域链合并某类能力集合，最近的作用域优先
    fn resolve_chain<T: ?Sized>(
        &self,
        select: impl Fn(&Scope) -> &CapabilitySet<T>,
    ) -> CapabilitySet<T> {
        let mut merged = CapabilitySet::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            merged.union_with(select(scope));
            current = scope.parent.as_deref();
        }
        merged
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("systems", &self.systems.len())
            .field("values", &self.values.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SysA;
    impl System for SysA {
        fn run(&self, _delta: f32) {}
    }

    struct SysB;
    impl System for SysB {
        fn run(&self, _delta: f32) {}
    }

    struct Listener;
    impl ModuleLoadListener for Listener {
        fn on_module_load(&self) {}
    }

    #[tokio::test]
    async fn test_scope_resolves_own_registrations() {
        let scope = Scope::create(None, |builder| {
            builder.register_system(Arc::new(SysA));
            builder.register_load_listener(Arc::new(Listener));
        })
        .await;

        assert_eq!(scope.resolve_systems().len(), 1);
        assert_eq!(scope.resolve_load_listeners().len(), 1);
        assert!(scope.resolve_unload_listeners().is_empty());
    }

    #[tokio::test]
    async fn test_child_scope_inherits_parent_registrations() {
        let parent = Scope::create(None, |builder| {
            builder.register_system(Arc::new(SysA));
        })
        .await;

        let child = Scope::create(Some(Arc::clone(&parent)), |builder| {
            builder.register_system(Arc::new(SysB));
        })
        .await;

        // 子作用域解析到自身 + 父的系统
        let systems = child.resolve_systems();
        assert_eq!(systems.len(), 2);
        assert!(systems.contains_type(TypeId::of::<SysA>()));
        assert!(systems.contains_type(TypeId::of::<SysB>()));
    }

    #[tokio::test]
    async fn test_value_lookup_walks_chain() {
        let parent = Scope::create(None, |builder| {
            builder.register_value(Arc::new(42i64));
        })
        .await;

        let child = Scope::create(Some(Arc::clone(&parent)), |_| {}).await;

        assert_eq!(child.value::<i64>().as_deref(), Some(&42));
        assert!(child.value::<String>().is_none());
    }

    #[tokio::test]
    async fn test_nearest_value_wins() {
        let parent = Scope::create(None, |builder| {
            builder.register_value(Arc::new("parent".to_string()));
        })
        .await;

        let child = Scope::create(Some(Arc::clone(&parent)), |builder| {
            builder.register_value(Arc::new("child".to_string()));
        })
        .await;

        assert_eq!(child.value::<String>().as_deref().map(|s| s.as_str()), Some("child"));
        assert_eq!(parent.value::<String>().as_deref().map(|s| s.as_str()), Some("parent"));
    }

    #[test]
    fn test_capability_set_insert_if_absent() {
        let mut set: CapabilitySet<dyn System> = CapabilitySet::new();

        assert!(set.insert(TypeId::of::<SysA>(), Arc::new(SysA)));
        assert!(!set.insert(TypeId::of::<SysA>(), Arc::new(SysA)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_capability_set_except_with() {
        let mut left: CapabilitySet<dyn System> = CapabilitySet::new();
        left.insert(TypeId::of::<SysA>(), Arc::new(SysA));
        left.insert(TypeId::of::<SysB>(), Arc::new(SysB));

        let mut right: CapabilitySet<dyn System> = CapabilitySet::new();
        right.insert(TypeId::of::<SysA>(), Arc::new(SysA));

        left.except_with(&right);

        assert_eq!(left.len(), 1);
        assert!(!left.contains_type(TypeId::of::<SysA>()));
        assert!(left.contains_type(TypeId::of::<SysB>()));
    }
}
