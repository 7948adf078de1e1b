//! # 顺序分配集成测试
//!
//! 验证顺序分配器的完整分配/回收轨迹，包括：
//! - 前沿分配 → 回收 → 扫描复用 → 池耗尽的完整序列
//! - 释放的幂等性
//! - 自定义顺序与默认顺序池互不协调
//! - 模块卸载归还的槽位被后续加载复用

use std::any::TypeId;
use std::sync::Arc;

use jimu_core::module::{ModuleBehavior, ScopeBuilder};
use jimu_core::{
    CoreError, KernelContext, Module, OrderResolver, StaticOrderRepository, System, TickEngine,
};

// ============================================================================
// 分配器单独的行为序列
// ============================================================================

#[test]
fn test_allocate_release_recycle_exhaust_sequence() {
    let repo = StaticOrderRepository::builder().last_default_order(2).build();
    let resolver = OrderResolver::new(Arc::new(repo));

    // 连续三次分配：前沿给出 0, 1, 2
    assert_eq!(resolver.default_order().unwrap(), 0);
    assert_eq!(resolver.default_order().unwrap(), 1);
    assert_eq!(resolver.default_order().unwrap(), 2);

    // 释放 1 后，第四次分配由扫描复用被释放的槽位
    resolver.release_order(1);
    assert_eq!(resolver.default_order().unwrap(), 1);

    // 第五次分配失败：扫描区间 [0, 2) 已满，槽位 2 扫描不可达
    let err = resolver.default_order().unwrap_err();
    assert!(matches!(err, CoreError::OrderExhausted { capacity: 2 }));
}

#[test]
fn test_release_is_idempotent() {
    let repo = StaticOrderRepository::builder().last_default_order(8).build();
    let resolver = OrderResolver::new(Arc::new(repo));

    // 释放从未分配过的槽位：无操作、不报错、状态不变
    resolver.release_order(5);
    assert_eq!(resolver.occupied_count(), 0);

    let order = resolver.default_order().unwrap();
    resolver.release_order(order);
    resolver.release_order(order);
    assert_eq!(resolver.occupied_count(), 0);
}

#[test]
fn test_custom_and_default_pools_are_uncoordinated() {
    struct FixedSystem;
    impl System for FixedSystem {
        fn run(&self, _delta: f32) {}
    }

    // 自定义顺序故意落在默认区间内：仓库不校验，分配器也不感知
    let repo = StaticOrderRepository::builder()
        .last_default_order(10)
        .reserve::<FixedSystem>(3)
        .build();
    let resolver = OrderResolver::new(Arc::new(repo));

    assert_eq!(resolver.custom_order(TypeId::of::<FixedSystem>()), Some(3));

    // 默认分配照常给出 0..，与保留值 3 可能撞值，互不协调
    for expected in 0..=4 {
        assert_eq!(resolver.default_order().unwrap(), expected);
    }
    assert!(resolver.is_occupied(3));
    assert_eq!(resolver.custom_order(TypeId::of::<FixedSystem>()), Some(3));
}

// ============================================================================
// 模块与分配器的协同
// ============================================================================

struct NoopSystem;
impl System for NoopSystem {
    fn run(&self, _delta: f32) {}
}

struct OneSystemBehavior;
impl ModuleBehavior for OneSystemBehavior {
    fn install(&self, builder: &mut ScopeBuilder) {
        builder.register_system(Arc::new(NoopSystem));
    }
}

#[tokio::test]
async fn test_unloaded_module_slot_is_reused() {
    let repo = StaticOrderRepository::builder().last_default_order(1).build();
    let ctx = Arc::new(KernelContext::new(
        Arc::new(TickEngine::new()),
        Arc::new(repo),
    ));

    // 两个模块占满前沿 0 和 1
    let first = Module::load(OneSystemBehavior, None, Arc::clone(&ctx), false)
        .await
        .unwrap();
    let second = Module::load(OneSystemBehavior, None, Arc::clone(&ctx), false)
        .await
        .unwrap();
    assert_eq!(first.group_orders(), vec![0]);
    assert_eq!(second.group_orders(), vec![1]);

    // 卸载第一个模块，归还槽位 0；新模块经扫描复用它
    first.unload().await.unwrap();
    assert_eq!(ctx.resolver().occupied_count(), 1);

    let third = Module::load(OneSystemBehavior, None, Arc::clone(&ctx), false)
        .await
        .unwrap();
    assert_eq!(third.group_orders(), vec![0]);
    assert_eq!(ctx.resolver().occupied_count(), 2);
}

#[tokio::test]
async fn test_module_without_systems_allocates_nothing() {
    struct NoSystems;
    impl ModuleBehavior for NoSystems {}

    let ctx = Arc::new(KernelContext::new(
        Arc::new(TickEngine::new()),
        Arc::new(StaticOrderRepository::with_defaults()),
    ));

    let module = Module::load(NoSystems, None, Arc::clone(&ctx), true)
        .await
        .unwrap();

    // 没有系统就没有默认组，也就不消耗槽位
    assert!(module.group_orders().is_empty());
    assert_eq!(ctx.resolver().occupied_count(), 0);

    module.unload().await.unwrap();
    assert_eq!(ctx.resolver().occupied_count(), 0);
}
