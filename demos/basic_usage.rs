//! 基本使用示例
//!
//! 本示例展示了积木内核的基本使用方法，包括：
//!
//! - 装配并启动内核
//! - 定义模块行为、注册系统与监听器
//! - 加载模块树并逐帧驱动
//! - 停用与级联卸载
//!
//! # 运行示例
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use jimu_core::module::{ModuleBehavior, ModuleLoadListener, ScopeBuilder};
use jimu_core::{CoreConfig, JimuCore, Logger, LoggerConfig, System};

/// 每帧移动单位的系统
struct MovementSystem;

impl System for MovementSystem {
    fn run(&self, delta: f32) {
        println!("   [MovementSystem] 推进 {:.3}s", delta);
    }
}

/// 每帧结算战斗的系统
struct CombatSystem;

impl System for CombatSystem {
    fn run(&self, delta: f32) {
        println!("   [CombatSystem] 结算 {:.3}s", delta);
    }
}

/// 打印加载通知的监听器
struct LoadAnnouncer;

impl ModuleLoadListener for LoadAnnouncer {
    fn on_module_load(&self) {
        println!("   [LoadAnnouncer] 收到模块加载通知");
    }
}

/// 游戏玩法模块：两个系统 + 一个加载监听器
struct GameplayBehavior;

impl ModuleBehavior for GameplayBehavior {
    fn install(&self, builder: &mut ScopeBuilder) {
        builder.register_system(Arc::new(MovementSystem));
        builder.register_system(Arc::new(CombatSystem));
        builder.register_load_listener(Arc::new(LoadAnnouncer));
    }
}

/// 子模块：继承父作用域，但只保留自己新增的系统
struct UiBehavior;

struct UiSystem;
impl System for UiSystem {
    fn run(&self, delta: f32) {
        println!("   [UiSystem] 刷新 {:.3}s", delta);
    }
}

impl ModuleBehavior for UiBehavior {
    fn install(&self, builder: &mut ScopeBuilder) {
        builder.register_system(Arc::new(UiSystem));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== 积木内核基本使用示例 ===\n");

    // -------------------------------------------------------------------------
    // 1. 装配并启动内核
    // -------------------------------------------------------------------------
    println!("1. 装配并启动内核...");

    let config = CoreConfig::builder()
        .log_level("warn")
        .last_default_order(9_999)
        .build();
    let _guard = Logger::init(LoggerConfig::from_log_config(&config.logging))?;
    println!("   - 默认顺序区间上界: {}", config.orders.last_default_order);

    let mut core = JimuCore::new(config).await?;
    core.start().await?;
    println!("   ✅ 内核已启动\n");

    // -------------------------------------------------------------------------
    // 2. 加载并激活模块树
    // -------------------------------------------------------------------------
    println!("2. 加载模块树...");

    let gameplay = core.load_module(GameplayBehavior, true).await?;
    let ui = jimu_core::Module::load(UiBehavior, Some(&gameplay), core.context(), true).await?;

    println!("   - 根模块系统数: {}", gameplay.system_count());
    println!("   - 子模块系统数: {}", ui.system_count());
    println!("   ✅ 模块树已激活\n");

    // -------------------------------------------------------------------------
    // 3. 逐帧驱动
    // -------------------------------------------------------------------------
    println!("3. 驱动两帧...");
    core.tick(0.016);
    core.tick(0.016);
    println!();

    // -------------------------------------------------------------------------
    // 4. 停用与关闭
    // -------------------------------------------------------------------------
    println!("4. 停用根模块（级联到子模块）...");
    gameplay.deactivate().await?;
    core.tick(0.016);
    println!("   - 停用后这一帧没有系统执行");

    println!("\n5. 关闭内核（级联卸载）...");
    core.shutdown().await?;

    let report = core.metrics_report();
    println!(
        "   - 累计加载 {} 个模块，卸载 {} 个，剩余占用槽位 {}",
        report.modules_loaded, report.modules_unloaded, report.occupied_orders
    );
    println!("   ✅ 完成");

    Ok(())
}
