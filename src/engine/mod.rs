//! 执行引擎模块
//!
//! 引擎按顺序升序运行已注册的系统组。模块只负责注册/注销系统组，
//! 从不直接驱动执行；驱动权在宿主的每帧循环（调用 [`TickEngine::tick`]）。
//!
//! # 主要组件
//!
//! - [`System`] - 系统能力接口，每帧被引擎调用一次
//! - [`GroupHandle`] - 系统组句柄，一组共享同一执行顺序的系统
//! - [`ExecutionEngine`] - 引擎接口，模块通过它注册/注销系统组
//! - [`TickEngine`] - 进程内引擎实现

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

// ============================================================================
// System - 系统能力接口
// ============================================================================

/// 系统能力接口
///
/// 系统是注册进执行引擎的独立调度单元。`Any` 超 trait 提供具体类型
/// 标识：能力去重与自定义顺序查询都按类型标识进行。
///
/// 每帧的具体计算内容由实现方决定，引擎只保证调用顺序。
pub trait System: Any + Send + Sync {
    /// 执行一帧
    ///
    /// # Arguments
    ///
    /// * `delta` - 距上一帧的时间（秒）
    fn run(&self, delta: f32);
}

// ============================================================================
// GroupHandle - 系统组句柄
// ============================================================================

/// 系统组内部数据
struct GroupInner {
    /// 组 ID（引擎内唯一，兼作相同顺序时的注册次序）
    id: u64,

    /// 组内系统，按加入顺序保存
    systems: Mutex<Vec<Arc<dyn System>>>,
}

/// 系统组句柄
///
/// 一组共享同一执行顺序的系统。句柄可廉价克隆，组内容由句柄共同持有：
/// 模块在卸载时丢弃自己的句柄副本，最后一个副本释放时组随之销毁，
/// 引擎侧无需额外的销毁接口。
#[derive(Clone)]
pub struct GroupHandle {
    inner: Arc<GroupInner>,
}

impl GroupHandle {
    fn new(id: u64) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                id,
                systems: Mutex::new(Vec::with_capacity(1)),
            }),
        }
    }

    /// 组 ID
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// 组内系统数量
    pub fn len(&self) -> usize {
        self.inner.systems.lock().expect("系统组锁中毒").len()
    }

    /// 组是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, system: Arc<dyn System>) {
        self.inner.systems.lock().expect("系统组锁中毒").push(system);
    }

    /// 按加入顺序执行组内所有系统
    fn run_all(&self, delta: f32) {
        let systems: Vec<Arc<dyn System>> = {
            let guard = self.inner.systems.lock().expect("系统组锁中毒");
            guard.clone()
        };
        for system in systems {
            system.run(delta);
        }
    }
}

impl std::fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHandle")
            .field("id", &self.inner.id)
            .field("systems", &self.len())
            .finish()
    }
}

// ============================================================================
// ExecutionEngine - 引擎接口
// ============================================================================

/// 执行引擎接口
///
/// 模块生命周期只使用这四个操作：建组、向组内加系统、
/// 按顺序注册组、注销组。引擎保证注册的组按顺序升序执行。
pub trait ExecutionEngine: Send + Sync {
    /// 创建一个空系统组
    fn create_group(&self) -> GroupHandle;

    /// 向组内追加一个系统
    fn add_system(&self, group: &GroupHandle, system: Arc<dyn System>);

    /// 按执行顺序注册系统组
    ///
    /// 顺序相同的组按注册次序执行；自定义顺序与默认顺序可能撞值，
    /// 引擎不做校验。
    fn add_group(&self, order: i32, group: GroupHandle);

    /// 从执行序列中注销系统组
    ///
    /// 组内容不受影响，同一句柄可再次注册（模块停用后重新激活）。
    fn remove_group(&self, group: &GroupHandle);
}

// ============================================================================
// TickEngine - 进程内引擎实现
// ============================================================================

/// 进程内执行引擎
///
/// 执行序列用 `(顺序, 组 ID)` 作键保存，遍历即升序。
/// `tick` 在快照上运行，执行期间不持有调度锁。
pub struct TickEngine {
    /// 组 ID 发号器
    next_group_id: AtomicU64,

    /// 执行序列：(顺序, 组 ID) -> 组句柄
    schedule: Mutex<BTreeMap<(i32, u64), GroupHandle>>,
}

impl TickEngine {
    /// 创建新的引擎实例
    pub fn new() -> Self {
        Self {
            next_group_id: AtomicU64::new(0),
            schedule: Mutex::new(BTreeMap::new()),
        }
    }

    /// 执行一帧：按顺序升序运行所有已注册的系统组
    pub fn tick(&self, delta: f32) {
        let groups: Vec<GroupHandle> = {
            let schedule = self.schedule.lock().expect("引擎调度锁中毒");
            schedule.values().cloned().collect()
        };

        for group in groups {
            group.run_all(delta);
        }
    }

    /// 当前已注册的系统组数量
    pub fn registered_count(&self) -> usize {
        self.schedule.lock().expect("引擎调度锁中毒").len()
    }
}

impl Default for TickEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine for TickEngine {
    fn create_group(&self) -> GroupHandle {
        let id = self.next_group_id.fetch_add(1, Ordering::Relaxed);
        trace!(group_id = id, "创建系统组");
        GroupHandle::new(id)
    }

    fn add_system(&self, group: &GroupHandle, system: Arc<dyn System>) {
        group.push(system);
    }

    fn add_group(&self, order: i32, group: GroupHandle) {
        trace!(group_id = group.id(), order, "注册系统组");
        let mut schedule = self.schedule.lock().expect("引擎调度锁中毒");
        schedule.insert((order, group.id()), group);
    }

    fn remove_group(&self, group: &GroupHandle) {
        trace!(group_id = group.id(), "注销系统组");
        let mut schedule = self.schedule.lock().expect("引擎调度锁中毒");
        schedule.retain(|(_, id), _| *id != group.id());
    }
}

impl std::fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickEngine")
            .field("registered_groups", &self.registered_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 把自己的标签写进共享执行记录的测试系统
    struct RecordingSystem {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl System for RecordingSystem {
        fn run(&self, _delta: f32) {
            self.log.lock().unwrap().push(self.label);
        }
    }

    fn recording(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn System> {
        Arc::new(RecordingSystem {
            label,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_create_group_ids_are_unique() {
        let engine = TickEngine::new();
        let a = engine.create_group();
        let b = engine.create_group();
        assert_ne!(a.id(), b.id());
        assert!(a.is_empty());
    }

    #[test]
    fn test_tick_runs_groups_in_ascending_order() {
        let engine = TickEngine::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        // 注册顺序与执行顺序无关
        let late = engine.create_group();
        engine.add_system(&late, recording("late", &log));
        engine.add_group(500, late);

        let early = engine.create_group();
        engine.add_system(&early, recording("early", &log));
        engine.add_group(1, early);

        let middle = engine.create_group();
        engine.add_system(&middle, recording("middle", &log));
        engine.add_group(250, middle);

        engine.tick(0.016);

        assert_eq!(*log.lock().unwrap(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_systems_within_group_run_in_insertion_order() {
        let engine = TickEngine::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let group = engine.create_group();
        engine.add_system(&group, recording("first", &log));
        engine.add_system(&group, recording("second", &log));
        engine.add_group(0, group);

        engine.tick(0.016);

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_removed_group_does_not_run() {
        let engine = TickEngine::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let group = engine.create_group();
        engine.add_system(&group, recording("gone", &log));
        engine.add_group(0, group.clone());

        engine.remove_group(&group);
        engine.tick(0.016);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(engine.registered_count(), 0);
    }

    #[test]
    fn test_group_can_be_reregistered() {
        let engine = TickEngine::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let group = engine.create_group();
        engine.add_system(&group, recording("again", &log));
        engine.add_group(0, group.clone());
        engine.remove_group(&group);

        // 停用后重新激活：同一句柄、同一内容
        engine.add_group(0, group.clone());
        engine.tick(0.016);

        assert_eq!(*log.lock().unwrap(), vec!["again"]);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_equal_orders_run_in_registration_order() {
        let engine = TickEngine::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = engine.create_group();
        engine.add_system(&a, recording("a", &log));
        let b = engine.create_group();
        engine.add_system(&b, recording("b", &log));

        engine.add_group(7, a);
        engine.add_group(7, b);
        engine.tick(0.016);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }
}
