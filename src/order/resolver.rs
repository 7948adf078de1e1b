//! 顺序分配器
//!
//! 管理默认顺序区间内槽位的分配与回收，并代理自定义顺序查询。
//!
//! 分配策略：
//!
//! - 快路径：前沿计数器 `next_free` 未越过区间上界时直接取用并自增
//! - 慢路径：前沿耗尽后线性扫描 `[0, last_default_order)`，
//!   取第一个未被占用的槽位（通常是已被释放回收的低位槽）
//! - 两者都失败时返回 [`CoreError::OrderExhausted`]，属于致命配置错误
//!
//! 注意慢路径的扫描上界是开区间：`last_default_order` 本身只能由
//! 快路径取得，释放后无法通过扫描回收。此边界行为与自定义/默认
//! 顺序共用一个整数空间但互不校验一样，是刻意保留的既有语义，
//! 调用方不应依赖其改变。

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use super::repository::OrderRepository;
use crate::utils::{CoreError, Result};

/// 分配器内部状态
#[derive(Debug)]
struct ResolverState {
    /// 已占用的默认顺序槽位
    ///
    /// 只包含 `default_order` 返回且尚未释放的值，自定义顺序不在其中。
    occupied: HashSet<i32>,

    /// 下一个未曾使用过的槽位（单调不减）
    next_free: i32,
}

/// 顺序分配器
///
/// 进程级共享状态，所有模块的加载（分配）和卸载（释放）都经过它。
/// 内部用互斥锁保护，临界区不跨越挂起点。
pub struct OrderResolver {
    repository: Arc<dyn OrderRepository>,
    state: Mutex<ResolverState>,
}

impl OrderResolver {
    /// 创建新的顺序分配器
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            repository,
            state: Mutex::new(ResolverState {
                occupied: HashSet::with_capacity(100),
                next_free: 0,
            }),
        }
    }

    /// 分配一个默认顺序槽位
    ///
    /// # Errors
    ///
    /// 前沿与扫描都未找到空闲槽位时返回 [`CoreError::OrderExhausted`]。
    pub fn default_order(&self) -> Result<i32> {
        let last = self.repository.last_default_order();
        let mut state = self.state.lock().expect("顺序分配器锁中毒");

        // 快路径：前沿未越界
        if state.next_free <= last {
            let result = state.next_free;
            state.next_free += 1;
            state.occupied.insert(result);

            trace!(order = result, "分配默认顺序（前沿）");
            return Ok(result);
        }

        // 慢路径：扫描回收槽位，上界为开区间
        for i in 0..last {
            if state.occupied.contains(&i) {
                continue;
            }

            state.occupied.insert(i);
            debug!(order = i, "分配默认顺序（回收槽位）");
            return Ok(i);
        }

        Err(CoreError::OrderExhausted { capacity: last })
    }

    /// 释放一个默认顺序槽位
    ///
    /// 释放未被占用的槽位是无操作。前沿计数器不会回退，
    /// 释放的低位槽只能被慢路径扫描重新取得。
    pub fn release_order(&self, order: i32) {
        let mut state = self.state.lock().expect("顺序分配器锁中毒");
        if state.occupied.remove(&order) {
            trace!(order, "释放默认顺序");
        }
    }

    /// 查询系统类型保留的自定义顺序
    ///
    /// 纯代理仓库查询。返回值不进入占用集合，也不与占用集合比对：
    /// 自定义顺序与默认顺序在引擎中共用一个整数顺序空间，
    /// 但在两个互不协调的池中各自管理。
    pub fn custom_order(&self, type_id: TypeId) -> Option<i32> {
        self.repository.custom_order(type_id)
    }

    /// 当前被占用的默认顺序槽位数
    pub fn occupied_count(&self) -> usize {
        self.state.lock().expect("顺序分配器锁中毒").occupied.len()
    }

    /// 某个槽位当前是否被占用
    pub fn is_occupied(&self, order: i32) -> bool {
        self.state
            .lock()
            .expect("顺序分配器锁中毒")
            .occupied
            .contains(&order)
    }
}

impl std::fmt::Debug for OrderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("顺序分配器锁中毒");
        f.debug_struct("OrderResolver")
            .field("occupied", &state.occupied.len())
            .field("next_free", &state.next_free)
            .field("last_default_order", &self.repository.last_default_order())
            .finish()
    }
}
