//! 生命周期指标收集
//!
//! 本模块收集模块生命周期事件计数和顺序池占用情况，
//! 支持 JSON 格式导出监控数据。
//!
//! # 示例
//!
//! ```rust
//! use jimu_core::utils::metrics::LifecycleMetrics;
//!
//! let metrics = LifecycleMetrics::new();
//! metrics.record_load();
//! metrics.record_activation();
//!
//! let report = metrics.export(3);
//! assert_eq!(report.modules_loaded, 1);
//! let json = serde_json::to_string_pretty(&report).unwrap();
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// LifecycleMetrics - 生命周期指标收集器
// ============================================================================

/// 生命周期指标收集器
///
/// 所有计数器使用 `AtomicU64`，可跨任务共享。
#[derive(Debug)]
pub struct LifecycleMetrics {
    // ==================== 生命周期计数 ====================
    /// 加载完成的模块总数
    load_count: AtomicU64,

    /// 卸载完成的模块总数
    unload_count: AtomicU64,

    /// 激活次数
    activation_count: AtomicU64,

    /// 停用次数
    deactivation_count: AtomicU64,

    // ==================== 时间戳 ====================
    /// 收集开始时间
    start_time: DateTime<Utc>,
}

impl LifecycleMetrics {
    /// 创建新的指标收集器
    pub fn new() -> Self {
        Self {
            load_count: AtomicU64::new(0),
            unload_count: AtomicU64::new(0),
            activation_count: AtomicU64::new(0),
            deactivation_count: AtomicU64::new(0),
            start_time: Utc::now(),
        }
    }

    /// 记录一次模块加载完成
    pub fn record_load(&self) {
        self.load_count.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次模块卸载完成
    pub fn record_unload(&self) {
        self.unload_count.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次模块激活
    pub fn record_activation(&self) {
        self.activation_count.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次模块停用
    pub fn record_deactivation(&self) {
        self.deactivation_count.fetch_add(1, Ordering::Relaxed);
    }

    /// 当前存活（已加载未卸载）的模块数
    pub fn live_modules(&self) -> u64 {
        let loaded = self.load_count.load(Ordering::Relaxed);
        let unloaded = self.unload_count.load(Ordering::Relaxed);
        loaded.saturating_sub(unloaded)
    }

    /// 导出指标报告
    ///
    /// # Arguments
    ///
    /// * `occupied_orders` - 当前被占用的默认顺序槽位数（来自顺序分配器）
    pub fn export(&self, occupied_orders: usize) -> LifecycleReport {
        LifecycleReport {
            modules_loaded: self.load_count.load(Ordering::Relaxed),
            modules_unloaded: self.unload_count.load(Ordering::Relaxed),
            activations: self.activation_count.load(Ordering::Relaxed),
            deactivations: self.deactivation_count.load(Ordering::Relaxed),
            live_modules: self.live_modules(),
            occupied_orders: occupied_orders as u64,
            start_time: self.start_time,
            generated_at: Utc::now(),
        }
    }
}

impl Default for LifecycleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LifecycleReport - 导出报告
// ============================================================================

/// 生命周期指标报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    /// 加载完成的模块总数
    pub modules_loaded: u64,

    /// 卸载完成的模块总数
    pub modules_unloaded: u64,

    /// 激活次数
    pub activations: u64,

    /// 停用次数
    pub deactivations: u64,

    /// 当前存活模块数
    pub live_modules: u64,

    /// 当前被占用的默认顺序槽位数
    pub occupied_orders: u64,

    /// 收集开始时间
    pub start_time: DateTime<Utc>,

    /// 报告生成时间
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = LifecycleMetrics::new();

        metrics.record_load();
        metrics.record_load();
        metrics.record_activation();
        metrics.record_deactivation();
        metrics.record_unload();

        let report = metrics.export(1);
        assert_eq!(report.modules_loaded, 2);
        assert_eq!(report.modules_unloaded, 1);
        assert_eq!(report.activations, 1);
        assert_eq!(report.deactivations, 1);
        assert_eq!(report.live_modules, 1);
        assert_eq!(report.occupied_orders, 1);
    }

    #[test]
    fn test_live_modules_saturating() {
        let metrics = LifecycleMetrics::new();
        metrics.record_unload();
        // 不应下溢
        assert_eq!(metrics.live_modules(), 0);
    }

    #[test]
    fn test_report_serialization() {
        let metrics = LifecycleMetrics::new();
        metrics.record_load();

        let report = metrics.export(0);
        let json = serde_json::to_string(&report).unwrap();
        let parsed: LifecycleReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.modules_loaded, 1);
    }
}
