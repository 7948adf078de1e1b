//! 公共 API 接口
//!
//! 包含内核对外的 SDK 入口。

pub mod sdk;

// 重导出常用类型
pub use sdk::{CoreState, JimuCore};
