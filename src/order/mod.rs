//! 执行顺序管理模块
//!
//! 包含顺序仓库（只读配置）和顺序分配器（有状态分配/回收）。

pub mod repository;
pub mod resolver;

// 重导出常用类型
pub use repository::{
    OrderRepository, StaticOrderRepository, StaticOrderRepositoryBuilder,
    DEFAULT_LAST_DEFAULT_ORDER,
};
pub use resolver::OrderResolver;
