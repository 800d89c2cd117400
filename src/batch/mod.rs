//! # 批量处理模块
//!
//! 收集匹配的输出文件并并行解析。
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 使用
//! - 使用 `rayon` 进行并行处理，`indicatif` 显示进度
//! - 子模块: collector, runner

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
