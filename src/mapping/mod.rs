//! # 映射 / 投影层
//!
//! 按布局变体选择绑定表，把中间值树（文法产出或 XML 节点树）
//! 投影为 `Simulation` 对象图。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs` 使用
//! - 使用 `grammar/`, `tree/`, `models/`
//! - 子模块: field, binding, transform, scope, project, tables

pub mod binding;
pub mod field;
pub mod project;
pub mod scope;
pub mod tables;
pub mod transform;

pub use binding::{Access, Binding, BindingTable, Input, Registry};
pub use field::Field;
pub use project::project;
pub use scope::{Context, Resolved, Scope};
pub use transform::Transform;
