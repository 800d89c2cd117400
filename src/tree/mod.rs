//! # 半结构化树读取器
//!
//! 通用 XML 节点树与路径查询。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs`, `mapping/` 使用
//! - 子模块: node, path, reader

pub mod node;
pub mod path;
pub mod reader;

pub use node::{Node, DOCUMENT_TAG};
pub use path::{hits_to_value, Found, Path};
pub use reader::read_xml;
