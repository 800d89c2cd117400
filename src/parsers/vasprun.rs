//! # vasprun.xml 读取
//!
//! 将标记文档读入通用节点树，并提供内容嗅探。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `pipeline.rs` 使用
//! - 使用 `tree/reader.rs`

use crate::grammar::Value;
use crate::tree::read_xml;

/// 读取为值树根（文档节点）
pub fn read_tree(content: &str) -> Value {
    Value::Node(read_xml(content))
}

/// 文件开头是否像 vasprun：XML 声明或 `<modeling>` 根，且 `<generator>` 声明 vasp
pub fn looks_like(head: &str) -> bool {
    let trimmed = head.trim_start();
    let is_markup = trimmed.starts_with("<?xml") || trimmed.starts_with("<modeling");
    is_markup
        && head.contains("<generator")
        && head.to_ascii_lowercase().contains(">vasp")
}
