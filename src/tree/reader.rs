//! # XML 树读取器
//!
//! 基于 `xml-rs` 事件流构建通用节点树。
//! 截断或格式错误的文档保留已读取部分并记录警告。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 使用
//! - 使用 `xml-rs` 的 `EventReader`

use super::node::{Node, DOCUMENT_TAG};

use xml::reader::{EventReader, XmlEvent};

/// 读取标记文档，返回合成文档根（子节点为文档根元素）
pub fn read_xml(content: &str) -> Node {
    let parser = EventReader::new(content.as_bytes());
    let mut stack: Vec<Node> = vec![Node::new(DOCUMENT_TAG)];

    for event in parser {
        match event {
            Ok(XmlEvent::StartElement {
                name, attributes, ..
            }) => {
                let mut node = Node::new(name.local_name);
                node.attributes = attributes
                    .into_iter()
                    .map(|a| (a.name.local_name, a.value))
                    .collect();
                stack.push(node);
            }
            Ok(XmlEvent::EndElement { .. }) => {
                if stack.len() > 1 {
                    close_top(&mut stack);
                }
            }
            Ok(XmlEvent::Characters(text)) | Ok(XmlEvent::CData(text)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(XmlEvent::EndDocument) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    open_elements = stack.len() - 1,
                    "malformed or truncated markup, keeping partial tree"
                );
                break;
            }
        }
    }

    // 关闭截断文档中仍未闭合的元素
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().unwrap_or_else(|| Node::new(DOCUMENT_TAG))
}

fn close_top(stack: &mut Vec<Node>) {
    if let Some(node) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }
}
