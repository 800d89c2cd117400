//! # 半结构化节点
//!
//! 标记文档的元素节点：标签、有序属性、有序子节点、文本。
//!
//! ## 依赖关系
//! - 被 `tree/reader.rs`, `tree/path.rs`, `grammar/value.rs` 使用
//! - 使用 `grammar/value.rs` 进行叶子值推断

use crate::grammar::{coerce_number, parse_bool_token, Mapping, Scalar, Value};

use serde::Serialize;

/// 文档根的合成标签
pub const DOCUMENT_TAG: &str = "#document";

/// 元素节点
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 标签匹配的直接子节点
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// 先序遍历的全部后代（不含自身）
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
            for child in &node.children {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// 叶子值解引用
    ///
    /// - 无子元素：按 `type` 属性推断文本（`string` 保留原文，`logical`
    ///   转布尔，其余按数值宽松推断；多个词组成序列）
    /// - 子元素全部带 `name` 属性：映射
    /// - 其余：子元素值序列
    pub fn value(&self) -> Value {
        if self.children.is_empty() {
            return self.text_value();
        }
        if self.children.iter().all(|c| c.attr("name").is_some()) {
            let mut mapping = Mapping::new();
            for child in &self.children {
                let key = child.attr("name").unwrap_or_default();
                if !mapping.contains_key(key) {
                    mapping.insert(key, child.value());
                }
            }
            return Value::Map(mapping);
        }
        Value::Seq(self.children.iter().map(Node::value).collect())
    }

    fn text_value(&self) -> Value {
        let text = self.text.as_deref().unwrap_or_default().trim();
        let kind = self.attr("type").unwrap_or_default();
        if kind == "string" {
            return Value::str(text);
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let scalar = |t: &str| -> Scalar {
            match kind {
                "logical" => parse_bool_token(t)
                    .map(Scalar::Bool)
                    .unwrap_or_else(|| Scalar::Str(t.to_string())),
                _ => coerce_number(t),
            }
        };
        match tokens.len() {
            0 => Value::str(""),
            1 => Value::Scalar(scalar(tokens[0])),
            _ => Value::Seq(tokens.into_iter().map(|t| Value::Scalar(scalar(t))).collect()),
        }
    }
}
