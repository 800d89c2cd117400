//! # 文法规则（Quantity）
//!
//! 单条命名提取规则：正则模式 + 重复标志 + 可选子解析器 / 字符串变换。
//!
//! ## 依赖关系
//! - 被 `grammar/parser.rs` 和 `parsers/outcar.rs` 使用
//! - 使用 `regex` 编译模式

use super::parser::TextParser;
use super::value::{coerce_token, Scalar, Value};
use crate::error::{Result, VaspError};

use regex::{Captures, Regex};
use std::fmt;

/// 字符串变换：接收拼接后的捕获文本，返回值原样存储
pub type StrOperation = fn(&str) -> Option<Value>;

/// 命名提取规则
#[derive(Clone)]
pub struct Quantity {
    name: String,
    pattern: Regex,
    repeats: bool,
    convert: bool,
    str_operation: Option<StrOperation>,
    sub_parser: Option<TextParser>,
}

impl Quantity {
    /// 编译规则；模式非法时返回 `InvalidPattern`
    pub fn new(name: &str, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| VaspError::InvalidPattern {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            repeats: false,
            convert: true,
            str_operation: None,
            sub_parser: None,
        })
    }

    pub fn repeats(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    /// 关闭自动类型推断后，捕获内容保留为字符串
    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn str_operation(mut self, op: StrOperation) -> Self {
        self.str_operation = Some(op);
        self
    }

    pub fn sub_parser(mut self, parser: TextParser) -> Self {
        self.sub_parser = Some(parser);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 在文本上应用规则；无匹配返回 `None`
    pub fn extract(&self, text: &str) -> Option<Value> {
        if self.repeats {
            let values: Vec<Value> = self
                .pattern
                .captures_iter(text)
                .filter_map(|caps| self.capture_value(&caps))
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(Value::Seq(values))
            }
        } else {
            let caps = self.pattern.captures(text)?;
            self.capture_value(&caps)
        }
    }

    fn capture_value(&self, caps: &Captures<'_>) -> Option<Value> {
        let groups: Vec<&str> = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect();

        // 无捕获组时使用整个匹配
        let span = if groups.is_empty() {
            caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
        } else {
            groups.join(" ")
        };

        if let Some(parser) = &self.sub_parser {
            return Some(Value::Map(parser.parse(&span)));
        }
        if let Some(op) = self.str_operation {
            return op(&span);
        }

        let parts: Vec<&str> = if groups.is_empty() {
            vec![span.as_str()]
        } else {
            groups
        };
        let mut values: Vec<Value> = parts
            .into_iter()
            .map(|g| {
                if self.convert {
                    convert_group(g)
                } else {
                    Value::str(g.trim())
                }
            })
            .collect();

        if values.len() == 1 {
            values.pop()
        } else {
            Some(Value::Seq(values))
        }
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quantity")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("repeats", &self.repeats)
            .field("sub_parser", &self.sub_parser)
            .finish()
    }
}

/// 单个捕获组的类型推断：多行 → 行序列，多词 → 词序列
fn convert_group(group: &str) -> Value {
    let lines: Vec<&str> = group
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    match lines.len() {
        0 => Value::str(""),
        1 => convert_line(lines[0]),
        _ => Value::Seq(lines.into_iter().map(convert_line).collect()),
    }
}

fn convert_line(line: &str) -> Value {
    let mut tokens: Vec<Scalar> = line.split_whitespace().map(coerce_token).collect();
    if tokens.len() == 1 {
        Value::Scalar(tokens.remove(0))
    } else {
        Value::Seq(tokens.into_iter().map(Value::Scalar).collect())
    }
}
