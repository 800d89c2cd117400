//! # 文本解析器
//!
//! 按声明顺序对整段文本应用一组 `Quantity`，产出有序映射。
//! 同名规则互为备选：先声明且命中的那条生效，其余不再求值。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar.rs` 和 `pipeline.rs` 使用
//! - 使用 `grammar/quantity.rs`

use super::quantity::Quantity;
use super::value::Mapping;

/// 声明式文本解析器（只读、可跨线程共享）
#[derive(Debug, Clone, Default)]
pub struct TextParser {
    quantities: Vec<Quantity>,
}

impl TextParser {
    pub fn new(quantities: Vec<Quantity>) -> Self {
        Self { quantities }
    }

    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    /// 解析文本；空文本或无命中返回空映射
    pub fn parse(&self, text: &str) -> Mapping {
        let mut result = Mapping::new();
        for quantity in &self.quantities {
            if result.contains_key(quantity.name()) {
                continue;
            }
            if let Some(value) = quantity.extract(text) {
                result.insert(quantity.name(), value);
            }
        }
        result
    }
}
