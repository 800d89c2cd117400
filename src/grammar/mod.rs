//! # 文法引擎
//!
//! 基于正则的声明式提取：命名规则（`Quantity`）集合作用于纯文本，
//! 产出带类型的中间值树（`Value`）。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `mapping/`, `pipeline.rs` 使用
//! - 子模块: value, quantity, parser

pub mod parser;
pub mod quantity;
pub mod value;

pub use parser::TextParser;
pub use quantity::{Quantity, StrOperation};
pub use value::{coerce_number, coerce_token, parse_bool_token, Mapping, Scalar, Value};
