//! # 绑定与注册表
//!
//! 绑定把目标字段连到源树上的取值方式：一条路径，或一个变换加输入列表。
//! 每个布局变体一张不可变的绑定表；注册表在构建时一次性校验全部
//! 路径、变换名称、参数个数、关键字参数与单位，之后只读共享。
//!
//! ## 依赖关系
//! - 被 `mapping/scope.rs`, `mapping/tables.rs`, `pipeline.rs` 使用
//! - 使用 `mapping/field.rs`, `mapping/transform.rs`, `tree/path.rs`

use super::field::Field;
use super::transform::Transform;
use crate::error::Result;
use crate::grammar::Mapping;
use crate::models::Unit;
use crate::parsers::Variant;
use crate::tree::Path;

use std::collections::HashMap;

/// 变换输入
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// 相对当前上下文（或绝对）的路径
    Path(Path),
    /// 同一作用域内另一个字段的解析结果
    Field(Field),
}

impl Input {
    pub fn path(expr: &str) -> Result<Self> {
        Ok(Input::Path(Path::parse(expr)?))
    }
}

/// 取值方式
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Path(Path),
    Transform {
        transform: Transform,
        inputs: Vec<Input>,
        kwargs: Mapping,
    },
}

/// 单个字段的绑定
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    access: Access,
    unit: Option<Unit>,
}

impl Binding {
    pub fn path(expr: &str) -> Result<Self> {
        Ok(Self {
            access: Access::Path(Path::parse(expr)?),
            unit: None,
        })
    }

    pub fn transform(name: &str, inputs: Vec<Input>) -> Result<Self> {
        Self::transform_with(name, inputs, Mapping::new())
    }

    /// 变换名称、参数个数与关键字参数在此处校验
    pub fn transform_with(name: &str, inputs: Vec<Input>, kwargs: Mapping) -> Result<Self> {
        let transform: Transform = name.parse()?;
        transform.validate(inputs.len(), &kwargs)?;
        Ok(Self {
            access: Access::Transform {
                transform,
                inputs,
                kwargs,
            },
            unit: None,
        })
    }

    /// 声明单位（覆盖字段缺省单位）
    pub fn unit(mut self, symbol: &str) -> Result<Self> {
        self.unit = Some(symbol.parse()?);
        Ok(self)
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn declared_unit(&self) -> Option<Unit> {
        self.unit
    }
}

/// 单个变体的绑定表
#[derive(Debug, Clone)]
pub struct BindingTable {
    variant: Variant,
    bindings: HashMap<Field, Binding>,
}

impl BindingTable {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            bindings: HashMap::new(),
        }
    }

    /// 追加绑定；同一字段重复绑定时后者覆盖前者
    pub fn bind(mut self, field: Field, binding: Binding) -> Self {
        self.bindings.insert(field, binding);
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn get(&self, field: Field) -> Option<&Binding> {
        self.bindings.get(&field)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// 变体 → 绑定表
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tables: HashMap<Variant, BindingTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置的三张表
    pub fn standard() -> Result<Self> {
        Ok(Self::new()
            .with_table(super::tables::outcar()?)
            .with_table(super::tables::vasprun_v1()?)
            .with_table(super::tables::vasprun_v2()?))
    }

    pub fn with_table(mut self, table: BindingTable) -> Self {
        self.tables.insert(table.variant(), table);
        self
    }

    pub fn table(&self, variant: Variant) -> Option<&BindingTable> {
        self.tables.get(&variant)
    }
}
