//! # 求值作用域
//!
//! 一个作用域 = 绑定表 + 文档根 + 当前上下文。值字段在作用域内按需
//! 求值并缓存；变换可引用同一作用域内的其它字段，循环引用记录警告
//! 并视为缺失。段字段展开为子作用域列表。
//!
//! ## 依赖关系
//! - 被 `mapping/project.rs`, `mapping/transform.rs` 使用
//! - 使用 `mapping/binding.rs`, `tree/path.rs`

use super::binding::{Access, BindingTable, Input};
use super::field::Field;
use super::transform::Transform;
use crate::grammar::{Mapping, Value};
use crate::models::{Measured, Unit};
use crate::tree::{Found, Path};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// 当前上下文：借用原树，或变换产出的独立值
#[derive(Debug, Clone)]
pub enum Context<'a> {
    View(Found<'a>),
    Owned(Value),
}

/// 已解析的字段值
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub unit: Option<Unit>,
}

pub struct Scope<'a> {
    table: &'a BindingTable,
    root: Found<'a>,
    context: Context<'a>,
    cache: RefCell<HashMap<Field, Option<Resolved>>>,
    in_progress: RefCell<HashSet<Field>>,
}

impl<'a> Scope<'a> {
    /// 以文档根为上下文的顶层作用域
    pub fn new(table: &'a BindingTable, root: &'a Value) -> Self {
        let root = Found::from_value(root);
        Self {
            table,
            root,
            context: Context::View(root),
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    fn child(&self, context: Context<'a>) -> Scope<'a> {
        Scope {
            table: self.table,
            root: self.root,
            context,
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    pub fn context(&self) -> &Context<'a> {
        &self.context
    }

    /// 在当前上下文上求路径
    pub fn evaluate(&self, path: &Path) -> Option<Value> {
        match &self.context {
            Context::View(found) => path.resolve(*found, self.root),
            Context::Owned(value) => path.resolve(Found::from_value(value), self.root),
        }
    }

    /// 段字段 → 子作用域
    ///
    /// - 未绑定：沿用当前上下文（一个子作用域）
    /// - 路径：每个命中一个
    /// - 变换：序列的每个元素一个，单个映射一个
    pub fn sections(&self, field: Field) -> Vec<Scope<'a>> {
        let Some(binding) = self.table.get(field) else {
            return vec![self.child(self.context.clone())];
        };

        let scopes: Vec<Scope<'a>> = match binding.access() {
            Access::Path(path) => match &self.context {
                Context::View(found) => path
                    .evaluate(*found, self.root)
                    .into_iter()
                    .map(|hit| self.child(Context::View(hit)))
                    .collect(),
                Context::Owned(value) => path
                    .evaluate(Found::from_value(value), self.root)
                    .iter()
                    .map(|hit| self.child(Context::Owned(hit.to_value())))
                    .collect(),
            },
            Access::Transform {
                transform,
                inputs,
                kwargs,
            } => match self.apply(*transform, inputs, kwargs) {
                Some(Value::Seq(items)) => items
                    .into_iter()
                    .map(|item| self.child(Context::Owned(item)))
                    .collect(),
                Some(single @ (Value::Map(_) | Value::Node(_))) => {
                    vec![self.child(Context::Owned(single))]
                }
                _ => Vec::new(),
            },
        };
        tracing::trace!(field = %field, count = scopes.len(), "expanded section");
        scopes
    }

    /// 值字段求值（带缓存与循环检测）
    pub fn value(&self, field: Field) -> Option<Resolved> {
        if let Some(cached) = self.cache.borrow().get(&field).cloned() {
            return cached;
        }
        if !self.in_progress.borrow_mut().insert(field) {
            tracing::warn!(field = %field, "cyclic field reference, treating as absent");
            return None;
        }

        let resolved = self.compute(field);

        self.in_progress.borrow_mut().remove(&field);
        self.cache.borrow_mut().insert(field, resolved.clone());
        resolved
    }

    fn compute(&self, field: Field) -> Option<Resolved> {
        let binding = self.table.get(field)?;
        let value = match binding.access() {
            Access::Path(path) => self.evaluate(path),
            Access::Transform {
                transform,
                inputs,
                kwargs,
            } => self.apply(*transform, inputs, kwargs),
        }?;
        Some(Resolved {
            value,
            unit: binding.declared_unit().or_else(|| field.schema_unit()),
        })
    }

    fn apply(&self, transform: Transform, inputs: &[Input], kwargs: &Mapping) -> Option<Value> {
        let values: Vec<Option<Value>> = inputs
            .iter()
            .map(|input| match input {
                Input::Path(path) => self.evaluate(path),
                Input::Field(field) => self.value(*field).map(|r| r.value),
            })
            .collect();
        transform.apply(&values, kwargs, self)
    }

    // ─────────────────────────────────────────────────────────
    // 类型化读取
    // ─────────────────────────────────────────────────────────

    /// 读取并转换；形状不符时记录并视为缺失
    pub fn get<T>(&self, field: Field, convert: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let resolved = self.value(field)?;
        let converted = convert(&resolved.value);
        if converted.is_none() {
            tracing::debug!(field = %field, "value has unexpected shape, skipped");
        }
        converted
    }

    /// 带单位读取
    pub fn measured<T>(
        &self,
        field: Field,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<Measured<T>> {
        let unit = self.value(field)?.unit?;
        self.get(field, convert).map(|m| Measured::new(m, unit))
    }

    pub fn text(&self, field: Field) -> Option<String> {
        self.get(field, Value::as_text)
    }

    pub fn flag(&self, field: Field) -> Option<bool> {
        self.get(field, Value::as_bool)
    }

    pub fn float(&self, field: Field) -> Option<f64> {
        self.get(field, Value::as_f64)
    }
}
