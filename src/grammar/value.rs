//! # 中间值树
//!
//! 文法引擎和 XML 读取器共同产出的中间表示：
//! `Scalar | Seq | Map | Node` 四种带标签变体。
//!
//! ## 功能
//! - 标量自动类型推断（布尔 / 整数 / 浮点 / 字符串）
//! - 保持插入顺序的映射 `Mapping`
//! - 供投影层使用的数值 / 矩阵转换辅助函数
//!
//! ## 依赖关系
//! - 被 `grammar/`, `tree/`, `mapping/` 使用
//! - 使用 `tree/node.rs` 的 `Node`

use crate::tree::Node;

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// 标量值
///
/// 浮点按值比较，NaN 与 NaN 相等。
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(i) => Some(*i != 0),
            Scalar::Str(s) => parse_bool_token(s),
            Scalar::Float(_) => None,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

/// 中间值树节点
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    Seq(Vec<Value>),
    Map(Mapping),
    Node(Node),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Scalar(Scalar::Str(s.into()))
    }

    pub fn float(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }

    pub fn int(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }

    pub fn bool(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// 重复段：非空且每个元素都是映射或节点
    pub fn is_section_list(&self) -> bool {
        match self {
            Value::Seq(items) => {
                !items.is_empty()
                    && items
                        .iter()
                        .all(|v| matches!(v, Value::Map(_) | Value::Node(_)))
            }
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar()?.as_f64()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar()?.as_i64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar()?.as_bool()
    }

    /// 标量的文本形式；字符串会去除首尾空白
    pub fn as_text(&self) -> Option<String> {
        match self.as_scalar()? {
            Scalar::Str(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// 一维浮点数组；单个标量视为长度为 1 的数组
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Value::Seq(items) => items.iter().map(Value::as_f64).collect(),
            Value::Scalar(s) => s.as_f64().map(|x| vec![x]),
            _ => None,
        }
    }

    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            Value::Seq(items) => items.iter().map(Value::as_i64).collect(),
            Value::Scalar(s) => s.as_i64().map(|x| vec![x]),
            _ => None,
        }
    }

    /// 二维浮点数组（行优先）
    pub fn to_f64_matrix(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            Value::Seq(rows) if rows.iter().all(|r| matches!(r, Value::Seq(_))) => {
                rows.iter().map(Value::to_f64_vec).collect()
            }
            _ => None,
        }
    }

    /// 三维向量列表
    ///
    /// 接受行数组（每行取前三列）或长度为 3 的整数倍的扁平数组。
    pub fn to_vec3s(&self) -> Option<Vec<[f64; 3]>> {
        if let Some(rows) = self.to_f64_matrix() {
            return rows
                .iter()
                .map(|r| (r.len() >= 3).then(|| [r[0], r[1], r[2]]))
                .collect();
        }
        let flat = self.to_f64_vec()?;
        if flat.is_empty() || flat.len() % 3 != 0 {
            return None;
        }
        Some(flat.chunks(3).map(|c| [c[0], c[1], c[2]]).collect())
    }

    /// 3×3 矩阵
    pub fn to_matrix3(&self) -> Option<[[f64; 3]; 3]> {
        let rows = self.to_vec3s()?;
        (rows.len() == 3).then(|| [rows[0], rows[1], rows[2]])
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Map(m)
    }
}

/// 保持插入顺序的字符串键映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Value)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// 插入；键已存在时覆盖原值并保持原位置
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ─────────────────────────────────────────────────────────────
// 标量类型推断
// ─────────────────────────────────────────────────────────────

/// 布尔标记（大小写不敏感）：`T`/`.TRUE.`/`TRUE`，`F`/`.FALSE.`/`FALSE`
pub fn parse_bool_token(token: &str) -> Option<bool> {
    match token.trim().to_ascii_uppercase().as_str() {
        "T" | ".TRUE." | "TRUE" => Some(true),
        "F" | ".FALSE." | "FALSE" => Some(false),
        _ => None,
    }
}

fn is_integer_token(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float_token(token: &str) -> bool {
    let body = token.strip_prefix(['-', '+']).unwrap_or(token);
    body.bytes().filter(|&b| b == b'.').count() == 1
        && body.bytes().any(|b| b.is_ascii_digit())
        && body.bytes().all(|b| b == b'.' || b.is_ascii_digit())
}

/// 文本文法的严格推断规则
///
/// 布尔标记优先；整数仅允许可选符号加数字；浮点要求恰好一个小数点；
/// 其余（包括解析溢出的数字）保留为去除空白的字符串。
pub fn coerce_token(token: &str) -> Scalar {
    let token = token.trim();
    if let Some(b) = parse_bool_token(token) {
        return Scalar::Bool(b);
    }
    if is_integer_token(token) {
        match token.parse::<i64>() {
            Ok(i) => return Scalar::Int(i),
            Err(e) => tracing::debug!(token, error = %e, "integer token kept as string"),
        }
    } else if is_float_token(token) {
        match token.parse::<f64>() {
            Ok(x) => return Scalar::Float(x),
            Err(e) => tracing::debug!(token, error = %e, "float token kept as string"),
        }
    }
    Scalar::Str(token.to_string())
}

/// 宽松数值推断：整数、任意合法浮点写法（含指数）、布尔标记，否则字符串
pub fn coerce_number(token: &str) -> Scalar {
    let token = token.trim();
    if let Ok(i) = token.parse::<i64>() {
        return Scalar::Int(i);
    }
    if token.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(x) = token.parse::<f64>() {
            return Scalar::Float(x);
        }
    }
    if let Some(b) = parse_bool_token(token) {
        return Scalar::Bool(b);
    }
    Scalar::Str(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_scalars_compare_equal() {
        assert_eq!(Scalar::Float(f64::NAN), Scalar::Float(f64::NAN));
        assert_ne!(Scalar::Float(f64::NAN), Scalar::Float(0.0));
        assert_ne!(Scalar::Float(1.0), Scalar::Int(1));
        let row = Value::Seq(vec![Value::int(4), Value::float(f64::NAN), Value::float(0.0)]);
        assert_eq!(row, row.clone());
    }

    #[test]
    fn test_coerce_token_kinds() {
        assert_eq!(coerce_token("42"), Scalar::Int(42));
        assert_eq!(coerce_token("-7"), Scalar::Int(-7));
        assert_eq!(coerce_token("-10.5"), Scalar::Float(-10.5));
        assert_eq!(coerce_token(".5"), Scalar::Float(0.5));
        assert_eq!(coerce_token(".TRUE."), Scalar::Bool(true));
        assert_eq!(coerce_token("f"), Scalar::Bool(false));
        assert_eq!(coerce_token("accura"), Scalar::Str("accura".into()));
        assert_eq!(coerce_token("1.2.3"), Scalar::Str("1.2.3".into()));
        assert_eq!(coerce_token("."), Scalar::Str(".".into()));
    }

    #[test]
    fn test_integer_overflow_stays_string() {
        let big = "99999999999999999999999";
        assert_eq!(coerce_token(big), Scalar::Str(big.into()));
    }

    #[test]
    fn test_coerce_number_accepts_exponent() {
        assert_eq!(coerce_number("0.1E-05"), Scalar::Float(1e-6));
        assert_eq!(coerce_number(" 4 "), Scalar::Int(4));
        assert_eq!(coerce_number("vasp"), Scalar::Str("vasp".into()));
        assert_eq!(coerce_number("F"), Scalar::Bool(false));
    }

    #[test]
    fn test_mapping_keeps_order_and_overwrites_in_place() {
        let mut m = Mapping::new();
        m.insert("b", Value::int(1));
        m.insert("a", Value::int(2));
        m.insert("b", Value::int(3));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(m.get("b"), Some(&Value::int(3)));
    }

    #[test]
    fn test_to_vec3s_from_rows_and_flat() {
        let rows = Value::Seq(vec![
            Value::Seq(vec![Value::float(1.0), Value::float(2.0), Value::float(3.0), Value::float(9.0)]),
            Value::Seq(vec![Value::float(4.0), Value::float(5.0), Value::float(6.0), Value::float(9.0)]),
        ]);
        assert_eq!(rows.to_vec3s(), Some(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));

        let flat = Value::Seq((1..=6).map(|i| Value::int(i)).collect());
        assert_eq!(flat.to_vec3s(), Some(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));

        let ragged = Value::Seq((1..=4).map(|i| Value::int(i)).collect());
        assert_eq!(ragged.to_vec3s(), None);
    }

    #[test]
    fn test_serialize_mapping_as_object() {
        let m: Mapping = vec![("x", Value::float(1.5)), ("flag", Value::bool(true))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&Value::Map(m)).unwrap();
        assert_eq!(json, r#"{"x":1.5,"flag":true}"#);
    }
}
