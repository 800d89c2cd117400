//! # 路径查询
//!
//! 类 XPath 的精简路径语言，同时作用于 XML 节点树和文法产出的值树。
//!
//! ## 语法
//! ```text
//! /modeling/generator/i[@name="version"]/$     绝对路径 + 属性过滤 + 叶子解引用
//! calculation[-1]/energies/energy_total        相对路径 + 位置下标（负数从末尾计）
//! .//separator[@name='electronic']             后代查找（先序）
//! positions_forces/0                           取序列元素
//! structure/@name                              属性值
//! ```
//!
//! 重复段（元素全部为映射 / 节点的序列）在按名称取值时展开为多个命中；
//! 数值数组保持为单个命中。查询结果是对原树的借用视图。
//!
//! ## 依赖关系
//! - 被 `mapping/` 使用
//! - 使用 `tree/node.rs`, `grammar/value.rs`

use super::node::Node;
use crate::error::{Result, VaspError};
use crate::grammar::{coerce_number, Value};

use std::fmt;
use std::str::FromStr;

/// 查询命中（借用视图）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Found<'a> {
    Value(&'a Value),
    Node(&'a Node),
    /// `$` 解引用后的节点，转换时取叶子值
    Deref(&'a Node),
    Attr(&'a str),
}

impl<'a> Found<'a> {
    /// 值树中嵌入的节点统一视为 `Found::Node`
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Node(node) => Found::Node(node),
            other => Found::Value(other),
        }
    }

    /// 转为独立拥有的值
    pub fn to_value(&self) -> Value {
        match self {
            Found::Value(v) => (*v).clone(),
            Found::Node(n) => Value::Node((*n).clone()),
            Found::Deref(n) => n.value(),
            Found::Attr(s) => Value::Scalar(coerce_number(s)),
        }
    }

    fn node(&self) -> Option<&'a Node> {
        match *self {
            Found::Node(n) | Found::Deref(n) => Some(n),
            _ => None,
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match *self {
            Found::Node(n) | Found::Deref(n) => n.attr(name).map(str::to_string),
            Found::Value(Value::Map(m)) => m.get(name).and_then(Value::as_text),
            _ => None,
        }
    }
}

/// 命中列表转为值：无命中 → `None`，单个 → 该值，多个 → 序列
pub fn hits_to_value(hits: &[Found<'_>]) -> Option<Value> {
    match hits {
        [] => None,
        [one] => Some(one.to_value()),
        many => Some(Value::Seq(many.iter().map(Found::to_value).collect())),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    Name(String),
    Any,
    Index(i64),
    Attr(String),
    Deref,
    Context,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    AttrEq(String, String),
    Position(i64),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: Test,
    predicates: Vec<Predicate>,
}

/// 已解析的路径表达式
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(expr: &str) -> Result<Self> {
        let source = expr.trim();
        let invalid = |reason: &str| VaspError::InvalidPath {
            path: source.to_string(),
            reason: reason.to_string(),
        };

        if source.is_empty() {
            return Err(invalid("empty path"));
        }
        let absolute = source.starts_with('/');
        if source == "/" {
            return Ok(Self {
                source: source.to_string(),
                absolute,
                steps: Vec::new(),
            });
        }

        let segments = split_segments(source).map_err(|r| invalid(&r))?;
        let mut steps = Vec::new();
        let mut descendant = false;
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if i == 0 && absolute {
                    continue;
                }
                if descendant {
                    return Err(invalid("unexpected '///'"));
                }
                descendant = true;
                continue;
            }
            let axis = if descendant { Axis::Descendant } else { Axis::Child };
            descendant = false;
            let step = parse_step(segment, axis).map_err(|r| invalid(&r))?;
            steps.push(step);
        }
        if descendant {
            return Err(invalid("trailing '/'"));
        }

        Ok(Self {
            source: source.to_string(),
            absolute,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// 在上下文（或绝对路径时的根）上求值，返回文档序的全部命中
    pub fn evaluate<'a>(&self, context: Found<'a>, root: Found<'a>) -> Vec<Found<'a>> {
        let start = if self.absolute { root } else { context };
        let start = match start {
            Found::Value(v) => Found::from_value(v),
            other => other,
        };

        let mut hits = vec![start];
        for step in &self.steps {
            let mut next = Vec::new();
            for hit in &hits {
                step.apply(*hit, &mut next);
            }
            for predicate in &step.predicates {
                next = predicate.filter(next);
            }
            hits = next;
            if hits.is_empty() {
                break;
            }
        }
        hits
    }

    /// 求值并转为独立值
    pub fn resolve(&self, context: Found<'_>, root: Found<'_>) -> Option<Value> {
        hits_to_value(&self.evaluate(context, root))
    }
}

impl FromStr for Path {
    type Err = VaspError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Step {
    fn apply<'a>(&self, hit: Found<'a>, out: &mut Vec<Found<'a>>) {
        match (&self.axis, &self.test) {
            (Axis::Child, Test::Name(name)) => children_of(hit, Some(name), out),
            (Axis::Child, Test::Any) => children_of(hit, None, out),
            (Axis::Descendant, Test::Name(name)) => descendants_of(hit, Some(name), out),
            (Axis::Descendant, _) => descendants_of(hit, None, out),
            (Axis::Child, Test::Index(i)) => match hit {
                Found::Value(Value::Seq(items)) => {
                    if let Some(item) = pick(items, *i) {
                        out.push(Found::from_value(item));
                    }
                }
                Found::Node(n) | Found::Deref(n) => {
                    if let Some(child) = pick(&n.children, *i) {
                        out.push(Found::Node(child));
                    }
                }
                _ => {}
            },
            (Axis::Child, Test::Attr(name)) => match hit {
                Found::Node(n) | Found::Deref(n) => {
                    if let Some(v) = n.attr(name) {
                        out.push(Found::Attr(v));
                    }
                }
                Found::Value(Value::Map(m)) => {
                    if let Some(v) = m.get(name) {
                        out.push(Found::from_value(v));
                    }
                }
                _ => {}
            },
            (Axis::Child, Test::Deref) => match hit.node() {
                Some(n) => out.push(Found::Deref(n)),
                None => out.push(hit),
            },
            (Axis::Child, Test::Context) => out.push(hit),
        }
    }
}

impl Predicate {
    fn filter<'a>(&self, hits: Vec<Found<'a>>) -> Vec<Found<'a>> {
        match self {
            Predicate::AttrEq(name, expected) => hits
                .into_iter()
                .filter(|h| h.attribute(name).as_deref() == Some(expected.as_str()))
                .collect(),
            Predicate::Position(i) => pick(&hits, *i).copied().into_iter().collect(),
        }
    }
}

fn pick<T>(items: &[T], index: i64) -> Option<&T> {
    let len = items.len() as i64;
    let idx = if index < 0 { len + index } else { index };
    if (0..len).contains(&idx) {
        items.get(idx as usize)
    } else {
        None
    }
}

fn push_expanded<'a>(value: &'a Value, out: &mut Vec<Found<'a>>) {
    match value {
        Value::Seq(items) if value.is_section_list() => {
            out.extend(items.iter().map(Found::from_value));
        }
        other => out.push(Found::from_value(other)),
    }
}

fn name_matches(name: Option<&String>, candidate: &str) -> bool {
    name.map_or(true, |n| n == candidate)
}

fn children_of<'a>(hit: Found<'a>, name: Option<&String>, out: &mut Vec<Found<'a>>) {
    match hit {
        Found::Node(n) | Found::Deref(n) => out.extend(
            n.children
                .iter()
                .filter(|c| name_matches(name, &c.tag))
                .map(Found::Node),
        ),
        Found::Value(Value::Map(m)) => {
            for (key, value) in m.iter() {
                if name_matches(name, key) {
                    push_expanded(value, out);
                }
            }
        }
        // 穿过重复段逐个查找
        Found::Value(Value::Seq(items)) => {
            for item in items {
                if matches!(item, Value::Map(_) | Value::Node(_)) {
                    children_of(Found::from_value(item), name, out);
                }
            }
        }
        _ => {}
    }
}

fn descendants_of<'a>(hit: Found<'a>, name: Option<&String>, out: &mut Vec<Found<'a>>) {
    match hit {
        Found::Node(n) | Found::Deref(n) => out.extend(
            n.descendants()
                .into_iter()
                .filter(|d| name_matches(name, &d.tag))
                .map(Found::Node),
        ),
        Found::Value(Value::Map(m)) => {
            for (key, value) in m.iter() {
                if name_matches(name, key) {
                    push_expanded(value, out);
                }
                descendants_of(Found::from_value(value), name, out);
            }
        }
        Found::Value(Value::Seq(items)) => {
            for item in items {
                descendants_of(Found::from_value(item), name, out);
            }
        }
        _ => {}
    }
}

/// 按 `/` 切分，忽略方括号和引号内部的分隔符
fn split_segments(source: &str) -> std::result::Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in source.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(ch);
            }
            (None, '/') if depth == 0 => segments.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".into());
    }
    if depth != 0 {
        return Err("unbalanced '['".into());
    }
    segments.push(current);
    Ok(segments)
}

fn parse_step(segment: &str, axis: Axis) -> std::result::Result<Step, String> {
    let (head, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };

    let test = parse_test(head.trim())?;
    if axis == Axis::Descendant && !matches!(test, Test::Name(_) | Test::Any) {
        return Err(format!("'//' must be followed by a name, got '{}'", head));
    }

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let end = closing_bracket(rest).ok_or_else(|| format!("unclosed predicate in '{}'", segment))?;
        predicates.push(parse_predicate(&rest[1..end])?);
        rest = rest[end + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(format!("unexpected text after predicate: '{}'", rest));
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_test(head: &str) -> std::result::Result<Test, String> {
    match head {
        "" => Err("empty step".into()),
        "$" => Ok(Test::Deref),
        "*" => Ok(Test::Any),
        "." => Ok(Test::Context),
        _ if head.starts_with('@') => {
            let name = &head[1..];
            if is_identifier(name) {
                Ok(Test::Attr(name.to_string()))
            } else {
                Err(format!("invalid attribute name '{}'", name))
            }
        }
        _ => {
            if let Ok(index) = head.parse::<i64>() {
                Ok(Test::Index(index))
            } else if is_identifier(head) {
                Ok(Test::Name(head.to_string()))
            } else {
                Err(format!("invalid step '{}'", head))
            }
        }
    }
}

fn parse_predicate(body: &str) -> std::result::Result<Predicate, String> {
    let body = body.trim();
    if let Some(attr) = body.strip_prefix('@') {
        let (name, value) = attr
            .split_once('=')
            .ok_or_else(|| format!("expected '@name=value', got '[{}]'", body))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(format!("invalid attribute name '{}'", name));
        }
        let value = value.trim();
        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        return Ok(Predicate::AttrEq(name.to_string(), unquoted.to_string()));
    }
    body.parse::<i64>()
        .map(Predicate::Position)
        .map_err(|_| format!("invalid predicate '[{}]'", body))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '#' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Mapping;
    use crate::tree::read_xml;

    const DOC: &str = r#"<modeling>
 <generator>
  <i name="program" type="string">vasp</i>
  <i name="version" type="string">5.4.4</i>
 </generator>
 <calculation><energy><i name="e_fr_energy">-1.0</i></energy></calculation>
 <calculation>
  <scstep><energy><i name="e_fr_energy">-1.5</i></energy></scstep>
  <energy><i name="e_fr_energy">-2.0</i></energy>
 </calculation>
</modeling>"#;

    fn eval(doc: &Node, expr: &str) -> Option<Value> {
        let root = Found::Node(doc);
        Path::parse(expr).unwrap().resolve(root, root)
    }

    #[test]
    fn test_attribute_filter_and_deref() {
        let doc = read_xml(DOC);
        assert_eq!(
            eval(&doc, r#"/modeling/generator/i[@name="version"]/$"#),
            Some(Value::str("5.4.4"))
        );
        assert_eq!(
            eval(&doc, "/modeling/generator/i[@name='program']/@type"),
            Some(Value::str("string"))
        );
    }

    #[test]
    fn test_repeated_siblings_in_document_order() {
        let doc = read_xml(DOC);
        let v = eval(&doc, r#"/modeling/calculation/energy/i[@name="e_fr_energy"]/$"#);
        assert_eq!(v.unwrap().to_f64_vec(), Some(vec![-1.0, -2.0]));
    }

    #[test]
    fn test_descendant_and_negative_position() {
        let doc = read_xml(DOC);
        assert_eq!(eval(&doc, "//energy[-1]/i/$"), Some(Value::float(-2.0)));
        assert_eq!(eval(&doc, "//energy[1]/i/$"), Some(Value::float(-1.5)));
    }

    #[test]
    fn test_missing_path_is_absent() {
        let doc = read_xml(DOC);
        assert_eq!(eval(&doc, "/modeling/dos/i/$"), None);
        assert_eq!(eval(&doc, "/modeling/calculation[5]"), None);
    }

    #[test]
    fn test_mapping_sections_expand() {
        let step = |e: f64| {
            let mut m = Mapping::new();
            m.insert("energy", Value::float(e));
            m.insert("forces", Value::Seq(vec![Value::float(0.1), Value::float(0.2)]));
            Value::Map(m)
        };
        let mut top = Mapping::new();
        top.insert("calculation", Value::Seq(vec![step(-1.0), step(-2.0)]));
        let root = Value::Map(top);
        let found = Found::from_value(&root);

        let energies = Path::parse("calculation/energy").unwrap().resolve(found, found);
        assert_eq!(energies.unwrap().to_f64_vec(), Some(vec![-1.0, -2.0]));

        let last = Path::parse("calculation[-1]/forces/1").unwrap().resolve(found, found);
        assert_eq!(last, Some(Value::float(0.2)));
    }

    #[test]
    fn test_invalid_paths_rejected() {
        for bad in ["", "a/", "a///b", "a[@x=1", "a[foo]", "//$", "a b"] {
            assert!(Path::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
