//! # VASP OUTCAR 文法
//!
//! OUTCAR 纯文本日志的声明式规则集：文件头、运行参数块、元素与每种元素的
//! 离子数、能带数、倒空间 k 点、晶格矢量、初始坐标、逐离子步的计算段。
//!
//! 初始坐标有两种布局，分别存放：近邻表（分数坐标）为 `positions_direct`，
//! `(Angst)` 块（笛卡尔坐标）为 `positions`。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs` 使用
//! - 使用 `grammar/` 的 `Quantity`, `TextParser`

use crate::error::Result;
use crate::grammar::{coerce_token, parse_bool_token, Mapping, Quantity, Scalar, TextParser, Value};

use once_cell::sync::Lazy;
use regex::Regex;

static KEY_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z_]+)\s*=[ \t]*(\.?[a-zA-Z]*[\d\-\.\+ \tE]*\.?)")
        .expect("key-value pattern is valid")
});

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d+\.\d*(?:[Ee][+-]?\d+)?").expect("float pattern is valid")
});

static POSITION_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d*\s*(-*\d+\.\d+)\s*(-*\d+\.\d+)\s*(-*\d+\.\d+)")
        .expect("position row pattern is valid")
});

/// 构建 OUTCAR 顶层规则集
pub fn grammar() -> Result<TextParser> {
    Ok(TextParser::new(vec![
        Quantity::new(
            "header",
            r"vasp\.([\d\.]+)\s*(\w+)\s*[\s\S]+?\)\s*(\w+)\s*executed on\s*(\w+)\s*date\s*([\d\.]+)\s*([\d:]+)\s*(\w+)",
        )?
        .str_operation(str_to_header),
        Quantity::new("parameters", r"Startparameter for this run:([\s\S]+?)\-{100}")?
            .str_operation(str_to_key_values),
        Quantity::new("ions_per_type", r"ions per type =\s*([ \d]+)")?,
        Quantity::new("species", r"\w+ +([A-Z][a-z]*).+?:\s*energy of atom +\d+")?
            .repeats(true)
            .convert(false),
        Quantity::new("nbands", r"NBANDS\s*=\s*(\d+)")?,
        Quantity::new(
            "kpoints",
            r"Following reciprocal coordinates:[\s\S]+?\n([\d\.\s\-]+)",
        )?
        .str_operation(str_to_kpoints),
        lattice_vectors()?,
        Quantity::new(
            "positions_direct",
            r"ion\s*position\s*nearest neighbor table([\s\S]+?)LATTYP",
        )?
        .str_operation(str_to_positions),
        Quantity::new(
            "positions",
            r"position of ions in cartesian coordinates\s*\(Angst\):([\s\S]+?)\n *\n",
        )?
        .str_operation(str_to_positions),
        Quantity::new(
            "calculation",
            r"(\-\-\s*Iteration\s*\d+\(\s*1\s*\)\s*[\s\S]+?)((?:FREE ENERGIE OF THE ION\-ELECTRON SYSTEM \(eV\)[\s\S]+?LOOP\+.+)|\z)",
        )?
        .repeats(true)
        .sub_parser(calculation_grammar()?),
    ]))
}

/// 单个离子步内的规则
fn calculation_grammar() -> Result<TextParser> {
    let scf_iteration = TextParser::new(vec![
        Quantity::new("energy_total", r"free energy\s*TOTEN\s*=\s*([\d\.\-]+)\s*eV")?,
        Quantity::new("energy_entropy0", r"energy without entropy\s*=\s*([\d\.\-]+)")?,
        Quantity::new("energy_T0", r"energy\(sigma\->0\)\s*=\s*([\d\.\-]+)")?,
        Quantity::new(
            "energy_components",
            r"Free energy of the ion-electron system \(eV\)\s*\-+([\s\S]+?)\-{10}",
        )?
        .str_operation(str_to_key_values),
        Quantity::new("time", r"LOOP:\s*cpu time\s*([\d\.]+):\s*real time\s*([\d\.]+)")?,
    ]);

    let energies = TextParser::new(vec![
        Quantity::new("energy_total", r"free\s*energy\s*TOTEN\s*=\s*([\-\d\.]+)")?,
        Quantity::new("energy_entropy0", r"energy\s*without\s*entropy\s*=\s*([\-\d\.]+)")?,
        Quantity::new("energy_T0", r"energy\(sigma\->0\)\s*=\s*([\-\d\.]+)")?,
    ]);

    Ok(TextParser::new(vec![
        Quantity::new(
            "scf_iteration",
            r"Iteration\s*\d+\(\s*\d+\s*\)([\s\S]+?energy\(sigma\->0\)\s*=\s*.+)",
        )?
        .repeats(true)
        .sub_parser(scf_iteration),
        Quantity::new(
            "energies",
            r"FREE ENERGIE OF THE ION\-ELECTRON SYSTEM \(eV\)\s*\-+\s*([\s\S]+?)\-{10}",
        )?
        .sub_parser(energies),
        Quantity::new("stress", &format!(r"in kB\s*{}", r"(\-?\d+\.\d+)\s*".repeat(6)))?
            .str_operation(str_to_stress),
        Quantity::new(
            "positions_forces",
            r"POSITION\s*TOTAL\-FORCE \(eV/Angst\)\s*\-+\s*([\d\.\s\-E]+)",
        )?
        .str_operation(str_to_positions_forces),
        lattice_vectors()?,
        Quantity::new("converged", r"aborting loop because (EDIFF is reached)")?.convert(false),
        Quantity::new("fermi_energy", r"E\-fermi :\s*([\-\d\.]+)")?,
        Quantity::new(
            "eigenvalues",
            r"band No\.\s*band energies\s*occupation\s*([\d\.\s\-\*]+?)(?:k\-point|spin|\-{10})",
        )?
        .repeats(true)
        .str_operation(str_to_eigenvalues),
        Quantity::new("time", r"LOOP\+:\s*cpu time\s*([\d\.]+):\s*real time\s*([\d\.]+)")?,
    ]))
}

fn lattice_vectors() -> Result<Quantity> {
    Ok(Quantity::new(
        "lattice_vectors",
        &format!(
            r"direct lattice vectors\s*reciprocal lattice vectors\s*{}",
            r"(\-?\d+\.\d+)\s*".repeat(18)
        ),
    )?
    .str_operation(str_to_lattice_vectors))
}

// ─────────────────────────────────────────────────────────────
// 字符串变换
// ─────────────────────────────────────────────────────────────

fn floats(text: &str) -> Vec<f64> {
    FLOAT_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn row(values: &[f64]) -> Value {
    Value::Seq(values.iter().map(|&x| Value::float(x)).collect())
}

/// 文件头：版本、编译日期、编译类型、平台、运行日期与时间、并行方式
pub fn str_to_header(text: &str) -> Option<Value> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let &[version, build_date, build_type, platform, date, time, parallel] = tokens.as_slice() else {
        tracing::debug!(tokens = tokens.len(), "unexpected OUTCAR header layout");
        return None;
    };
    let parallel = if parallel == "running" { "parallel" } else { parallel };

    let mut header = Mapping::new();
    header.insert("version", Value::str(version));
    header.insert(
        "subversion",
        Value::str(format!("{} {} {}", build_date, build_type, parallel)),
    );
    header.insert("platform", Value::str(platform));
    header.insert("date", Value::str(date.replace('.', " ")));
    header.insert("time", Value::str(time));
    Some(Value::Map(header))
}

/// `KEY = value` 参数块；多词值为序列，重复键以后出现者为准
pub fn str_to_key_values(text: &str) -> Option<Value> {
    let mut result = Mapping::new();
    for caps in KEY_VALUE_RE.captures_iter(text) {
        let key = &caps[1];
        let tokens: Vec<&str> = caps[2].split_whitespace().collect();
        let value = match tokens.as_slice() {
            [] => continue,
            [single] => match parse_bool_token(single) {
                Some(b) => Value::bool(b),
                None => Value::Scalar(convert_parameter(single)),
            },
            many => Value::Seq(
                many.iter()
                    .map(|t| Value::Scalar(convert_parameter(t)))
                    .collect(),
            ),
        };
        result.insert(key, value);
    }
    Some(Value::Map(result))
}

/// 含小数点按浮点解析（允许指数），否则按整数；失败保留字符串
fn convert_parameter(token: &str) -> Scalar {
    if token.contains('.') {
        if let Ok(x) = token.parse::<f64>() {
            return Scalar::Float(x);
        }
    } else if let Ok(i) = token.parse::<i64>() {
        return Scalar::Int(i);
    }
    Scalar::Str(token.to_string())
}

/// 倒空间 k 点坐标与权重
pub fn str_to_kpoints(text: &str) -> Option<Value> {
    let mut points = Vec::new();
    let mut weights = Vec::new();
    for line in text.lines() {
        let values = floats(line);
        if values.len() >= 4 {
            points.push(row(&values[..3]));
            weights.push(Value::float(values[3]));
        }
    }
    if points.is_empty() {
        return None;
    }
    let mut kpoints = Mapping::new();
    kpoints.insert("points", Value::Seq(points));
    kpoints.insert("weights", Value::Seq(weights));
    Some(Value::Map(kpoints))
}

/// 每行取首个三元组作为坐标
pub fn str_to_positions(text: &str) -> Option<Value> {
    let rows: Vec<Value> = text
        .lines()
        .filter_map(|line| POSITION_ROW_RE.captures(line))
        .filter_map(|caps| {
            let xyz: Option<Vec<f64>> = (1..=3).map(|i| caps[i].parse().ok()).collect();
            xyz.map(|v| row(&v))
        })
        .collect();
    (!rows.is_empty()).then_some(Value::Seq(rows))
}

/// POSITION / TOTAL-FORCE 表拆分为 `[positions, forces]`
pub fn str_to_positions_forces(text: &str) -> Option<Value> {
    let mut positions = Vec::new();
    let mut forces = Vec::new();
    for line in text.lines().filter(|l| !l.contains("--")) {
        let values = floats(line);
        if values.len() >= 6 {
            positions.push(row(&values[0..3]));
            forces.push(row(&values[3..6]));
        }
    }
    if positions.is_empty() {
        return None;
    }
    Some(Value::Seq(vec![Value::Seq(positions), Value::Seq(forces)]))
}

/// 18 个数按行拆成 `[direct, reciprocal]` 两个 3×3 矩阵
pub fn str_to_lattice_vectors(text: &str) -> Option<Value> {
    let values = floats(text);
    if values.len() != 18 {
        return None;
    }
    let direct: Vec<Value> = values.chunks(6).map(|r| row(&r[0..3])).collect();
    let reciprocal: Vec<Value> = values.chunks(6).map(|r| row(&r[3..6])).collect();
    Some(Value::Seq(vec![Value::Seq(direct), Value::Seq(reciprocal)]))
}

/// XX YY ZZ XY YZ ZX → 对称 3×3 应力张量
pub fn str_to_stress(text: &str) -> Option<Value> {
    let s = floats(text);
    if s.len() != 6 {
        return None;
    }
    Some(Value::Seq(vec![
        row(&[s[0], s[3], s[5]]),
        row(&[s[3], s[1], s[4]]),
        row(&[s[5], s[4], s[2]]),
    ]))
}

/// 单个 k 点的 `(序号, 本征值, 占据数)` 扁平序列；溢出的 `***` 记为 NaN
pub fn str_to_eigenvalues(text: &str) -> Option<Value> {
    let values: Vec<Value> = text
        .split_whitespace()
        .map(|t| {
            if t.contains('*') {
                Value::float(f64::NAN)
            } else {
                match coerce_token(t) {
                    Scalar::Int(i) => Value::float(i as f64),
                    other => Value::Scalar(other),
                }
            }
        })
        .collect();
    (!values.is_empty()).then_some(Value::Seq(values))
}
