//! # 变换
//!
//! 绑定可引用的有名变换。名称在构建绑定时解析为枚举，未知名称、
//! 参数个数不符或关键字参数不合法都在构建时报错；求值时输入缺失
//! 则结果缺失，不报错。
//!
//! | 名称 | 输入 | 关键字参数 |
//! |------|------|-----------|
//! | `mix_alpha` | 混合系数, 是否杂化 | |
//! | `lookup` | 代码 | `table`, `default` |
//! | `get_xc_functionals` | 参数映射 | |
//! | `data` | 可选源值 | `path`, `value` |
//! | `get_eigenvalues` | 扁平本征值[, 参数映射[, 能带数]] | |
//! | `get_eigenvalue_sets` | 自旋/k 点/能带嵌套集合 | |
//! | `get_energy_contributions` | 能量分项映射 | `exclude` |
//! | `get_version` | 文件头映射 | |
//! | `cartesian_positions` | 分数坐标, 基矢 | |
//! | `get_ionic_positions` | 离子步坐标, 初始笛卡尔坐标, 初始分数坐标, 初始基矢 | |
//! | `get_labels` | 元素列表[, 每种元素的离子数] | |
//!
//! ## 依赖关系
//! - 被 `mapping/binding.rs`, `mapping/scope.rs` 使用
//! - 使用 `grammar/value.rs`, `tree/path.rs`

use super::scope::Scope;
use crate::error::{Result, VaspError};
use crate::grammar::{Mapping, Scalar, Value};
use crate::tree::Path;

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// 内置变换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    MixAlpha,
    Lookup,
    XcFunctionals,
    Data,
    Eigenvalues,
    EigenvalueSets,
    EnergyContributions,
    Version,
    CartesianPositions,
    IonicPositions,
    Labels,
}

const TRANSFORMS: [(&str, Transform); 11] = [
    ("mix_alpha", Transform::MixAlpha),
    ("lookup", Transform::Lookup),
    ("get_xc_functionals", Transform::XcFunctionals),
    ("data", Transform::Data),
    ("get_eigenvalues", Transform::Eigenvalues),
    ("get_eigenvalue_sets", Transform::EigenvalueSets),
    ("get_energy_contributions", Transform::EnergyContributions),
    ("get_version", Transform::Version),
    ("cartesian_positions", Transform::CartesianPositions),
    ("get_ionic_positions", Transform::IonicPositions),
    ("get_labels", Transform::Labels),
];

/// 浮点参数比较容差
const PARAM_TOLERANCE: f64 = 1e-6;

impl FromStr for Transform {
    type Err = VaspError;

    fn from_str(s: &str) -> Result<Self> {
        TRANSFORMS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, t)| *t)
            .ok_or_else(|| VaspError::UnknownTransform(s.to_string()))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Transform {
    pub fn name(&self) -> &'static str {
        TRANSFORMS
            .iter()
            .find(|(_, t)| t == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Transform::MixAlpha | Transform::CartesianPositions => 2..=2,
            Transform::Data => 0..=1,
            Transform::Eigenvalues => 1..=3,
            Transform::Labels => 1..=2,
            Transform::IonicPositions => 4..=4,
            _ => 1..=1,
        }
    }

    fn allowed_kwargs(&self) -> &'static [&'static str] {
        match self {
            Transform::Lookup => &["table", "default"],
            Transform::Data => &["path", "value"],
            Transform::EnergyContributions => &["exclude"],
            _ => &[],
        }
    }

    /// 构建时校验
    pub fn validate(&self, n_inputs: usize, kwargs: &Mapping) -> Result<()> {
        let arity = self.arity();
        if !arity.contains(&n_inputs) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else {
                format!("{}..={}", arity.start(), arity.end())
            };
            return Err(VaspError::TransformArity {
                transform: self.name().to_string(),
                expected,
                got: n_inputs,
            });
        }

        let invalid = |reason: String| VaspError::InvalidKwargs {
            transform: self.name().to_string(),
            reason,
        };

        let allowed = self.allowed_kwargs();
        if let Some(key) = kwargs.keys().find(|k| !allowed.contains(k)) {
            return Err(invalid(format!("unexpected keyword '{}'", key)));
        }

        match self {
            Transform::Lookup => match kwargs.get("table") {
                Some(Value::Map(_)) => {}
                Some(_) => return Err(invalid("'table' must be a mapping".into())),
                None => return Err(invalid("missing 'table'".into())),
            },
            Transform::Data => {
                if let Some(path) = kwargs.get("path") {
                    let expr = match path.as_scalar() {
                        Some(Scalar::Str(s)) => s,
                        _ => return Err(invalid("'path' must be a string".into())),
                    };
                    Path::parse(expr)?;
                }
                if n_inputs == 0 && kwargs.is_empty() {
                    return Err(invalid("needs an input, 'path' or 'value'".into()));
                }
            }
            Transform::EnergyContributions => {
                if let Some(exclude) = kwargs.get("exclude") {
                    let names_ok = exclude
                        .as_seq()
                        .map_or(false, |items| items.iter().all(|v| v.as_text().is_some()));
                    if !names_ok {
                        return Err(invalid("'exclude' must be a list of names".into()));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// 求值；任何必需输入缺失时返回 `None`
    pub fn apply(&self, inputs: &[Option<Value>], kwargs: &Mapping, scope: &Scope<'_>) -> Option<Value> {
        let input = |i: usize| inputs.get(i).and_then(Option::as_ref);
        match self {
            Transform::MixAlpha => mix_alpha(input(0), input(1)),
            Transform::Lookup => lookup(input(0)?, kwargs),
            Transform::XcFunctionals => {
                let names = xc_functionals(input(0)?.as_map()?);
                Some(Value::Seq(
                    names
                        .into_iter()
                        .map(|n| Value::Map([("name", Value::str(n))].into_iter().collect()))
                        .collect(),
                ))
            }
            Transform::Data => data(input(0), kwargs, scope),
            Transform::Eigenvalues => eigenvalues(
                input(0)?,
                input(1).and_then(Value::as_map),
                input(2).and_then(Value::as_i64),
            ),
            Transform::EigenvalueSets => eigenvalue_sets(input(0)?),
            Transform::EnergyContributions => energy_contributions(input(0)?.as_map()?, kwargs),
            Transform::Version => version(input(0)?.as_map()?),
            Transform::CartesianPositions => cartesian_positions(input(0)?, input(1)?),
            Transform::IonicPositions => ionic_positions(input(0), input(1), input(2), input(3)),
            Transform::Labels => labels(input(0)?, input(1)),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 各变换实现
// ─────────────────────────────────────────────────────────────

/// 杂化时取混合系数，否则为 0；系数本身缺失时结果缺失
fn mix_alpha(mix: Option<&Value>, is_hybrid: Option<&Value>) -> Option<Value> {
    let mix = mix?.as_f64()?;
    if is_hybrid.and_then(Value::as_bool).unwrap_or(false) {
        Some(Value::float(mix))
    } else {
        Some(Value::float(0.0))
    }
}

/// 查表；未命中时取 `default`，再退回原值
fn lookup(code: &Value, kwargs: &Mapping) -> Option<Value> {
    let key = code.as_text()?;
    let table = kwargs.get("table").and_then(Value::as_map)?;
    table
        .get(&key)
        .or_else(|| kwargs.get("default"))
        .cloned()
        .or_else(|| Some(code.clone()))
}

/// 源值优先（映射带 `value` 时取之），其次按 `path` 在当前作用域求值，最后取常量 `value`
fn data(source: Option<&Value>, kwargs: &Mapping, scope: &Scope<'_>) -> Option<Value> {
    if let Some(source) = source {
        match source.as_map().and_then(|m| m.get("value")) {
            Some(inner) => return Some(inner.clone()),
            None => return Some(source.clone()),
        }
    }
    let from_path = kwargs
        .get("path")
        .and_then(Value::as_text)
        .and_then(|expr| Path::parse(&expr).ok())
        .and_then(|path| scope.evaluate(&path));
    from_path.or_else(|| kwargs.get("value").cloned())
}

fn group(spin_channel: usize, eigenvalues: Vec<Vec<f64>>, occupations: Vec<Vec<f64>>) -> Value {
    let n_bands = eigenvalues.first().map_or(0, Vec::len);
    let matrix = |rows: Vec<Vec<f64>>| {
        Value::Seq(
            rows.into_iter()
                .map(|r| Value::Seq(r.into_iter().map(Value::float).collect()))
                .collect(),
        )
    };
    let mut m = Mapping::new();
    m.insert("spin_channel", Value::int(spin_channel as i64));
    m.insert("n_bands", Value::int(n_bands as i64));
    m.insert("eigenvalues", matrix(eigenvalues));
    m.insert("occupations", matrix(occupations));
    Value::Map(m)
}

/// OUTCAR：每个 k 点一行 `(序号, 本征值, 占据数)*n_bands`，按 ISPIN 均分为自旋通道
///
/// 给出 NBANDS 时与表宽核对，不一致只记录警告。
fn eigenvalues(flat: &Value, parameters: Option<&Mapping>, nbands: Option<i64>) -> Option<Value> {
    let ispin = parameters
        .and_then(|p| p.get("ISPIN"))
        .and_then(Value::as_i64)
        .filter(|&n| n >= 1)
        .unwrap_or(1) as usize;

    let rows: Vec<Vec<f64>> = flat.as_seq()?.iter().map(Value::to_f64_vec).collect::<Option<_>>()?;
    if rows.is_empty() || rows.len() % ispin != 0 {
        tracing::warn!(
            kpoints = rows.len(),
            ispin,
            "eigenvalue blocks do not split evenly over spin channels"
        );
        return None;
    }
    let width = rows[0].len();
    if width == 0 || width % 3 != 0 || rows.iter().any(|r| r.len() != width) {
        tracing::warn!(width, "ragged eigenvalue table");
        return None;
    }
    if let Some(declared) = nbands.filter(|&n| n != (width / 3) as i64) {
        tracing::warn!(declared, found = width / 3, "band count differs from NBANDS");
    }

    let n_kpts = rows.len() / ispin;
    let groups = rows
        .chunks(n_kpts)
        .enumerate()
        .map(|(spin, kpoints)| {
            let eigs: Vec<Vec<f64>> = kpoints
                .iter()
                .map(|r| r.chunks(3).map(|b| b[1]).collect())
                .collect();
            let occs: Vec<Vec<f64>> = kpoints
                .iter()
                .map(|r| r.chunks(3).map(|b| b[2]).collect())
                .collect();
            group(spin, eigs, occs)
        })
        .collect();
    Some(Value::Seq(groups))
}

/// vasprun：`set(spin)/set(kpoint)/r[eig occ]`
fn eigenvalue_sets(sets: &Value) -> Option<Value> {
    let spins = sets.as_seq()?;
    let mut groups = Vec::new();
    for (spin, kpoints) in spins.iter().enumerate() {
        let mut eigs: Vec<Vec<f64>> = Vec::new();
        let mut occs: Vec<Vec<f64>> = Vec::new();
        for kpoint in kpoints.as_seq()? {
            let bands = kpoint.to_f64_matrix()?;
            eigs.push(bands.iter().filter_map(|b| b.first().copied()).collect());
            occs.push(bands.iter().filter_map(|b| b.get(1).copied()).collect());
        }
        groups.push(group(spin, eigs, occs));
    }
    (!groups.is_empty()).then_some(Value::Seq(groups))
}

fn energy_contributions(source: &Mapping, kwargs: &Mapping) -> Option<Value> {
    let exclude: Vec<String> = kwargs
        .get("exclude")
        .and_then(Value::as_seq)
        .map(|items| items.iter().filter_map(Value::as_text).collect())
        .unwrap_or_default();

    let items = source
        .iter()
        .filter(|(name, _)| !exclude.iter().any(|e| e == name))
        .map(|(name, value)| {
            let mut m = Mapping::new();
            m.insert("name", Value::str(name));
            if let Some(x) = value.as_f64() {
                m.insert("value", Value::float(x));
            }
            Value::Map(m)
        })
        .collect();
    Some(Value::Seq(items))
}

fn version(header: &Mapping) -> Option<Value> {
    let parts: Vec<String> = ["version", "subversion", "platform"]
        .iter()
        .filter_map(|k| header.get(k).and_then(Value::as_text))
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| Value::str(parts.join(" ")))
}

fn cartesian_positions(frac: &Value, basis: &Value) -> Option<Value> {
    let frac = frac.to_vec3s()?;
    let basis = basis.to_matrix3()?;
    Some(Value::Seq(
        frac.iter()
            .map(|f| {
                let c = frac_to_cart(*f, &basis);
                Value::Seq(c.iter().map(|&x| Value::float(x)).collect())
            })
            .collect(),
    ))
}

/// OUTCAR 坐标：离子步内的 POSITION 表优先，其次初始 `(Angst)` 块，
/// 最后把近邻表的分数坐标按初始基矢换算
fn ionic_positions(
    step: Option<&Value>,
    initial: Option<&Value>,
    direct: Option<&Value>,
    basis: Option<&Value>,
) -> Option<Value> {
    if let Some(cartesian) = step.or(initial) {
        return Some(cartesian.clone());
    }
    let converted = cartesian_positions(direct?, basis?);
    if converted.is_some() {
        tracing::debug!("positions converted from direct coordinates");
    }
    converted
}

/// 元素符号按原子展开
///
/// 给出离子数时按种类重复（OUTCAR），否则每个元素即一个原子；
/// 元素为行时取首列（vasprun `atoms` 表）。
fn labels(species: &Value, counts: Option<&Value>) -> Option<Value> {
    let symbols: Vec<String> = species
        .as_seq()?
        .iter()
        .map(|row| match row {
            Value::Seq(columns) => columns.first().and_then(symbol),
            other => symbol(other),
        })
        .collect::<Option<_>>()?;

    let expanded: Vec<String> = match counts {
        None => symbols,
        Some(counts) => {
            let counts = counts.to_i64_vec()?;
            if counts.len() != symbols.len() || counts.iter().any(|&n| n < 0) {
                tracing::warn!(
                    species = symbols.len(),
                    counts = counts.len(),
                    "ion counts do not match species"
                );
                return None;
            }
            symbols
                .iter()
                .zip(&counts)
                .flat_map(|(s, &n)| std::iter::repeat(s.clone()).take(n as usize))
                .collect()
        }
    };
    (!expanded.is_empty()).then(|| Value::Seq(expanded.into_iter().map(Value::str).collect()))
}

/// 单字母元素 `F` / `T` 在无类型标注时会被推断为布尔
fn symbol(value: &Value) -> Option<String> {
    match value.as_scalar()? {
        Scalar::Bool(true) => Some("T".to_string()),
        Scalar::Bool(false) => Some("F".to_string()),
        other => Some(other.to_string().trim().to_string()).filter(|s| !s.is_empty()),
    }
}

fn frac_to_cart(frac: [f64; 3], m: &[[f64; 3]; 3]) -> [f64; 3] {
    [
        frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
        frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
        frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
    ]
}

// ─────────────────────────────────────────────────────────────
// 交换关联泛函
// ─────────────────────────────────────────────────────────────

/// GGA / METAGGA 代码 → LibXC 名称
fn libxc_names(code: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match code {
        "--" | "PE" | "PBE" => &["GGA_X_PBE", "GGA_C_PBE"],
        "HL" => &["LDA_C_HL"],
        "WI" => &["LDA_C_WIGNER"],
        "PZ" => &["LDA_C_PZ"],
        "91" => &["GGA_X_PW91", "GGA_C_PW91"],
        "RE" => &["GGA_X_PBE_R"],
        "VW" => &["LDA_C_VWN"],
        "RP" => &["GGA_X_RPBE", "GGA_C_PBE"],
        "PS" => &["GGA_C_PBE_SOL", "GGA_X_PBE_SOL"],
        "AM" => &["GGA_X_AM05", "GGA_C_AM05"],
        "B3" => &["HYB_GGA_XC_B3LYP3"],
        "B5" => &["HYB_GGA_XC_B3LYP5"],
        "BF" => &["GGA_X_BEEFVDW", "GGA_XC_BEEFVDW"],
        "OR" => &["GGA_X_OPTPBE_VDW"],
        "BO" => &["GGA_X_OPTB88_VDW"],
        "MK" => &["GGA_X_OPTB86B_VDW"],
        "ML" => &["VDW_XC_DF2"],
        "CX" => &["VDW_XC_DF_CX"],
        "TPSS" => &["MGGA_X_TPSS", "MGGA_C_TPSS"],
        "RTPSS" => &["MGGA_X_RTPSS"],
        "M06L" => &["MGGA_C_M06_L"],
        "MS0" => &["MGGA_X_MS0"],
        "MS1" => &["MGGA_X_MS1"],
        "MS2" => &["MGGA_X_MS2"],
        "SCAN" => &["MGGA_X_SCAN"],
        "RSCAN" => &["MGGA_X_RSCAN", "MGGA_C_RSCAN"],
        "R2SCAN" => &["MGGA_X_R2SCAN", "MGGA_C_R2SCAN"],
        "SCANL" => &["MGGA_X_SCANL", "MGGA_C_SCANL"],
        "R2SCANL" => &["MGGA_X_R2SCANL", "MGGA_C_R2SCANL"],
        "MBJ" => &["MGGA_X_BJ06"],
        "HLE17" => &["MGGA_XC_HLE17"],
        "RA" => &["LDA_C_PW_RPA"],
        // 已知代码，但 LibXC 中无对应
        "CO" | "RSCANL" | "OFR2" | "LBMJ" => &[],
        _ => return None,
    };
    Some(names)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < PARAM_TOLERANCE
}

/// 由 INCAR 参数推断泛函
pub fn xc_functionals(params: &Mapping) -> Vec<String> {
    let text = |key: &str| params.get(key).and_then(Value::as_text);
    let num = |key: &str, default: f64| params.get(key).and_then(Value::as_f64).unwrap_or(default);

    let is_hybrid = params.get("LHFCALC").and_then(Value::as_bool) == Some(true);
    if is_hybrid {
        let gga = text("GGA").unwrap_or_else(|| "PE".to_string());
        let aexx = num("AEXX", 0.0);
        let aggax = num("AGGAX", 1.0);
        let aggac = num("AGGAC", 1.0);
        let aldac = num("ALDAC", 1.0);
        let hfscreen = num("HFSCREEN", 0.0);

        let name = if close(hfscreen, 0.2) {
            "HYB_GGA_XC_HSE06".to_string()
        } else if close(hfscreen, 0.3) {
            "HYB_GGA_XC_HSE03".to_string()
        } else if gga == "B3"
            && close(aexx, 0.2)
            && close(aggax, 0.72)
            && close(aggac, 0.81)
            && close(aldac, 0.19)
        {
            "HYB_GGA_XC_B3LYP3".to_string()
        } else if close(aexx, 1.0) && close(aldac, 0.0) && close(aggac, 0.0) {
            "HF_X".to_string()
        } else if gga == "PE" {
            "HYB_GGA_XC_PBEH".to_string()
        } else {
            format!("HYB_GGA_XC_{}", gga)
        };
        return vec![name];
    }

    // METAGGA 未设置时 OUTCAR 写 `--` 或 `F`
    let metagga = params
        .get("METAGGA")
        .filter(|v| v.as_bool() != Some(false))
        .and_then(Value::as_text)
        .filter(|s| !s.is_empty() && s != "--" && !s.eq_ignore_ascii_case("none"));

    let names: Vec<&str> = match metagga {
        Some(code) => match libxc_names(&code) {
            Some(names) => names.to_vec(),
            None => return vec![code],
        },
        None => text("GGA")
            .and_then(|code| libxc_names(&code))
            .map(<[&str]>::to_vec)
            .unwrap_or_default(),
    };
    names.into_iter().map(str::to_string).collect()
}
