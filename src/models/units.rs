//! # 物理单位
//!
//! 绑定声明的单位在构建时解析为枚举；投影层只做标注，不做换算。
//!
//! ## 依赖关系
//! - 被 `models/simulation.rs`, `mapping/` 使用

use crate::error::{Result, VaspError};

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 支持的物理单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    ElectronVolt,
    Angstrom,
    InverseAngstrom,
    ElectronVoltPerAngstrom,
    KiloBar,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::ElectronVolt => "eV",
            Unit::Angstrom => "angstrom",
            Unit::InverseAngstrom => "1/angstrom",
            Unit::ElectronVoltPerAngstrom => "eV/angstrom",
            Unit::KiloBar => "kbar",
        }
    }
}

impl FromStr for Unit {
    type Err = VaspError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "eV" | "electron_volt" => Ok(Unit::ElectronVolt),
            "angstrom" | "Angstrom" | "Å" => Ok(Unit::Angstrom),
            "1/angstrom" | "1/Angstrom" => Ok(Unit::InverseAngstrom),
            "eV/angstrom" | "eV/Angstrom" | "eV/Angst" => Ok(Unit::ElectronVoltPerAngstrom),
            "kbar" | "kB" | "kilobar" => Ok(Unit::KiloBar),
            other => Err(VaspError::UnknownUnit(other.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// 带单位的物理量
///
/// 相等比较见 [`FloatEq`]：本征值溢出记为 NaN，同一文件重复解析结果仍相等。
#[derive(Debug, Clone, Serialize)]
pub struct Measured<T> {
    pub magnitude: T,
    pub unit: Unit,
}

impl<T> Measured<T> {
    pub fn new(magnitude: T, unit: Unit) -> Self {
        Self { magnitude, unit }
    }
}

impl<T: FloatEq> PartialEq for Measured<T> {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.magnitude.float_eq(&other.magnitude)
    }
}

// ─────────────────────────────────────────────────────────────
// NaN 相等
// ─────────────────────────────────────────────────────────────

/// 浮点相等，NaN 与 NaN 视为相等
pub trait FloatEq {
    fn float_eq(&self, other: &Self) -> bool;
}

impl FloatEq for f64 {
    fn float_eq(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl<T: FloatEq> FloatEq for [T] {
    fn float_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.float_eq(b))
    }
}

impl<T: FloatEq, const N: usize> FloatEq for [T; N] {
    fn float_eq(&self, other: &Self) -> bool {
        self.as_slice().float_eq(other.as_slice())
    }
}

impl<T: FloatEq> FloatEq for Vec<T> {
    fn float_eq(&self, other: &Self) -> bool {
        self.as_slice().float_eq(other.as_slice())
    }
}
