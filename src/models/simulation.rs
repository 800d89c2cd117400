//! # 模拟结果对象图
//!
//! 投影层写入的目标结构：程序信息、DFT 方法、原子结构、输出量。
//! 每个被解析的文件对应一个 `Simulation`，允许部分字段缺失。
//!
//! ## 依赖关系
//! - 被 `mapping/project.rs`, `normalizer.rs`, `commands/` 使用
//! - 使用 `models/units.rs`

use super::units::{Measured, Unit};

use serde::Serialize;

/// 残差能量项的名称
pub const UNKNOWN_ENERGY: &str = "UnknownEnergy";

/// 一次模拟
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Simulation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<Program>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_method: Vec<Dft>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_system: Vec<ModelSystem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Outputs>,
}

impl Simulation {
    /// 最后一个带数值的总能
    pub fn final_total_energy(&self) -> Option<&Measured<f64>> {
        self.outputs
            .iter()
            .rev()
            .flat_map(|o| o.total_energy.iter())
            .find_map(|e| e.value.as_ref())
    }
}

/// 程序信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation_host: Option<String>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.version.is_none() && self.compilation_host.is_none()
    }
}

/// DFT 方法参数
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dft {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub xc_functionals: Vec<XcFunctional>,
    /// LHFCALC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hybrid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_exchange_mixing_factor: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numerical_settings: Vec<KMesh>,
}

impl Dft {
    pub fn is_empty(&self) -> bool {
        self.xc_functionals.is_empty()
            && self.is_hybrid.is_none()
            && self.exact_exchange_mixing_factor.is_none()
            && self.numerical_settings.is_empty()
    }
}

/// 交换关联泛函（LibXC 标识）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XcFunctional {
    pub libxc_name: String,
}

/// k 点网格
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KMesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

impl KMesh {
    pub fn is_empty(&self) -> bool {
        self.grid.is_none() && self.offset.is_none() && self.points.is_none() && self.weights.is_none()
    }
}

/// 模型体系（每个离子步或最终结构一个）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelSystem {
    pub cell: Vec<AtomicCell>,
}

/// 原子结构
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AtomicCell {
    /// 逐原子的元素符号，与 `positions` 同序
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Measured<Vec<[f64; 3]>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lattice_vectors: Option<Measured<[[f64; 3]; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reciprocal_lattice_vectors: Option<Measured<[[f64; 3]; 3]>>,
}

impl AtomicCell {
    pub fn is_empty(&self) -> bool {
        self.labels.is_none()
            && self.positions.is_none()
            && self.lattice_vectors.is_none()
            && self.reciprocal_lattice_vectors.is_none()
    }
}

/// 单个输出块（每个离子步或最终状态一个）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outputs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub total_energy: Vec<TotalEnergy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermi_level: Option<Measured<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_forces: Option<Measured<Vec<[f64; 3]>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<Measured<[[f64; 3]; 3]>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub electronic_eigenvalues: Vec<ElectronicEigenvalues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_converged: Option<bool>,
}

/// 总能及其分项
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalEnergy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Measured<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<EnergyContribution>,
}

/// 能量分项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Named,
    DoubleCounting,
    /// 由总能减去其余分项得到的残差
    Unknown,
}

/// 能量分项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyContribution {
    pub name: String,
    pub kind: ContributionKind,
    pub value: Option<Measured<f64>>,
}

impl EnergyContribution {
    /// 按名称归类的读取分项
    pub fn named(name: impl Into<String>, value: Option<Measured<f64>>) -> Self {
        let name = name.into();
        let kind = classify_contribution(&name);
        Self { name, kind, value }
    }

    /// 残差分项
    pub fn unknown(value: Option<f64>) -> Self {
        Self {
            name: UNKNOWN_ENERGY.to_string(),
            kind: ContributionKind::Unknown,
            value: value.map(|v| Measured::new(v, Unit::ElectronVolt)),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == ContributionKind::Unknown
    }
}

fn classify_contribution(name: &str) -> ContributionKind {
    match name {
        UNKNOWN_ENERGY => ContributionKind::Unknown,
        // OUTCAR: -Hartree energ DENC, -V(xc)+E(xc) XCENC；vasprun: hartreedc, XCdc, PAW dc
        "DENC" | "XCENC" | "hartreedc" | "XCdc" | "pawpsdc" | "pawaedc" => {
            ContributionKind::DoubleCounting
        }
        _ => ContributionKind::Named,
    }
}

/// 单个自旋通道的电子本征值
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElectronicEigenvalues {
    pub spin_channel: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_bands: Option<usize>,
    /// 形状 `(n_kpoints, n_bands)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Measured<Vec<Vec<f64>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<Vec<Vec<f64>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_classification() {
        assert_eq!(
            EnergyContribution::named("hartreedc", None).kind,
            ContributionKind::DoubleCounting
        );
        assert_eq!(
            EnergyContribution::named("TEWEN", None).kind,
            ContributionKind::Named
        );
        assert!(EnergyContribution::named(UNKNOWN_ENERGY, None).is_unknown());
    }

    #[test]
    fn test_final_total_energy_skips_unset() {
        let mut sim = Simulation::default();
        sim.outputs.push(Outputs {
            total_energy: vec![TotalEnergy {
                value: Some(Measured::new(-1.0, Unit::ElectronVolt)),
                contributions: vec![],
            }],
            ..Default::default()
        });
        sim.outputs.push(Outputs {
            total_energy: vec![TotalEnergy::default()],
            ..Default::default()
        });
        assert_eq!(sim.final_total_energy().unwrap().magnitude, -1.0);
    }

    #[test]
    fn test_empty_sections_not_serialized() {
        let json = serde_json::to_string(&Simulation::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
