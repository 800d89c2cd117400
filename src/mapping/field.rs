//! # 目标字段
//!
//! 模拟结果对象图中可被绑定的位置。段字段（section）产出零个或多个
//! 子作用域，值字段产出单个值。
//!
//! ## 依赖关系
//! - 被 `mapping/binding.rs`, `mapping/scope.rs`, `mapping/project.rs`, `mapping/tables.rs` 使用

use crate::models::Unit;

use std::fmt;

/// 可绑定的目标字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // 段
    Simulation,
    Program,
    ModelMethod,
    XcFunctionals,
    NumericalSettings,
    ModelSystem,
    Cell,
    Outputs,
    TotalEnergy,
    Contributions,
    ElectronicEigenvalues,

    // 值
    ProgramName,
    ProgramVersion,
    ProgramCompilationHost,
    DftIsHybrid,
    ExactExchangeMixing,
    XcLibxcName,
    KMeshGrid,
    KMeshOffset,
    KMeshPoints,
    KMeshWeights,
    Labels,
    Positions,
    LatticeVectors,
    ReciprocalLatticeVectors,
    TotalEnergyValue,
    ContributionName,
    ContributionValue,
    FermiLevel,
    TotalForces,
    Stress,
    IsConverged,
    EigenvalueSpin,
    EigenvalueNBands,
    EigenvalueValues,
    EigenvalueOccupations,
}

impl Field {
    /// 对象图中的限定名，用于日志
    pub fn qualified_name(&self) -> &'static str {
        match self {
            Field::Simulation => "simulation",
            Field::Program => "simulation.program",
            Field::ModelMethod => "simulation.model_method",
            Field::XcFunctionals => "model_method.xc_functionals",
            Field::NumericalSettings => "model_method.numerical_settings",
            Field::ModelSystem => "simulation.model_system",
            Field::Cell => "model_system.cell",
            Field::Outputs => "simulation.outputs",
            Field::TotalEnergy => "outputs.total_energy",
            Field::Contributions => "total_energy.contributions",
            Field::ElectronicEigenvalues => "outputs.electronic_eigenvalues",
            Field::ProgramName => "program.name",
            Field::ProgramVersion => "program.version",
            Field::ProgramCompilationHost => "program.compilation_host",
            Field::DftIsHybrid => "model_method.is_hybrid",
            Field::ExactExchangeMixing => "model_method.exact_exchange_mixing_factor",
            Field::XcLibxcName => "xc_functional.libxc_name",
            Field::KMeshGrid => "k_mesh.grid",
            Field::KMeshOffset => "k_mesh.offset",
            Field::KMeshPoints => "k_mesh.points",
            Field::KMeshWeights => "k_mesh.weights",
            Field::Labels => "cell.labels",
            Field::Positions => "cell.positions",
            Field::LatticeVectors => "cell.lattice_vectors",
            Field::ReciprocalLatticeVectors => "cell.reciprocal_lattice_vectors",
            Field::TotalEnergyValue => "total_energy.value",
            Field::ContributionName => "contribution.name",
            Field::ContributionValue => "contribution.value",
            Field::FermiLevel => "outputs.fermi_level",
            Field::TotalForces => "outputs.total_forces",
            Field::Stress => "outputs.stress",
            Field::IsConverged => "outputs.is_converged",
            Field::EigenvalueSpin => "electronic_eigenvalues.spin_channel",
            Field::EigenvalueNBands => "electronic_eigenvalues.n_bands",
            Field::EigenvalueValues => "electronic_eigenvalues.value",
            Field::EigenvalueOccupations => "electronic_eigenvalues.occupation",
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(
            self,
            Field::Simulation
                | Field::Program
                | Field::ModelMethod
                | Field::XcFunctionals
                | Field::NumericalSettings
                | Field::ModelSystem
                | Field::Cell
                | Field::Outputs
                | Field::TotalEnergy
                | Field::Contributions
                | Field::ElectronicEigenvalues
        )
    }

    /// 绑定未声明单位时使用的缺省单位
    pub fn schema_unit(&self) -> Option<Unit> {
        match self {
            Field::Positions | Field::LatticeVectors => Some(Unit::Angstrom),
            Field::ReciprocalLatticeVectors => Some(Unit::InverseAngstrom),
            Field::TotalEnergyValue
            | Field::ContributionValue
            | Field::FermiLevel
            | Field::EigenvalueValues => Some(Unit::ElectronVolt),
            Field::TotalForces => Some(Unit::ElectronVoltPerAngstrom),
            Field::Stress => Some(Unit::KiloBar),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
