//! # 数据模型模块
//!
//! 模拟结果对象图、物理单位与归档容器。
//!
//! ## 依赖关系
//! - 被 `mapping/`, `normalizer.rs`, `pipeline.rs`, `commands/` 使用
//! - 子模块: simulation, units, archive

pub mod archive;
pub mod simulation;
pub mod units;

pub use archive::{Archive, EntryMetadata};
pub use simulation::{
    AtomicCell, ContributionKind, Dft, ElectronicEigenvalues, EnergyContribution, KMesh,
    ModelSystem, Outputs, Program, Simulation, TotalEnergy, XcFunctional, UNKNOWN_ENERGY,
};
pub use units::{FloatEq, Measured, Unit};
