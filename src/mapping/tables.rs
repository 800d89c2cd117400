//! # 内置绑定表
//!
//! 三种布局各一张表：
//! - `outcar`：文法产出的映射树，逐离子步（`calculation`）输出
//! - `vasprun_v1`：XML 树，相对 `<modeling>` 的路径，逐 `<calculation>` 输出
//! - `vasprun_v2`：XML 树，绝对路径与后代搜索，只取最终结构与最后一个 `<calculation>`
//!
//! ## 依赖关系
//! - 被 `mapping/binding.rs`（`Registry::standard`）使用

use super::binding::{Binding, BindingTable, Input};
use super::field::Field;
use crate::error::Result;
use crate::grammar::{Mapping, Value};
use crate::parsers::Variant;

/// vasprun 能量块中不是分项的条目
const VASPRUN_ENERGY_TOTALS: [&str; 3] = ["e_fr_energy", "e_wo_entrp", "e_0_energy"];

const XC_SEPARATOR: &str = r#"separator[@name="electronic exchange-correlation"]"#;

fn kwargs(pairs: Vec<(&str, Value)>) -> Mapping {
    pairs.into_iter().collect()
}

fn path(expr: &str) -> Result<Input> {
    Input::path(expr)
}

/// 三种布局共用：本征值组、能量分项内部字段
fn shared(table: BindingTable) -> Result<BindingTable> {
    Ok(table
        .bind(Field::XcLibxcName, Binding::path("name")?)
        .bind(Field::ContributionName, Binding::path("name")?)
        .bind(Field::ContributionValue, Binding::path("value")?.unit("eV")?)
        .bind(Field::EigenvalueSpin, Binding::path("spin_channel")?)
        .bind(Field::EigenvalueNBands, Binding::path("n_bands")?)
        .bind(Field::EigenvalueValues, Binding::path("eigenvalues")?.unit("eV")?)
        .bind(Field::EigenvalueOccupations, Binding::path("occupations")?))
}

pub fn outcar() -> Result<BindingTable> {
    let table = BindingTable::new(Variant::Outcar)
        // 程序
        .bind(
            Field::ProgramName,
            Binding::transform_with("data", vec![], kwargs(vec![("value", Value::str("VASP"))]))?,
        )
        .bind(
            Field::ProgramVersion,
            Binding::transform("get_version", vec![path("header")?])?,
        )
        .bind(Field::ProgramCompilationHost, Binding::path("header/platform")?)
        // 方法
        .bind(Field::DftIsHybrid, Binding::path("parameters/LHFCALC")?)
        .bind(
            Field::ExactExchangeMixing,
            Binding::transform(
                "mix_alpha",
                vec![path("parameters/AEXX")?, Input::Field(Field::DftIsHybrid)],
            )?,
        )
        .bind(
            Field::XcFunctionals,
            Binding::transform("get_xc_functionals", vec![path("parameters")?])?,
        )
        .bind(Field::KMeshPoints, Binding::path("kpoints/points")?)
        .bind(Field::KMeshWeights, Binding::path("kpoints/weights")?)
        // 结构：离子步内缺失时退回初始结构
        .bind(Field::ModelSystem, Binding::path("calculation")?)
        .bind(
            Field::Labels,
            Binding::transform("get_labels", vec![path("/species")?, path("/ions_per_type")?])?,
        )
        .bind(
            Field::Positions,
            Binding::transform(
                "get_ionic_positions",
                vec![
                    path("positions_forces/0")?,
                    path("/positions")?,
                    path("/positions_direct")?,
                    path("/lattice_vectors/0")?,
                ],
            )?
            .unit("angstrom")?,
        )
        .bind(
            Field::LatticeVectors,
            Binding::transform_with(
                "data",
                vec![path("lattice_vectors/0")?],
                kwargs(vec![("path", Value::str("/lattice_vectors/0"))]),
            )?
            .unit("angstrom")?,
        )
        .bind(
            Field::ReciprocalLatticeVectors,
            Binding::path("lattice_vectors/1")?.unit("1/angstrom")?,
        )
        // 输出
        .bind(Field::Outputs, Binding::path("calculation")?)
        .bind(
            Field::TotalEnergyValue,
            Binding::path("energies/energy_total")?.unit("eV")?,
        )
        .bind(
            Field::Contributions,
            Binding::transform(
                "get_energy_contributions",
                vec![path("scf_iteration[-1]/energy_components")?],
            )?,
        )
        .bind(Field::FermiLevel, Binding::path("fermi_energy")?.unit("eV")?)
        .bind(
            Field::TotalForces,
            Binding::path("positions_forces/1")?.unit("eV/angstrom")?,
        )
        .bind(Field::Stress, Binding::path("stress")?.unit("kbar")?)
        .bind(
            Field::IsConverged,
            Binding::transform_with(
                "lookup",
                vec![path("converged")?],
                kwargs(vec![(
                    "table",
                    Value::Map(kwargs(vec![("EDIFF is reached", Value::bool(true))])),
                )]),
            )?,
        )
        .bind(
            Field::ElectronicEigenvalues,
            Binding::transform(
                "get_eigenvalues",
                vec![path("eigenvalues")?, path("/parameters")?, path("/nbands")?],
            )?,
        );
    shared(table)
}

fn program_name() -> Result<Binding> {
    Binding::transform_with(
        "lookup",
        vec![path(r#"i[@name="program"]/$"#)?],
        kwargs(vec![(
            "table",
            Value::Map(kwargs(vec![("vasp", Value::str("VASP"))])),
        )]),
    )
}

fn contributions(energy: &str) -> Result<Binding> {
    Binding::transform_with(
        "get_energy_contributions",
        vec![path(energy)?],
        kwargs(vec![(
            "exclude",
            Value::Seq(VASPRUN_ENERGY_TOTALS.iter().map(|n| Value::str(*n)).collect()),
        )]),
    )
}

/// 晶胞内字段（上下文为 `<structure>`）
fn structure_fields(table: BindingTable) -> Result<BindingTable> {
    Ok(table
        .bind(
            Field::Positions,
            Binding::transform(
                "cartesian_positions",
                vec![
                    path(r#"varray[@name="positions"]/$"#)?,
                    path(r#"crystal/varray[@name="basis"]/$"#)?,
                ],
            )?
            .unit("angstrom")?,
        )
        .bind(
            Field::LatticeVectors,
            Binding::path(r#"crystal/varray[@name="basis"]/$"#)?.unit("angstrom")?,
        )
        .bind(
            Field::ReciprocalLatticeVectors,
            Binding::path(r#"crystal/varray[@name="rec_basis"]/$"#)?.unit("1/angstrom")?,
        ))
}

/// k 点字段（上下文为 `<kpoints>`）
fn kpoint_fields(table: BindingTable) -> Result<BindingTable> {
    Ok(table
        .bind(Field::KMeshGrid, Binding::path(r#"generation/v[@name="divisions"]/$"#)?)
        .bind(Field::KMeshOffset, Binding::path(r#"generation/v[@name="shift"]/$"#)?)
        .bind(Field::KMeshPoints, Binding::path(r#"varray[@name="kpointlist"]/$"#)?)
        .bind(Field::KMeshWeights, Binding::path(r#"varray[@name="weights"]/$"#)?))
}

pub fn vasprun_v1() -> Result<BindingTable> {
    let xc = format!(".//{}", XC_SEPARATOR);
    let table = BindingTable::new(Variant::VasprunV1)
        .bind(Field::Simulation, Binding::path("modeling")?)
        .bind(Field::Program, Binding::path("generator")?)
        .bind(Field::ProgramName, program_name()?)
        .bind(Field::ProgramVersion, Binding::path(r#"i[@name="version"]/$"#)?)
        .bind(Field::ProgramCompilationHost, Binding::path(r#"i[@name="platform"]/$"#)?)
        .bind(Field::ModelMethod, Binding::path("parameters")?)
        .bind(
            Field::DftIsHybrid,
            Binding::path(&format!(r#"{}/i[@name="LHFCALC"]/$"#, xc))?,
        )
        .bind(
            Field::ExactExchangeMixing,
            Binding::transform(
                "mix_alpha",
                vec![
                    path(&format!(r#"{}/i[@name="HFALPHA"]/$"#, xc))?,
                    Input::Field(Field::DftIsHybrid),
                ],
            )?,
        )
        .bind(
            Field::XcFunctionals,
            Binding::transform("get_xc_functionals", vec![path(&format!("{}/$", xc))?])?,
        )
        .bind(Field::NumericalSettings, Binding::path("/modeling/kpoints")?)
        .bind(Field::ModelSystem, Binding::path("calculation")?)
        .bind(Field::Cell, Binding::path("structure")?)
        .bind(
            Field::Labels,
            Binding::transform(
                "get_labels",
                vec![path(r#"/modeling/atominfo/array[@name="atoms"]/set/$"#)?],
            )?,
        )
        .bind(Field::Outputs, Binding::path("calculation")?)
        .bind(
            Field::TotalEnergyValue,
            Binding::path(r#"energy/i[@name="e_fr_energy"]/$"#)?.unit("eV")?,
        )
        .bind(Field::Contributions, contributions("energy/$")?)
        .bind(
            Field::FermiLevel,
            Binding::path(r#"dos/i[@name="efermi"]/$"#)?.unit("eV")?,
        )
        .bind(
            Field::TotalForces,
            Binding::path(r#"varray[@name="forces"]/$"#)?.unit("eV/angstrom")?,
        )
        .bind(
            Field::Stress,
            Binding::path(r#"varray[@name="stress"]/$"#)?.unit("kbar")?,
        )
        .bind(
            Field::ElectronicEigenvalues,
            Binding::transform("get_eigenvalue_sets", vec![path("eigenvalues/array/set/$")?])?,
        );
    shared(kpoint_fields(structure_fields(table)?)?)
}

pub fn vasprun_v2() -> Result<BindingTable> {
    let xc = format!("//parameters//{}", XC_SEPARATOR);
    let table = BindingTable::new(Variant::VasprunV2)
        .bind(Field::Simulation, Binding::path("/*")?)
        .bind(Field::Program, Binding::path("//generator")?)
        .bind(Field::ProgramName, program_name()?)
        .bind(Field::ProgramVersion, Binding::path(r#"i[@name="version"]/$"#)?)
        .bind(Field::ProgramCompilationHost, Binding::path(r#"i[@name="platform"]/$"#)?)
        .bind(Field::ModelMethod, Binding::path("//parameters")?)
        .bind(
            Field::DftIsHybrid,
            Binding::path(&format!(r#"{}/i[@name="LHFCALC"]/$"#, xc))?,
        )
        .bind(
            Field::ExactExchangeMixing,
            Binding::transform(
                "mix_alpha",
                vec![
                    path(&format!(r#"{}/i[@name="HFALPHA"]/$"#, xc))?,
                    Input::Field(Field::DftIsHybrid),
                ],
            )?,
        )
        .bind(
            Field::XcFunctionals,
            Binding::transform("get_xc_functionals", vec![path(&format!("{}/$", xc))?])?,
        )
        .bind(Field::NumericalSettings, Binding::path("//kpoints[0]")?)
        .bind(Field::ModelSystem, Binding::path(r#"//structure[@name="finalpos"]"#)?)
        .bind(
            Field::Labels,
            Binding::transform(
                "get_labels",
                vec![path(r#"//atominfo/array[@name="atoms"]/set/$"#)?],
            )?,
        )
        .bind(Field::Outputs, Binding::path("/modeling/calculation[-1]")?)
        .bind(
            Field::TotalEnergyValue,
            Binding::path(r#".//energy[-1]/i[@name="e_fr_energy"]/$"#)?.unit("eV")?,
        )
        .bind(Field::Contributions, contributions(".//energy[-1]/$")?)
        .bind(
            Field::FermiLevel,
            Binding::path(r#".//i[@name="efermi"]/$"#)?.unit("eV")?,
        )
        .bind(
            Field::TotalForces,
            Binding::path(r#"varray[@name="forces"]/$"#)?.unit("eV/angstrom")?,
        )
        .bind(
            Field::Stress,
            Binding::path(r#"varray[@name="stress"]/$"#)?.unit("kbar")?,
        )
        .bind(
            Field::ElectronicEigenvalues,
            Binding::transform(
                "get_eigenvalue_sets",
                vec![path(".//eigenvalues/array/set/$")?],
            )?,
        );
    shared(kpoint_fields(structure_fields(table)?)?)
}
