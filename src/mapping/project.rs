//! # 投影
//!
//! 沿对象图自顶向下展开作用域，把绑定结果写入 `Simulation`。
//! 缺失的值只留空，不报错；空的 k 点网格、空原子结构、空本征值组、
//! 既无数值也无分项的总能不会写入。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs` 使用
//! - 使用 `mapping/scope.rs`, `models/simulation.rs`

use super::binding::BindingTable;
use super::field::Field;
use super::scope::Scope;
use crate::grammar::Value;
use crate::models::{
    AtomicCell, Dft, ElectronicEigenvalues, EnergyContribution, KMesh, ModelSystem, Outputs,
    Program, Simulation, TotalEnergy, XcFunctional,
};

/// 按绑定表把源树投影为模拟结果
pub fn project(table: &BindingTable, root: &Value) -> Simulation {
    let top = Scope::new(table, root);
    let Some(scope) = top.sections(Field::Simulation).into_iter().next() else {
        tracing::warn!(variant = %table.variant(), "simulation section not found in source");
        return Simulation::default();
    };

    let simulation = Simulation {
        program: scope
            .sections(Field::Program)
            .first()
            .map(program)
            .filter(|p| !p.is_empty()),
        model_method: scope
            .sections(Field::ModelMethod)
            .iter()
            .map(dft)
            .filter(|d| !d.is_empty())
            .collect(),
        model_system: scope
            .sections(Field::ModelSystem)
            .iter()
            .map(model_system)
            .filter(|m| !m.cell.is_empty())
            .collect(),
        outputs: scope.sections(Field::Outputs).iter().map(outputs).collect(),
    };

    tracing::debug!(
        model_systems = simulation.model_system.len(),
        outputs = simulation.outputs.len(),
        "projected simulation"
    );
    simulation
}

fn program(scope: &Scope<'_>) -> Program {
    Program {
        name: scope.text(Field::ProgramName),
        version: scope.text(Field::ProgramVersion),
        compilation_host: scope.text(Field::ProgramCompilationHost),
    }
}

fn dft(scope: &Scope<'_>) -> Dft {
    Dft {
        xc_functionals: scope
            .sections(Field::XcFunctionals)
            .iter()
            .filter_map(|s| s.text(Field::XcLibxcName))
            .map(|libxc_name| XcFunctional { libxc_name })
            .collect(),
        is_hybrid: scope.flag(Field::DftIsHybrid),
        exact_exchange_mixing_factor: scope.float(Field::ExactExchangeMixing),
        numerical_settings: scope
            .sections(Field::NumericalSettings)
            .iter()
            .map(k_mesh)
            .filter(|k| !k.is_empty())
            .collect(),
    }
}

fn k_mesh(scope: &Scope<'_>) -> KMesh {
    KMesh {
        grid: scope.get(Field::KMeshGrid, Value::to_i64_vec),
        offset: scope.get(Field::KMeshOffset, Value::to_f64_vec),
        points: scope.get(Field::KMeshPoints, Value::to_vec3s),
        weights: scope.get(Field::KMeshWeights, Value::to_f64_vec),
    }
}

fn model_system(scope: &Scope<'_>) -> ModelSystem {
    ModelSystem {
        cell: scope
            .sections(Field::Cell)
            .iter()
            .map(atomic_cell)
            .filter(|c| !c.is_empty())
            .collect(),
    }
}

fn atomic_cell(scope: &Scope<'_>) -> AtomicCell {
    AtomicCell {
        labels: scope.get(Field::Labels, |v| v.as_seq()?.iter().map(Value::as_text).collect()),
        positions: scope.measured(Field::Positions, Value::to_vec3s),
        lattice_vectors: scope.measured(Field::LatticeVectors, Value::to_matrix3),
        reciprocal_lattice_vectors: scope.measured(Field::ReciprocalLatticeVectors, Value::to_matrix3),
    }
}

fn outputs(scope: &Scope<'_>) -> Outputs {
    Outputs {
        total_energy: scope
            .sections(Field::TotalEnergy)
            .iter()
            .map(total_energy)
            .filter(|e| e.value.is_some() || !e.contributions.is_empty())
            .collect(),
        fermi_level: scope.measured(Field::FermiLevel, Value::as_f64),
        total_forces: scope.measured(Field::TotalForces, Value::to_vec3s),
        stress: scope.measured(Field::Stress, Value::to_matrix3),
        electronic_eigenvalues: scope
            .sections(Field::ElectronicEigenvalues)
            .iter()
            .map(eigenvalues)
            .filter(|e| e.value.is_some() || e.occupation.is_some())
            .collect(),
        is_converged: scope.flag(Field::IsConverged),
    }
}

fn total_energy(scope: &Scope<'_>) -> TotalEnergy {
    TotalEnergy {
        value: scope.measured(Field::TotalEnergyValue, Value::as_f64),
        contributions: scope
            .sections(Field::Contributions)
            .iter()
            .filter_map(|s| {
                let name = s.text(Field::ContributionName)?;
                Some(EnergyContribution::named(
                    name,
                    s.measured(Field::ContributionValue, Value::as_f64),
                ))
            })
            .collect(),
    }
}

fn eigenvalues(scope: &Scope<'_>) -> ElectronicEigenvalues {
    ElectronicEigenvalues {
        spin_channel: scope
            .get(Field::EigenvalueSpin, Value::as_i64)
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or_default(),
        n_bands: scope
            .get(Field::EigenvalueNBands, Value::as_i64)
            .and_then(|n| usize::try_from(n).ok()),
        value: scope.measured(Field::EigenvalueValues, Value::to_f64_matrix),
        occupation: scope.get(Field::EigenvalueOccupations, Value::to_f64_matrix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Mapping;
    use crate::mapping::binding::{Binding, Input};
    use crate::parsers::Variant;

    fn map(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(pairs.into_iter().collect::<Mapping>())
    }

    fn table() -> BindingTable {
        BindingTable::new(Variant::Outcar)
            .bind(Field::Outputs, Binding::path("steps").unwrap())
            .bind(Field::TotalEnergyValue, Binding::path("total").unwrap())
            .bind(
                Field::Contributions,
                Binding::transform("get_energy_contributions", vec![Input::path("parts").unwrap()])
                    .unwrap(),
            )
            .bind(Field::ContributionName, Binding::path("name").unwrap())
            .bind(Field::ContributionValue, Binding::path("value").unwrap())
            .bind(Field::ModelSystem, Binding::path("steps").unwrap())
            .bind(Field::Positions, Binding::path("positions").unwrap())
    }

    #[test]
    fn test_projects_outputs_per_step() {
        let doc = map(vec![(
            "steps",
            Value::Seq(vec![
                map(vec![
                    ("total", Value::float(-3.0)),
                    (
                        "parts",
                        map(vec![("TEWEN", Value::float(-1.0)), ("DENC", Value::float(-0.5))]),
                    ),
                ]),
                map(vec![("other", Value::int(1))]),
            ]),
        )]);
        let sim = project(&table(), &doc);
        assert_eq!(sim.outputs.len(), 2);

        let first = &sim.outputs[0].total_energy[0];
        assert_eq!(first.value.as_ref().unwrap().magnitude, -3.0);
        assert_eq!(first.contributions.len(), 2);
        assert_eq!(first.contributions[1].name, "DENC");

        // 既无数值也无分项
        assert!(sim.outputs[1].total_energy.is_empty());
        // 两个离子步都没有坐标
        assert!(sim.model_system.is_empty());
        assert!(sim.program.is_none());
    }

    #[test]
    fn test_empty_source_yields_empty_simulation() {
        let sim = project(&table(), &map(vec![]));
        assert_eq!(sim, Simulation::default());
    }
}
