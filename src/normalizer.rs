//! # 派生字段规范化
//!
//! 对每个总能补出残差分项 `UnknownEnergy`：
//! 总能减去其余已赋值、且与总能单位相同的分项之和。
//!
//! | 已有残差分项 | 处理 |
//! |-------------|------|
//! | 不存在 | 追加 |
//! | 存在但未赋值 | 填入 |
//! | 已赋值 | 保留；与计算值不符时记录警告 |
//!
//! 没有数值或没有分项的总能不处理。重复执行结果不变。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs` 使用
//! - 使用 `models/simulation.rs`

use crate::models::{EnergyContribution, Measured, Simulation, TotalEnergy};

const MISMATCH_TOLERANCE: f64 = 1e-8;

/// 规范化整个模拟结果
pub fn normalize(simulation: &mut Simulation) {
    for outputs in &mut simulation.outputs {
        for energy in &mut outputs.total_energy {
            normalize_total_energy(energy);
        }
    }
}

/// 规范化单个总能
pub fn normalize_total_energy(energy: &mut TotalEnergy) {
    let Some(total) = energy.value.clone() else {
        return;
    };
    if energy.contributions.is_empty() {
        return;
    }

    let known: f64 = energy
        .contributions
        .iter()
        .filter(|c| !c.is_unknown())
        .filter_map(|c| c.value.as_ref())
        .filter(|v| v.unit == total.unit)
        .map(|v| v.magnitude)
        .sum();
    let residual = total.magnitude - known;

    match energy.contributions.iter_mut().find(|c| c.is_unknown()) {
        None => {
            let mut unknown = EnergyContribution::unknown(None);
            unknown.value = Some(Measured::new(residual, total.unit));
            energy.contributions.push(unknown);
        }
        Some(unknown) => match &unknown.value {
            None => unknown.value = Some(Measured::new(residual, total.unit)),
            Some(existing) => {
                if (existing.magnitude - residual).abs() > MISMATCH_TOLERANCE {
                    tracing::warn!(
                        existing = existing.magnitude,
                        computed = residual,
                        "residual energy differs from stored value, keeping stored"
                    );
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outputs, Unit, UNKNOWN_ENERGY};

    fn ev(x: f64) -> Option<Measured<f64>> {
        Some(Measured::new(x, Unit::ElectronVolt))
    }

    fn energy(total: Option<f64>, parts: &[(&str, Option<f64>)]) -> TotalEnergy {
        TotalEnergy {
            value: total.and_then(ev),
            contributions: parts
                .iter()
                .map(|(n, v)| EnergyContribution::named(*n, v.and_then(ev)))
                .collect(),
        }
    }

    fn unknown_of(e: &TotalEnergy) -> Vec<&EnergyContribution> {
        e.contributions.iter().filter(|c| c.is_unknown()).collect()
    }

    #[test]
    fn test_appends_residual_when_absent() {
        let mut e = energy(Some(-10.5), &[("hartreedc", Some(-2.0)), ("XCdc", Some(-1.0))]);
        normalize_total_energy(&mut e);
        let unknown = unknown_of(&e);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].name, UNKNOWN_ENERGY);
        assert!((unknown[0].value.as_ref().unwrap().magnitude + 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_fills_unset_residual() {
        let mut e = energy(Some(-5.0), &[("TEWEN", Some(-3.0)), (UNKNOWN_ENERGY, None)]);
        normalize_total_energy(&mut e);
        assert_eq!(e.contributions.len(), 2);
        assert_eq!(unknown_of(&e)[0].value.as_ref().unwrap().magnitude, -2.0);
    }

    #[test]
    fn test_keeps_set_residual() {
        let mut e = energy(Some(-5.0), &[("TEWEN", Some(-3.0)), (UNKNOWN_ENERGY, Some(1.0))]);
        normalize_total_energy(&mut e);
        assert_eq!(e.contributions.len(), 2);
        assert_eq!(unknown_of(&e)[0].value.as_ref().unwrap().magnitude, 1.0);
    }

    #[test]
    fn test_skips_unset_and_foreign_unit_parts() {
        let mut e = energy(Some(-5.0), &[("TEWEN", Some(-3.0)), ("PAW", None)]);
        e.contributions.push(EnergyContribution::named(
            "odd",
            Some(Measured::new(100.0, Unit::KiloBar)),
        ));
        normalize_total_energy(&mut e);
        assert_eq!(unknown_of(&e)[0].value.as_ref().unwrap().magnitude, -2.0);
    }

    #[test]
    fn test_requires_value_and_contributions() {
        let mut no_value = energy(None, &[("TEWEN", Some(-3.0))]);
        normalize_total_energy(&mut no_value);
        assert!(unknown_of(&no_value).is_empty());

        let mut no_parts = energy(Some(-1.0), &[]);
        normalize_total_energy(&mut no_parts);
        assert!(no_parts.contributions.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let mut sim = Simulation::default();
        sim.outputs.push(Outputs {
            total_energy: vec![energy(Some(-10.84), &[("TEWEN", Some(-200.0)), ("EATOM", Some(180.59))])],
            ..Default::default()
        });
        normalize(&mut sim);
        let once = sim.clone();
        normalize(&mut sim);
        assert_eq!(sim, once);
    }
}
