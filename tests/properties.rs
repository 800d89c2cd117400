//! 标量推断、变体选择与规范化的性质测试

use proptest::prelude::*;
use rstest::rstest;

use vasp_extract::grammar::{coerce_token, Mapping, Scalar, Value};
use vasp_extract::mapping::{BindingTable, Scope, Transform};
use vasp_extract::models::{EnergyContribution, Measured, TotalEnergy, Unit};
use vasp_extract::normalizer::normalize_total_energy;
use vasp_extract::parsers::outcar::str_to_stress;
use vasp_extract::{match_variant, Variant};

#[rstest]
#[case("T", Scalar::Bool(true))]
#[case(".TRUE.", Scalar::Bool(true))]
#[case("f", Scalar::Bool(false))]
#[case(".FALSE.", Scalar::Bool(false))]
#[case("t", Scalar::Bool(true))]
#[case("F", Scalar::Bool(false))]
#[case("TRUE", Scalar::Bool(true))]
#[case("FALSE", Scalar::Bool(false))]
#[case("True", Scalar::Bool(true))]
#[case("false", Scalar::Bool(false))]
#[case(".true.", Scalar::Bool(true))]
#[case(".False.", Scalar::Bool(false))]
#[case("42", Scalar::Int(42))]
#[case("-3", Scalar::Int(-3))]
#[case("1.5", Scalar::Float(1.5))]
#[case("-0.25", Scalar::Float(-0.25))]
#[case("accura", Scalar::Str("accura".to_string()))]
#[case("99999999999999999999", Scalar::Str("99999999999999999999".to_string()))]
fn token_coercion(#[case] token: &str, #[case] expected: Scalar) {
    assert_eq!(coerce_token(token), expected);
}

#[rstest]
#[case("OUTCAR", "", Some(Variant::Outcar))]
#[case("run/OUTCAR.relax.gz", "", Some(Variant::Outcar))]
#[case("run/vasprun.xml.gz", "", Some(Variant::VasprunV1))]
#[case("log.txt", " vasp.5.4.4.18Apr17-6-g9f103f2a35 (build Apr 04 2019)", Some(Variant::Outcar))]
#[case(
    "result.dat",
    "<?xml version=\"1.0\"?>\n<modeling>\n <generator>\n  <i name=\"program\" type=\"string\">vasp </i>",
    Some(Variant::VasprunV1)
)]
#[case("notes.txt", "nothing to see here", None)]
fn variant_selection(#[case] name: &str, #[case] head: &str, #[case] expected: Option<Variant>) {
    assert_eq!(match_variant(name, head), expected);
}

fn eigenvalue_rows(n_rows: usize, n_bands: usize) -> Value {
    Value::Seq(
        (0..n_rows)
            .map(|k| {
                Value::Seq(
                    (0..n_bands)
                        .flat_map(|b| {
                            [
                                Value::int(b as i64 + 1),
                                Value::float(k as f64 + b as f64 * 0.5),
                                Value::float(1.0),
                            ]
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn boolean_tokens_ignore_case(
        (token, expected) in prop_oneof![
            Just(("t", true)),
            Just((".true.", true)),
            Just(("true", true)),
            Just(("f", false)),
            Just((".false.", false)),
            Just(("false", false)),
        ],
        upper in proptest::collection::vec(any::<bool>(), 7),
    ) {
        let mixed: String = token
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(coerce_token(&mixed), Scalar::Bool(expected));
    }

    #[test]
    fn integers_coerce_to_int(i in any::<i64>()) {
        prop_assert_eq!(coerce_token(&i.to_string()), Scalar::Int(i));
    }

    #[test]
    fn decimals_coerce_to_float(x in -1.0e6f64..1.0e6) {
        let token = format!("{:.4}", x);
        match coerce_token(&token) {
            Scalar::Float(y) => prop_assert!((x - y).abs() < 1e-3),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn stress_is_symmetric(s in proptest::collection::vec(-500.0f64..500.0, 6)) {
        let text = s.iter().map(|x| format!("{:.5}", x)).collect::<Vec<_>>().join("  ");
        let m = str_to_stress(&text).unwrap().to_matrix3().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                prop_assert_eq!(m[i][j], m[j][i]);
            }
        }
    }

    #[test]
    fn residual_closes_the_sum_and_is_idempotent(
        total in -1000.0f64..1000.0,
        parts in proptest::collection::vec(-100.0f64..100.0, 1..8),
    ) {
        let mut energy = TotalEnergy {
            value: Some(Measured::new(total, Unit::ElectronVolt)),
            contributions: parts
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    EnergyContribution::named(format!("E{}", i), Some(Measured::new(*x, Unit::ElectronVolt)))
                })
                .collect(),
        };
        normalize_total_energy(&mut energy);
        let once = energy.clone();
        normalize_total_energy(&mut energy);
        prop_assert_eq!(&energy, &once);

        let sum: f64 = energy
            .contributions
            .iter()
            .filter_map(|c| c.value.as_ref())
            .map(|v| v.magnitude)
            .sum();
        prop_assert!((sum - total).abs() < 1e-6);
    }

    #[test]
    fn eigenvalues_split_by_spin(ispin in 1usize..=2, n_kpts in 1usize..5, n_bands in 1usize..6) {
        let table = BindingTable::new(Variant::Outcar);
        let root = Value::Map(Mapping::new());
        let scope = Scope::new(&table, &root);

        let mut params = Mapping::new();
        params.insert("ISPIN", Value::int(ispin as i64));
        let inputs = [Some(eigenvalue_rows(ispin * n_kpts, n_bands)), Some(Value::Map(params))];

        let transform: Transform = "get_eigenvalues".parse().unwrap();
        let groups = transform.apply(&inputs, &Mapping::new(), &scope).unwrap();
        let groups = groups.as_seq().unwrap();
        prop_assert_eq!(groups.len(), ispin);
        for (spin, group) in groups.iter().enumerate() {
            let group = group.as_map().unwrap();
            prop_assert_eq!(group.get("spin_channel").and_then(Value::as_i64), Some(spin as i64));
            prop_assert_eq!(group.get("n_bands").and_then(Value::as_i64), Some(n_bands as i64));
            let eig = group.get("eigenvalues").unwrap().to_f64_matrix().unwrap();
            prop_assert_eq!(eig.len(), n_kpts);
            prop_assert!(eig.iter().all(|row| row.len() == n_bands));
        }
    }
}
