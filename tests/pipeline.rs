//! 端到端解析：OUTCAR 与两种 vasprun 布局

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use vasp_extract::models::{Archive, ContributionKind, Outputs, TotalEnergy, Unit, UNKNOWN_ENERGY};
use vasp_extract::{ParserConfig, Simulation, Variant, VaspError, VaspParser};

const EPS: f64 = 1e-6;

fn data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn parse_with(path: &Path, variant: Option<Variant>) -> Archive {
    VaspParser::new()
        .unwrap()
        .with_config(ParserConfig::default().with_variant(variant))
        .parse_file(path)
        .unwrap()
}

fn simulation(name: &str, variant: Option<Variant>) -> Simulation {
    parse_with(&data(name), variant).data.unwrap()
}

fn energy(outputs: &Outputs) -> &TotalEnergy {
    &outputs.total_energy[0]
}

fn residual(energy: &TotalEnergy) -> f64 {
    let unknown: Vec<_> = energy
        .contributions
        .iter()
        .filter(|c| c.kind == ContributionKind::Unknown)
        .collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].name, UNKNOWN_ENERGY);
    unknown[0].value.as_ref().unwrap().magnitude
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

// ─────────────────────────────────────────────────────────────
// OUTCAR
// ─────────────────────────────────────────────────────────────

#[test]
fn outcar_program_and_method() {
    let sim = simulation("OUTCAR", None);

    let program = sim.program.as_ref().unwrap();
    assert_eq!(program.name.as_deref(), Some("VASP"));
    assert!(program.version.as_deref().unwrap().starts_with("5.4.4.18"));
    assert_eq!(program.compilation_host.as_deref(), Some("LinuxIFC"));

    assert_eq!(sim.model_method.len(), 1);
    let dft = &sim.model_method[0];
    assert_eq!(dft.is_hybrid, Some(false));
    assert_eq!(dft.exact_exchange_mixing_factor, Some(0.0));
    let names: Vec<&str> = dft.xc_functionals.iter().map(|x| x.libxc_name.as_str()).collect();
    assert_eq!(names, vec!["GGA_X_PBE", "GGA_C_PBE"]);

    let mesh = &dft.numerical_settings[0];
    assert_eq!(mesh.points.as_ref().unwrap().len(), 2);
    assert_eq!(mesh.weights, Some(vec![1.0, 3.0]));
}

#[test]
fn outcar_outputs_per_ionic_step() {
    let sim = simulation("OUTCAR", None);
    assert_eq!(sim.outputs.len(), 2);

    let first = &sim.outputs[0];
    let total = energy(first).value.as_ref().unwrap();
    assert!(close(total.magnitude, -10.84));
    assert_eq!(total.unit, Unit::ElectronVolt);
    assert!(close(residual(energy(first)), 8.57));
    assert!(energy(first).contributions.iter().any(|c| c.name == "TEWEN"));

    assert!(close(first.fermi_level.as_ref().unwrap().magnitude, 5.921));
    assert_eq!(first.is_converged, Some(true));

    let stress = first.stress.as_ref().unwrap();
    assert_eq!(stress.unit, Unit::KiloBar);
    assert_eq!(stress.magnitude[0][1], stress.magnitude[1][0]);
    assert!(close(stress.magnitude[0][1], 0.5));

    let forces = first.total_forces.as_ref().unwrap();
    assert_eq!(forces.unit, Unit::ElectronVoltPerAngstrom);
    assert_eq!(forces.magnitude.len(), 2);

    assert_eq!(first.electronic_eigenvalues.len(), 1);
    let eig = &first.electronic_eigenvalues[0];
    assert_eq!(eig.n_bands, Some(4));
    let values = &eig.value.as_ref().unwrap().magnitude;
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], vec![-5.7, 6.1, 6.1, 8.0]);
    // `*******` 溢出
    assert!(values[1][3].is_nan());
    assert_eq!(values[1][2], 4.0);
    assert_eq!(eig.occupation.as_ref().unwrap()[0], vec![2.0, 2.0, 1.0, 0.0]);

    let second = &sim.outputs[1];
    assert!(close(energy(second).value.as_ref().unwrap().magnitude, -10.90));
    assert!(close(residual(energy(second)), 9.51));
    assert_ne!(second.is_converged, Some(true));
}

#[test]
fn outcar_structure_per_ionic_step() {
    let sim = simulation("OUTCAR", None);
    assert_eq!(sim.model_system.len(), 2);

    let cell = &sim.model_system[1].cell[0];
    assert_eq!(cell.labels, Some(vec!["Si".to_string(), "Si".to_string()]));
    let lattice = cell.lattice_vectors.as_ref().unwrap();
    assert_eq!(lattice.unit, Unit::Angstrom);
    assert!(close(lattice.magnitude[0][0], 5.44));
    let positions = cell.positions.as_ref().unwrap();
    assert!(close(positions.magnitude[1][0], 1.36));
    let reciprocal = cell.reciprocal_lattice_vectors.as_ref().unwrap();
    assert_eq!(reciprocal.unit, Unit::InverseAngstrom);
}

// ─────────────────────────────────────────────────────────────
// vasprun.xml
// ─────────────────────────────────────────────────────────────

#[test]
fn vasprun_detected_and_projected_per_calculation() {
    let archive = parse_with(&data("vasprun.xml"), None);
    assert_eq!(archive.metadata.variant, Variant::VasprunV1);
    let sim = archive.data.unwrap();

    let program = sim.program.as_ref().unwrap();
    assert_eq!(program.name.as_deref(), Some("VASP"));
    assert_eq!(program.version.as_deref(), Some("5.4.4.18Apr17-6-g9f103f2a35"));
    assert_eq!(program.compilation_host.as_deref(), Some("LinuxIFC"));

    let dft = &sim.model_method[0];
    assert_eq!(dft.is_hybrid, Some(false));
    assert_eq!(dft.exact_exchange_mixing_factor, Some(0.0));
    let names: Vec<&str> = dft.xc_functionals.iter().map(|x| x.libxc_name.as_str()).collect();
    assert_eq!(names, vec!["GGA_X_PBE", "GGA_C_PBE"]);
    let mesh = &dft.numerical_settings[0];
    assert_eq!(mesh.grid, Some(vec![4, 4, 4]));
    assert_eq!(mesh.offset, Some(vec![0.125, 0.125, 0.125]));
    assert_eq!(mesh.weights, Some(vec![0.25, 0.75]));

    assert_eq!(sim.model_system.len(), 1);
    let cell = &sim.model_system[0].cell[0];
    assert_eq!(cell.labels, Some(vec!["Si".to_string(), "Si".to_string()]));
    let positions = cell.positions.as_ref().unwrap();
    assert_eq!(positions.unit, Unit::Angstrom);
    assert!(close(positions.magnitude[1][2], 1.3575));
    assert!(close(cell.reciprocal_lattice_vectors.as_ref().unwrap().magnitude[2][2], 0.18416206));

    assert_eq!(sim.outputs.len(), 1);
    let out = &sim.outputs[0];
    let e = energy(out);
    assert!(close(e.value.as_ref().unwrap().magnitude, -10.5));
    assert_eq!(e.contributions.len(), 3);
    assert!(close(residual(e), -7.5));
    let hartree = e.contributions.iter().find(|c| c.name == "hartreedc").unwrap();
    assert_eq!(hartree.kind, ContributionKind::DoubleCounting);
    assert!(!e.contributions.iter().any(|c| c.name.starts_with("e_")));

    assert!(close(out.fermi_level.as_ref().unwrap().magnitude, 5.921));
    let stress = &out.stress.as_ref().unwrap().magnitude;
    assert_eq!(stress[1][2], stress[2][1]);

    let eig = &out.electronic_eigenvalues[0];
    assert_eq!(eig.spin_channel, 0);
    assert_eq!(eig.n_bands, Some(3));
    assert_eq!(
        eig.value.as_ref().unwrap().magnitude,
        vec![vec![-5.7, 6.1, 8.0], vec![-3.0, 4.0, 9.0]]
    );
    assert_eq!(
        eig.occupation.as_ref().unwrap(),
        &vec![vec![1.0, 1.0, 0.0], vec![1.0, 1.0, 0.0]]
    );
}

#[test]
fn vasprun_v2_takes_final_state() {
    let sim = simulation("vasprun.xml", Some(Variant::VasprunV2));

    assert_eq!(sim.program.as_ref().unwrap().name.as_deref(), Some("VASP"));
    assert_eq!(sim.outputs.len(), 1);
    let e = energy(&sim.outputs[0]);
    // 最后一个 <energy> 块，而非电子步中的
    assert!(close(e.value.as_ref().unwrap().magnitude, -10.5));
    assert!(close(residual(e), -7.5));
    assert!(close(sim.outputs[0].fermi_level.as_ref().unwrap().magnitude, 5.921));

    assert_eq!(sim.model_system.len(), 1);
    let cell = &sim.model_system[0].cell[0];
    assert_eq!(cell.labels.as_deref().map(<[String]>::len), Some(2));
    let lattice = cell.lattice_vectors.as_ref().unwrap();
    assert!(close(lattice.magnitude[1][1], 5.43));
    assert_eq!(sim.model_method[0].numerical_settings[0].grid, Some(vec![4, 4, 4]));
}

// ─────────────────────────────────────────────────────────────
// 容错与确定性
// ─────────────────────────────────────────────────────────────

#[test]
fn gzip_input_matches_plain() {
    let dir = tempfile::tempdir().unwrap();
    let gz_path = dir.path().join("OUTCAR.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&fs::read(data("OUTCAR")).unwrap()).unwrap();
    fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

    let plain = parse_with(&data("OUTCAR"), None);
    let zipped = parse_with(&gz_path, None);
    assert_eq!(plain.data, zipped.data);
}

#[test]
fn truncated_files_keep_what_was_read() {
    let dir = tempfile::tempdir().unwrap();

    let outcar = fs::read_to_string(data("OUTCAR")).unwrap();
    let cut = outcar.find("E-fermi").unwrap();
    let path = dir.path().join("OUTCAR");
    fs::write(&path, &outcar[..cut]).unwrap();
    let sim = parse_with(&path, None).data.unwrap();
    assert_eq!(sim.program.unwrap().name.as_deref(), Some("VASP"));
    assert!(sim.outputs.iter().all(|o| o.fermi_level.is_none()));

    let vasprun = fs::read_to_string(data("vasprun.xml")).unwrap();
    let cut = vasprun.find("<calculation>").unwrap();
    let path = dir.path().join("vasprun.xml");
    fs::write(&path, &vasprun[..cut]).unwrap();
    let sim = parse_with(&path, None).data.unwrap();
    assert_eq!(sim.model_method[0].numerical_settings[0].grid, Some(vec![4, 4, 4]));
    assert!(sim.outputs.is_empty());
}

#[test]
fn truncated_step_positions_stay_cartesian() {
    let dir = tempfile::tempdir().unwrap();
    let outcar = fs::read_to_string(data("OUTCAR")).unwrap();
    let cut = outcar.find(" POSITION ").unwrap();

    // 离子步内没有 POSITION 表：取初始 (Angst) 块
    let path = dir.path().join("OUTCAR");
    fs::write(&path, &outcar[..cut]).unwrap();
    let sim = parse_with(&path, None).data.unwrap();
    let positions = sim.model_system[0].cell[0].positions.as_ref().unwrap();
    assert_eq!(positions.unit, Unit::Angstrom);
    assert!(close(positions.magnitude[1][0], 1.3575));

    // 只剩近邻表的分数坐标：按初始基矢换算
    let start = outcar.find(" position of ions in cartesian").unwrap();
    let end = outcar.find("      direct lattice vectors").unwrap();
    let without_cartesian = format!("{}{}", &outcar[..start], &outcar[end..cut]);
    fs::write(&path, without_cartesian).unwrap();
    let sim = parse_with(&path, None).data.unwrap();
    let positions = sim.model_system[0].cell[0].positions.as_ref().unwrap();
    assert_eq!(positions.unit, Unit::Angstrom);
    assert!(close(positions.magnitude[1][0], 1.3575));
    assert!(close(positions.magnitude[1][2], 1.3575));
}

#[test]
fn parsing_is_deterministic() {
    for name in ["OUTCAR", "vasprun.xml"] {
        let a = simulation(name, None);
        let b = simulation(name, None);
        assert_eq!(a, b);
    }

    // OUTCAR 样例含溢出的本征值
    let sim = simulation("OUTCAR", None);
    let eig = &sim.outputs[0].electronic_eigenvalues[0];
    assert!(eig.value.as_ref().unwrap().magnitude.iter().flatten().any(|x| x.is_nan()));
}

#[test]
fn parse_fills_supplied_archive() {
    let parser = VaspParser::new().unwrap();
    let mut archive = Archive::new("placeholder", Variant::Outcar);
    parser.parse(&data("vasprun.xml"), &mut archive).unwrap();
    assert_eq!(archive.metadata.variant, Variant::VasprunV1);
    assert!(archive.metadata.mainfile.ends_with("vasprun.xml"));
    assert!(archive.data.is_some());
}

#[test]
fn missing_file_is_error() {
    let parser = VaspParser::new().unwrap();
    assert!(matches!(
        parser.parse_file(&data("NOPE")),
        Err(VaspError::FileNotFound { .. })
    ));
}

#[test]
fn archive_serializes_units() {
    let archive = parse_with(&data("vasprun.xml"), None);
    let json = serde_json::to_value(&archive).unwrap();
    assert_eq!(json["metadata"]["variant"], "vasprun");
    let total = &json["data"]["outputs"][0]["total_energy"][0]["value"];
    assert_eq!(total["unit"], "eV");
}
