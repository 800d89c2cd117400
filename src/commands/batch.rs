//! # batch 命令实现
//!
//! 并行解析目录下所有匹配的 VASP 输出文件。
//!
//! ## 功能
//! - 按模式收集 OUTCAR / vasprun.xml（含 `.gz`）
//! - rayon 并行解析，每个文件各自拥有解析状态
//! - 终端汇总表 + CSV 汇总
//! - 可选逐文件 JSON 归档
//!
//! 无法识别格式的文件记为跳过，不计入失败。
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的参数
//! - 使用 `batch/`, `pipeline.rs`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::batch::BatchArgs;
use crate::error::{Result, VaspError};
use crate::models::{Archive, ContributionKind};
use crate::pipeline::VaspParser;
use crate::utils::output;

use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 汇总表行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Program")]
    program: String,
    #[tabled(rename = "Steps")]
    steps: usize,
    #[tabled(rename = "Final E (eV)")]
    final_energy: String,
    #[tabled(rename = "Residual (eV)")]
    residual: String,
    #[tabled(rename = "Converged")]
    converged: String,
}

/// 单个归档的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub variant: String,
    pub program: Option<String>,
    pub steps: usize,
    pub final_energy: Option<f64>,
    pub residual: Option<f64>,
    pub converged: Option<bool>,
}

impl Summary {
    pub fn from_archive(archive: &Archive) -> Self {
        let variant = archive.metadata.variant.to_string();
        let Some(sim) = &archive.data else {
            return Self {
                variant,
                program: None,
                steps: 0,
                final_energy: None,
                residual: None,
                converged: None,
            };
        };

        let program = sim.program.as_ref().map(|p| {
            [p.name.as_deref(), p.version.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        let last_energy = sim
            .outputs
            .iter()
            .rev()
            .flat_map(|o| o.total_energy.iter())
            .find(|e| e.value.is_some());
        let residual = last_energy.and_then(|e| {
            e.contributions
                .iter()
                .find(|c| c.kind == ContributionKind::Unknown)
                .and_then(|c| c.value.as_ref())
                .map(|v| v.magnitude)
        });

        Self {
            variant,
            program,
            steps: sim.outputs.len(),
            final_energy: last_energy.and_then(|e| e.value.as_ref()).map(|v| v.magnitude),
            residual,
            converged: sim.outputs.last().and_then(|o| o.is_converged),
        }
    }
}

/// 执行 batch 命令
pub fn execute(args: BatchArgs) -> Result<()> {
    output::print_header("Parsing VASP Outputs");

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive);
    let files = collector.collect()?;
    if files.is_empty() {
        return Err(VaspError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Found {} file(s), using {} thread(s)",
        files.len(),
        runner.jobs()
    ));

    if let Some(dir) = &args.json_dir {
        fs::create_dir_all(dir).map_err(|e| VaspError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
    }

    let parser = VaspParser::new()?.with_config(args.options.config());
    let json_dir = args.json_dir.as_deref();
    let result = runner.run(files, |file| process_file(&parser, file, json_dir))?;

    for (path, reason) in &result.skipped {
        output::print_skip(&format!("{}: {}", path.display(), reason));
    }
    for (path, err) in &result.failures {
        output::print_error(&format!("{}: {}", path.display(), err));
    }

    if result.outputs.is_empty() {
        output::print_warning("No files were parsed successfully.");
        return Ok(());
    }

    let rows: Vec<SummaryRow> = result
        .outputs
        .iter()
        .map(|(path, summary)| summary_row(path, summary))
        .collect();
    let table = Table::new(&rows);
    println!("{}", table);

    let summaries: Vec<(PathBuf, Summary)> = result.outputs;
    save_summary_csv(&summaries, &args.output_csv)?;
    output::print_success(&format!(
        "Summary saved to '{}'",
        args.output_csv.display()
    ));

    output::print_done(&format!(
        "Parsed: {}, Skipped: {}, Failed: {}",
        summaries.len(),
        result.skipped.len(),
        result.failures.len()
    ));

    Ok(())
}

fn process_file(
    parser: &VaspParser,
    file: &PathBuf,
    json_dir: Option<&Path>,
) -> ProcessResult<Summary> {
    let archive = match parser.parse_file(file) {
        Ok(archive) => archive,
        Err(VaspError::UnrecognizedFormat { .. }) => {
            return ProcessResult::Skipped(file.clone(), "unrecognized format".to_string())
        }
        Err(e) => return ProcessResult::Failed(file.clone(), e.to_string()),
    };

    if let Some(dir) = json_dir {
        if let Err(e) = write_archive(&archive, file, dir) {
            return ProcessResult::Failed(file.clone(), e.to_string());
        }
    }

    ProcessResult::Success(file.clone(), Summary::from_archive(&archive))
}

/// 写出单个归档 JSON，文件名由路径各段拼接避免重名
fn write_archive(archive: &Archive, file: &Path, dir: &Path) -> Result<()> {
    let out = dir.join(format!("{}.json", flat_name(file)));
    let json = serde_json::to_string_pretty(archive)?;
    fs::write(&out, json).map_err(|e| VaspError::FileWriteError {
        path: out.display().to_string(),
        source: e,
    })
}

fn flat_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string())
}

fn summary_row(path: &Path, summary: &Summary) -> SummaryRow {
    SummaryRow {
        file: path.display().to_string(),
        variant: summary.variant.clone(),
        program: summary.program.clone().unwrap_or_else(|| "-".to_string()),
        steps: summary.steps,
        final_energy: fmt_opt(summary.final_energy),
        residual: fmt_opt(summary.residual),
        converged: summary
            .converged
            .map(|c| if c { "yes" } else { "no" }.to_string())
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// 保存汇总 CSV
fn save_summary_csv(summaries: &[(PathBuf, Summary)], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([
        "file",
        "variant",
        "program",
        "steps",
        "final_energy_eV",
        "residual_eV",
        "converged",
    ])?;

    for (path, s) in summaries {
        wtr.write_record(&[
            path.display().to_string(),
            s.variant.clone(),
            s.program.clone().unwrap_or_default(),
            s.steps.to_string(),
            s.final_energy.map(|v| format!("{:.10}", v)).unwrap_or_default(),
            s.residual.map(|v| format!("{:.10}", v)).unwrap_or_default(),
            s.converged.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush().map_err(|e| VaspError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EnergyContribution, Measured, Outputs, Program, Simulation, TotalEnergy, Unit,
    };
    use crate::parsers::Variant;

    fn archive() -> Archive {
        let mut archive = Archive::new("run/OUTCAR", Variant::Outcar);
        archive.data = Some(Simulation {
            program: Some(Program {
                name: Some("VASP".into()),
                version: Some("5.4.4".into()),
                compilation_host: None,
            }),
            outputs: vec![Outputs {
                total_energy: vec![TotalEnergy {
                    value: Some(Measured::new(-10.5, Unit::ElectronVolt)),
                    contributions: vec![EnergyContribution::unknown(Some(-7.5))],
                }],
                is_converged: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        });
        archive
    }

    #[test]
    fn test_summary_from_archive() {
        let s = Summary::from_archive(&archive());
        assert_eq!(s.variant, "outcar");
        assert_eq!(s.program.as_deref(), Some("VASP 5.4.4"));
        assert_eq!(s.steps, 1);
        assert_eq!(s.final_energy, Some(-10.5));
        assert_eq!(s.residual, Some(-7.5));
        assert_eq!(s.converged, Some(true));
    }

    #[test]
    fn test_summary_without_data() {
        let s = Summary::from_archive(&Archive::new("vasprun.xml", Variant::VasprunV1));
        assert_eq!(s.steps, 0);
        assert_eq!(s.final_energy, None);
    }

    #[test]
    fn test_csv_written() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("summary.csv");
        let rows = vec![(PathBuf::from("run/OUTCAR"), Summary::from_archive(&archive()))];
        save_summary_csv(&rows, &csv_path).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("file,variant,program"));
        assert!(lines.next().unwrap().contains("-10.5000000000"));
    }

    #[test]
    fn test_flat_name() {
        assert_eq!(flat_name(Path::new("a/b/OUTCAR")), "a_b_OUTCAR");
    }
}
