//! # 解析流水线
//!
//! 单个文件的完整流程：
//!
//! ```text
//! Unparsed → GrammarApplied → TreeBuilt → FieldsProjected → Normalized
//! ```
//!
//! - 纯文本（OUTCAR）：文法产出映射树
//! - 标记文档（vasprun）：XML 读入节点树
//!
//! 之后按变体取绑定表投影，再做派生字段规范化，整体写入 `Archive.data`。
//! 只有 I/O、格式无法识别与缺少绑定表会返回错误，且都发生在
//! `GrammarApplied` 之前。
//!
//! ## 依赖关系
//! - 被 `commands/`, `lib.rs` 使用
//! - 使用 `parsers/`, `mapping/`, `normalizer.rs`, `config.rs`

use crate::config::ParserConfig;
use crate::error::{Result, VaspError};
use crate::grammar::{TextParser, Value};
use crate::mapping::{project, Registry};
use crate::models::{Archive, Simulation};
use crate::normalizer::normalize;
use crate::parsers::{self, match_variant, outcar, vasprun, Variant};

use std::fmt;
use std::path::Path;

/// 单文件解析阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unparsed,
    GrammarApplied,
    TreeBuilt,
    FieldsProjected,
    Normalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unparsed => "unparsed",
            Stage::GrammarApplied => "grammar-applied",
            Stage::TreeBuilt => "tree-built",
            Stage::FieldsProjected => "fields-projected",
            Stage::Normalized => "normalized",
        };
        write!(f, "{}", name)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}

/// VASP 输出解析器
///
/// 编译好的 OUTCAR 文法与绑定注册表只读共享，可跨线程使用。
#[derive(Debug, Clone)]
pub struct VaspParser {
    outcar: TextParser,
    registry: Registry,
    config: ParserConfig,
}

impl VaspParser {
    /// 内置文法与绑定表
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::standard()?)
    }

    pub fn with_registry(registry: Registry) -> Result<Self> {
        Ok(Self {
            outcar: outcar::grammar()?,
            registry,
            config: ParserConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 解析已读入的内容
    pub fn parse_content(&self, content: &str, variant: Variant) -> Result<Simulation> {
        let table = self
            .registry
            .table(variant)
            .ok_or_else(|| VaspError::UnknownVariant(variant.to_string()))?;

        let mut stage = Stage::Unparsed;
        let tree = if variant.is_markup() {
            let tree = vasprun::read_tree(content);
            tracing::debug!("markup read");
            advance(&mut stage, Stage::GrammarApplied);
            tree
        } else {
            let mapping = self.outcar.parse(content);
            tracing::debug!(keys = mapping.len(), "grammar matched");
            advance(&mut stage, Stage::GrammarApplied);
            Value::Map(mapping)
        };
        advance(&mut stage, Stage::TreeBuilt);

        let mut simulation = project(table, &tree);
        advance(&mut stage, Stage::FieldsProjected);

        normalize(&mut simulation);
        advance(&mut stage, Stage::Normalized);
        Ok(simulation)
    }

    /// 解析文件并写入外部提供的归档；变体由配置指定或自动选择
    pub fn parse(&self, mainfile: &Path, archive: &mut Archive) -> Result<()> {
        let parsed = self.parse_file(mainfile)?;
        archive.metadata = parsed.metadata;
        archive.data = parsed.data;
        Ok(())
    }

    /// 解析文件，返回新归档
    pub fn parse_file(&self, mainfile: &Path) -> Result<Archive> {
        let mainfile_name = mainfile.display().to_string();
        if !self.config.decompress && is_gzip(mainfile) {
            return Err(VaspError::UnsupportedCompression {
                path: mainfile_name,
                extension: "gz".to_string(),
            });
        }

        let content = parsers::read_source(mainfile)?;
        let variant = self
            .config
            .variant
            .or_else(|| match_variant(&mainfile_name, &content))
            .ok_or_else(|| VaspError::UnrecognizedFormat {
                path: mainfile_name.clone(),
            })?;

        let span = tracing::info_span!("parse", mainfile = %mainfile_name, variant = %variant);
        let _enter = span.enter();

        let simulation = self.parse_content(&content, variant)?;
        tracing::info!(
            outputs = simulation.outputs.len(),
            final_energy = simulation.final_total_energy().map(|e| e.magnitude),
            "parsed"
        );

        let mut archive = Archive::new(mainfile_name, variant);
        archive.data = Some(simulation);
        Ok(archive)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("gz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn assert_sync<T: Sync + Send>() {}

    #[test]
    fn test_parser_is_shareable() {
        assert_sync::<VaspParser>();
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Unparsed < Stage::GrammarApplied);
        assert!(Stage::FieldsProjected < Stage::Normalized);
        assert_eq!(Stage::TreeBuilt.to_string(), "tree-built");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn stage_log(content: &str, variant: Variant) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let parser = VaspParser::new().unwrap();
        tracing::subscriber::with_default(subscriber, || {
            parser.parse_content(content, variant).unwrap();
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn position(log: &str, needle: &str) -> usize {
        log.find(needle)
            .unwrap_or_else(|| panic!("'{}' missing from log:\n{}", needle, log))
    }

    #[test]
    fn test_grammar_stage_logged_after_reading() {
        for (content, variant, read) in [
            ("<modeling><generator/></modeling>", Variant::VasprunV1, "markup read"),
            (" vasp.5.4.4.18Apr17 (build)", Variant::Outcar, "grammar matched"),
        ] {
            let log = stage_log(content, variant);
            let applied = position(&log, "to=grammar-applied");
            assert!(position(&log, read) < applied);
            assert!(position(&log, "to=tree-built") > applied);
            assert!(position(&log, "to=normalized") > position(&log, "to=fields-projected"));
        }
    }

    #[test]
    fn test_empty_content_is_tolerated() {
        let parser = VaspParser::new().unwrap();
        let sim = parser.parse_content("", Variant::Outcar).unwrap();
        assert!(sim.outputs.is_empty());
        assert!(sim.model_system.is_empty());
        assert!(sim.model_method.is_empty());

        let sim = parser.parse_content("", Variant::VasprunV1).unwrap();
        assert_eq!(sim, Simulation::default());
    }

    #[test]
    fn test_missing_table_is_error() {
        let parser = VaspParser::with_registry(Registry::new()).unwrap();
        assert!(matches!(
            parser.parse_content("", Variant::Outcar),
            Err(VaspError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_unrecognized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "nothing to see").unwrap();
        let parser = VaspParser::new().unwrap();
        assert!(matches!(
            parser.parse_file(&path),
            Err(VaspError::UnrecognizedFormat { .. })
        ));
    }

    #[test]
    fn test_gzip_rejected_without_decompress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("OUTCAR.gz");
        std::fs::write(&path, b"x").unwrap();
        let parser = VaspParser::new()
            .unwrap()
            .with_config(ParserConfig::default().with_decompress(false));
        assert!(matches!(
            parser.parse_file(&path),
            Err(VaspError::UnsupportedCompression { .. })
        ));
    }
}
