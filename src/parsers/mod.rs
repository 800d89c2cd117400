//! # 解析器模块
//!
//! VASP 输出文件的格式识别、读取与文法定义。
//!
//! ## 功能
//! - `Variant`：一次解析所使用的布局变体
//! - `match_variant`：按文件名与文件开头内容选择变体
//! - `read_source`：读取文件（支持 gzip）
//!
//! ## 依赖关系
//! - 被 `pipeline.rs`, `mapping/`, `commands/` 使用
//! - 子模块: outcar, vasprun

pub mod outcar;
pub mod vasprun;

use crate::error::{Result, VaspError};

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// 内容嗅探读取的文件开头长度
const SNIFF_CHARS: usize = 4096;

static OUTCAR_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*vasp\.\d+\.\d+").expect("signature pattern is valid"));

/// 文件布局变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// OUTCAR 纯文本日志
    Outcar,
    /// vasprun.xml，相对 `<modeling>` 的路径，逐 `<calculation>` 输出
    VasprunV1,
    /// vasprun.xml，文档绝对路径 + 后代搜索，只取最终状态
    VasprunV2,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Outcar, Variant::VasprunV1, Variant::VasprunV2];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Outcar => "outcar",
            Variant::VasprunV1 => "vasprun",
            Variant::VasprunV2 => "vasprun-v2",
        }
    }

    /// 是否为标记文档
    pub fn is_markup(&self) -> bool {
        !matches!(self, Variant::Outcar)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Variant {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = VaspError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outcar" => Ok(Variant::Outcar),
            "vasprun" | "vasprun-v1" | "xml" => Ok(Variant::VasprunV1),
            "vasprun-v2" => Ok(Variant::VasprunV2),
            other => Err(VaspError::UnknownVariant(other.to_string())),
        }
    }
}

/// 选择契约：文件名优先，其次嗅探文件开头
pub fn match_variant(filename: &str, content: &str) -> Option<Variant> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
        .to_ascii_lowercase();

    if name.contains("outcar") {
        return Some(Variant::Outcar);
    }
    if name.contains("vasprun") && name.contains(".xml") {
        return Some(Variant::VasprunV1);
    }

    let head: String = content.chars().take(SNIFF_CHARS).collect();
    if vasprun::looks_like(&head) {
        Some(Variant::VasprunV1)
    } else if OUTCAR_SIGNATURE.is_match(&head) {
        Some(Variant::Outcar)
    } else {
        None
    }
}

/// 读取文件为 UTF-8 文本；`.gz` 透明解压
pub fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(VaspError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let read_error = |source| VaspError::FileReadError {
        path: path.display().to_string(),
        source,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let file = File::open(path).map_err(read_error)?;
    let mut bytes = Vec::new();
    match extension.as_str() {
        "gz" => {
            GzDecoder::new(file)
                .read_to_end(&mut bytes)
                .map_err(read_error)?;
        }
        "bz2" | "xz" => {
            return Err(VaspError::UnsupportedCompression {
                path: path.display().to_string(),
                extension,
            });
        }
        _ => {
            BufReader::new(file)
                .read_to_end(&mut bytes)
                .map_err(read_error)?;
        }
    }

    String::from_utf8(bytes).map_err(|_| VaspError::EncodingError {
        path: path.display().to_string(),
    })
}
