//! # vasp-extract - VASP 输出结构化提取
//!
//! 将 OUTCAR 纯文本日志与 vasprun.xml 标记文档声明式地映射到统一的
//! 模拟结果结构（程序、DFT 方法、原子结构、逐步输出）。
//!
//! ## 处理流程
//! ```text
//! 文件 ──read_source──▶ 文本
//!   ├── OUTCAR  ──grammar/──▶ 映射树 ─┐
//!   └── vasprun ──tree/─────▶ 节点树 ─┴─mapping/──▶ Simulation ──normalizer──▶ Archive
//! ```
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── grammar/    (文法引擎：数量规则、值转换)
//!   ├── tree/       (XML 节点树与路径查询)
//!   ├── parsers/    (变体识别、OUTCAR 文法、vasprun 读入)
//!   ├── mapping/    (绑定表、转换函数、投影)
//!   ├── models/     (模拟结果对象图与单位)
//!   ├── normalizer  (残差能量项)
//!   ├── pipeline    (单文件解析流程)
//!   ├── batch/      (并行批处理)
//!   ├── cli/, commands/, utils/
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod grammar;
pub mod mapping;
pub mod models;
pub mod normalizer;
pub mod parsers;
pub mod pipeline;
pub mod tree;
pub mod utils;

pub use config::ParserConfig;
pub use error::{Result, VaspError};
pub use models::{Archive, Simulation};
pub use parsers::{match_variant, Variant};
pub use pipeline::{Stage, VaspParser};
