// crates/fv_config/src/lib.rs

//! FinVol 配置层
//!
//! 算例以 JSON 描述，顶层包含 `controlDict`、`mesh`、`fields`、
//! `physicalProperties`、`fvSchemes`、`fvSolution` 等字典。
//!
//! - [`dictionary`]: 带作用域路径的字典与类型化查找
//! - [`pattern`]: 键名模式匹配（精确匹配优先，其次最后配置的模式）
//! - [`scheme_stream`]: 格式描述串的词法流（如 `"Gauss linear corrected"`）
//! - [`solver_controls`]: 每个场的线性求解器控制参数
//! - [`schemes`]: `fvSchemes` 查找（按项名，回退到 `default`）
//! - [`solution`]: `fvSolution` 查找（求解器、松弛因子、算法字典）
//! - [`case`]: 算例文件读写与校验

#![warn(missing_docs)]

pub mod case;
pub mod dictionary;
pub mod error;
pub mod pattern;
pub mod scheme_stream;
pub mod schemes;
pub mod solution;
pub mod solver_controls;

pub use case::{CaseConfig, ControlDict};
pub use dictionary::Dictionary;
pub use error::{ConfigError, ConfigResult};
pub use pattern::KeyPattern;
pub use scheme_stream::SchemeStream;
pub use schemes::FvSchemes;
pub use solution::FvSolution;
pub use solver_controls::SolverControls;
