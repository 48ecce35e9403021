// crates/fv_core/src/matrix/mod.rs

//! 矩阵层
//!
//! - [`LduMatrix`]: 按网格面寻址的稀疏矩阵
//! - [`LduInterface`] / [`ProcessorInterface`] / [`CoupledInterfaces`]: 跨分区耦合
//! - [`FvMatrix`]: 带源项、边界系数与量纲的有限体积方程
//! - [`SolverPerformance`]: 求解结果报告

mod fv_matrix;
mod interface;
mod ldu_matrix;
mod performance;

pub use fv_matrix::FvMatrix;
pub use interface::{CoupledInterfaces, LduInterface, ProcessorInterface};
pub use ldu_matrix::{DiagonalView, LduMatrix, OffDiagonalView};
pub use performance::{SolverPerformance, SolverStatus};
