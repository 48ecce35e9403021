// crates/fv_core/src/lib.rs

//! FinVol 核心
//!
//! 有限体积离散、装配与求解引擎。每个时间步的数据流：
//!
//! 1. 运行时注册表按名称提供边界条件、离散格式、求解器等实例
//! 2. 离散算子（[`fvm`] 隐式、[`fvc`] 显式）查询格式与边界层，装配 LDU 矩阵
//! 3. 通信调度在装配前后交换分区边界（halo）值
//! 4. 迭代求解器原地求解，返回 [`SolverPerformance`] 供外迭代使用
//!
//! # 模块概览
//!
//! - [`parallel`]: 通信器、归约、确定性通信调度
//! - [`mesh`]: 有限体积网格（插值权重、距离系数、非正交修正）与区域注册表
//! - [`fields`]: 体场、面场、带量纲标量、时间状态
//! - [`boundary`]: 多态边界条件层
//! - [`matrix`]: LDU 矩阵、耦合接口、有限体积方程
//! - [`solvers`]: 迭代求解器、预条件器、光顺器
//! - [`schemes`]: 插值、面法向梯度、时间与梯度格式
//! - [`registry`]: 按类别的运行时选择表
//! - [`models`]: 可替换物理子模型（粘性/湍流）
//! - [`control`]: 外迭代控制（残差控制、松弛因子）
//!
//! # 示例
//!
//! ```no_run
//! use std::sync::Arc;
//! use fv_core::prelude::*;
//!
//! fv_core::registry::initialise().unwrap();
//! let poly = fv_mesh::BlockMesh::one_dimensional(10, 1.0).build().unwrap();
//! let mesh = Arc::new(FvMesh::serial(poly).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod control;
pub mod fields;
pub mod fvc;
pub mod fvm;
pub mod matrix;
pub mod mesh;
pub mod models;
pub mod parallel;
pub mod registry;
pub mod schemes;
pub mod solvers;

pub use matrix::{FvMatrix, LduMatrix, SolverPerformance, SolverStatus};

/// 常用类型
pub mod prelude {
    pub use crate::boundary::{PatchField, PatchState};
    pub use crate::fields::{DimensionedScalar, SurfaceField, TimeState, VolField};
    pub use crate::matrix::{FvMatrix, LduMatrix, SolverPerformance, SolverStatus};
    pub use crate::mesh::{FvMesh, RegionRegistry};
    pub use crate::parallel::{Communicator, SerialCommunicator, ThreadCommunicator};
    pub use crate::{fvc, fvm};
    pub use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult, Tensor, Vector};
}
