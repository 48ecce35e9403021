// crates/fv_foundation/src/lib.rs

//! FinVol Foundation Layer
//!
//! 整个工作区共享的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `FvError` / `FvResult`
//! - [`dimension`]: 七个 SI 基本量纲的量纲集合
//! - [`scalar`]: 标量类型与数值常量
//! - [`value`]: 场值类型（标量、矢量、张量）的统一接口
//!
//! # 示例
//!
//! ```
//! use fv_foundation::{DimensionSet, FieldValue, Vector};
//!
//! let v = Vector::new(3.0, 4.0, 0.0);
//! assert_eq!(v.mag(), 5.0);
//!
//! let nu = DimensionSet::KINEMATIC_VISCOSITY;
//! assert_eq!(nu, DimensionSet::AREA / DimensionSet::TIME);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dimension;
pub mod error;
pub mod scalar;
pub mod value;

pub use dimension::DimensionSet;
pub use error::{FvError, FvResult};
pub use scalar::{Scalar, GREAT, SMALL, VGREAT, VSMALL};
pub use value::{FieldValue, Gradient, Tensor, Vector};
