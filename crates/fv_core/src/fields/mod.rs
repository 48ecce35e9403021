// crates/fv_core/src/fields/mod.rs

//! 场
//!
//! - [`VolField`]: 单元中心场 + 每个边界片一个 [`PatchField`](crate::boundary::PatchField)
//! - [`SurfaceField`]: 面场（内部面 + 每个边界片的面值）
//! - [`ComponentField`]: 单个分量的标量视图，供梯度与非正交修正逐分量计算
//! - [`DimensionedScalar`]: 带量纲的标量常数
//! - [`TimeState`]: 时间步状态

mod component;
mod dimensioned;
mod surface_field;
mod time;
mod vol_field;

pub use component::ComponentField;
pub use dimensioned::DimensionedScalar;
pub use surface_field::SurfaceField;
pub use time::TimeState;
pub use vol_field::VolField;
