// crates/fv_core/src/mesh/mod.rs

//! 有限体积网格
//!
//! - [`FvMesh`]: 多面体网格 + 通信器 + 离散所需的面几何量
//! - [`FvPatch`]: 边界片的离散视图（空边界片大小为 0）
//! - [`RegionRegistry`]: 多区域耦合时发布/获取边界片数据

mod fv_mesh;
mod region;

pub use fv_mesh::{FvMesh, FvPatch, DEFAULT_REGION};
pub use region::RegionRegistry;
