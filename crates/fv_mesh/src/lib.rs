// crates/fv_mesh/src/lib.rs

//! FinVol 网格层
//!
//! 离散与求解所消费的网格信息：
//!
//! - [`addressing`]: LDU 寻址（每个内部面的 lower/upper 单元及派生的排序表）
//! - [`patch`]: 边界片（普通、壁面、空、进程间、映射）
//! - [`geometry`]: 由点与面顶点计算面心、面积矢量、单元中心与体积
//! - [`poly_mesh`]: 多面体网格（拓扑 + 几何），构造时校验寻址
//! - [`block`]: 结构化六面体块，用于测试与命令行算例，可沿 x 方向切分为多个分区
//!
//! 面编号约定：先内部面（按 owner、neighbour 升序，即上三角顺序），
//! 后边界面，每个边界片占据一段连续的面编号。

#![warn(missing_docs)]

pub mod addressing;
pub mod block;
pub mod geometry;
pub mod patch;
pub mod poly_mesh;

pub use addressing::LduAddressing;
pub use block::{BlockMesh, BlockPatchType};
pub use patch::{PatchKind, PolyPatch};
pub use poly_mesh::{MeshGeometry, PolyMesh};
