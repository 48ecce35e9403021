// crates/fv_mesh/src/block.rs

//! 结构化六面体块
//!
//! 轴对齐长方体被均匀划分为 `nx × ny × nz` 个六面体单元，六个边界片依次为
//! `xmin, xmax, ymin, ymax, zmin, zmax`。一维/二维问题把不求解方向的两个
//! 边界片设为 `empty`。
//!
//! [`BlockMesh::decompose_x`] 沿 x 方向把块切成若干分区，相邻分区之间以
//! processor 边界片连接，两侧面顺序一致，供并行测试与多线程运行使用。
//!
//! ```
//! use fv_mesh::BlockMesh;
//!
//! let mesh = BlockMesh::one_dimensional(4, 2.0).build().unwrap();
//! assert_eq!(mesh.n_cells(), 4);
//! assert_eq!(mesh.n_internal_faces(), 3);
//! assert_eq!(mesh.solution_directions(), [true, false, false]);
//! ```

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use fv_foundation::{FvError, FvResult};

use crate::patch::{PatchKind, PolyPatch};
use crate::poly_mesh::PolyMesh;

/// 六个边界片名
pub const PATCH_NAMES: [&str; 6] = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];

/// 块边界片类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockPatchType {
    /// 普通边界
    #[default]
    Patch,
    /// 壁面
    Wall,
    /// 空边界
    Empty,
}

impl From<BlockPatchType> for PatchKind {
    fn from(t: BlockPatchType) -> Self {
        match t {
            BlockPatchType::Patch => PatchKind::Patch,
            BlockPatchType::Wall => PatchKind::Wall,
            BlockPatchType::Empty => PatchKind::Empty,
        }
    }
}

/// 结构化块描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMesh {
    /// 各方向单元数
    pub cells: [usize; 3],
    /// 最小角点
    #[serde(default)]
    pub origin: [f64; 3],
    /// 各方向长度
    pub extent: [f64; 3],
    /// 边界片类型，未列出的为 `patch`
    #[serde(default)]
    pub patches: BTreeMap<String, BlockPatchType>,
}

/// 一个分区在 x 方向上的单元范围及两侧进程边界
struct Part {
    i0: usize,
    i1: usize,
    rank: usize,
    n_parts: usize,
}

impl BlockMesh {
    /// 创建
    pub fn new(cells: [usize; 3], origin: [f64; 3], extent: [f64; 3]) -> Self {
        Self {
            cells,
            origin,
            extent,
            patches: BTreeMap::new(),
        }
    }

    /// 一维块：x 方向 `n` 个单元，y/z 两侧为 empty
    pub fn one_dimensional(n: usize, length: f64) -> Self {
        Self::new([n, 1, 1], [0.0; 3], [length, 1.0, 1.0])
            .with_patch("ymin", BlockPatchType::Empty)
            .with_patch("ymax", BlockPatchType::Empty)
            .with_patch("zmin", BlockPatchType::Empty)
            .with_patch("zmax", BlockPatchType::Empty)
    }

    /// 二维块：z 两侧为 empty
    pub fn two_dimensional(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self::new([nx, ny, 1], [0.0; 3], [lx, ly, 1.0])
            .with_patch("zmin", BlockPatchType::Empty)
            .with_patch("zmax", BlockPatchType::Empty)
    }

    /// 设置边界片类型
    pub fn with_patch(mut self, name: &str, kind: BlockPatchType) -> Self {
        self.patches.insert(name.to_string(), kind);
        self
    }

    /// 校验
    pub fn validate(&self) -> FvResult<()> {
        for (axis, (&n, &l)) in self.cells.iter().zip(self.extent.iter()).enumerate() {
            if n == 0 {
                return Err(FvError::invalid_config(
                    format!("mesh.cells[{axis}]"),
                    n.to_string(),
                    "必须为正",
                ));
            }
            if !(l > 0.0) {
                return Err(FvError::invalid_config(
                    format!("mesh.extent[{axis}]"),
                    l.to_string(),
                    "必须为正",
                ));
            }
        }
        if let Some(name) = self.patches.keys().find(|k| !PATCH_NAMES.contains(&k.as_str())) {
            return Err(FvError::invalid_config(
                "mesh.patches",
                name.clone(),
                format!("边界片名必须是 {PATCH_NAMES:?} 之一"),
            ));
        }
        Ok(())
    }

    /// 总单元数
    pub fn n_cells(&self) -> usize {
        self.cells.iter().product()
    }

    /// 构建完整网格
    pub fn build(&self) -> FvResult<PolyMesh> {
        self.validate()?;
        self.build_part(&Part {
            i0: 0,
            i1: self.cells[0],
            rank: 0,
            n_parts: 1,
        })
    }

    /// 沿 x 方向均匀切分为 `n_parts` 个分区
    ///
    /// 分区 `r` 与 `r + 1` 之间的 processor 边界片使用标签 `r`。
    pub fn decompose_x(&self, n_parts: usize) -> FvResult<Vec<PolyMesh>> {
        self.validate()?;
        let nx = self.cells[0];
        if n_parts == 0 || n_parts > nx {
            return Err(FvError::invalid_config(
                "partitions",
                n_parts.to_string(),
                format!("必须在 1..={nx} 内"),
            ));
        }
        let base = nx / n_parts;
        let extra = nx % n_parts;
        let mut i0 = 0;
        (0..n_parts)
            .map(|rank| {
                let len = base + usize::from(rank < extra);
                let part = Part {
                    i0,
                    i1: i0 + len,
                    rank,
                    n_parts,
                };
                i0 += len;
                self.build_part(&part)
            })
            .collect()
    }

    fn patch_kind(&self, name: &str) -> PatchKind {
        self.patches.get(name).copied().unwrap_or_default().into()
    }

    fn build_part(&self, part: &Part) -> FvResult<PolyMesh> {
        let nx = part.i1 - part.i0;
        let [_, ny, nz] = self.cells;
        let d = DVec3::new(
            self.extent[0] / self.cells[0] as f64,
            self.extent[1] / ny as f64,
            self.extent[2] / nz as f64,
        );
        let origin = DVec3::from_array(self.origin);

        let pid = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
        let cid = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    points.push(
                        origin
                            + DVec3::new(
                                (part.i0 + i) as f64 * d.x,
                                j as f64 * d.y,
                                k as f64 * d.z,
                            ),
                    );
                }
            }
        }

        let mut faces: Vec<Vec<usize>> = Vec::new();
        let mut owner = Vec::new();
        let mut neighbour = Vec::new();

        // 内部面：按单元编号遍历，依次 +x, +y, +z，保证上三角顺序
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let c = cid(i, j, k);
                    if i + 1 < nx {
                        faces.push(vec![
                            pid(i + 1, j, k),
                            pid(i + 1, j + 1, k),
                            pid(i + 1, j + 1, k + 1),
                            pid(i + 1, j, k + 1),
                        ]);
                        owner.push(c);
                        neighbour.push(cid(i + 1, j, k));
                    }
                    if j + 1 < ny {
                        faces.push(vec![
                            pid(i, j + 1, k),
                            pid(i, j + 1, k + 1),
                            pid(i + 1, j + 1, k + 1),
                            pid(i + 1, j + 1, k),
                        ]);
                        owner.push(c);
                        neighbour.push(cid(i, j + 1, k));
                    }
                    if k + 1 < nz {
                        faces.push(vec![
                            pid(i, j, k + 1),
                            pid(i + 1, j, k + 1),
                            pid(i + 1, j + 1, k + 1),
                            pid(i, j + 1, k + 1),
                        ]);
                        owner.push(c);
                        neighbour.push(cid(i, j, k + 1));
                    }
                }
            }
        }

        let mut patches = Vec::with_capacity(6);
        let mut add_patch = |name: String, kind: PatchKind, new_faces: Vec<(Vec<usize>, usize)>| {
            let start = faces.len();
            let size = new_faces.len();
            for (f, c) in new_faces {
                faces.push(f);
                owner.push(c);
            }
            patches.push(PolyPatch::new(name, kind, start, size));
        };

        // xmin / xmax，分区内部一侧替换为 processor
        let xmin: Vec<_> = (0..nz)
            .flat_map(|k| (0..ny).map(move |j| (j, k)))
            .map(|(j, k)| {
                (
                    vec![pid(0, j, k), pid(0, j, k + 1), pid(0, j + 1, k + 1), pid(0, j + 1, k)],
                    cid(0, j, k),
                )
            })
            .collect();
        let xmax: Vec<_> = (0..nz)
            .flat_map(|k| (0..ny).map(move |j| (j, k)))
            .map(|(j, k)| {
                (
                    vec![pid(nx, j, k), pid(nx, j + 1, k), pid(nx, j + 1, k + 1), pid(nx, j, k + 1)],
                    cid(nx - 1, j, k),
                )
            })
            .collect();

        if part.rank > 0 {
            add_patch(
                format!("procBoundary{}to{}", part.rank, part.rank - 1),
                PatchKind::Processor {
                    my_rank: part.rank,
                    neighb_rank: part.rank - 1,
                    tag: (part.rank - 1) as u32,
                },
                xmin,
            );
        } else {
            add_patch("xmin".into(), self.patch_kind("xmin"), xmin);
        }
        if part.rank + 1 < part.n_parts {
            add_patch(
                format!("procBoundary{}to{}", part.rank, part.rank + 1),
                PatchKind::Processor {
                    my_rank: part.rank,
                    neighb_rank: part.rank + 1,
                    tag: part.rank as u32,
                },
                xmax,
            );
        } else {
            add_patch("xmax".into(), self.patch_kind("xmax"), xmax);
        }

        let ymin: Vec<_> = (0..nz)
            .flat_map(|k| (0..nx).map(move |i| (i, k)))
            .map(|(i, k)| {
                (
                    vec![pid(i, 0, k), pid(i + 1, 0, k), pid(i + 1, 0, k + 1), pid(i, 0, k + 1)],
                    cid(i, 0, k),
                )
            })
            .collect();
        add_patch("ymin".into(), self.patch_kind("ymin"), ymin);

        let ymax: Vec<_> = (0..nz)
            .flat_map(|k| (0..nx).map(move |i| (i, k)))
            .map(|(i, k)| {
                (
                    vec![pid(i, ny, k), pid(i, ny, k + 1), pid(i + 1, ny, k + 1), pid(i + 1, ny, k)],
                    cid(i, ny - 1, k),
                )
            })
            .collect();
        add_patch("ymax".into(), self.patch_kind("ymax"), ymax);

        let zmin: Vec<_> = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (i, j)))
            .map(|(i, j)| {
                (
                    vec![pid(i, j, 0), pid(i, j + 1, 0), pid(i + 1, j + 1, 0), pid(i + 1, j, 0)],
                    cid(i, j, 0),
                )
            })
            .collect();
        add_patch("zmin".into(), self.patch_kind("zmin"), zmin);

        let zmax: Vec<_> = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (i, j)))
            .map(|(i, j)| {
                (
                    vec![pid(i, j, nz), pid(i + 1, j, nz), pid(i + 1, j + 1, nz), pid(i, j + 1, nz)],
                    cid(i, j, nz - 1),
                )
            })
            .collect();
        add_patch("zmax".into(), self.patch_kind("zmax"), zmax);

        tracing::debug!(
            "块网格分区 {}/{}: {} 单元, {} 内部面",
            part.rank,
            part.n_parts,
            nx * ny * nz,
            neighbour.len()
        );

        PolyMesh::new(&points, &faces, owner, neighbour, patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_counts() {
        let mesh = BlockMesh::new([3, 2, 2], [0.0; 3], [3.0, 2.0, 2.0]).build().unwrap();
        assert_eq!(mesh.n_cells(), 12);
        // (nx-1)ny nz + nx(ny-1)nz + nx ny(nz-1)
        assert_eq!(mesh.n_internal_faces(), 8 + 6 + 6);
        assert_eq!(mesh.patches().len(), 6);
        let total: f64 = mesh.cell_volumes().iter().sum();
        assert!((total - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_vectors_point_outward() {
        let mesh = BlockMesh::new([2, 2, 1], [0.0; 3], [1.0, 1.0, 1.0]).build().unwrap();
        for patch in mesh.patches() {
            for f in patch.range() {
                let cell = mesh.owner()[f];
                let out = mesh.face_centres()[f] - mesh.cell_centres()[cell];
                assert!(mesh.face_areas()[f].dot(out) > 0.0, "patch {}", patch.name);
            }
        }
        for f in 0..mesh.n_internal_faces() {
            let d = mesh.cell_centres()[mesh.neighbour()[f]] - mesh.cell_centres()[mesh.owner()[f]];
            assert!(mesh.face_areas()[f].dot(d) > 0.0);
        }
    }

    #[test]
    fn test_decompose_x() {
        let block = BlockMesh::one_dimensional(5, 5.0);
        let parts = block.decompose_x(2).unwrap();
        assert_eq!(parts[0].n_cells(), 3);
        assert_eq!(parts[1].n_cells(), 2);

        let p0 = parts[0].find_patch("procBoundary0to1").unwrap();
        let p1 = parts[1].find_patch("procBoundary1to0").unwrap();
        assert_eq!(parts[0].patches()[p0].size, parts[1].patches()[p1].size);
        assert_eq!(
            parts[0].patches()[p0].kind,
            PatchKind::Processor { my_rank: 0, neighb_rank: 1, tag: 0 }
        );

        // 第二个分区的单元中心在全局坐标下
        assert!((parts[1].cell_centres()[0].x - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_patch_name() {
        let block = BlockMesh::one_dimensional(2, 1.0).with_patch("left", BlockPatchType::Wall);
        assert!(block.build().is_err());
        assert!(BlockMesh::one_dimensional(2, 1.0).decompose_x(3).is_err());
    }
}
