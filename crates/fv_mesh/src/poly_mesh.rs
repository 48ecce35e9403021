// crates/fv_mesh/src/poly_mesh.rs

//! 多面体网格
//!
//! 网格由面描述：每个面有一个 owner 单元，内部面另有一个 neighbour 单元。
//! 构造时校验：
//!
//! - 内部面满足 LDU 寻址约束（见 [`LduAddressing`]）
//! - 边界片从第一个边界面开始首尾相接，覆盖全部边界面且不重叠
//! - 几何数组长度与拓扑一致，单元体积为正

use std::sync::Arc;

use glam::DVec3;

use fv_foundation::{FvError, FvResult};

use crate::addressing::LduAddressing;
use crate::geometry::{cell_centres_and_volumes, face_centre_and_area};
use crate::patch::{PatchKind, PolyPatch};

/// 网格几何
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// 单元中心
    pub cell_centres: Vec<DVec3>,
    /// 单元体积
    pub cell_volumes: Vec<f64>,
    /// 面心
    pub face_centres: Vec<DVec3>,
    /// 面积矢量（owner 指向 neighbour / 域外）
    pub face_areas: Vec<DVec3>,
}

/// 多面体网格
#[derive(Debug, Clone)]
pub struct PolyMesh {
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<PolyPatch>,
    addressing: Arc<LduAddressing>,
    geometry: MeshGeometry,
}

impl PolyMesh {
    /// 由点与面顶点表构造，几何由剖分计算
    pub fn new(
        points: &[DVec3],
        faces: &[Vec<usize>],
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<PolyPatch>,
    ) -> FvResult<Self> {
        FvError::check_size("faces", owner.len(), faces.len())?;
        for (f, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(FvError::addressing(format!("面 {f} 少于 3 个顶点")));
            }
            if let Some(&p) = face.iter().find(|&&p| p >= points.len()) {
                return Err(FvError::addressing(format!(
                    "面 {f} 引用了不存在的点 {p}"
                )));
            }
        }

        let (face_centres, face_areas): (Vec<_>, Vec<_>) = faces
            .iter()
            .map(|face| face_centre_and_area(points, face))
            .unzip();

        let n_cells = Self::count_cells(&owner, &neighbour);
        let (cell_centres, cell_volumes) =
            cell_centres_and_volumes(n_cells, &owner, &neighbour, &face_centres, &face_areas);

        Self::from_geometry(
            owner,
            neighbour,
            patches,
            MeshGeometry {
                cell_centres,
                cell_volumes,
                face_centres,
                face_areas,
            },
        )
    }

    /// 由显式几何构造
    ///
    /// 单元数取自 `geometry.cell_centres` 的长度。
    pub fn from_geometry(
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<PolyPatch>,
        geometry: MeshGeometry,
    ) -> FvResult<Self> {
        let n_cells = geometry.cell_centres.len();
        let n_faces = owner.len();
        let n_internal = neighbour.len();

        FvError::check_size("cell_volumes", n_cells, geometry.cell_volumes.len())?;
        FvError::check_size("face_centres", n_faces, geometry.face_centres.len())?;
        FvError::check_size("face_areas", n_faces, geometry.face_areas.len())?;

        if n_internal > n_faces {
            return Err(FvError::addressing(format!(
                "内部面数 {n_internal} 大于总面数 {n_faces}"
            )));
        }
        if let Some((f, &o)) = owner.iter().enumerate().find(|(_, &o)| o >= n_cells) {
            return Err(FvError::addressing(format!(
                "面 {f} 的 owner {o} 超出单元数 {n_cells}"
            )));
        }

        Self::check_patches(&patches, n_internal, n_faces)?;

        if let Some((cell, v)) = geometry
            .cell_volumes
            .iter()
            .enumerate()
            .find(|(_, &v)| !(v > 0.0))
        {
            return Err(FvError::addressing(format!("单元 {cell} 的体积非正: {v}")));
        }

        let addressing = Arc::new(LduAddressing::new(
            n_cells,
            owner[..n_internal].to_vec(),
            neighbour.clone(),
        )?);

        Ok(Self {
            owner,
            neighbour,
            patches,
            addressing,
            geometry,
        })
    }

    fn count_cells(owner: &[usize], neighbour: &[usize]) -> usize {
        owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map_or(0, |&m| m + 1)
    }

    /// 边界片必须首尾相接地覆盖所有边界面
    fn check_patches(patches: &[PolyPatch], n_internal: usize, n_faces: usize) -> FvResult<()> {
        let mut expected_start = n_internal;
        for patch in patches {
            if patch.start != expected_start {
                return Err(FvError::addressing(format!(
                    "边界片 '{}' 起始面 {} 与期望 {} 不符（边界面必须恰好属于一个边界片）",
                    patch.name, patch.start, expected_start
                )));
            }
            expected_start += patch.size;
        }
        if expected_start != n_faces {
            return Err(FvError::addressing(format!(
                "边界片覆盖到面 {expected_start}，但网格共有 {n_faces} 个面"
            )));
        }

        for (i, a) in patches.iter().enumerate() {
            if patches[..i].iter().any(|b| b.name == a.name) {
                return Err(FvError::addressing(format!("边界片名 '{}' 重复", a.name)));
            }
        }
        Ok(())
    }

    // ========================================================================
    // 拓扑访问
    // ========================================================================

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.geometry.cell_centres.len()
    }

    /// 总面数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }

    /// 内部面数
    #[inline]
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    /// 全部面的 owner
    #[inline]
    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    /// 内部面的 neighbour
    #[inline]
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    /// LDU 寻址
    #[inline]
    pub fn ldu_addr(&self) -> &LduAddressing {
        &self.addressing
    }

    /// 共享的 LDU 寻址（矩阵持有）
    #[inline]
    pub fn shared_addr(&self) -> Arc<LduAddressing> {
        Arc::clone(&self.addressing)
    }

    /// 边界片列表
    #[inline]
    pub fn patches(&self) -> &[PolyPatch] {
        &self.patches
    }

    /// 按名称查找边界片索引
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// 修改边界片类型（例如把块网格的某一侧改为 mapped）
    ///
    /// 进程边界片由切分生成，不能在这里改写。
    pub fn with_patch_kind(mut self, name: &str, kind: PatchKind) -> FvResult<Self> {
        let patch = self
            .patches
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| FvError::invalid_config("patch", name, "边界片不存在"))?;
        if patch.kind.is_processor() || kind.is_processor() {
            return Err(FvError::invalid_config(
                format!("{name}.type"),
                kind.type_name(),
                "进程边界片只能由切分生成",
            ));
        }
        patch.kind = kind;
        Ok(self)
    }

    /// 边界片相邻单元
    pub fn face_cells(&self, patch: usize) -> &[usize] {
        &self.owner[self.patches[patch].range()]
    }

    // ========================================================================
    // 几何访问
    // ========================================================================

    /// 几何
    #[inline]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// 单元中心
    #[inline]
    pub fn cell_centres(&self) -> &[DVec3] {
        &self.geometry.cell_centres
    }

    /// 单元体积
    #[inline]
    pub fn cell_volumes(&self) -> &[f64] {
        &self.geometry.cell_volumes
    }

    /// 面心
    #[inline]
    pub fn face_centres(&self) -> &[DVec3] {
        &self.geometry.face_centres
    }

    /// 面积矢量
    #[inline]
    pub fn face_areas(&self) -> &[DVec3] {
        &self.geometry.face_areas
    }

    /// 求解方向：空边界法向所在的坐标轴不求解
    pub fn solution_directions(&self) -> [bool; 3] {
        let mut dirs = [true; 3];
        for patch in self.patches.iter().filter(|p| p.kind == PatchKind::Empty) {
            if let Some(sf) = self.geometry.face_areas.get(patch.start) {
                let a = sf.abs();
                let axis = if a.x >= a.y && a.x >= a.z {
                    0
                } else if a.y >= a.z {
                    1
                } else {
                    2
                };
                dirs[axis] = false;
            }
        }
        dirs
    }

    /// 网格维数
    pub fn n_geometric_d(&self) -> usize {
        self.solution_directions().iter().filter(|&&d| d).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 单位立方体单元
    fn unit_cube() -> PolyMesh {
        let p = |x: f64, y: f64, z: f64| DVec3::new(x, y, z);
        let points = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ];
        // 全部面法向朝外
        let faces = vec![
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
            vec![0, 1, 5, 4], // -y
            vec![3, 7, 6, 2], // +y
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
        ];
        PolyMesh::new(
            &points,
            &faces,
            vec![0; 6],
            vec![],
            vec![PolyPatch::new("walls", PatchKind::Wall, 0, 6)],
        )
        .unwrap()
    }

    #[test]
    fn test_cube_geometry() {
        let mesh = unit_cube();
        assert_eq!(mesh.n_cells(), 1);
        assert!((mesh.cell_volumes()[0] - 1.0).abs() < 1e-12);
        assert!((mesh.cell_centres()[0] - DVec3::splat(0.5)).length() < 1e-12);
        assert!((mesh.face_areas()[1] - DVec3::X).length() < 1e-12);
        assert!((mesh.face_areas()[0] + DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_patch_gap_rejected() {
        let geometry = MeshGeometry {
            cell_centres: vec![DVec3::ZERO; 2],
            cell_volumes: vec![1.0; 2],
            face_centres: vec![DVec3::ZERO; 3],
            face_areas: vec![DVec3::X; 3],
        };
        let err = PolyMesh::from_geometry(
            vec![0, 0, 1],
            vec![1],
            vec![PolyPatch::new("left", PatchKind::Patch, 1, 1)],
            geometry,
        )
        .unwrap_err();
        assert!(matches!(err, FvError::Addressing { .. }));
    }

    #[test]
    fn test_negative_volume_rejected() {
        let geometry = MeshGeometry {
            cell_centres: vec![DVec3::ZERO],
            cell_volumes: vec![-1.0],
            face_centres: vec![],
            face_areas: vec![],
        };
        assert!(PolyMesh::from_geometry(vec![], vec![], vec![], geometry).is_err());
    }

    #[test]
    fn test_with_patch_kind() {
        let mesh = unit_cube()
            .with_patch_kind(
                "walls",
                PatchKind::Mapped {
                    sample_region: "solid".into(),
                    sample_patch: "interface".into(),
                },
            )
            .unwrap();
        assert_eq!(mesh.patches()[0].kind.type_name(), "mapped");

        assert!(unit_cube().with_patch_kind("inlet", PatchKind::Patch).is_err());
        let processor = PatchKind::Processor {
            my_rank: 0,
            neighb_rank: 1,
            tag: 0,
        };
        assert!(unit_cube().with_patch_kind("walls", processor).is_err());
    }
}
