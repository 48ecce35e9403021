// crates/fv_core/src/mesh/fv_mesh.rs

//! 有限体积网格
//!
//! 在 [`PolyMesh`] 之上计算离散所需的面几何量：
//!
//! | 量 | 内部面 | 非耦合边界面 | 进程边界面 |
//! |---|---|---|---|
//! | `d` | `C_N - C_P` | `C_f - C_P` | `C_N - C_P`（C_N 来自相邻分区）|
//! | 插值权重 `w` | `|S·(C_N-C_f)| / (|S·(C_f-C_P)| + |S·(C_N-C_f)|)` | 1 | 同内部面 |
//! | 距离系数 | `1/|d|` | `1/max(n·d, 0.05|d|)` | 同非耦合边界 |
//! | 非正交距离系数 | `1/max(n·d, 0.05|d|)` | — | — |
//! | 非正交修正矢量 | `n - d·Δ⊥` | — | — |
//!
//! 进程边界片相邻单元中心在构造时按通信调度交换。

use std::sync::Arc;

use glam::DVec3;

use fv_config::{FvSchemes, FvSolution};
use fv_foundation::{FvResult, VSMALL};
use fv_mesh::{LduAddressing, PatchKind, PolyMesh};

use crate::matrix::{LduInterface, ProcessorInterface};
use crate::parallel::{
    flatten, unflatten, CommsSchedule, CommsType, Communicator, SchedulePhase, SerialCommunicator,
};

use super::region::RegionRegistry;

/// 非正交距离系数下限比例
const NON_ORTH_LIMIT: f64 = 0.05;

/// 默认区域名
pub const DEFAULT_REGION: &str = "region0";

/// 边界片的离散视图
#[derive(Debug, Clone)]
pub struct FvPatch {
    index: usize,
    name: String,
    kind: PatchKind,
    start: usize,
    face_cells: Vec<usize>,
    sf: Vec<DVec3>,
    mag_sf: Vec<f64>,
    cf: Vec<DVec3>,
    weights: Vec<f64>,
    delta_coeffs: Vec<f64>,
    delta: Vec<DVec3>,
    neighbour_centres: Vec<DVec3>,
}

impl FvPatch {
    /// 边界片索引
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// 名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 类型
    #[inline]
    pub fn kind(&self) -> &PatchKind {
        &self.kind
    }

    /// 第一个面的全局编号
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// 参与离散的面数（空边界片为 0）
    #[inline]
    pub fn size(&self) -> usize {
        self.face_cells.len()
    }

    /// 相邻单元
    #[inline]
    pub fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    /// 面积矢量
    #[inline]
    pub fn sf(&self) -> &[DVec3] {
        &self.sf
    }

    /// 面积
    #[inline]
    pub fn mag_sf(&self) -> &[f64] {
        &self.mag_sf
    }

    /// 面心
    #[inline]
    pub fn cf(&self) -> &[DVec3] {
        &self.cf
    }

    /// 单位法向
    pub fn nf(&self) -> Vec<DVec3> {
        self.sf
            .iter()
            .zip(self.mag_sf.iter())
            .map(|(s, &m)| *s / m.max(VSMALL))
            .collect()
    }

    /// 插值权重（相邻单元一侧）
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// 距离系数
    #[inline]
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.delta_coeffs
    }

    /// 单元中心到面心（或相邻单元中心）的矢量
    #[inline]
    pub fn delta(&self) -> &[DVec3] {
        &self.delta
    }

    /// 相邻分区的单元中心（仅进程边界片）
    #[inline]
    pub fn neighbour_centres(&self) -> &[DVec3] {
        &self.neighbour_centres
    }

    /// 是否为耦合边界片
    #[inline]
    pub fn coupled(&self) -> bool {
        self.kind.is_processor()
    }

    /// 相邻进程号
    #[inline]
    pub fn neighbour_rank(&self) -> Option<usize> {
        self.kind.neighbour_rank()
    }
}

/// 有限体积网格
#[derive(Debug)]
pub struct FvMesh {
    name: String,
    poly: PolyMesh,
    comm: Arc<dyn Communicator>,
    schemes: FvSchemes,
    solution: FvSolution,
    regions: Arc<RegionRegistry>,
    mag_sf: Vec<f64>,
    weights: Vec<f64>,
    delta_coeffs: Vec<f64>,
    non_orth_delta_coeffs: Vec<f64>,
    non_orth_correction: Vec<DVec3>,
    patches: Vec<FvPatch>,
    interfaces: Vec<Option<ProcessorInterface>>,
    comms_type: CommsType,
    schedule: CommsSchedule,
}

impl FvMesh {
    /// 创建并交换进程边界片几何
    pub fn new(poly: PolyMesh, comm: Arc<dyn Communicator>) -> FvResult<Self> {
        let centres = poly.cell_centres();
        let face_centres = poly.face_centres();
        let face_areas = poly.face_areas();

        let n_internal = poly.n_internal_faces();
        let mut mag_sf = Vec::with_capacity(n_internal);
        let mut weights = Vec::with_capacity(n_internal);
        let mut delta_coeffs = Vec::with_capacity(n_internal);
        let mut non_orth_delta_coeffs = Vec::with_capacity(n_internal);
        let mut non_orth_correction = Vec::with_capacity(n_internal);

        for f in 0..n_internal {
            let own = centres[poly.owner()[f]];
            let nei = centres[poly.neighbour()[f]];
            let sf = face_areas[f];
            let cf = face_centres[f];
            let (w, dc, nodc, corr) = coupled_face_geometry(sf, cf, own, nei);
            mag_sf.push(sf.length());
            weights.push(w);
            delta_coeffs.push(dc);
            non_orth_delta_coeffs.push(nodc);
            non_orth_correction.push(corr);
        }

        let mut patches: Vec<FvPatch> = poly
            .patches()
            .iter()
            .enumerate()
            .map(|(index, p)| {
                if p.kind.is_empty() {
                    return FvPatch {
                        index,
                        name: p.name.clone(),
                        kind: p.kind.clone(),
                        start: p.start,
                        face_cells: Vec::new(),
                        sf: Vec::new(),
                        mag_sf: Vec::new(),
                        cf: Vec::new(),
                        weights: Vec::new(),
                        delta_coeffs: Vec::new(),
                        delta: Vec::new(),
                        neighbour_centres: Vec::new(),
                    };
                }
                let range = p.range();
                let face_cells = poly.face_cells(index).to_vec();
                let sf = face_areas[range.clone()].to_vec();
                let cf = face_centres[range].to_vec();
                let delta: Vec<DVec3> = face_cells
                    .iter()
                    .zip(cf.iter())
                    .map(|(&c, &f)| f - centres[c])
                    .collect();
                let delta_coeffs = sf
                    .iter()
                    .zip(delta.iter())
                    .map(|(s, d)| boundary_delta_coeff(*s, *d))
                    .collect();
                FvPatch {
                    index,
                    name: p.name.clone(),
                    kind: p.kind.clone(),
                    start: p.start,
                    mag_sf: sf.iter().map(|s| s.length()).collect(),
                    weights: vec![1.0; face_cells.len()],
                    face_cells,
                    sf,
                    cf,
                    delta_coeffs,
                    delta,
                    neighbour_centres: Vec::new(),
                }
            })
            .collect();

        let interfaces: Vec<Option<ProcessorInterface>> = patches
            .iter()
            .map(|p| match p.kind {
                PatchKind::Processor {
                    my_rank,
                    neighb_rank,
                    tag,
                } => Some(ProcessorInterface::new(
                    p.face_cells.clone(),
                    my_rank,
                    neighb_rank,
                    tag,
                )),
                _ => None,
            })
            .collect();

        let comms_type = CommsType::default();
        let neighbours: Vec<Option<usize>> = patches.iter().map(FvPatch::neighbour_rank).collect();
        let schedule = CommsSchedule::build(&neighbours, comms_type);

        // 交换进程边界片相邻单元中心
        for entry in schedule.iter() {
            let Some(iface) = &interfaces[entry.interface] else {
                continue;
            };
            match entry.phase {
                SchedulePhase::Init => {
                    let own: Vec<DVec3> = iface.face_cells().iter().map(|&c| centres[c]).collect();
                    comm.send(iface.neighb_rank(), iface.tag(), flatten(&own))?;
                }
                SchedulePhase::Complete => {
                    let n = iface.face_cells().len();
                    let data = comm.recv(iface.neighb_rank(), iface.tag(), 3 * n)?;
                    let patch = &mut patches[entry.interface];
                    patch.neighbour_centres = unflatten(&data);
                    for i in 0..n {
                        let own = centres[patch.face_cells[i]];
                        let nei = patch.neighbour_centres[i];
                        let (w, _, nodc, _) =
                            coupled_face_geometry(patch.sf[i], patch.cf[i], own, nei);
                        patch.weights[i] = w;
                        patch.delta[i] = nei - own;
                        patch.delta_coeffs[i] = nodc;
                    }
                }
            }
        }

        tracing::debug!(
            "有限体积网格: rank {}/{}, {} 单元, {} 内部面, {} 边界片",
            comm.rank(),
            comm.n_ranks(),
            poly.n_cells(),
            n_internal,
            patches.len()
        );

        let regions = Arc::new(RegionRegistry::new());
        for patch in poly.patches() {
            if let PatchKind::Mapped { .. } = patch.kind {
                regions.declare(DEFAULT_REGION, &patch.name);
            }
        }

        Ok(Self {
            name: DEFAULT_REGION.to_string(),
            poly,
            comm,
            schemes: FvSchemes::default(),
            solution: FvSolution::default(),
            regions,
            mag_sf,
            weights,
            delta_coeffs,
            non_orth_delta_coeffs,
            non_orth_correction,
            patches,
            interfaces,
            comms_type,
            schedule,
        })
    }

    /// 单进程网格
    pub fn serial(poly: PolyMesh) -> FvResult<Self> {
        Self::new(poly, Arc::new(SerialCommunicator))
    }

    /// 设置区域名与区域注册表，并登记本区域的 mapped 边界片
    pub fn with_region(mut self, name: impl Into<String>, regions: Arc<RegionRegistry>) -> Self {
        self.name = name.into();
        for patch in self.poly.patches() {
            if let PatchKind::Mapped { .. } = patch.kind {
                regions.declare(&self.name, &patch.name);
            }
        }
        self.regions = regions;
        self
    }

    /// 设置离散格式
    pub fn with_schemes(mut self, schemes: FvSchemes) -> Self {
        self.schemes = schemes;
        self
    }

    /// 设置求解控制
    pub fn with_solution(mut self, solution: FvSolution) -> Self {
        self.solution = solution;
        self
    }

    /// 设置通信方式
    pub fn with_comms_type(mut self, comms_type: CommsType) -> Self {
        let neighbours: Vec<Option<usize>> =
            self.patches.iter().map(FvPatch::neighbour_rank).collect();
        self.comms_type = comms_type;
        self.schedule = CommsSchedule::build(&neighbours, comms_type);
        self
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 区域名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 多面体网格
    pub fn poly(&self) -> &PolyMesh {
        &self.poly
    }

    /// 通信器
    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    /// 离散格式
    pub fn schemes(&self) -> &FvSchemes {
        &self.schemes
    }

    /// 求解控制
    pub fn solution(&self) -> &FvSolution {
        &self.solution
    }

    /// 区域注册表
    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    /// LDU 寻址
    pub fn ldu_addr(&self) -> &LduAddressing {
        self.poly.ldu_addr()
    }

    /// 共享的 LDU 寻址（矩阵持有）
    pub fn shared_addr(&self) -> Arc<LduAddressing> {
        self.poly.shared_addr()
    }

    /// 单元数
    pub fn n_cells(&self) -> usize {
        self.poly.n_cells()
    }

    /// 内部面数
    pub fn n_internal_faces(&self) -> usize {
        self.poly.n_internal_faces()
    }

    /// 内部面 owner
    pub fn owner(&self) -> &[usize] {
        &self.poly.owner()[..self.poly.n_internal_faces()]
    }

    /// 内部面 neighbour
    pub fn neighbour(&self) -> &[usize] {
        self.poly.neighbour()
    }

    /// 单元体积
    pub fn volumes(&self) -> &[f64] {
        self.poly.cell_volumes()
    }

    /// 单元中心
    pub fn cell_centres(&self) -> &[DVec3] {
        self.poly.cell_centres()
    }

    /// 内部面面积矢量
    pub fn sf(&self) -> &[DVec3] {
        &self.poly.face_areas()[..self.poly.n_internal_faces()]
    }

    /// 内部面面心
    pub fn cf(&self) -> &[DVec3] {
        &self.poly.face_centres()[..self.poly.n_internal_faces()]
    }

    /// 内部面面积
    pub fn mag_sf(&self) -> &[f64] {
        &self.mag_sf
    }

    /// 内部面线性插值权重
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// 内部面距离系数 `1/|d|`
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.delta_coeffs
    }

    /// 内部面非正交距离系数
    pub fn non_orth_delta_coeffs(&self) -> &[f64] {
        &self.non_orth_delta_coeffs
    }

    /// 内部面非正交修正矢量
    pub fn non_orth_correction_vectors(&self) -> &[DVec3] {
        &self.non_orth_correction
    }

    /// 边界片
    pub fn boundary(&self) -> &[FvPatch] {
        &self.patches
    }

    /// 按名称查找边界片
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// 边界片的耦合接口
    pub fn interface(&self, patch: usize) -> Option<&ProcessorInterface> {
        self.interfaces.get(patch).and_then(Option::as_ref)
    }

    /// 通信方式
    pub fn comms_type(&self) -> CommsType {
        self.comms_type
    }

    /// 全部边界片的通信调度
    pub fn schedule(&self) -> &CommsSchedule {
        &self.schedule
    }

    /// 求解方向
    pub fn solution_directions(&self) -> [bool; 3] {
        self.poly.solution_directions()
    }
}

/// 两个单元中心之间的面几何量：(权重, 1/|d|, 非正交距离系数, 非正交修正矢量)
fn coupled_face_geometry(sf: DVec3, cf: DVec3, own: DVec3, nei: DVec3) -> (f64, f64, f64, DVec3) {
    let sfd_own = sf.dot(cf - own).abs();
    let sfd_nei = sf.dot(nei - cf).abs();
    let w = if sfd_own + sfd_nei > VSMALL {
        sfd_nei / (sfd_own + sfd_nei)
    } else {
        0.5
    };

    let d = nei - own;
    let mag_d = d.length().max(VSMALL);
    let nf = sf / sf.length().max(VSMALL);
    let non_orth = 1.0 / nf.dot(d).max(NON_ORTH_LIMIT * mag_d);
    (w, 1.0 / mag_d, non_orth, nf - d * non_orth)
}

fn boundary_delta_coeff(sf: DVec3, d: DVec3) -> f64 {
    let nf = sf / sf.length().max(VSMALL);
    1.0 / nf.dot(d).max(NON_ORTH_LIMIT * d.length()).max(VSMALL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::BlockMesh;

    #[test]
    fn test_uniform_line_geometry() {
        let mesh = FvMesh::serial(BlockMesh::one_dimensional(4, 2.0).build().unwrap()).unwrap();
        assert_eq!(mesh.n_internal_faces(), 3);
        for f in 0..3 {
            assert!((mesh.weights()[f] - 0.5).abs() < 1e-12);
            assert!((mesh.delta_coeffs()[f] - 2.0).abs() < 1e-12);
            assert!(mesh.non_orth_correction_vectors()[f].length() < 1e-12);
        }
        let xmin = &mesh.boundary()[mesh.find_patch("xmin").unwrap()];
        assert_eq!(xmin.size(), 1);
        // 半个单元距离
        assert!((xmin.delta_coeffs()[0] - 4.0).abs() < 1e-12);
        let ymin = &mesh.boundary()[mesh.find_patch("ymin").unwrap()];
        assert_eq!(ymin.size(), 0);
    }

    #[test]
    fn test_schedule_covers_all_patches() {
        let mesh = FvMesh::serial(BlockMesh::one_dimensional(2, 1.0).build().unwrap()).unwrap();
        assert_eq!(mesh.schedule().len(), 2 * mesh.boundary().len());
        assert!(mesh.interface(0).is_none());
    }
}
