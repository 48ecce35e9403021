// crates/fv_core/src/matrix/fv_matrix.rs

//! 有限体积方程
//!
//! [`FvMatrix`] 表示表达式 `A·ψ − b`：LDU 系数、源项 `b`，以及每个边界片的
//! 两组系数：
//!
//! - `internal_coeffs`: 求解时加到相邻单元对角上
//! - `boundary_coeffs`: 非耦合边界片加到源项；耦合边界片作为接口系数，
//!   求解时以 `A·ψ −= k·ψ_nbr` 的形式参与矩阵乘
//!
//! 方程可以相加、相减、取负（量纲与场名必须一致），`==` 右侧的显式场用
//! [`FvMatrix::sub_explicit`] 表示。
//!
//! 多分量场按分量分离求解：每个分量共享同一组 LDU 系数，只有边界贡献与
//! 源项按分量取值。降维方向上的矢量分量不求解。

use std::ops::{Add, Neg, Sub};
use std::sync::Arc;

use fv_config::SolverControls;
use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult};

use crate::fields::{SurfaceField, VolField};
use crate::mesh::FvMesh;
use crate::solvers::{new_solver, LduSystem};

use super::interface::{CoupledInterfaces, LduInterface};
use super::ldu_matrix::LduMatrix;
use super::performance::{SolverPerformance, SolverStatus};

/// 有限体积方程
#[derive(Debug, Clone)]
pub struct FvMatrix<T: FieldValue> {
    field_name: String,
    mesh: Arc<FvMesh>,
    dimensions: DimensionSet,
    ldu: LduMatrix,
    source: Vec<T>,
    internal_coeffs: Vec<Vec<T>>,
    boundary_coeffs: Vec<Vec<T>>,
}

/// 分量后缀
fn component_suffix(n_components: usize, c: usize) -> &'static str {
    const VECTOR: [&str; 3] = ["x", "y", "z"];
    const TENSOR: [&str; 9] = ["xx", "xy", "xz", "yx", "yy", "yz", "zx", "zy", "zz"];
    match n_components {
        3 => VECTOR[c],
        9 => TENSOR[c],
        _ => "",
    }
}

impl<T: FieldValue> FvMatrix<T> {
    /// 场 `psi` 的零方程，`dimensions` 为方程量纲
    pub fn new(psi: &VolField<T>, dimensions: DimensionSet) -> Self {
        let mesh = Arc::clone(psi.mesh());
        let zeros = |n: usize| vec![T::ZERO; n];
        Self {
            field_name: psi.name().to_string(),
            ldu: LduMatrix::new(mesh.shared_addr()),
            source: zeros(mesh.n_cells()),
            internal_coeffs: mesh.boundary().iter().map(|p| zeros(p.size())).collect(),
            boundary_coeffs: mesh.boundary().iter().map(|p| zeros(p.size())).collect(),
            dimensions,
            mesh,
        }
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 求解的场名
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// 网格
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    /// 方程量纲
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// LDU 系数
    pub fn ldu(&self) -> &LduMatrix {
        &self.ldu
    }

    /// 可变 LDU 系数
    pub fn ldu_mut(&mut self) -> &mut LduMatrix {
        &mut self.ldu
    }

    /// 源项
    pub fn source(&self) -> &[T] {
        &self.source
    }

    /// 可变源项
    pub fn source_mut(&mut self) -> &mut [T] {
        &mut self.source
    }

    /// 各边界片的对角贡献
    pub fn internal_coeffs(&self) -> &[Vec<T>] {
        &self.internal_coeffs
    }

    /// 可变对角贡献
    pub fn internal_coeffs_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.internal_coeffs
    }

    /// 各边界片的源项/接口贡献
    pub fn boundary_coeffs(&self) -> &[Vec<T>] {
        &self.boundary_coeffs
    }

    /// 可变源项/接口贡献
    pub fn boundary_coeffs_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.boundary_coeffs
    }

    /// 单元源项累加
    pub fn add_to_source(&mut self, cell: usize, value: T) -> FvResult<()> {
        FvError::check_index("cell", cell, self.source.len())?;
        self.source[cell] += value;
        Ok(())
    }

    // ========================================================================
    // 组合
    // ========================================================================

    fn check_compatible(&self, other: &FvMatrix<T>, op: &str) -> FvResult<()> {
        if self.field_name != other.field_name {
            return Err(FvError::invalid_config(
                format!("fvMatrix<{}>", self.field_name),
                other.field_name.clone(),
                format!("'{op}' 两侧的方程求解不同的场"),
            ));
        }
        self.dimensions.check_same(
            &other.dimensions,
            &format!("fvMatrix({}) {op} fvMatrix({})", self.field_name, other.field_name),
        )
    }

    /// 加上另一个方程
    pub fn add_matrix(&mut self, other: &FvMatrix<T>) -> FvResult<()> {
        self.check_compatible(other, "+")?;
        self.ldu.add(&other.ldu)?;
        for (a, &b) in self.source.iter_mut().zip(&other.source) {
            *a += b;
        }
        for (pa, pb) in self.internal_coeffs.iter_mut().zip(&other.internal_coeffs) {
            pa.iter_mut().zip(pb).for_each(|(a, &b)| *a += b);
        }
        for (pa, pb) in self.boundary_coeffs.iter_mut().zip(&other.boundary_coeffs) {
            pa.iter_mut().zip(pb).for_each(|(a, &b)| *a += b);
        }
        Ok(())
    }

    /// 取负
    pub fn negate(&mut self) {
        self.ldu.negate();
        self.source.iter_mut().for_each(|v| *v = -*v);
        for p in self.internal_coeffs.iter_mut().chain(self.boundary_coeffs.iter_mut()) {
            p.iter_mut().for_each(|v| *v = -*v);
        }
    }

    fn check_explicit(&self, su: &VolField<T>, op: &str) -> FvResult<()> {
        if su.internal().len() != self.source.len() {
            return Err(FvError::size_mismatch(su.name(), self.source.len(), su.internal().len()));
        }
        (su.dimensions() * DimensionSet::VOLUME).check_same(
            &self.dimensions,
            &format!("fvMatrix({}) {op} {}", self.field_name, su.name()),
        )
    }

    /// 加上显式体场：`A·ψ − b + su`
    pub fn add_explicit(&mut self, su: &VolField<T>) -> FvResult<()> {
        self.check_explicit(su, "+")?;
        let volumes = self.mesh.volumes();
        for ((s, &v), &vol) in self.source.iter_mut().zip(su.internal()).zip(volumes) {
            *s -= v.scale(vol);
        }
        Ok(())
    }

    /// 减去显式体场，即 `eqn == su`
    pub fn sub_explicit(&mut self, su: &VolField<T>) -> FvResult<()> {
        self.check_explicit(su, "==")?;
        let volumes = self.mesh.volumes();
        for ((s, &v), &vol) in self.source.iter_mut().zip(su.internal()).zip(volumes) {
            *s += v.scale(vol);
        }
        Ok(())
    }

    // ========================================================================
    // 松弛与参考值
    // ========================================================================

    /// 对角加上边界片对角贡献（分量平均）
    fn boundary_diag(&self) -> Vec<f64> {
        let mut d = vec![0.0; self.ldu.n_cells()];
        for (patch, ic) in self.mesh.boundary().iter().zip(&self.internal_coeffs) {
            for (&c, v) in patch.face_cells().iter().zip(ic) {
                d[c] += v.cmpt_av();
            }
        }
        d
    }

    /// 方程松弛
    ///
    /// 有效对角先取 `max(|D|, Σ|a_N|)` 保证对角占优，再除以 `alpha`；
    /// 对角的增量乘以当前值加入源项，收敛时方程不变。
    pub fn relax(&mut self, psi: &VolField<T>, alpha: f64) -> FvResult<()> {
        if alpha.is_nan() || alpha <= 0.0 {
            return Err(FvError::invalid_config(
                format!("relaxationFactors.equations.{}", self.field_name),
                alpha.to_string(),
                "松弛因子必须为正",
            ));
        }
        let bdiag = self.boundary_diag();
        let mut d: Vec<f64> = self.ldu.diag().iter().zip(&bdiag).map(|(a, b)| a + b).collect();
        let d0 = d.clone();

        let mut sum_off = self.ldu.sum_mag_off_diag();
        for (pf, bc) in psi.boundary().iter().zip(&self.boundary_coeffs) {
            if pf.coupled() {
                for (&c, v) in pf.patch().face_cells().iter().zip(bc) {
                    sum_off[c] += v.cmpt_av().abs();
                }
            }
        }

        for (di, &so) in d.iter_mut().zip(&sum_off) {
            *di = di.abs().max(so) / alpha;
        }
        for ((s, &p), (&di, &di0)) in self.source.iter_mut().zip(psi.internal()).zip(d.iter().zip(&d0)) {
            *s += p.scale(di - di0);
        }
        for ((diag, &di), &b) in self.ldu.diag_mut().iter_mut().zip(&d).zip(&bdiag) {
            *diag = di - b;
        }
        Ok(())
    }

    /// 按 `relaxationFactors.equations` 松弛（未配置时不松弛）
    pub fn relax_configured(&mut self, psi: &VolField<T>, final_iter: bool) -> FvResult<()> {
        let factor = self
            .mesh
            .solution()
            .equation_relaxation_factor(&self.field_name, final_iter)?;
        match factor {
            Some(alpha) => self.relax(psi, alpha),
            None => Ok(()),
        }
    }

    /// 在 `cell` 处固定参考值（只有值在本分区时生效）
    ///
    /// 用于没有固定值边界的方程（如压力），消除奇异性。
    pub fn set_reference(&mut self, cell: Option<usize>, value: T) -> FvResult<()> {
        let Some(cell) = cell else {
            return Ok(());
        };
        FvError::check_index("cell", cell, self.source.len())?;
        let d = self.ldu.diag()[cell];
        self.source[cell] += value.scale(d);
        self.ldu.diag_mut()[cell] += d;
        Ok(())
    }

    // ========================================================================
    // 派生量
    // ========================================================================

    /// 对角系数除以体积
    pub fn a(&self) -> Vec<f64> {
        let bdiag = self.boundary_diag();
        self.ldu
            .diag()
            .iter()
            .zip(&bdiag)
            .zip(self.mesh.volumes())
            .map(|((&d, &b), &v)| (d + b) / v)
            .collect()
    }

    /// H 算子：`(b − Σ a_N ψ_N) / V`
    ///
    /// 分量对角与 [`a`](Self::a) 所用平均对角之差移到右侧；耦合边界片用
    /// 最近一次交换得到的对侧值。
    pub fn h(&self, psi: &VolField<T>) -> Vec<T> {
        let mut out = self.source.clone();

        for c in 0..T::N_COMPONENTS {
            let psi_c: Vec<f64> = psi.internal().iter().map(|v| v.component(c)).collect();
            let hc = self.ldu.h_operator(&psi_c);
            for (o, h) in out.iter_mut().zip(hc) {
                o.set_component(c, o.component(c) + h);
            }
        }

        for (pf, (ic, bc)) in psi
            .boundary()
            .iter()
            .zip(self.internal_coeffs.iter().zip(&self.boundary_coeffs))
        {
            let face_cells = pf.patch().face_cells();
            for (i, &cell) in face_cells.iter().enumerate() {
                let p = psi.internal()[cell];
                let av = ic[i].cmpt_av();
                let mut diag_corr = T::ZERO;
                for c in 0..T::N_COMPONENTS {
                    diag_corr.set_component(c, (av - ic[i].component(c)) * p.component(c));
                }
                out[cell] += diag_corr;
            }
            match pf.patch_neighbour_values() {
                Some(nbr) if pf.coupled() => {
                    for ((&cell, &k), &n) in face_cells.iter().zip(bc).zip(nbr) {
                        out[cell] += k.cmpt_mul(n);
                    }
                }
                _ => {
                    for (&cell, &k) in face_cells.iter().zip(bc) {
                        out[cell] += k;
                    }
                }
            }
        }

        out.iter()
            .zip(self.mesh.volumes())
            .map(|(&v, &vol)| v.scale(1.0 / vol))
            .collect()
    }

    /// 面通量：内部面 `upper·ψ_N − lower·ψ_P`，边界面 `ic·ψ_P − bc(·ψ_nbr)`
    pub fn flux(&self, psi: &VolField<T>) -> FvResult<SurfaceField<T>> {
        let l = self.mesh.owner();
        let u = self.mesh.neighbour();
        let upper = self.ldu.upper();
        let lower = self.ldu.lower();
        let p = psi.internal();
        let internal = (0..upper.len())
            .map(|f| p[u[f]].scale(upper[f]) - p[l[f]].scale(lower[f]))
            .collect();
        let boundary = psi
            .boundary()
            .iter()
            .zip(self.internal_coeffs.iter().zip(&self.boundary_coeffs))
            .map(|(pf, (ic, bc))| {
                let fc = pf.patch().face_cells();
                let nbr = pf.patch_neighbour_values().filter(|_| pf.coupled());
                (0..fc.len())
                    .map(|i| {
                        let own = ic[i].cmpt_mul(p[fc[i]]);
                        let other = match nbr {
                            Some(n) => bc[i].cmpt_mul(n[i]),
                            None => bc[i],
                        };
                        own - other
                    })
                    .collect()
            })
            .collect();
        SurfaceField::new(
            format!("flux({})", self.field_name),
            &self.mesh,
            self.dimensions,
            internal,
            boundary,
        )
    }

    // ========================================================================
    // 求解
    // ========================================================================

    /// 单个分量的矩阵与源项（边界贡献已并入）
    fn component_system(&self, psi: &VolField<T>, c: usize) -> (LduMatrix, Vec<f64>) {
        let mut matrix = self.ldu.clone();
        let mut source: Vec<f64> = self.source.iter().map(|v| v.component(c)).collect();
        for (pf, (ic, bc)) in psi
            .boundary()
            .iter()
            .zip(self.internal_coeffs.iter().zip(&self.boundary_coeffs))
        {
            let coupled = pf.coupled();
            for (i, &cell) in pf.patch().face_cells().iter().enumerate() {
                matrix.diag_mut()[cell] += ic[i].component(c);
                if !coupled {
                    source[cell] += bc[i].component(c);
                }
            }
        }
        (matrix, source)
    }

    /// 单个分量的耦合接口系数
    fn interface_entries<'a>(
        mesh: &'a FvMesh,
        coupled: &[bool],
        boundary_coeffs: &[Vec<T>],
        c: usize,
    ) -> Vec<Option<(&'a dyn LduInterface, Vec<f64>)>> {
        coupled
            .iter()
            .enumerate()
            .map(|(p, &is_coupled)| {
                if !is_coupled {
                    return None;
                }
                mesh.interface(p).map(|iface| {
                    let coeffs = boundary_coeffs[p].iter().map(|v| v.component(c)).collect();
                    (iface as &dyn LduInterface, coeffs)
                })
            })
            .collect()
    }

    /// 残差 `b − A·ψ`（按分量，含耦合接口）
    ///
    /// 并行时所有分区必须同时调用。
    pub fn residual(&self, psi: &VolField<T>) -> FvResult<Vec<T>> {
        let mesh = Arc::clone(&self.mesh);
        let coupled: Vec<bool> = psi.boundary().iter().map(|pf| pf.coupled()).collect();
        let mut out = vec![T::ZERO; self.ldu.n_cells()];
        for c in 0..T::N_COMPONENTS {
            let (matrix, source) = self.component_system(psi, c);
            let entries = Self::interface_entries(&mesh, &coupled, &self.boundary_coeffs, c);
            let interfaces = CoupledInterfaces::new(mesh.comm(), mesh.schedule(), entries)?;
            let system = LduSystem::with_interfaces(&matrix, interfaces);
            let psi_c: Vec<f64> = psi.internal().iter().map(|v| v.component(c)).collect();
            let mut r = vec![0.0; psi_c.len()];
            system.residual(&psi_c, &source, &mut r)?;
            for (o, rc) in out.iter_mut().zip(r) {
                o.set_component(c, rc);
            }
        }
        Ok(out)
    }

    /// 按 `fvSolution.solvers` 中该场的设置求解
    pub fn solve(&self, psi: &mut VolField<T>) -> FvResult<SolverPerformance> {
        let controls = self.mesh.solution().solver_controls(&self.field_name, false)?;
        self.solve_segregated(psi, &controls)
    }

    /// 外迭代最后一次求解（使用 `<field>Final` 设置）
    pub fn solve_final(&self, psi: &mut VolField<T>) -> FvResult<SolverPerformance> {
        let controls = self.mesh.solution().solver_controls(&self.field_name, true)?;
        self.solve_segregated(psi, &controls)
    }

    /// 使用给定控制参数求解
    pub fn solve_with(&self, psi: &mut VolField<T>, controls: &SolverControls) -> FvResult<SolverPerformance> {
        self.solve_segregated(psi, controls)
    }

    /// 按分量分离求解，然后更新边界条件
    ///
    /// 返回初始残差最大的分量的结果。并行时所有分区必须同时调用。
    pub fn solve_segregated(
        &self,
        psi: &mut VolField<T>,
        controls: &SolverControls,
    ) -> FvResult<SolverPerformance> {
        if psi.name() != self.field_name {
            return Err(FvError::invalid_config(
                format!("fvMatrix<{}>", self.field_name),
                psi.name(),
                "方程与求解的场不一致",
            ));
        }
        psi.check_evaluated()?;

        let mesh = Arc::clone(&self.mesh);
        let directions = mesh.solution_directions();
        let coupled: Vec<bool> = psi.boundary().iter().map(|pf| pf.coupled()).collect();
        let mut solver = new_solver(&self.field_name, controls)?;
        let mut overall: Option<SolverPerformance> = None;

        for c in 0..T::N_COMPONENTS {
            if T::N_COMPONENTS == 3 && !directions[c] {
                continue;
            }
            let (matrix, source) = self.component_system(psi, c);
            let entries = Self::interface_entries(&mesh, &coupled, &self.boundary_coeffs, c);
            let interfaces = CoupledInterfaces::new(mesh.comm(), mesh.schedule(), entries)?;
            let system = LduSystem::with_interfaces(&matrix, interfaces);

            let mut x: Vec<f64> = psi.internal().iter().map(|v| v.component(c)).collect();
            let perf = solver
                .solve(&system, &mut x, &source)?
                .with_field_name(format!(
                    "{}{}",
                    self.field_name,
                    component_suffix(T::N_COMPONENTS, c)
                ));
            psi.set_component(c, &x)?;
            perf.log();

            overall = Some(match overall {
                Some(prev) => prev.max(perf),
                None => perf,
            });
        }

        psi.correct_boundary_conditions()?;
        Ok(overall.unwrap_or_else(|| {
            SolverPerformance::new(
                solver.type_name(),
                self.field_name.clone(),
                0.0,
                0.0,
                0,
                SolverStatus::Converged,
            )
        }))
    }
}

// ============================================================================
// 运算符
// ============================================================================

impl<T: FieldValue> Add for FvMatrix<T> {
    type Output = FvResult<FvMatrix<T>>;

    fn add(mut self, rhs: FvMatrix<T>) -> Self::Output {
        self.add_matrix(&rhs)?;
        Ok(self)
    }
}

impl<T: FieldValue> Sub for FvMatrix<T> {
    type Output = FvResult<FvMatrix<T>>;

    fn sub(mut self, mut rhs: FvMatrix<T>) -> Self::Output {
        rhs.negate();
        self.check_compatible(&rhs, "-")?;
        self.add_matrix(&rhs)?;
        Ok(self)
    }
}

impl<T: FieldValue> Neg for FvMatrix<T> {
    type Output = FvMatrix<T>;

    fn neg(mut self) -> Self::Output {
        self.negate();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use fv_mesh::BlockMesh;

    fn line(n: usize) -> (Arc<FvMesh>, VolField<f64>) {
        registry::initialise().unwrap();
        let mesh = Arc::new(FvMesh::serial(BlockMesh::one_dimensional(n, n as f64).build().unwrap()).unwrap());
        let t = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 1.0, "zeroGradient").unwrap();
        (mesh, t)
    }

    #[test]
    fn test_component_suffix() {
        assert_eq!(component_suffix(1, 0), "");
        assert_eq!(component_suffix(3, 2), "z");
        assert_eq!(component_suffix(9, 4), "yy");
    }

    #[test]
    fn test_add_requires_same_dimensions() {
        let (_, t) = line(3);
        let a = FvMatrix::new(&t, DimensionSet::TEMPERATURE);
        let b = FvMatrix::new(&t, DimensionSet::TEMPERATURE * DimensionSet::VOLUME);
        assert!(matches!(a + b, Err(FvError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_sub_explicit_sign() {
        let (_, t) = line(2);
        let mut m = FvMatrix::new(&t, DimensionSet::TEMPERATURE * DimensionSet::VOLUME);
        m.sub_explicit(&t).unwrap();
        assert_eq!(m.source(), &[1.0, 1.0]);
        m.add_explicit(&t).unwrap();
        assert_eq!(m.source(), &[0.0, 0.0]);
    }

    #[test]
    fn test_relax_keeps_converged_solution() {
        let (_, t) = line(3);
        let mut m = FvMatrix::new(&t, DimensionSet::TEMPERATURE);
        for c in 0..3 {
            m.ldu_mut().add_to_diagonal(c, 2.0).unwrap();
        }
        m.ldu_mut().add_to_off_diagonal(0, -1.0).unwrap();
        m.ldu_mut().add_to_off_diagonal(1, -1.0).unwrap();
        // 对 ψ = 1，A·ψ = [1, 0, 1]
        m.source_mut().copy_from_slice(&[1.0, 0.0, 1.0]);
        m.relax(&t, 0.5).unwrap();
        assert_eq!(m.ldu().diag(), &[4.0, 4.0, 4.0]);
        let r = m.residual(&t).unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-12));
        assert!(m.relax(&t, 0.0).is_err());
    }

    #[test]
    fn test_set_reference_doubles_diagonal() {
        let (_, t) = line(2);
        let mut m = FvMatrix::new(&t, DimensionSet::TEMPERATURE);
        m.ldu_mut().add_to_diagonal(0, 3.0).unwrap();
        m.set_reference(Some(0), 2.0).unwrap();
        assert_eq!(m.ldu().diag()[0], 6.0);
        assert_eq!(m.source()[0], 6.0);
        assert!(m.set_reference(Some(5), 0.0).is_err());
    }
}
