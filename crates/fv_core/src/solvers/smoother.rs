// crates/fv_core/src/solvers/smoother.rs

//! 光顺器
//!
//! - `GaussSeidel`: 按单元升序逐行更新
//! - `symGaussSeidel`: 升序一遍后降序一遍
//! - `DIC` / `DILU`: 预条件 Richardson 扫描 `ψ += M⁻¹(b − Aψ)`
//!
//! Gauss-Seidel 每次扫描前把耦合接口贡献移到右端（`b' = b + coeff·ψ_nbr`），
//! 扫描期间跨分区值保持不变。

use fv_config::SolverControls;
use fv_foundation::{FvResult, VSMALL};

use crate::matrix::LduMatrix;

use super::preconditioner::{DicPreconditioner, DiluPreconditioner};
use super::{LduPreconditioner, LduSmoother, LduSystem};

/// 右端项加上接口贡献
fn interface_source(system: &LduSystem<'_>, psi: &[f64], source: &[f64]) -> FvResult<Vec<f64>> {
    let mut b_prime = source.to_vec();
    if let Some(interfaces) = system.interfaces() {
        interfaces.exchange(psi, |iface, coeffs, nbr| {
            for ((&c, &k), &v) in iface.face_cells().iter().zip(coeffs).zip(nbr) {
                b_prime[c] += k * v;
            }
        })?;
    }
    Ok(b_prime)
}

/// 单行 Gauss-Seidel 更新
#[inline]
fn relax_row(matrix: &LduMatrix, cell: usize, b_prime: &[f64], psi: &mut [f64]) {
    let addr = matrix.addr();
    let view = matrix.off_diagonal_view();
    let mut psii = b_prime[cell];
    for f in addr.owner_faces(cell) {
        psii -= view.upper[f] * psi[view.u[f]];
    }
    for &f in addr.neighbour_faces(cell) {
        psii -= view.lower[f] * psi[view.l[f]];
    }
    let d = matrix.diag()[cell];
    if d.abs() > VSMALL {
        psi[cell] = psii / d;
    }
}

/// Gauss-Seidel 光顺器
#[derive(Debug, Clone, Default)]
pub struct GaussSeidelSmoother;

impl GaussSeidelSmoother {
    pub(crate) fn create(
        _matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduSmoother>> {
        Ok(Box::new(Self))
    }
}

impl LduSmoother for GaussSeidelSmoother {
    fn type_name(&self) -> &'static str {
        "GaussSeidel"
    }

    fn smooth(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
        n_sweeps: usize,
    ) -> FvResult<()> {
        let matrix = system.matrix();
        for _ in 0..n_sweeps {
            let b_prime = interface_source(system, psi, source)?;
            for cell in 0..matrix.n_cells() {
                relax_row(matrix, cell, &b_prime, psi);
            }
        }
        Ok(())
    }
}

/// 对称 Gauss-Seidel 光顺器
#[derive(Debug, Clone, Default)]
pub struct SymGaussSeidelSmoother;

impl SymGaussSeidelSmoother {
    pub(crate) fn create(
        _matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduSmoother>> {
        Ok(Box::new(Self))
    }
}

impl LduSmoother for SymGaussSeidelSmoother {
    fn type_name(&self) -> &'static str {
        "symGaussSeidel"
    }

    fn smooth(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
        n_sweeps: usize,
    ) -> FvResult<()> {
        let matrix = system.matrix();
        for _ in 0..n_sweeps {
            let b_prime = interface_source(system, psi, source)?;
            for cell in 0..matrix.n_cells() {
                relax_row(matrix, cell, &b_prime, psi);
            }
            let b_prime = interface_source(system, psi, source)?;
            for cell in (0..matrix.n_cells()).rev() {
                relax_row(matrix, cell, &b_prime, psi);
            }
        }
        Ok(())
    }
}

/// 预条件 Richardson 光顺器（DIC / DILU）
pub struct PreconditionedSmoother {
    name: &'static str,
    preconditioner: Box<dyn LduPreconditioner>,
}

impl std::fmt::Debug for PreconditionedSmoother {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreconditionedSmoother")
            .field("name", &self.name)
            .finish()
    }
}

impl PreconditionedSmoother {
    /// 由任意预条件器构造
    pub fn new(name: &'static str, preconditioner: Box<dyn LduPreconditioner>) -> Self {
        Self {
            name,
            preconditioner,
        }
    }

    pub(crate) fn create_dic(
        matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduSmoother>> {
        Ok(Box::new(Self::new("DIC", Box::new(DicPreconditioner::new(matrix)))))
    }

    pub(crate) fn create_dilu(
        matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduSmoother>> {
        Ok(Box::new(Self::new("DILU", Box::new(DiluPreconditioner::new(matrix)))))
    }
}

impl LduSmoother for PreconditionedSmoother {
    fn type_name(&self) -> &'static str {
        self.name
    }

    fn smooth(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
        n_sweeps: usize,
    ) -> FvResult<()> {
        let n = system.n_cells();
        let mut r_a = vec![0.0; n];
        let mut w_a = vec![0.0; n];
        for _ in 0..n_sweeps {
            system.residual(psi, source, &mut r_a)?;
            self.preconditioner.precondition(&mut w_a, &r_a);
            for (p, w) in psi.iter_mut().zip(w_a.iter()) {
                *p += w;
            }
        }
        Ok(())
    }
}
