// crates/fv_core/src/solvers/preconditioner.rs

//! 预条件器
//!
//! | 名称 | 矩阵 | 作用 |
//! |---|---|---|
//! | `none` | 任意 | `w = r` |
//! | `diagonal` | 任意 | `w = r / diag` |
//! | `DIC` | 对称 | 对角不完全 Cholesky |
//! | `DILU` | 非对称 | 对角不完全 LU |
//!
//! DIC/DILU 只修改对角：`D_u ← D_u − a_ul·a_lu / D_l`，
//! 作用时先前代（按面升序）再回代（按面降序）。

use fv_config::SolverControls;
use fv_foundation::{FvResult, VSMALL};

use crate::matrix::LduMatrix;

use super::LduPreconditioner;

/// 无预条件
#[derive(Debug, Clone, Default)]
pub struct NoPreconditioner;

impl NoPreconditioner {
    pub(crate) fn create(
        _matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduPreconditioner>> {
        Ok(Box::new(Self))
    }
}

impl LduPreconditioner for NoPreconditioner {
    fn type_name(&self) -> &'static str {
        "none"
    }

    fn precondition(&self, w_a: &mut [f64], r_a: &[f64]) {
        w_a.copy_from_slice(r_a);
    }
}

/// Jacobi 预条件
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner {
    r_d: Vec<f64>,
}

impl DiagonalPreconditioner {
    /// 从矩阵创建
    pub fn new(matrix: &LduMatrix) -> Self {
        let r_d = matrix
            .diag()
            .iter()
            .map(|&d| if d.abs() > VSMALL { 1.0 / d } else { 1.0 })
            .collect();
        Self { r_d }
    }

    pub(crate) fn create(
        matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduPreconditioner>> {
        Ok(Box::new(Self::new(matrix)))
    }
}

impl LduPreconditioner for DiagonalPreconditioner {
    fn type_name(&self) -> &'static str {
        "diagonal"
    }

    fn precondition(&self, w_a: &mut [f64], r_a: &[f64]) {
        for ((w, &r), &d) in w_a.iter_mut().zip(r_a.iter()).zip(self.r_d.iter()) {
            *w = r * d;
        }
    }
}

/// 不完全分解的对角倒数
///
/// 主元退化时退回原对角。
fn reciprocal_d(matrix: &LduMatrix) -> Vec<f64> {
    let view = matrix.off_diagonal_view();
    let diag = matrix.diag();
    let mut r_d = diag.to_vec();
    for f in 0..view.upper.len() {
        let (l, u) = (view.l[f], view.u[f]);
        r_d[u] -= view.upper[f] * view.lower[f] / r_d[l];
    }
    r_d.iter()
        .zip(diag.iter())
        .map(|(&r, &d)| {
            if r.abs() > VSMALL {
                1.0 / r
            } else if d.abs() > VSMALL {
                1.0 / d
            } else {
                1.0
            }
        })
        .collect()
}

/// 对角不完全 Cholesky（对称矩阵）
#[derive(Debug, Clone)]
pub struct DicPreconditioner {
    r_d: Vec<f64>,
    l: Vec<usize>,
    u: Vec<usize>,
    upper: Vec<f64>,
}

impl DicPreconditioner {
    /// 从矩阵创建
    pub fn new(matrix: &LduMatrix) -> Self {
        if matrix.is_asymmetric() {
            tracing::debug!("DIC 用于非对称矩阵，仅使用上三角");
        }
        let view = matrix.off_diagonal_view();
        Self {
            r_d: reciprocal_d(matrix),
            l: view.l.to_vec(),
            u: view.u.to_vec(),
            upper: view.upper.to_vec(),
        }
    }

    pub(crate) fn create(
        matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduPreconditioner>> {
        Ok(Box::new(Self::new(matrix)))
    }
}

impl LduPreconditioner for DicPreconditioner {
    fn type_name(&self) -> &'static str {
        "DIC"
    }

    fn precondition(&self, w_a: &mut [f64], r_a: &[f64]) {
        for ((w, &r), &d) in w_a.iter_mut().zip(r_a.iter()).zip(self.r_d.iter()) {
            *w = d * r;
        }
        for f in 0..self.upper.len() {
            let (l, u) = (self.l[f], self.u[f]);
            w_a[u] -= self.r_d[u] * self.upper[f] * w_a[l];
        }
        for f in (0..self.upper.len()).rev() {
            let (l, u) = (self.l[f], self.u[f]);
            w_a[l] -= self.r_d[l] * self.upper[f] * w_a[u];
        }
    }
}

/// 对角不完全 LU（非对称矩阵）
#[derive(Debug, Clone)]
pub struct DiluPreconditioner {
    r_d: Vec<f64>,
    l: Vec<usize>,
    u: Vec<usize>,
    losort: Vec<usize>,
    upper: Vec<f64>,
    lower: Vec<f64>,
}

impl DiluPreconditioner {
    /// 从矩阵创建
    pub fn new(matrix: &LduMatrix) -> Self {
        let view = matrix.off_diagonal_view();
        Self {
            r_d: reciprocal_d(matrix),
            l: view.l.to_vec(),
            u: view.u.to_vec(),
            losort: matrix.addr().losort().to_vec(),
            upper: view.upper.to_vec(),
            lower: view.lower.to_vec(),
        }
    }

    pub(crate) fn create(
        matrix: &LduMatrix,
        _controls: &SolverControls,
    ) -> FvResult<Box<dyn LduPreconditioner>> {
        Ok(Box::new(Self::new(matrix)))
    }
}

impl LduPreconditioner for DiluPreconditioner {
    fn type_name(&self) -> &'static str {
        "DILU"
    }

    fn precondition(&self, w_a: &mut [f64], r_a: &[f64]) {
        for ((w, &r), &d) in w_a.iter_mut().zip(r_a.iter()).zip(self.r_d.iter()) {
            *w = d * r;
        }
        // 前代按 upper 单元顺序
        for &f in &self.losort {
            let (l, u) = (self.l[f], self.u[f]);
            w_a[u] -= self.r_d[u] * self.lower[f] * w_a[l];
        }
        for f in (0..self.upper.len()).rev() {
            let (l, u) = (self.l[f], self.u[f]);
            w_a[l] -= self.r_d[l] * self.upper[f] * w_a[u];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::LduAddressing;
    use std::sync::Arc;

    /// 三对角 [-1, 2, -1]
    fn tridiagonal(n: usize) -> LduMatrix {
        let addr = LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap();
        let mut m = LduMatrix::new(Arc::new(addr));
        for f in 0..n - 1 {
            m.add_to_off_diagonal(f, -1.0).unwrap();
        }
        m.diag_mut().fill(2.0);
        m
    }

    #[test]
    fn test_dic_exact_on_tridiagonal() {
        // 三对角矩阵的不完全 Cholesky 没有填充，即精确分解
        let m = tridiagonal(4);
        let p = DicPreconditioner::new(&m);
        let b = [1.0, 0.0, 0.0, 1.0];
        let mut x = [0.0; 4];
        p.precondition(&mut x, &b);
        let mut ax = [0.0; 4];
        m.amul(&x, &mut ax, None).unwrap();
        for (a, b) in ax.iter().zip(b.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dilu_matches_dic_on_symmetric() {
        let m = tridiagonal(5);
        let r = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut a = [0.0; 5];
        let mut b = [0.0; 5];
        DicPreconditioner::new(&m).precondition(&mut a, &r);
        DiluPreconditioner::new(&m).precondition(&mut b, &r);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_diagonal_preconditioner() {
        let m = tridiagonal(3);
        let mut w = [0.0; 3];
        DiagonalPreconditioner::new(&m).precondition(&mut w, &[2.0, 4.0, 6.0]);
        assert_eq!(w, [1.0, 2.0, 3.0]);
    }
}
