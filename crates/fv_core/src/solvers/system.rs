// crates/fv_core/src/solvers/system.rs

//! 求解器面对的线性系统与迭代控制

use fv_config::SolverControls;
use fv_foundation::{FvResult, SMALL, VSMALL};

use crate::matrix::{CoupledInterfaces, LduMatrix, SolverStatus};
use crate::parallel::{reduce, Communicator, SERIAL};

use super::vector_ops::{dot, sum_mag, sum_sqr};

/// 线性系统：矩阵 + 耦合接口 + 通信器
#[derive(Debug)]
pub struct LduSystem<'a> {
    matrix: &'a LduMatrix,
    interfaces: Option<CoupledInterfaces<'a>>,
    comm: &'a dyn Communicator,
}

impl<'a> LduSystem<'a> {
    /// 单进程、无耦合接口的系统
    pub fn new(matrix: &'a LduMatrix) -> Self {
        Self {
            matrix,
            interfaces: None,
            comm: &SERIAL,
        }
    }

    /// 带耦合接口的系统（通信器取自接口）
    pub fn with_interfaces(matrix: &'a LduMatrix, interfaces: CoupledInterfaces<'a>) -> Self {
        let comm = interfaces.comm();
        Self {
            matrix,
            interfaces: Some(interfaces),
            comm,
        }
    }

    /// 矩阵
    pub fn matrix(&self) -> &'a LduMatrix {
        self.matrix
    }

    /// 耦合接口
    pub fn interfaces(&self) -> Option<&CoupledInterfaces<'a>> {
        self.interfaces.as_ref()
    }

    /// 通信器
    pub fn comm(&self) -> &'a dyn Communicator {
        self.comm
    }

    /// 单元数（本地）
    pub fn n_cells(&self) -> usize {
        self.matrix.n_cells()
    }

    /// `result = A·ψ`
    pub fn amul(&self, psi: &[f64], result: &mut [f64]) -> FvResult<()> {
        self.matrix.amul(psi, result, self.interfaces.as_ref())
    }

    /// `r = b − A·ψ`
    pub fn residual(&self, psi: &[f64], source: &[f64], r: &mut [f64]) -> FvResult<()> {
        self.matrix.residual(psi, source, self.interfaces.as_ref(), r)
    }

    /// 每行系数之和（含耦合接口）
    pub fn sum_a(&self) -> Vec<f64> {
        let mut out = self.matrix.diag().to_vec();
        let view = self.matrix.off_diagonal_view();
        for f in 0..view.upper.len() {
            out[view.l[f]] += view.upper[f];
            out[view.u[f]] += view.lower[f];
        }
        if let Some(interfaces) = &self.interfaces {
            interfaces.subtract_coeffs(&mut out);
        }
        out
    }

    // ========================================================================
    // 全局归约
    // ========================================================================

    /// 全局 Σx
    pub fn g_sum(&self, x: &[f64]) -> FvResult<f64> {
        reduce::sum(self.comm, x.iter().sum())
    }

    /// 全局 Σ|x|
    pub fn g_sum_mag(&self, x: &[f64]) -> FvResult<f64> {
        reduce::sum(self.comm, sum_mag(x))
    }

    /// 全局 Σx·y
    pub fn g_sum_prod(&self, x: &[f64], y: &[f64]) -> FvResult<f64> {
        reduce::sum(self.comm, dot(x, y))
    }

    /// 全局 Σx²
    pub fn g_sum_sqr(&self, x: &[f64]) -> FvResult<f64> {
        reduce::sum(self.comm, sum_sqr(x))
    }

    /// 全局平均
    pub fn g_average(&self, x: &[f64]) -> FvResult<f64> {
        let mut v = [x.iter().sum::<f64>(), x.len() as f64];
        reduce::all_reduce(self.comm, &mut v, |a, b| a + b)?;
        Ok(if v[1] > 0.0 { v[0] / v[1] } else { 0.0 })
    }

    /// 残差归一化因子
    ///
    /// `w_a = A·ψ` 已由调用者算好。
    pub fn normalisation_factor(&self, psi: &[f64], source: &[f64], w_a: &[f64]) -> FvResult<f64> {
        let x_ref = self.g_average(psi)?;
        let sum_a = self.sum_a();
        let local: f64 = w_a
            .iter()
            .zip(source.iter())
            .zip(sum_a.iter())
            .map(|((&w, &b), &s)| {
                let p = s * x_ref;
                (w - p).abs() + (b - p).abs()
            })
            .sum();
        Ok(reduce::sum(self.comm, local)? + SMALL)
    }
}

/// 迭代控制（收敛、发散与奇异判据）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationControl {
    /// 绝对容差
    pub tolerance: f64,
    /// 相对容差
    pub rel_tol: f64,
    /// 最大迭代次数
    pub max_iter: usize,
    /// 最小迭代次数
    pub min_iter: usize,
    /// 发散倍数
    pub divergence_factor: f64,
}

impl IterationControl {
    /// 从控制参数读取
    pub fn from_controls(controls: &SolverControls) -> Self {
        Self {
            tolerance: controls.tolerance,
            rel_tol: controls.rel_tol,
            max_iter: controls.max_iter,
            min_iter: controls.min_iter,
            divergence_factor: controls.divergence_factor,
        }
    }

    /// 是否满足容差
    pub fn converged(&self, initial: f64, current: f64) -> bool {
        current < self.tolerance || (self.rel_tol > 0.0 && current < self.rel_tol * initial)
    }

    /// 初始残差下是否需要迭代
    pub fn needs_iteration(&self, initial: f64) -> bool {
        self.min_iter > 0 || !self.converged(initial, initial)
    }

    /// 是否发散
    pub fn diverged(&self, initial: f64, current: f64) -> bool {
        !current.is_finite() || (initial > 0.0 && current > self.divergence_factor * initial)
    }

    /// 已完成 `n_iter` 次迭代后是否继续
    pub fn keep_iterating(&self, n_iter: usize, initial: f64, current: f64) -> bool {
        if n_iter < self.min_iter {
            return true;
        }
        n_iter < self.max_iter
            && !self.converged(initial, current)
            && !self.diverged(initial, current)
    }

    /// 求解结束后的状态
    pub fn status(&self, initial: f64, current: f64, singular: bool) -> SolverStatus {
        if singular {
            SolverStatus::Singular
        } else if self.converged(initial, current) {
            SolverStatus::Converged
        } else if self.diverged(initial, current) {
            SolverStatus::Diverged
        } else {
            SolverStatus::MaxIterations
        }
    }

    /// 奇异判据
    #[inline]
    pub fn is_singular(value: f64) -> bool {
        value.abs() < VSMALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_tolerance() {
        let ctl = IterationControl::from_controls(
            &SolverControls::new("PCG").with_tolerance(1e-12, 0.1),
        );
        assert!(!ctl.converged(1.0, 0.2));
        assert!(ctl.converged(1.0, 0.05));
        assert!(ctl.keep_iterating(0, 1.0, 0.5));
    }

    #[test]
    fn test_status_order() {
        let ctl = IterationControl::from_controls(&SolverControls::new("PCG"));
        assert_eq!(ctl.status(1.0, 1e-9, true), SolverStatus::Singular);
        assert_eq!(ctl.status(1.0, 1e-9, false), SolverStatus::Converged);
        assert_eq!(ctl.status(1.0, 1e6, false), SolverStatus::Diverged);
        assert_eq!(ctl.status(1.0, 0.5, false), SolverStatus::MaxIterations);
    }
}
