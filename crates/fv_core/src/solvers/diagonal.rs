// crates/fv_core/src/solvers/diagonal.rs

//! 对角求解器：`ψ = b / diag`，一次完成

use fv_config::SolverControls;
use fv_foundation::{FvError, FvResult};

use crate::matrix::{SolverPerformance, SolverStatus};

use super::{LduSolver, LduSystem};

/// 对角求解器
#[derive(Debug, Clone)]
pub struct DiagonalSolver {
    field_name: String,
}

impl DiagonalSolver {
    /// 创建
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
        }
    }

    pub(crate) fn create(field_name: &str, _controls: &SolverControls) -> FvResult<Box<dyn LduSolver>> {
        Ok(Box::new(Self::new(field_name)))
    }
}

impl LduSolver for DiagonalSolver {
    fn type_name(&self) -> &'static str {
        "diagonal"
    }

    fn solve(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
    ) -> FvResult<SolverPerformance> {
        let diag = system.matrix().diag();
        FvError::check_size("psi", diag.len(), psi.len())?;
        FvError::check_size("source", diag.len(), source.len())?;
        if diag.iter().any(|&d| d == 0.0) {
            tracing::warn!("对角求解器: 场 {} 的对角系数含零", self.field_name);
            return Ok(SolverPerformance::new(
                self.type_name(),
                &self.field_name,
                0.0,
                0.0,
                0,
                SolverStatus::Singular,
            ));
        }
        for ((p, &b), &d) in psi.iter_mut().zip(source.iter()).zip(diag.iter()) {
            *p = b / d;
        }
        Ok(SolverPerformance::new(
            self.type_name(),
            &self.field_name,
            0.0,
            0.0,
            0,
            SolverStatus::Converged,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduMatrix;
    use fv_mesh::LduAddressing;
    use std::sync::Arc;

    #[test]
    fn test_diagonal_solve_exact() {
        let addr = Arc::new(LduAddressing::new(3, vec![], vec![]).unwrap());
        let mut m = LduMatrix::new(addr);
        m.diag_mut().copy_from_slice(&[2.0, 4.0, 5.0]);
        let mut psi = vec![0.0; 3];
        let perf = DiagonalSolver::new("T")
            .solve(&LduSystem::new(&m), &mut psi, &[2.0, 2.0, 10.0])
            .unwrap();
        assert_eq!(psi, vec![1.0, 0.5, 2.0]);
        assert!(perf.converged());
        assert_eq!(perf.final_residual(), 0.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let addr = Arc::new(LduAddressing::new(3, vec![], vec![]).unwrap());
        let mut m = LduMatrix::new(addr);
        m.diag_mut().fill(1.0);
        let mut psi = vec![0.0; 2];
        let err = DiagonalSolver::new("T")
            .solve(&LduSystem::new(&m), &mut psi, &[1.0, 1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, FvError::SizeMismatch { .. }));

        let mut psi = vec![0.0; 3];
        assert!(DiagonalSolver::new("T")
            .solve(&LduSystem::new(&m), &mut psi, &[1.0])
            .is_err());
    }
}
