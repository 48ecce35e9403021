// crates/fv_core/src/solvers/smooth_solver.rs

//! 光顺求解器：反复调用光顺器直到满足容差

use fv_config::SolverControls;
use fv_foundation::FvResult;

use crate::matrix::SolverPerformance;

use super::{new_smoother, IterationControl, LduSolver, LduSystem};

/// smoothSolver
#[derive(Debug, Clone)]
pub struct SmoothSolver {
    field_name: String,
    controls: SolverControls,
}

impl SmoothSolver {
    /// 创建
    pub fn new(field_name: impl Into<String>, controls: SolverControls) -> Self {
        Self {
            field_name: field_name.into(),
            controls,
        }
    }

    pub(crate) fn create(field_name: &str, controls: &SolverControls) -> FvResult<Box<dyn LduSolver>> {
        Ok(Box::new(Self::new(field_name, controls.clone())))
    }
}

impl LduSolver for SmoothSolver {
    fn type_name(&self) -> &'static str {
        "smoothSolver"
    }

    fn solve(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
    ) -> FvResult<SolverPerformance> {
        let ctl = IterationControl::from_controls(&self.controls);
        let n = system.n_cells();

        let mut w_a = vec![0.0; n];
        system.amul(psi, &mut w_a)?;
        let mut r_a: Vec<f64> = source.iter().zip(w_a.iter()).map(|(b, w)| b - w).collect();

        let norm_factor = system.normalisation_factor(psi, source, &w_a)?;
        let initial = system.g_sum_mag(&r_a)? / norm_factor;
        let mut current = initial;
        let mut n_iter = 0;

        if ctl.needs_iteration(initial) {
            let mut smoother = new_smoother(system.matrix(), &self.controls)?;
            let n_sweeps = self.controls.n_sweeps.max(1);
            loop {
                let sweeps = n_sweeps.min(ctl.max_iter.saturating_sub(n_iter)).max(1);
                smoother.smooth(system, psi, source, sweeps)?;
                n_iter += sweeps;

                system.residual(psi, source, &mut r_a)?;
                current = system.g_sum_mag(&r_a)? / norm_factor;
                tracing::trace!(
                    "smoothSolver {}: 扫描 {} 残差 {:.3e}",
                    self.field_name,
                    n_iter,
                    current
                );
                if !ctl.keep_iterating(n_iter, initial, current) {
                    break;
                }
            }
        }

        Ok(SolverPerformance::new(
            self.type_name(),
            &self.field_name,
            initial,
            current,
            n_iter,
            ctl.status(initial, current, false),
        ))
    }
}
