// crates/fv_core/src/solvers/pbicgstab.rs

//! 预条件双共轭梯度稳定法（任意矩阵）

use fv_config::SolverControls;
use fv_foundation::FvResult;

use crate::matrix::SolverPerformance;

use super::vector_ops::axpy;
use super::{new_preconditioner, IterationControl, LduSolver, LduSystem};

/// PBiCGStab 求解器
#[derive(Debug, Clone)]
pub struct PBiCGStab {
    field_name: String,
    controls: SolverControls,
}

impl PBiCGStab {
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

impl LduSolver for PBiCGStab {
    fn type_name(&self) -> &'static str {
        "PBiCGStab"
    }

    fn solve(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
    ) -> FvResult<SolverPerformance> {
        let ctl = IterationControl::from_controls(&self.controls);
        let n = system.n_cells();

        let mut y_a = vec![0.0; n];
        system.amul(psi, &mut y_a)?;
        let mut r_a: Vec<f64> = source.iter().zip(y_a.iter()).map(|(b, y)| b - y).collect();

        let norm_factor = system.normalisation_factor(psi, source, &y_a)?;
        let initial = system.g_sum_mag(&r_a)? / norm_factor;
        let mut current = initial;
        let mut n_iter = 0;
        let mut singular = false;

        if ctl.needs_iteration(initial) {
            let precon = new_preconditioner(system.matrix(), &self.controls)?;

            let mut ay_a = vec![0.0; n];
            let mut s_a = vec![0.0; n];
            let mut z_a = vec![0.0; n];
            let mut t_a = vec![0.0; n];
            let mut p_a = vec![0.0; n];
            let r_a0 = r_a.clone();

            let mut r_a0r_a = 0.0;
            let mut alpha = 0.0;
            let mut omega = 0.0;

            loop {
                let r_a0r_a_old = r_a0r_a;
                r_a0r_a = system.g_sum_prod(&r_a0, &r_a)?;

                if n_iter == 0 {
                    p_a.copy_from_slice(&r_a);
                } else {
                    if IterationControl::is_singular(r_a0r_a_old) || IterationControl::is_singular(omega) {
                        singular = true;
                        break;
                    }
                    let beta = (r_a0r_a / r_a0r_a_old) * (alpha / omega);
                    for i in 0..n {
                        p_a[i] = r_a[i] + beta * (p_a[i] - omega * ay_a[i]);
                    }
                }

                precon.precondition(&mut y_a, &p_a);
                system.amul(&y_a, &mut ay_a)?;
                let r_a0ay_a = system.g_sum_prod(&r_a0, &ay_a)?;
                if IterationControl::is_singular(r_a0ay_a) {
                    singular = true;
                    break;
                }
                alpha = r_a0r_a / r_a0ay_a;

                for i in 0..n {
                    s_a[i] = r_a[i] - alpha * ay_a[i];
                }
                let s_residual = system.g_sum_mag(&s_a)? / norm_factor;
                if n_iter + 1 >= ctl.min_iter && ctl.converged(initial, s_residual) {
                    axpy(alpha, &y_a, psi);
                    current = s_residual;
                    n_iter += 1;
                    break;
                }

                precon.precondition(&mut z_a, &s_a);
                system.amul(&z_a, &mut t_a)?;
                let t_at_a = system.g_sum_sqr(&t_a)?;
                if IterationControl::is_singular(t_at_a) {
                    axpy(alpha, &y_a, psi);
                    r_a.copy_from_slice(&s_a);
                    current = s_residual;
                    n_iter += 1;
                    break;
                }
                omega = system.g_sum_prod(&t_a, &s_a)? / t_at_a;

                for i in 0..n {
                    psi[i] += alpha * y_a[i] + omega * z_a[i];
                    r_a[i] = s_a[i] - omega * t_a[i];
                }
                current = system.g_sum_mag(&r_a)? / norm_factor;
                n_iter += 1;

                tracing::trace!(
                    "PBiCGStab {}: 迭代 {} 残差 {:.3e}",
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
            ctl.status(initial, current, singular),
        ))
    }
}
