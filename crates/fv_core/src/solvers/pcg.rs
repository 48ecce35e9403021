// crates/fv_core/src/solvers/pcg.rs

//! 预条件共轭梯度法（对称矩阵）
//!
//! ```text
//! r = b − Aψ
//! 循环:
//!   w = M⁻¹ r,  ρ = (w, r)
//!   p = w + (ρ / ρ_old)·p
//!   q = A p,    α = ρ / (q, p)
//!   ψ += α p,   r −= α q
//! ```

use fv_config::SolverControls;
use fv_foundation::FvResult;

use crate::matrix::SolverPerformance;

use super::vector_ops::{axpy, xpay};
use super::{new_preconditioner, IterationControl, LduSolver, LduSystem};

/// PCG 求解器
#[derive(Debug, Clone)]
pub struct Pcg {
    field_name: String,
    controls: SolverControls,
}

impl Pcg {
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

impl LduSolver for Pcg {
    fn type_name(&self) -> &'static str {
        "PCG"
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
        let mut singular = false;

        if ctl.needs_iteration(initial) {
            let precon = new_preconditioner(system.matrix(), &self.controls)?;
            let mut p_a = vec![0.0; n];
            let mut w_ar_a = 0.0;

            loop {
                let w_ar_a_old = w_ar_a;
                precon.precondition(&mut w_a, &r_a);
                w_ar_a = system.g_sum_prod(&w_a, &r_a)?;

                if n_iter == 0 {
                    p_a.copy_from_slice(&w_a);
                } else {
                    if IterationControl::is_singular(w_ar_a_old) {
                        singular = true;
                        break;
                    }
                    xpay(&w_a, w_ar_a / w_ar_a_old, &mut p_a);
                }

                system.amul(&p_a, &mut w_a)?;
                let w_ap_a = system.g_sum_prod(&w_a, &p_a)?;
                if IterationControl::is_singular(w_ap_a / norm_factor) {
                    singular = true;
                    break;
                }

                let alpha = w_ar_a / w_ap_a;
                axpy(alpha, &p_a, psi);
                axpy(-alpha, &w_a, &mut r_a);
                current = system.g_sum_mag(&r_a)? / norm_factor;
                n_iter += 1;

                tracing::trace!("PCG {}: 迭代 {} 残差 {:.3e}", self.field_name, n_iter, current);
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
