// crates/fv_core/src/schemes/interpolation.rs

//! 面插值格式
//!
//! 面值 `φ_f = w φ_P + (1−w) φ_N (+ 显式修正)`。权重决定隐式部分，
//! `correction` 给出延迟修正的显式部分。
//!
//! | 格式 | 权重 | 修正 |
//! |---|---|---|
//! | `linear` | 几何权重 | — |
//! | `upwind` | 1（φ≥0）或 0 | — |
//! | `linearUpwind grad(ψ)` | 迎风 | `(C_f − C_U)·∇ψ_U` |
//! | `limitedLinear k` / `vanLeer` / `Minmod` | `λ w_lin + (1−λ) w_up` | — |
//!
//! TVD 限制器的 `r` 按 `2 (d·∇ψ_C)·(ψ_D − ψ_C) / |ψ_D − ψ_C|² − 1` 计算，
//! 对矢量场同样适用。

use std::fmt;
use std::sync::Arc;

use fv_config::SchemeStream;
use fv_foundation::{FieldValue, FvError, FvResult, Vector, SMALL, VSMALL};

use crate::fields::{SurfaceField, VolField};
use crate::mesh::FvMesh;

use super::grad::{GaussGrad, GradScheme};
use super::new_grad_scheme;

/// 面插值格式
pub trait SurfaceInterpolationScheme<T: FieldValue>: Send + Sync + fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 插值权重（owner 一侧）
    fn weights(&self, vf: &VolField<T>) -> FvResult<SurfaceField<f64>>;

    /// 是否有显式修正
    fn corrected(&self) -> bool {
        false
    }

    /// 显式修正
    fn correction(&self, _vf: &VolField<T>) -> FvResult<Option<SurfaceField<T>>> {
        Ok(None)
    }

    /// 面值
    fn interpolate(&self, vf: &VolField<T>) -> FvResult<SurfaceField<T>> {
        let weights = self.weights(vf)?;
        let sf = interpolate_with_weights(vf, &weights)?;
        match self.correction(vf)? {
            Some(corr) => sf.try_add(&corr),
            None => Ok(sf),
        }
    }
}

/// 按给定权重插值
///
/// 非耦合边界片直接取边界条件面值；耦合边界片用另一侧单元值插值。
pub fn interpolate_with_weights<T: FieldValue>(
    vf: &VolField<T>,
    weights: &SurfaceField<f64>,
) -> FvResult<SurfaceField<T>> {
    let mesh = vf.mesh();
    let psi = vf.internal();
    let internal = mesh
        .owner()
        .iter()
        .zip(mesh.neighbour())
        .zip(weights.internal())
        .map(|((&p, &n), &w)| psi[p].scale(w) + psi[n].scale(1.0 - w))
        .collect();
    let boundary = vf
        .boundary()
        .iter()
        .zip(weights.boundary())
        .map(|(pf, pw)| match pf.patch_neighbour_values() {
            Some(nbr) if pf.coupled() => pf
                .patch()
                .face_cells()
                .iter()
                .zip(nbr)
                .zip(pw)
                .map(|((&c, &n), &w)| psi[c].scale(w) + n.scale(1.0 - w))
                .collect(),
            _ => pf.values().to_vec(),
        })
        .collect();
    SurfaceField::new(
        format!("interpolate({})", vf.name()),
        mesh,
        vf.dimensions(),
        internal,
        boundary,
    )
}

/// 按通量方向的迎风权重
fn upwind_weights(mesh: &Arc<FvMesh>, flux: &SurfaceField<f64>) -> SurfaceField<f64> {
    let pos = |f: f64| if f >= 0.0 { 1.0 } else { 0.0 };
    let mut w = flux.map("upwindWeights", fv_foundation::DimensionSet::DIMLESS, pos);
    for (patch, pw) in mesh.boundary().iter().zip(w.boundary_mut()) {
        if !patch.coupled() {
            pw.iter_mut().for_each(|v| *v = 1.0);
        }
    }
    w
}

fn require_flux(flux: Option<&SurfaceField<f64>>, scheme: &str) -> FvResult<SurfaceField<f64>> {
    flux.cloned().ok_or_else(|| {
        FvError::invalid_config(
            "interpolationScheme",
            scheme,
            "该格式需要面通量（只能用于 div 项）",
        )
    })
}

/// 各分量的单元梯度 `grads[c][cell]`
fn component_gradients<T: FieldValue>(
    scheme: &dyn GradScheme,
    vf: &VolField<T>,
) -> FvResult<Vec<Vec<Vector>>> {
    (0..T::N_COMPONENTS)
        .map(|c| scheme.grad(vf.mesh(), &vf.component_field(c)))
        .collect()
}

// ============================================================================
// linear / upwind
// ============================================================================

/// 线性插值
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    mesh: Arc<FvMesh>,
}

impl LinearInterpolation {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>) -> Self {
        Self {
            mesh: Arc::clone(mesh),
        }
    }

    pub(crate) fn create<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        _flux: Option<&SurfaceField<f64>>,
        _stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        Ok(Box::new(Self::new(mesh)))
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for LinearInterpolation {
    fn type_name(&self) -> &'static str {
        "linear"
    }

    fn weights(&self, _vf: &VolField<T>) -> FvResult<SurfaceField<f64>> {
        Ok(SurfaceField::linear_weights(&self.mesh))
    }
}

/// 迎风插值
#[derive(Debug, Clone)]
pub struct UpwindInterpolation {
    mesh: Arc<FvMesh>,
    flux: SurfaceField<f64>,
}

impl UpwindInterpolation {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, flux: SurfaceField<f64>) -> Self {
        Self {
            mesh: Arc::clone(mesh),
            flux,
        }
    }

    pub(crate) fn create<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        flux: Option<&SurfaceField<f64>>,
        _stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        Ok(Box::new(Self::new(mesh, require_flux(flux, "upwind")?)))
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for UpwindInterpolation {
    fn type_name(&self) -> &'static str {
        "upwind"
    }

    fn weights(&self, _vf: &VolField<T>) -> FvResult<SurfaceField<f64>> {
        Ok(upwind_weights(&self.mesh, &self.flux))
    }
}

// ============================================================================
// linearUpwind
// ============================================================================

/// 迎风 + 梯度外推修正（二阶）
#[derive(Debug)]
pub struct LinearUpwind {
    mesh: Arc<FvMesh>,
    flux: SurfaceField<f64>,
    grad_scheme: Box<dyn GradScheme>,
}

impl LinearUpwind {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, flux: SurfaceField<f64>, grad_scheme: Box<dyn GradScheme>) -> Self {
        Self {
            mesh: Arc::clone(mesh),
            flux,
            grad_scheme,
        }
    }

    pub(crate) fn create<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        flux: Option<&SurfaceField<f64>>,
        stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        let flux = require_flux(flux, "linearUpwind")?;
        let grad_term = stream.next_word()?;
        let mut grad_stream = mesh.schemes().grad(&grad_term)?;
        let grad_scheme = new_grad_scheme(mesh, &mut grad_stream)?;
        Ok(Box::new(Self::new(mesh, flux, grad_scheme)))
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for LinearUpwind {
    fn type_name(&self) -> &'static str {
        "linearUpwind"
    }

    fn weights(&self, _vf: &VolField<T>) -> FvResult<SurfaceField<f64>> {
        Ok(upwind_weights(&self.mesh, &self.flux))
    }

    fn corrected(&self) -> bool {
        true
    }

    fn correction(&self, vf: &VolField<T>) -> FvResult<Option<SurfaceField<T>>> {
        let grads = component_gradients(self.grad_scheme.as_ref(), vf)?;
        let mesh = &self.mesh;
        let centres = mesh.cell_centres();
        let cf = mesh.cf();
        let internal = (0..mesh.n_internal_faces())
            .map(|f| {
                let upwind = if self.flux.internal()[f] >= 0.0 {
                    mesh.owner()[f]
                } else {
                    mesh.neighbour()[f]
                };
                let d = cf[f] - centres[upwind];
                let mut v = T::ZERO;
                for (c, g) in grads.iter().enumerate() {
                    v.set_component(c, d.dot(g[upwind]));
                }
                v
            })
            .collect();
        let boundary = mesh.boundary().iter().map(|p| vec![T::ZERO; p.size()]).collect();
        SurfaceField::new(
            format!("linearUpwindCorrection({})", vf.name()),
            mesh,
            vf.dimensions(),
            internal,
            boundary,
        )
        .map(Some)
    }
}

// ============================================================================
// TVD 限制格式
// ============================================================================

/// TVD 限制器
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limiter {
    /// `max(min(2r/k, 1), 0)`
    LimitedLinear {
        /// `2 / k`
        two_by_k: f64,
    },
    /// `(r + |r|) / (1 + |r|)`
    VanLeer,
    /// `max(min(r, 1), 0)`
    Minmod,
}

impl Limiter {
    /// 由 `r` 计算限制因子
    pub fn limiter(&self, r: f64) -> f64 {
        match *self {
            Self::LimitedLinear { two_by_k } => (two_by_k * r).min(1.0).max(0.0),
            Self::VanLeer => (r + r.abs()) / (1.0 + r.abs()),
            Self::Minmod => r.min(1.0).max(0.0),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::LimitedLinear { .. } => "limitedLinear",
            Self::VanLeer => "vanLeer",
            Self::Minmod => "Minmod",
        }
    }
}

/// 梯度比 `r`
fn r_ratio<T: FieldValue>(d: Vector, grads: &[Vec<Vector>], c_cell: usize, phi_c: T, phi_d: T) -> f64 {
    let mut grad_cf = 0.0;
    let mut d_sqr = 0.0;
    for (c, g) in grads.iter().enumerate() {
        let delta = phi_d.component(c) - phi_c.component(c);
        grad_cf += d.dot(g[c_cell]) * delta;
        d_sqr += delta * delta;
    }
    if d_sqr < VSMALL {
        return 1.0;
    }
    2.0 * grad_cf / (d_sqr + SMALL * SMALL) - 1.0
}

/// TVD 限制格式
#[derive(Debug, Clone)]
pub struct LimitedScheme {
    mesh: Arc<FvMesh>,
    flux: SurfaceField<f64>,
    limiter: Limiter,
}

impl LimitedScheme {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, flux: SurfaceField<f64>, limiter: Limiter) -> Self {
        Self {
            mesh: Arc::clone(mesh),
            flux,
            limiter,
        }
    }

    /// 限制系数 λ（内部面与耦合边界面）
    pub fn limiters<T: FieldValue>(&self, vf: &VolField<T>) -> FvResult<SurfaceField<f64>> {
        let mesh = &self.mesh;
        let grads = component_gradients(&GaussGrad, vf)?;
        let psi = vf.internal();
        let centres = mesh.cell_centres();

        let internal = (0..mesh.n_internal_faces())
            .map(|f| {
                let (p, n) = (mesh.owner()[f], mesh.neighbour()[f]);
                let r = if self.flux.internal()[f] >= 0.0 {
                    r_ratio(centres[n] - centres[p], &grads, p, psi[p], psi[n])
                } else {
                    r_ratio(centres[p] - centres[n], &grads, n, psi[n], psi[p])
                };
                self.limiter.limiter(r)
            })
            .collect();

        let boundary = vf
            .boundary()
            .iter()
            .zip(self.flux.boundary())
            .map(|(pf, pflux)| match pf.patch_neighbour_values() {
                Some(nbr) if pf.coupled() => {
                    let patch = pf.patch();
                    patch
                        .face_cells()
                        .iter()
                        .zip(patch.delta())
                        .zip(nbr)
                        .zip(pflux)
                        .map(|(((&c, &d), &pn), &phi)| {
                            if phi >= 0.0 {
                                self.limiter.limiter(r_ratio(d, &grads, c, psi[c], pn))
                            } else {
                                1.0
                            }
                        })
                        .collect()
                }
                _ => vec![1.0; pf.patch().size()],
            })
            .collect();

        SurfaceField::new(
            format!("{}Limiter({})", self.limiter.name(), vf.name()),
            mesh,
            fv_foundation::DimensionSet::DIMLESS,
            internal,
            boundary,
        )
    }

    pub(crate) fn create_limited_linear<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        flux: Option<&SurfaceField<f64>>,
        stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        let flux = require_flux(flux, "limitedLinear")?;
        let k = stream.next_scalar()?;
        if !(0.0..=1.0).contains(&k) {
            return Err(FvError::invalid_config(
                stream.term(),
                stream.source(),
                "limitedLinear 系数必须位于 [0, 1]",
            ));
        }
        let limiter = Limiter::LimitedLinear {
            two_by_k: 2.0 / k.max(SMALL),
        };
        Ok(Box::new(Self::new(mesh, flux, limiter)))
    }

    pub(crate) fn create_van_leer<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        flux: Option<&SurfaceField<f64>>,
        _stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        Ok(Box::new(Self::new(mesh, require_flux(flux, "vanLeer")?, Limiter::VanLeer)))
    }

    pub(crate) fn create_minmod<T: FieldValue>(
        mesh: &Arc<FvMesh>,
        flux: Option<&SurfaceField<f64>>,
        _stream: &mut SchemeStream,
    ) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
        Ok(Box::new(Self::new(mesh, require_flux(flux, "Minmod")?, Limiter::Minmod)))
    }
}

impl<T: FieldValue> SurfaceInterpolationScheme<T> for LimitedScheme {
    fn type_name(&self) -> &'static str {
        self.limiter.name()
    }

    fn weights(&self, vf: &VolField<T>) -> FvResult<SurfaceField<f64>> {
        let lambda = self.limiters(vf)?;
        let linear = SurfaceField::linear_weights(&self.mesh);
        let upwind = upwind_weights(&self.mesh, &self.flux);

        let blend = |l: f64, wl: f64, wu: f64| l * wl + (1.0 - l) * wu;
        let mut w = upwind.clone();
        for (i, wi) in w.internal_mut().iter_mut().enumerate() {
            *wi = blend(lambda.internal()[i], linear.internal()[i], upwind.internal()[i]);
        }
        for (p, wp) in w.boundary_mut().iter_mut().enumerate() {
            for (i, wi) in wp.iter_mut().enumerate() {
                *wi = blend(lambda.patch(p)[i], linear.patch(p)[i], upwind.patch(p)[i]);
            }
        }
        Ok(w.with_name(format!("{}Weights", self.limiter.name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_functions() {
        let ll = Limiter::LimitedLinear { two_by_k: 2.0 };
        assert_eq!(ll.limiter(-1.0), 0.0);
        assert_eq!(ll.limiter(0.25), 0.5);
        assert_eq!(ll.limiter(3.0), 1.0);
        assert_eq!(Limiter::VanLeer.limiter(1.0), 1.0);
        assert_eq!(Limiter::VanLeer.limiter(-2.0), 0.0);
        assert_eq!(Limiter::Minmod.limiter(0.5), 0.5);
    }

    #[test]
    fn test_r_ratio_smooth_profile() {
        // 线性分布: r = 2·(d·∇φ)·Δφ/Δφ² − 1 = 1
        let grads = vec![vec![Vector::new(1.0, 0.0, 0.0); 2]];
        let r = r_ratio(Vector::new(1.0, 0.0, 0.0), &grads, 0, 0.0, 1.0);
        assert!((r - 1.0).abs() < 1e-12);
    }
}
