// crates/fv_core/src/schemes/sn_grad.rs

//! 面法向梯度格式
//!
//! 内部面 `∂φ/∂n ≈ Δ_f (φ_N − φ_P) + k_f·(∇φ)_f`：
//!
//! | 格式 | Δ_f | 显式修正 |
//! |---|---|---|
//! | `orthogonal` | `1/|d|` | — |
//! | `uncorrected` | `1/(n̂·d)` | — |
//! | `corrected` | `1/(n̂·d)` | `k·(∇φ)_f` |
//! | `limited [corrected] ψ` | `1/(n̂·d)` | 限幅后的 `k·(∇φ)_f` |
//!
//! 修正项所需的单元梯度按 `gradSchemes` 中 `grad(<场名>)` 项计算。

use std::fmt;
use std::sync::Arc;

use fv_config::SchemeStream;
use fv_foundation::{FvError, FvResult, Vector, SMALL};

use crate::fields::ComponentField;
use crate::mesh::FvMesh;

use super::new_grad_scheme;

/// 面法向梯度格式
pub trait SnGradScheme: Send + Sync + fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 内部面的隐式距离系数
    fn delta_coeffs(&self) -> &[f64];

    /// 是否有显式修正
    fn corrected(&self) -> bool {
        false
    }

    /// 内部面上的显式修正（单个分量）
    fn correction(&self, _field_name: &str, _field: &ComponentField) -> FvResult<Option<Vec<f64>>> {
        Ok(None)
    }

    /// 内部面法向梯度（隐式部分 + 修正）
    fn sn_grad(&self, field_name: &str, field: &ComponentField, mesh: &FvMesh) -> FvResult<Vec<f64>> {
        let dc = self.delta_coeffs();
        let psi = &field.internal;
        let mut out: Vec<f64> = mesh
            .owner()
            .iter()
            .zip(mesh.neighbour())
            .zip(dc)
            .map(|((&p, &n), &d)| d * (psi[n] - psi[p]))
            .collect();
        if let Some(corr) = self.correction(field_name, field)? {
            out.iter_mut().zip(corr).for_each(|(o, c)| *o += c);
        }
        Ok(out)
    }
}

/// `k_f · (∇φ)_f`，面梯度取线性插值
fn non_orth_correction(mesh: &Arc<FvMesh>, field_name: &str, field: &ComponentField) -> FvResult<Vec<f64>> {
    let mut stream = mesh.schemes().grad(&format!("grad({field_name})"))?;
    let grad = new_grad_scheme(mesh, &mut stream)?.grad(mesh, field)?;
    let k = mesh.non_orth_correction_vectors();
    let w = mesh.weights();
    Ok(mesh
        .owner()
        .iter()
        .zip(mesh.neighbour())
        .enumerate()
        .map(|(f, (&p, &n))| {
            let gf: Vector = grad[p] * w[f] + grad[n] * (1.0 - w[f]);
            k[f].dot(gf)
        })
        .collect())
}

// ============================================================================
// orthogonal / uncorrected / corrected
// ============================================================================

/// 正交网格：`Δ = 1/|d|`
#[derive(Debug, Clone)]
pub struct OrthogonalSnGrad {
    mesh: Arc<FvMesh>,
}

impl OrthogonalSnGrad {
    pub(crate) fn create(mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>> {
        Ok(Box::new(Self {
            mesh: Arc::clone(mesh),
        }))
    }
}

impl SnGradScheme for OrthogonalSnGrad {
    fn type_name(&self) -> &'static str {
        "orthogonal"
    }

    fn delta_coeffs(&self) -> &[f64] {
        self.mesh.delta_coeffs()
    }
}

/// 非正交网格，不做显式修正
#[derive(Debug, Clone)]
pub struct UncorrectedSnGrad {
    mesh: Arc<FvMesh>,
}

impl UncorrectedSnGrad {
    pub(crate) fn create(mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>> {
        Ok(Box::new(Self {
            mesh: Arc::clone(mesh),
        }))
    }
}

impl SnGradScheme for UncorrectedSnGrad {
    fn type_name(&self) -> &'static str {
        "uncorrected"
    }

    fn delta_coeffs(&self) -> &[f64] {
        self.mesh.non_orth_delta_coeffs()
    }
}

/// 非正交修正
#[derive(Debug, Clone)]
pub struct CorrectedSnGrad {
    mesh: Arc<FvMesh>,
}

impl CorrectedSnGrad {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>) -> Self {
        Self {
            mesh: Arc::clone(mesh),
        }
    }

    pub(crate) fn create(mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>> {
        Ok(Box::new(Self::new(mesh)))
    }
}

impl SnGradScheme for CorrectedSnGrad {
    fn type_name(&self) -> &'static str {
        "corrected"
    }

    fn delta_coeffs(&self) -> &[f64] {
        self.mesh.non_orth_delta_coeffs()
    }

    fn corrected(&self) -> bool {
        true
    }

    fn correction(&self, field_name: &str, field: &ComponentField) -> FvResult<Option<Vec<f64>>> {
        non_orth_correction(&self.mesh, field_name, field).map(Some)
    }
}

// ============================================================================
// limited
// ============================================================================

/// 限幅非正交修正
///
/// `λ = min(ψ|Δ(φ_N − φ_P)| / ((1−ψ)|corr| + SMALL), 1)`；
/// ψ = 0 等同 `uncorrected`，ψ = 1 等同 `corrected`。
#[derive(Debug, Clone)]
pub struct LimitedSnGrad {
    mesh: Arc<FvMesh>,
    limit_coeff: f64,
}

impl LimitedSnGrad {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, limit_coeff: f64) -> FvResult<Self> {
        if !(0.0..=1.0).contains(&limit_coeff) {
            return Err(FvError::invalid_config(
                "snGradSchemes.limited",
                limit_coeff.to_string(),
                "限幅系数必须位于 [0, 1]",
            ));
        }
        Ok(Self {
            mesh: Arc::clone(mesh),
            limit_coeff,
        })
    }

    /// 限幅系数 ψ
    pub fn limit_coeff(&self) -> f64 {
        self.limit_coeff
    }

    pub(crate) fn create(mesh: &Arc<FvMesh>, stream: &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>> {
        stream.accept("corrected");
        let psi = stream.next_scalar()?;
        Ok(Box::new(Self::new(mesh, psi)?))
    }
}

impl SnGradScheme for LimitedSnGrad {
    fn type_name(&self) -> &'static str {
        "limited"
    }

    fn delta_coeffs(&self) -> &[f64] {
        self.mesh.non_orth_delta_coeffs()
    }

    fn corrected(&self) -> bool {
        self.limit_coeff > 0.0
    }

    fn correction(&self, field_name: &str, field: &ComponentField) -> FvResult<Option<Vec<f64>>> {
        if self.limit_coeff <= 0.0 {
            return Ok(None);
        }
        let mut corr = non_orth_correction(&self.mesh, field_name, field)?;
        if self.limit_coeff >= 1.0 {
            return Ok(Some(corr));
        }
        let mesh = &self.mesh;
        let psi = &field.internal;
        let dc = mesh.non_orth_delta_coeffs();
        let k = self.limit_coeff;
        for (f, c) in corr.iter_mut().enumerate() {
            let uncorr = dc[f] * (psi[mesh.neighbour()[f]] - psi[mesh.owner()[f]]);
            let limiter = (k * uncorr.abs() / ((1.0 - k) * c.abs() + SMALL)).min(1.0);
            *c *= limiter;
        }
        Ok(Some(corr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::BlockMesh;

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::serial(BlockMesh::one_dimensional(4, 1.0).build().unwrap()).unwrap())
    }

    #[test]
    fn test_limited_coeff_range() {
        let m = mesh();
        assert!(LimitedSnGrad::new(&m, 0.5).is_ok());
        assert!(LimitedSnGrad::new(&m, 1.5).is_err());
        assert!(!LimitedSnGrad::new(&m, 0.0).unwrap().corrected());
    }

    #[test]
    fn test_orthogonal_sn_grad_of_linear_field() {
        let m = mesh();
        let scheme = OrthogonalSnGrad { mesh: Arc::clone(&m) };
        let internal: Vec<f64> = m.cell_centres().iter().map(|c| 2.0 * c.x).collect();
        let field = ComponentField::new(internal, m.boundary().iter().map(|p| vec![0.0; p.size()]).collect());
        let g = scheme.sn_grad("T", &field, &m).unwrap();
        assert_eq!(g.len(), 3);
        for v in g {
            assert!((v - 2.0).abs() < 1e-10);
        }
    }
}
