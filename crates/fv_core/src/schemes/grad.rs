// crates/fv_core/src/schemes/grad.rs

//! 梯度格式（逐分量）
//!
//! - `Gauss linear`: `∇φ_P = (1/V_P) Σ_f S_f φ_f`
//! - `leastSquares`: `∇φ_P = (Σ w d⊗d)⁻¹ Σ w d (φ_N − φ_P)`，`w = 1/|d|²`
//!
//! 降维方向（empty 边界片法向）上梯度为零。

use std::sync::Arc;

use glam::DMat3;

use fv_config::SchemeStream;
use fv_foundation::{FvError, FvResult, Vector, VSMALL};

use crate::fields::ComponentField;
use crate::mesh::FvMesh;

/// 梯度格式
pub trait GradScheme: Send + Sync + std::fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 单个分量的单元梯度
    fn grad(&self, mesh: &FvMesh, field: &ComponentField) -> FvResult<Vec<Vector>>;
}

/// 清除降维方向上的分量
fn clear_empty_directions(mesh: &FvMesh, grad: &mut [Vector]) {
    let dirs = mesh.solution_directions();
    if dirs.iter().all(|&d| d) {
        return;
    }
    for g in grad.iter_mut() {
        for (axis, &active) in dirs.iter().enumerate() {
            if !active {
                g[axis] = 0.0;
            }
        }
    }
}

/// Gauss 定理梯度（线性插值面值）
#[derive(Debug, Clone, Default)]
pub struct GaussGrad;

impl GaussGrad {
    pub(crate) fn create(_mesh: &Arc<FvMesh>, stream: &mut SchemeStream) -> FvResult<Box<dyn GradScheme>> {
        let interp = stream.next_word()?;
        if interp != "linear" {
            return Err(FvError::unknown_type(
                "gradScheme interpolation",
                interp,
                vec!["linear".to_string()],
            ));
        }
        Ok(Box::new(Self))
    }
}

impl GradScheme for GaussGrad {
    fn type_name(&self) -> &'static str {
        "Gauss"
    }

    fn grad(&self, mesh: &FvMesh, field: &ComponentField) -> FvResult<Vec<Vector>> {
        FvError::check_size("grad.internal", mesh.n_cells(), field.internal.len())?;
        let mut g = vec![Vector::ZERO; mesh.n_cells()];
        let (own, nei) = (mesh.owner(), mesh.neighbour());
        let sf = mesh.sf();
        let w = mesh.weights();
        for f in 0..mesh.n_internal_faces() {
            let (p, n) = (own[f], nei[f]);
            let phi_f = w[f] * field.internal[p] + (1.0 - w[f]) * field.internal[n];
            g[p] += sf[f] * phi_f;
            g[n] -= sf[f] * phi_f;
        }
        for (patch, values) in mesh.boundary().iter().zip(field.boundary.iter()) {
            for ((&c, s), &v) in patch.face_cells().iter().zip(patch.sf()).zip(values) {
                g[c] += *s * v;
            }
        }
        for (gi, &v) in g.iter_mut().zip(mesh.volumes()) {
            *gi /= v;
        }
        clear_empty_directions(mesh, &mut g);
        Ok(g)
    }
}

/// 最小二乘梯度
#[derive(Debug, Clone, Default)]
pub struct LeastSquaresGrad;

impl LeastSquaresGrad {
    pub(crate) fn create(_mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn GradScheme>> {
        Ok(Box::new(Self))
    }
}

fn outer(d: Vector) -> DMat3 {
    DMat3::from_cols(d * d.x, d * d.y, d * d.z)
}

impl GradScheme for LeastSquaresGrad {
    fn type_name(&self) -> &'static str {
        "leastSquares"
    }

    fn grad(&self, mesh: &FvMesh, field: &ComponentField) -> FvResult<Vec<Vector>> {
        FvError::check_size("grad.internal", mesh.n_cells(), field.internal.len())?;
        let n = mesh.n_cells();
        let centres = mesh.cell_centres();
        let mut dd = vec![DMat3::ZERO; n];
        let mut rhs = vec![Vector::ZERO; n];

        let (own, nei) = (mesh.owner(), mesh.neighbour());
        for f in 0..mesh.n_internal_faces() {
            let (p, q) = (own[f], nei[f]);
            let d = centres[q] - centres[p];
            let w = 1.0 / d.length_squared().max(VSMALL);
            let wdd = outer(d) * w;
            dd[p] += wdd;
            dd[q] += wdd;
            let dphi = field.internal[q] - field.internal[p];
            rhs[p] += d * (w * dphi);
            rhs[q] += d * (w * dphi);
        }
        for (patch, values) in mesh.boundary().iter().zip(field.boundary.iter()) {
            for ((&c, cf), &v) in patch.face_cells().iter().zip(patch.cf()).zip(values) {
                let d = *cf - centres[c];
                let w = 1.0 / d.length_squared().max(VSMALL);
                dd[c] += outer(d) * w;
                rhs[c] += d * (w * (v - field.internal[c]));
            }
        }

        let dirs = mesh.solution_directions();
        let mut g: Vec<Vector> = dd
            .iter()
            .zip(rhs.iter())
            .map(|(m, r)| {
                let mut m = *m;
                for (axis, &active) in dirs.iter().enumerate() {
                    if !active {
                        m.col_mut(axis)[axis] += 1.0;
                    }
                }
                if m.determinant().abs() > VSMALL {
                    m.inverse() * *r
                } else {
                    Vector::ZERO
                }
            })
            .collect();
        clear_empty_directions(mesh, &mut g);
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::BlockMesh;

    fn linear_field(mesh: &FvMesh) -> ComponentField {
        let internal = mesh.cell_centres().iter().map(|c| 2.0 * c.x + 1.0).collect();
        let boundary = mesh
            .boundary()
            .iter()
            .map(|p| p.cf().iter().map(|c| 2.0 * c.x + 1.0).collect())
            .collect();
        ComponentField::new(internal, boundary)
    }

    #[test]
    fn test_linear_field_exact() {
        let mesh = FvMesh::serial(BlockMesh::two_dimensional(4, 3, 2.0, 1.5).build().unwrap()).unwrap();
        let field = linear_field(&mesh);
        for scheme in [&GaussGrad as &dyn GradScheme, &LeastSquaresGrad] {
            let g = scheme.grad(&mesh, &field).unwrap();
            for gi in g {
                assert!((gi - Vector::new(2.0, 0.0, 0.0)).length() < 1e-10, "{}: {gi}", scheme.type_name());
            }
        }
    }

    #[test]
    fn test_gauss_requires_linear() {
        let mesh = Arc::new(FvMesh::serial(BlockMesh::one_dimensional(2, 1.0).build().unwrap()).unwrap());
        let mut s = SchemeStream::new("grad(T)", "cubic");
        assert!(GaussGrad::create(&mesh, &mut s).is_err());
    }
}
