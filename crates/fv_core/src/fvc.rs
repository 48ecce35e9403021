// crates/fv_core/src/fvc.rs

//! 显式离散算子
//!
//! 由当前场值直接计算结果场，不装配矩阵。返回体场的算子用
//! [`VolField::calculated`] 构造，并行时所有分区必须同时调用。

use std::sync::Arc;

use fv_foundation::{DimensionSet, FieldValue, FvResult, Gradient, Vector};

use crate::fields::{DimensionedScalar, SurfaceField, TimeState, VolField};
use crate::fvm::laplacian_schemes;
use crate::mesh::FvMesh;
use crate::registry::RegisteredType;
use crate::schemes::{new_ddt_scheme, new_grad_scheme, new_interpolation_scheme, new_sn_grad_scheme};

/// 面插值，格式取 `interpolationSchemes` 中的 `interpolate(T)`
pub fn interpolate<T: RegisteredType>(vf: &VolField<T>) -> FvResult<SurfaceField<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let mut stream = mesh
        .schemes()
        .interpolation(&format!("interpolate({})", vf.name()))?;
    new_interpolation_scheme::<T>(mesh, None, &mut stream)?.interpolate(vf)
}

/// 单元梯度，格式取 `gradSchemes` 中的 `grad(T)`
pub fn grad<T>(vf: &VolField<T>) -> FvResult<VolField<T::Grad>>
where
    T: RegisteredType + Gradient,
{
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let name = format!("grad({})", vf.name());
    let mut stream = mesh.schemes().grad(&name)?;
    let scheme = new_grad_scheme(mesh, &mut stream)?;

    let grads: Vec<Vec<Vector>> = (0..T::N_COMPONENTS)
        .map(|c| scheme.grad(mesh, &vf.component_field(c)))
        .collect::<FvResult<_>>()?;
    let internal = (0..mesh.n_cells())
        .map(|cell| {
            let g: Vec<Vector> = grads.iter().map(|gc| gc[cell]).collect();
            T::from_component_gradients(&g)
        })
        .collect();
    VolField::calculated(&name, mesh, vf.dimensions() / DimensionSet::LENGTH, internal)
}

/// 面值求和到相邻单元（owner 与 neighbour 都加）
pub fn surface_sum<T: FieldValue>(sf: &SurfaceField<T>) -> FvResult<VolField<T>> {
    let mesh = sf.mesh();
    let mut out = vec![T::ZERO; mesh.n_cells()];
    for ((&p, &n), &v) in mesh.owner().iter().zip(mesh.neighbour()).zip(sf.internal()) {
        out[p] += v;
        out[n] += v;
    }
    for (patch, pv) in mesh.boundary().iter().zip(sf.boundary()) {
        for (&c, &v) in patch.face_cells().iter().zip(pv) {
            out[c] += v;
        }
    }
    VolField::calculated(&format!("surfaceSum({})", sf.name()), mesh, sf.dimensions(), out)
}

/// 面通量的散度 `(1/V) Σ_f F_f`（owner 为正）
pub fn div<T: FieldValue>(flux: &SurfaceField<T>) -> FvResult<VolField<T>> {
    let mesh = flux.mesh();
    let out = surface_integrate(mesh, flux);
    VolField::calculated(
        &format!("div({})", flux.name()),
        mesh,
        flux.dimensions() / DimensionSet::VOLUME,
        out,
    )
}

fn surface_integrate<T: FieldValue>(mesh: &Arc<FvMesh>, flux: &SurfaceField<T>) -> Vec<T> {
    let mut out = vec![T::ZERO; mesh.n_cells()];
    for ((&p, &n), &f) in mesh.owner().iter().zip(mesh.neighbour()).zip(flux.internal()) {
        out[p] += f;
        out[n] -= f;
    }
    for (patch, pf) in mesh.boundary().iter().zip(flux.boundary()) {
        for (&c, &f) in patch.face_cells().iter().zip(pf) {
            out[c] += f;
        }
    }
    out.iter_mut()
        .zip(mesh.volumes())
        .for_each(|(v, &vol)| *v = v.scale(1.0 / vol));
    out
}

/// 对流通量 `φ_f ψ_f`，插值格式取 `divSchemes` 中的 `div(phi,T)`
pub fn flux<T: RegisteredType>(phi: &SurfaceField<f64>, vf: &VolField<T>) -> FvResult<SurfaceField<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let mut stream = mesh.schemes().div(&format!("div({},{})", phi.name(), vf.name()))?;
    stream.expect("Gauss")?;
    let scheme = new_interpolation_scheme::<T>(mesh, Some(phi), &mut stream)?;
    Ok(scheme.interpolate(vf)?.scaled_by(phi))
}

/// 面法向梯度，格式取 `snGradSchemes` 中的 `snGrad(T)`
///
/// 边界面取各边界条件自身的法向梯度。
pub fn sn_grad<T: FieldValue>(vf: &VolField<T>) -> FvResult<SurfaceField<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let mut stream = mesh.schemes().sn_grad(&format!("snGrad({})", vf.name()))?;
    let scheme = new_sn_grad_scheme(mesh, &mut stream)?;
    sn_grad_with(vf, scheme.as_ref())
}

fn sn_grad_with<T: FieldValue>(
    vf: &VolField<T>,
    scheme: &dyn crate::schemes::SnGradScheme,
) -> FvResult<SurfaceField<T>> {
    let mesh = vf.mesh();
    let mut internal = vec![T::ZERO; mesh.n_internal_faces()];
    for c in 0..T::N_COMPONENTS {
        let g = scheme.sn_grad(vf.name(), &vf.component_field(c), mesh)?;
        for (v, gc) in internal.iter_mut().zip(g) {
            v.set_component(c, gc);
        }
    }
    let boundary = vf.boundary().iter().map(|pf| pf.sn_grad(vf.internal())).collect();
    SurfaceField::new(
        format!("snGrad({})", vf.name()),
        mesh,
        vf.dimensions() / DimensionSet::LENGTH,
        internal,
        boundary,
    )
}

/// `∇·(Γ∇ψ)` 的显式值，面法向梯度格式取自 `laplacian(DT,T)` 项
pub fn laplacian<T: RegisteredType>(gamma: &DimensionedScalar, vf: &VolField<T>) -> FvResult<VolField<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let (_, sn) = laplacian_schemes(vf, &gamma.name)?;
    let face_grad = sn_grad_with(vf, sn.as_ref())?;
    let gamma_mag_sf = SurfaceField::mag_sf(mesh).map(
        format!("{}*magSf", gamma.name),
        gamma.dimensions * DimensionSet::AREA,
        |s| gamma.value * s,
    );
    let face_flux = face_grad.scaled_by(&gamma_mag_sf);
    VolField::calculated(
        &format!("laplacian({},{})", gamma.name, vf.name()),
        mesh,
        face_flux.dimensions() / DimensionSet::VOLUME,
        surface_integrate(mesh, &face_flux),
    )
}

/// 时间导数的显式值 `c₀ψ − Σ cᵢψ⁽ⁱ⁾`
pub fn ddt<T: RegisteredType>(vf: &VolField<T>, time: &TimeState) -> FvResult<VolField<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let name = format!("ddt({})", vf.name());
    let mut stream = mesh.schemes().ddt(&name)?;
    let coeffs = new_ddt_scheme::<T>(mesh, &mut stream)?.coeffs(vf, time)?;
    let mut out: Vec<T> = vf.internal().iter().map(|v| v.scale(coeffs.current)).collect();
    for (level, &k) in coeffs.old.iter().enumerate() {
        for (o, &old) in out.iter_mut().zip(vf.old_time(level + 1)) {
            *o -= old.scale(k);
        }
    }
    VolField::calculated(&name, mesh, vf.dimensions() / DimensionSet::TIME, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use fv_config::{Dictionary, FvSchemes};
    use fv_mesh::BlockMesh;
    use serde_json::json;

    use crate::registry;

    fn mesh() -> Arc<FvMesh> {
        registry::initialise().unwrap();
        let schemes = FvSchemes::new(
            Dictionary::from_value(
                "fvSchemes",
                json!({
                    "ddtSchemes": { "default": "Euler" },
                    "gradSchemes": { "default": "Gauss linear" },
                    "divSchemes": { "default": "Gauss linear" },
                    "laplacianSchemes": { "default": "Gauss linear corrected" },
                    "interpolationSchemes": { "default": "linear" },
                    "snGradSchemes": { "default": "corrected" }
                }),
            )
            .unwrap(),
        );
        let poly = BlockMesh::one_dimensional(4, 4.0).build().unwrap();
        Arc::new(FvMesh::serial(poly).unwrap().with_schemes(schemes))
    }

    fn linear_field(mesh: &Arc<FvMesh>) -> VolField<f64> {
        let dict = Dictionary::from_value(
            "T",
            json!({
                "dimensions": [0, 0, 0, 1, 0, 0, 0],
                "internalField": { "nonuniform": [0.5, 1.5, 2.5, 3.5] },
                "boundaryField": {
                    "xmin": { "type": "fixedValue", "value": 0.0 },
                    "xmax": { "type": "fixedValue", "value": 4.0 }
                }
            }),
        )
        .unwrap();
        VolField::from_dict("T", mesh, &dict).unwrap()
    }

    #[test]
    fn test_grad_of_linear_field() {
        let mesh = mesh();
        let t = linear_field(&mesh);
        let g = grad(&t).unwrap();
        for v in g.internal() {
            assert!((v.x - 1.0).abs() < 1e-12);
            assert_eq!(v.y, 0.0);
        }
        assert_eq!(g.dimensions(), DimensionSet::TEMPERATURE / DimensionSet::LENGTH);
    }

    #[test]
    fn test_laplacian_of_linear_field_vanishes() {
        let mesh = mesh();
        let t = linear_field(&mesh);
        let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1.0);
        let lap = laplacian(&dt, &t).unwrap();
        assert!(lap.internal().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_div_of_uniform_flux_is_zero_inside() {
        let mesh = mesh();
        let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        let mut phi = phi;
        // xmin 是入口
        let xmin = mesh.find_patch("xmin").unwrap();
        phi.boundary_mut()[xmin].iter_mut().for_each(|v| *v = -1.0);
        let d = div(&phi).unwrap();
        assert!(d.internal().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_sn_grad_boundary_from_patch() {
        let mesh = mesh();
        let t = linear_field(&mesh);
        let g = sn_grad(&t).unwrap();
        assert!(g.internal().iter().all(|v| (v - 1.0).abs() < 1e-12));
        let xmax = mesh.find_patch("xmax").unwrap();
        assert!((g.patch(xmax)[0] - 1.0).abs() < 1e-12);
    }
}
