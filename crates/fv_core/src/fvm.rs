// crates/fv_core/src/fvm.rs

//! 隐式离散算子
//!
//! 每个算子返回一个 [`FvMatrix`]，格式按项名从 `fvSchemes` 选择：
//!
//! | 算子 | 项名 | 方程量纲 |
//! |---|---|---|
//! | [`ddt`] | `ddt(T)` | `ψ·V/t` |
//! | [`ddt_rho`] | `ddt(rho,T)` | `ρ·ψ·V/t` |
//! | [`div`] | `div(phi,T)` | `φ·ψ` |
//! | [`laplacian`] | `laplacian(DT,T)` | `Γ·ψ·L` |
//! | [`sp`] / [`su`] / [`su_sp`] | — | `s·ψ·V` |
//!
//! 边界面从不插值：对流项使用边界条件的值系数，扩散项使用梯度系数。
//! 参与离散的场必须处于已求值状态。

use fv_foundation::{DimensionSet, FieldValue, FvResult};

use crate::fields::{DimensionedScalar, SurfaceField, TimeState, VolField};
use crate::matrix::FvMatrix;
use crate::registry::RegisteredType;
use crate::schemes::{
    new_ddt_scheme, new_interpolation_scheme, new_sn_grad_scheme, SnGradScheme,
    SurfaceInterpolationScheme,
};

// ============================================================================
// 时间项
// ============================================================================

/// `∂ψ/∂t`
pub fn ddt<T: RegisteredType>(vf: &VolField<T>, time: &TimeState) -> FvResult<FvMatrix<T>> {
    ddt_scaled(
        &DimensionedScalar::dimensionless("1", 1.0),
        vf,
        time,
        &format!("ddt({})", vf.name()),
    )
}

/// `∂(ρψ)/∂t`，ρ 为常数
pub fn ddt_rho<T: RegisteredType>(
    rho: &DimensionedScalar,
    vf: &VolField<T>,
    time: &TimeState,
) -> FvResult<FvMatrix<T>> {
    ddt_scaled(rho, vf, time, &format!("ddt({},{})", rho.name, vf.name()))
}

fn ddt_scaled<T: RegisteredType>(
    rho: &DimensionedScalar,
    vf: &VolField<T>,
    time: &TimeState,
    term: &str,
) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let mut stream = mesh.schemes().ddt(term)?;
    let scheme = new_ddt_scheme::<T>(mesh, &mut stream)?;
    let coeffs = scheme.coeffs(vf, time)?;

    let dims = rho.dimensions * vf.dimensions() * DimensionSet::VOLUME / DimensionSet::TIME;
    let mut m = FvMatrix::new(vf, dims);
    let volumes = mesh.volumes();
    let r = rho.value;

    for (d, &v) in m.ldu_mut().diag_mut().iter_mut().zip(volumes) {
        *d = r * coeffs.current * v;
    }
    for (level, &k) in coeffs.old.iter().enumerate() {
        let old = vf.old_time(level + 1);
        for ((s, &o), &v) in m.source_mut().iter_mut().zip(old).zip(volumes) {
            *s += o.scale(r * k * v);
        }
    }
    Ok(m)
}

// ============================================================================
// 对流项
// ============================================================================

/// `∇·(φ ψ)`，Gauss 定理 + 运行时选择的插值格式
pub fn div<T: RegisteredType>(flux: &SurfaceField<f64>, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let mut stream = mesh.schemes().div(&format!("div({},{})", flux.name(), vf.name()))?;
    stream.expect("Gauss")?;
    let scheme = new_interpolation_scheme::<T>(mesh, Some(flux), &mut stream)?;
    gauss_convection(flux, vf, scheme.as_ref())
}

/// 给定插值格式的对流矩阵
///
/// 内部面 `lower = −wφ`，`upper = lower + φ`；延迟修正 `φ·corr` 进入源项。
pub fn gauss_convection<T: FieldValue>(
    flux: &SurfaceField<f64>,
    vf: &VolField<T>,
    scheme: &dyn SurfaceInterpolationScheme<T>,
) -> FvResult<FvMatrix<T>> {
    let weights = scheme.weights(vf)?;
    let mut m = FvMatrix::new(vf, flux.dimensions() * vf.dimensions());

    let lower: Vec<f64> = weights
        .internal()
        .iter()
        .zip(flux.internal())
        .map(|(&w, &phi)| -w * phi)
        .collect();
    {
        let ldu = m.ldu_mut();
        for ((u, &l), &phi) in ldu.upper_mut().iter_mut().zip(&lower).zip(flux.internal()) {
            *u = l + phi;
        }
        ldu.lower_mut().copy_from_slice(&lower);
        ldu.neg_sum_diag();
    }

    for (p, pf) in vf.boundary().iter().enumerate() {
        let pw = weights.patch(p);
        let pflux = flux.patch(p);
        let vic = pf.value_internal_coeffs(pw)?;
        let vbc = pf.value_boundary_coeffs(pw)?;
        m.internal_coeffs_mut()[p] = vic.iter().zip(pflux).map(|(v, &phi)| v.scale(phi)).collect();
        m.boundary_coeffs_mut()[p] = vbc.iter().zip(pflux).map(|(v, &phi)| v.scale(-phi)).collect();
    }

    if scheme.corrected() {
        if let Some(corr) = scheme.correction(vf)? {
            add_face_source(&mut m, &corr.scaled_by(flux));
        }
    }
    Ok(m)
}

// ============================================================================
// 扩散项
// ============================================================================

/// `∇·(Γ∇ψ)`，Γ 为常数
pub fn laplacian<T: RegisteredType>(gamma: &DimensionedScalar, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mesh = vf.mesh();
    let (_, sn) = laplacian_schemes(vf, &gamma.name)?;
    let gamma_mag_sf = SurfaceField::mag_sf(mesh).map(
        format!("{}*magSf", gamma.name),
        gamma.dimensions * DimensionSet::AREA,
        |s| gamma.value * s,
    );
    gauss_laplacian(&gamma_mag_sf, vf, sn.as_ref())
}

/// `∇·(Γ∇ψ)`，Γ 为体场，按 laplacian 项中的插值格式插值到面
pub fn laplacian_vol<T: RegisteredType>(gamma: &VolField<f64>, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    gamma.check_evaluated()?;
    let mesh = vf.mesh();
    let (interp, sn) = laplacian_schemes(vf, gamma.name())?;
    let gamma_f = interp.interpolate(gamma)?;
    let gamma_mag_sf = gamma_f.scaled_by(&SurfaceField::mag_sf(mesh));
    gauss_laplacian(&gamma_mag_sf, vf, sn.as_ref())
}

/// `∇·(Γ∇ψ)`，Γ 已在面上
pub fn laplacian_surface<T: RegisteredType>(
    gamma: &SurfaceField<f64>,
    vf: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let (_, sn) = laplacian_schemes(vf, gamma.name())?;
    let gamma_mag_sf = gamma.scaled_by(&SurfaceField::mag_sf(vf.mesh()));
    gauss_laplacian(&gamma_mag_sf, vf, sn.as_ref())
}

/// 解析 `Gauss <插值格式> <面法向梯度格式>`
pub(crate) fn laplacian_schemes<T: FieldValue>(
    vf: &VolField<T>,
    gamma_name: &str,
) -> FvResult<(
    Box<dyn SurfaceInterpolationScheme<f64>>,
    Box<dyn SnGradScheme>,
)> {
    let mesh = vf.mesh();
    let mut stream = mesh
        .schemes()
        .laplacian(&format!("laplacian({},{})", gamma_name, vf.name()))?;
    stream.expect("Gauss")?;
    let interp = new_interpolation_scheme::<f64>(mesh, None, &mut stream)?;
    let sn = new_sn_grad_scheme(mesh, &mut stream)?;
    Ok((interp, sn))
}

/// 给定 `Γ_f|S_f|` 与面法向梯度格式的扩散矩阵
///
/// 内部面 `upper = Γ|S|Δ`；非正交修正逐分量显式计算后进入源项。
pub fn gauss_laplacian<T: FieldValue>(
    gamma_mag_sf: &SurfaceField<f64>,
    vf: &VolField<T>,
    sn: &dyn SnGradScheme,
) -> FvResult<FvMatrix<T>> {
    let dims = gamma_mag_sf.dimensions() * vf.dimensions() / DimensionSet::LENGTH;
    let mut m = FvMatrix::new(vf, dims);

    {
        let ldu = m.ldu_mut();
        for ((u, &g), &dc) in ldu
            .upper_mut()
            .iter_mut()
            .zip(gamma_mag_sf.internal())
            .zip(sn.delta_coeffs())
        {
            *u = g * dc;
        }
        ldu.neg_sum_diag();
    }

    for (p, pf) in vf.boundary().iter().enumerate() {
        let pg = gamma_mag_sf.patch(p);
        let gic = pf.gradient_internal_coeffs()?;
        let gbc = pf.gradient_boundary_coeffs()?;
        m.internal_coeffs_mut()[p] = gic.iter().zip(pg).map(|(v, &g)| v.scale(g)).collect();
        m.boundary_coeffs_mut()[p] = gbc.iter().zip(pg).map(|(v, &g)| v.scale(-g)).collect();
    }

    if sn.corrected() {
        let mut face_corr = vec![T::ZERO; vf.mesh().n_internal_faces()];
        let mut any = false;
        for c in 0..T::N_COMPONENTS {
            if let Some(corr) = sn.correction(vf.name(), &vf.component_field(c))? {
                any = true;
                for ((fc, k), &g) in face_corr.iter_mut().zip(corr).zip(gamma_mag_sf.internal()) {
                    fc.set_component(c, g * k);
                }
            }
        }
        if any {
            let boundary = vf.mesh().boundary().iter().map(|p| vec![T::ZERO; p.size()]).collect();
            let corr = SurfaceField::new(
                format!("faceFluxCorrection({})", vf.name()),
                vf.mesh(),
                dims,
                face_corr,
                boundary,
            )?;
            add_face_source(&mut m, &corr);
        }
    }
    Ok(m)
}

/// 显式面通量的散度并入方程：`A·ψ − b + Σ_f F_f`
fn add_face_source<T: FieldValue>(m: &mut FvMatrix<T>, face_flux: &SurfaceField<T>) {
    let mesh = std::sync::Arc::clone(m.mesh());
    let source = m.source_mut();
    for ((&p, &n), &f) in mesh.owner().iter().zip(mesh.neighbour()).zip(face_flux.internal()) {
        source[p] -= f;
        source[n] += f;
    }
    for (patch, pf) in mesh.boundary().iter().zip(face_flux.boundary()) {
        for (&c, &f) in patch.face_cells().iter().zip(pf) {
            source[c] -= f;
        }
    }
}

// ============================================================================
// 源项
// ============================================================================

/// 隐式源项 `sp·ψ`
pub fn sp<T: FieldValue>(sp: &VolField<f64>, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mut m = FvMatrix::new(vf, sp.dimensions() * vf.dimensions() * DimensionSet::VOLUME);
    let volumes = vf.mesh().volumes();
    for ((d, &s), &v) in m.ldu_mut().diag_mut().iter_mut().zip(sp.internal()).zip(volumes) {
        *d += v * s;
    }
    Ok(m)
}

/// 显式源项 `su`
pub fn su<T: FieldValue>(su: &VolField<T>, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mut m = FvMatrix::new(vf, su.dimensions() * DimensionSet::VOLUME);
    let volumes = vf.mesh().volumes();
    for ((s, &u), &v) in m.source_mut().iter_mut().zip(su.internal()).zip(volumes) {
        *s -= u.scale(v);
    }
    Ok(m)
}

/// 按符号拆分的源项 `s·ψ`：正部隐式、负部显式
pub fn su_sp<T: FieldValue>(s: &VolField<f64>, vf: &VolField<T>) -> FvResult<FvMatrix<T>> {
    vf.check_evaluated()?;
    let mut m = FvMatrix::new(vf, s.dimensions() * vf.dimensions() * DimensionSet::VOLUME);
    let volumes = vf.mesh().volumes();
    for ((d, &k), &v) in m.ldu_mut().diag_mut().iter_mut().zip(s.internal()).zip(volumes) {
        *d += v * k.max(0.0);
    }
    for (((src, &k), &v), &p) in m
        .source_mut()
        .iter_mut()
        .zip(s.internal())
        .zip(volumes)
        .zip(vf.internal())
    {
        *src -= p.scale(v * k.min(0.0));
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fv_config::{Dictionary, FvSchemes};
    use fv_mesh::BlockMesh;
    use serde_json::json;

    use crate::mesh::FvMesh;
    use crate::registry;

    fn schemes() -> FvSchemes {
        let dict = Dictionary::from_value(
            "fvSchemes",
            json!({
                "ddtSchemes": { "default": "Euler" },
                "gradSchemes": { "default": "Gauss linear" },
                "divSchemes": { "default": "none", "div(phi,T)": "Gauss upwind" },
                "laplacianSchemes": { "default": "Gauss linear corrected" },
                "interpolationSchemes": { "default": "linear" },
                "snGradSchemes": { "default": "corrected" }
            }),
        )
        .unwrap();
        FvSchemes::new(dict)
    }

    fn line(n: usize) -> (Arc<FvMesh>, VolField<f64>) {
        registry::initialise().unwrap();
        let poly = BlockMesh::one_dimensional(n, n as f64).build().unwrap();
        let mesh = Arc::new(FvMesh::serial(poly).unwrap().with_schemes(schemes()));
        let t = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 1.0, "zeroGradient").unwrap();
        (mesh, t)
    }

    #[test]
    fn test_ddt_euler_coefficients() {
        let (_, mut t) = line(3);
        t.store_old_times(0);
        let time = TimeState::new(0.0, 0.5, 1.0);
        let m = ddt(&t, &time).unwrap();
        assert_eq!(m.ldu().diag(), &[2.0, 2.0, 2.0]);
        assert_eq!(m.source(), &[2.0, 2.0, 2.0]);
        assert_eq!(
            m.dimensions(),
            DimensionSet::TEMPERATURE * DimensionSet::VOLUME / DimensionSet::TIME
        );
    }

    #[test]
    fn test_upwind_convection_row_sums() {
        let (mesh, t) = line(3);
        let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        let m = div(&phi, &t).unwrap();
        // 内部面：owner 行出流，neighbour 行入流
        assert_eq!(m.ldu().upper(), &[0.0, 0.0]);
        assert_eq!(m.ldu().lower(), &[-1.0, -1.0]);
        assert_eq!(m.ldu().diag(), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_div_requires_configured_scheme() {
        let (mesh, t) = line(2);
        let phi = SurfaceField::uniform("psi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        assert!(div(&phi, &t).is_err());
    }

    #[test]
    fn test_laplacian_uniform_coefficients() {
        let (_, t) = line(3);
        let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 2.0);
        let m = laplacian(&dt, &t).unwrap();
        assert_eq!(m.ldu().upper(), &[2.0, 2.0]);
        assert_eq!(m.ldu().diag(), &[-2.0, -4.0, -2.0]);
        assert!(m.ldu().is_symmetric());
    }

    #[test]
    fn test_su_sp_splits_by_sign() {
        let (mesh, t) = line(2);
        let s = VolField::calculated("s", &mesh, DimensionSet::DIMLESS / DimensionSet::TIME, vec![2.0, -3.0]).unwrap();
        let m = su_sp(&s, &t).unwrap();
        assert_eq!(m.ldu().diag(), &[2.0, 0.0]);
        assert_eq!(m.source(), &[0.0, 3.0]);
    }
}
