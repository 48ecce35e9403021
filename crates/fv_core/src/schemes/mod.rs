// crates/fv_core/src/schemes/mod.rs

//! 离散格式
//!
//! 所有格式都由 `fvSchemes` 中的条目按名称运行时选择：
//!
//! ```text
//! ddtSchemes          { default Euler; }
//! gradSchemes         { default Gauss linear; }
//! divSchemes          { div(phi,U) Gauss linearUpwind grad(U); }
//! laplacianSchemes    { default Gauss linear corrected; }
//! interpolationSchemes{ default linear; }
//! snGradSchemes       { default corrected; }
//! ```
//!
//! `div` 与 `laplacian` 条目以 `Gauss` 开头，其后分别是插值格式和
//! `<插值格式> <面法向梯度格式>`，由 [`crate::fvm`] 拆解。

mod ddt;
mod grad;
mod interpolation;
mod sn_grad;

use std::sync::Arc;

use fv_config::SchemeStream;
use fv_foundation::FvResult;

use crate::fields::SurfaceField;
use crate::mesh::FvMesh;
use crate::registry::{self, RegisteredType};

pub use ddt::{BackwardDdt, DdtCoeffs, DdtScheme, EulerDdt, SteadyStateDdt};
pub use grad::{GaussGrad, GradScheme, LeastSquaresGrad};
pub use interpolation::{
    interpolate_with_weights, Limiter, LimitedScheme, LinearInterpolation, LinearUpwind,
    SurfaceInterpolationScheme, UpwindInterpolation,
};
pub use sn_grad::{CorrectedSnGrad, LimitedSnGrad, OrthogonalSnGrad, SnGradScheme, UncorrectedSnGrad};

/// 时间格式构造函数
pub type DdtCtor<T> = fn(&Arc<FvMesh>, &mut SchemeStream) -> FvResult<Box<dyn DdtScheme<T>>>;

/// 插值格式构造函数（对流项传入面通量）
pub type InterpolationCtor<T> = fn(
    &Arc<FvMesh>,
    Option<&SurfaceField<f64>>,
    &mut SchemeStream,
) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>>;

/// 面法向梯度格式构造函数
pub type SnGradCtor = fn(&Arc<FvMesh>, &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>>;

/// 梯度格式构造函数
pub type GradCtor = fn(&Arc<FvMesh>, &mut SchemeStream) -> FvResult<Box<dyn GradScheme>>;

// ============================================================================
// 按名称创建
// ============================================================================

/// 读取格式名并创建时间格式
pub fn new_ddt_scheme<T: RegisteredType>(
    mesh: &Arc<FvMesh>,
    stream: &mut SchemeStream,
) -> FvResult<Box<dyn DdtScheme<T>>> {
    let name = stream.next_word()?;
    T::ddt_schemes().lookup(&name)?(mesh, stream)
}

/// 读取格式名并创建插值格式
pub fn new_interpolation_scheme<T: RegisteredType>(
    mesh: &Arc<FvMesh>,
    flux: Option<&SurfaceField<f64>>,
    stream: &mut SchemeStream,
) -> FvResult<Box<dyn SurfaceInterpolationScheme<T>>> {
    let name = stream.next_word()?;
    T::interpolation_schemes().lookup(&name)?(mesh, flux, stream)
}

/// 读取格式名并创建面法向梯度格式
pub fn new_sn_grad_scheme(mesh: &Arc<FvMesh>, stream: &mut SchemeStream) -> FvResult<Box<dyn SnGradScheme>> {
    let name = stream.next_word()?;
    registry::sn_grad_schemes().lookup(&name)?(mesh, stream)
}

/// 读取格式名并创建梯度格式
pub fn new_grad_scheme(mesh: &Arc<FvMesh>, stream: &mut SchemeStream) -> FvResult<Box<dyn GradScheme>> {
    let name = stream.next_word()?;
    registry::grad_schemes().lookup(&name)?(mesh, stream)
}

// ============================================================================
// 注册
// ============================================================================

pub(crate) fn register_value_type<T: RegisteredType>() -> FvResult<()> {
    let ddt = T::ddt_schemes();
    ddt.register("Euler", EulerDdt::<T>::create)?;
    ddt.register("backward", BackwardDdt::<T>::create)?;
    ddt.register("steadyState", SteadyStateDdt::<T>::create)?;

    let interp = T::interpolation_schemes();
    interp.register("linear", LinearInterpolation::create::<T>)?;
    interp.register("upwind", UpwindInterpolation::create::<T>)?;
    interp.register("linearUpwind", LinearUpwind::create::<T>)?;
    interp.register("limitedLinear", LimitedScheme::create_limited_linear::<T>)?;
    interp.register("vanLeer", LimitedScheme::create_van_leer::<T>)?;
    interp.register("Minmod", LimitedScheme::create_minmod::<T>)
}

pub(crate) fn register_builtin() -> FvResult<()> {
    let sn = registry::sn_grad_schemes();
    sn.register("orthogonal", OrthogonalSnGrad::create)?;
    sn.register("uncorrected", UncorrectedSnGrad::create)?;
    sn.register("corrected", CorrectedSnGrad::create)?;
    sn.register("limited", LimitedSnGrad::create)?;

    let grad = registry::grad_schemes();
    grad.register("Gauss", GaussGrad::create)?;
    grad.register("leastSquares", LeastSquaresGrad::create)
}
