// crates/fv_core/src/schemes/ddt.rs

//! 时间导数格式
//!
//! 每个格式给出一组系数，`∂ψ/∂t ≈ c₀ ψ − Σ cᵢ ψ⁽ⁱ⁾`，其中 `ψ⁽ⁱ⁾` 为第 i 层旧值。
//!
//! - `Euler`: `c₀ = 1/Δt`，`c₁ = 1/Δt`
//! - `backward`: 变步长二阶后向差分，旧值不足两层时退化为 Euler
//! - `steadyState`: 全为零

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fv_config::SchemeStream;
use fv_foundation::{FieldValue, FvResult};

use crate::fields::{TimeState, VolField};
use crate::mesh::FvMesh;

/// 时间离散系数
#[derive(Debug, Clone, PartialEq)]
pub struct DdtCoeffs {
    /// 当前值系数
    pub current: f64,
    /// 各层旧值系数（第 0 项对应上一时间步）
    pub old: Vec<f64>,
}

impl DdtCoeffs {
    /// 稳态：无时间项
    pub fn steady() -> Self {
        Self {
            current: 0.0,
            old: Vec::new(),
        }
    }

    /// 一阶隐式
    pub fn euler(delta_t: f64) -> Self {
        let r = 1.0 / delta_t;
        Self {
            current: r,
            old: vec![r],
        }
    }
}

/// 时间导数格式
pub trait DdtScheme<T: FieldValue>: Send + Sync + fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 需要保留的旧时间层数
    fn n_old_times(&self) -> usize;

    /// 本时间步的离散系数
    fn coeffs(&self, vf: &VolField<T>, time: &TimeState) -> FvResult<DdtCoeffs>;

    /// 是否为稳态
    fn steady(&self) -> bool {
        false
    }
}

// ============================================================================

/// 一阶隐式 Euler
#[derive(Debug)]
pub struct EulerDdt<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> EulerDdt<T> {
    /// 创建
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    pub(crate) fn create(_mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn DdtScheme<T>>> {
        Ok(Box::new(Self::new()))
    }
}

impl<T: FieldValue> Default for EulerDdt<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldValue> DdtScheme<T> for EulerDdt<T> {
    fn type_name(&self) -> &'static str {
        "Euler"
    }

    fn n_old_times(&self) -> usize {
        1
    }

    fn coeffs(&self, _vf: &VolField<T>, time: &TimeState) -> FvResult<DdtCoeffs> {
        Ok(DdtCoeffs::euler(time.delta_t()))
    }
}

/// 二阶后向差分（支持变时间步长）
///
/// ```text
/// c  = 1 + Δt/(Δt + Δt₀)
/// c₀₀ = Δt² / (Δt₀ (Δt + Δt₀))
/// c₀ = c + c₀₀
/// ∂ψ/∂t ≈ (c ψ − c₀ ψ⁰ + c₀₀ ψ⁰⁰) / Δt
/// ```
#[derive(Debug)]
pub struct BackwardDdt<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> BackwardDdt<T> {
    /// 创建
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    pub(crate) fn create(_mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn DdtScheme<T>>> {
        Ok(Box::new(Self::new()))
    }
}

impl<T: FieldValue> Default for BackwardDdt<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldValue> DdtScheme<T> for BackwardDdt<T> {
    fn type_name(&self) -> &'static str {
        "backward"
    }

    fn n_old_times(&self) -> usize {
        2
    }

    fn coeffs(&self, vf: &VolField<T>, time: &TimeState) -> FvResult<DdtCoeffs> {
        let dt = time.delta_t();
        if vf.n_old_times() < 2 || time.delta_t0() <= 0.0 {
            tracing::trace!("{}: 旧值不足两层，backward 退化为 Euler", vf.name());
            return Ok(DdtCoeffs::euler(dt));
        }
        let dt0 = time.delta_t0();
        let coefft = 1.0 + dt / (dt + dt0);
        let coefft00 = dt * dt / (dt0 * (dt + dt0));
        let coefft0 = coefft + coefft00;
        Ok(DdtCoeffs {
            current: coefft / dt,
            old: vec![coefft0 / dt, -coefft00 / dt],
        })
    }
}

/// 稳态
#[derive(Debug)]
pub struct SteadyStateDdt<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> SteadyStateDdt<T> {
    /// 创建
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    pub(crate) fn create(_mesh: &Arc<FvMesh>, _stream: &mut SchemeStream) -> FvResult<Box<dyn DdtScheme<T>>> {
        Ok(Box::new(Self::new()))
    }
}

impl<T: FieldValue> Default for SteadyStateDdt<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FieldValue> DdtScheme<T> for SteadyStateDdt<T> {
    fn type_name(&self) -> &'static str {
        "steadyState"
    }

    fn n_old_times(&self) -> usize {
        0
    }

    fn coeffs(&self, _vf: &VolField<T>, _time: &TimeState) -> FvResult<DdtCoeffs> {
        Ok(DdtCoeffs::steady())
    }

    fn steady(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::DimensionSet;
    use fv_mesh::BlockMesh;

    fn field() -> VolField<f64> {
        crate::registry::initialise().unwrap();
        let mesh = Arc::new(FvMesh::serial(BlockMesh::one_dimensional(2, 1.0).build().unwrap()).unwrap());
        VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 1.0, "zeroGradient").unwrap()
    }

    #[test]
    fn test_backward_falls_back_to_euler() {
        let vf = field();
        let time = TimeState::new(0.0, 0.1, 1.0);
        let c = BackwardDdt::new().coeffs(&vf, &time).unwrap();
        assert_eq!(c, DdtCoeffs::euler(0.1));
    }

    #[test]
    fn test_backward_uniform_step() {
        let mut vf = field();
        vf.request_old_times(2);
        let mut time = TimeState::new(0.0, 0.5, 10.0);
        for _ in 0..3 {
            time.advance();
            vf.store_old_times(time.index());
        }
        let c = BackwardDdt::new().coeffs(&vf, &time).unwrap();
        // 等步长: (3ψ − 4ψ⁰ + ψ⁰⁰) / (2Δt)
        assert!((c.current - 3.0).abs() < 1e-12);
        assert!((c.old[0] - 4.0).abs() < 1e-12);
        assert!((c.old[1] + 1.0).abs() < 1e-12);
        // 常数场的时间导数为零
        assert!((c.current - c.old.iter().sum::<f64>()).abs() < 1e-12);
    }
}
