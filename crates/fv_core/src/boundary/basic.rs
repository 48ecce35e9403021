// crates/fv_core/src/boundary/basic.rs

//! 基本边界条件：固定值、固定梯度、零梯度、混合、计算值
//!
//! 记 `Δ` 为边界片距离系数，`w` 为面值系数：
//!
//! | 类型 | value_internal | value_boundary | gradient_internal | gradient_boundary |
//! |---|---|---|---|---|
//! | fixedValue | 0 | φ_b | −Δ | Δ·φ_b |
//! | fixedGradient | 1 | g/Δ | 0 | g |
//! | zeroGradient | 1 | 0 | 0 | 0 |
//! | mixed | 1−f | f·φ_r + (1−f)·g_r/Δ | −f·Δ | f·Δ·φ_r + (1−f)·g_r |

use std::sync::Arc;

use fv_config::Dictionary;
use fv_foundation::{FieldValue, FvError, FvResult};

use crate::mesh::FvMesh;

use super::{patch_base_access, PatchBase, PatchContext, PatchField, PatchFieldArgs};

// ============================================================================
// fixedValue
// ============================================================================

/// 固定值（Dirichlet）
#[derive(Debug, Clone)]
pub struct FixedValuePatchField<T> {
    base: PatchBase<T>,
}

impl<T: FieldValue> FixedValuePatchField<T> {
    /// 以给定面值创建
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, values: Vec<T>) -> FvResult<Self> {
        Ok(Self {
            base: PatchBase::new(mesh, patch, values)?,
        })
    }

    /// 以均匀面值创建
    pub fn uniform(mesh: &Arc<FvMesh>, patch: usize, value: T) -> FvResult<Self> {
        let size = mesh.boundary()[patch].size();
        Self::new(mesh, patch, vec![value; size])
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        let values = args.lookup_values("value")?;
        Ok(Box::new(Self::new(args.mesh, args.patch, values)?))
    }
}

impl<T: FieldValue> PatchField<T> for FixedValuePatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "fixedValue"
    }

    fn evaluate(&mut self, _ctx: &PatchContext<'_, T>) -> FvResult<()> {
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(vec![T::ZERO; self.base.size()])
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(self.base.values.clone())
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(self
            .base
            .fv_patch()
            .delta_coeffs()
            .iter()
            .map(|&dc| T::splat(-dc))
            .collect())
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(self
            .base
            .values
            .iter()
            .zip(self.base.fv_patch().delta_coeffs())
            .map(|(&v, &dc)| v.scale(dc))
            .collect())
    }

    fn fixes_value(&self) -> bool {
        true
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())?;
        self.base.write_values(dict, "value", &self.base.values)
    }
}

// ============================================================================
// fixedGradient
// ============================================================================

/// 固定法向梯度（Neumann）
#[derive(Debug, Clone)]
pub struct FixedGradientPatchField<T> {
    base: PatchBase<T>,
    gradient: Vec<T>,
}

impl<T: FieldValue> FixedGradientPatchField<T> {
    /// 创建，面值先取相邻单元值
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, gradient: Vec<T>, internal: &[T]) -> FvResult<Self> {
        let values = super::patch_internal_values(&mesh.boundary()[patch], internal);
        let base = PatchBase::new(mesh, patch, values)?;
        FvError::check_size("gradient", base.size(), gradient.len())?;
        let mut field = Self { base, gradient };
        field.assign_from(internal);
        Ok(field)
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        let gradient = args.lookup_values("gradient")?;
        Ok(Box::new(Self::new(args.mesh, args.patch, gradient, args.internal)?))
    }

    /// 法向梯度
    pub fn gradient(&self) -> &[T] {
        &self.gradient
    }

    /// 修改法向梯度
    pub fn gradient_mut(&mut self) -> &mut [T] {
        self.base.state = super::PatchState::Configured;
        &mut self.gradient
    }

    fn assign_from(&mut self, internal: &[T]) {
        let pi = self.base.internal_values(internal);
        let mesh = Arc::clone(&self.base.mesh);
        let dc = mesh.boundary()[self.base.patch].delta_coeffs();
        for (i, v) in self.base.values.iter_mut().enumerate() {
            *v = pi[i] + self.gradient[i].scale(1.0 / dc[i]);
        }
    }
}

impl<T: FieldValue> PatchField<T> for FixedGradientPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "fixedGradient"
    }

    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        self.assign_from(ctx.internal);
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(self.base.uniform(1.0))
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(self
            .gradient
            .iter()
            .zip(self.base.fv_patch().delta_coeffs())
            .map(|(&g, &dc)| g.scale(1.0 / dc))
            .collect())
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(vec![T::ZERO; self.base.size()])
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(self.gradient.clone())
    }

    fn sn_grad(&self, _internal: &[T]) -> Vec<T> {
        self.gradient.clone()
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())?;
        self.base.write_values(dict, "gradient", &self.gradient)?;
        self.base.write_values(dict, "value", &self.base.values)
    }
}

// ============================================================================
// zeroGradient
// ============================================================================

/// 零法向梯度
#[derive(Debug, Clone)]
pub struct ZeroGradientPatchField<T> {
    base: PatchBase<T>,
}

impl<T: FieldValue> ZeroGradientPatchField<T> {
    /// 创建，面值取相邻单元值
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, internal: &[T]) -> FvResult<Self> {
        let values = super::patch_internal_values(&mesh.boundary()[patch], internal);
        Ok(Self {
            base: PatchBase::new(mesh, patch, values)?,
        })
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        Ok(Box::new(Self::new(args.mesh, args.patch, args.internal)?))
    }
}

impl<T: FieldValue> PatchField<T> for ZeroGradientPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "zeroGradient"
    }

    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        self.base.values = self.base.internal_values(ctx.internal);
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(self.base.uniform(1.0))
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(vec![T::ZERO; self.base.size()])
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(vec![T::ZERO; self.base.size()])
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(vec![T::ZERO; self.base.size()])
    }

    fn sn_grad(&self, _internal: &[T]) -> Vec<T> {
        vec![T::ZERO; self.base.size()]
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())
    }
}

// ============================================================================
// mixed
// ============================================================================

/// 混合边界（Robin）：`φ_b = f·φ_r + (1−f)·(φ_P + g_r/Δ)`
#[derive(Debug, Clone)]
pub struct MixedPatchField<T> {
    base: PatchBase<T>,
    ref_value: Vec<T>,
    ref_grad: Vec<T>,
    value_fraction: Vec<f64>,
}

impl<T: FieldValue> MixedPatchField<T> {
    /// 创建
    pub fn new(
        mesh: &Arc<FvMesh>,
        patch: usize,
        ref_value: Vec<T>,
        ref_grad: Vec<T>,
        value_fraction: Vec<f64>,
        internal: &[T],
    ) -> FvResult<Self> {
        let values = super::patch_internal_values(&mesh.boundary()[patch], internal);
        let base = PatchBase::new(mesh, patch, values)?;
        FvError::check_size("refValue", base.size(), ref_value.len())?;
        FvError::check_size("refGradient", base.size(), ref_grad.len())?;
        FvError::check_size("valueFraction", base.size(), value_fraction.len())?;
        if let Some(&f) = value_fraction.iter().find(|f| !(0.0..=1.0).contains(*f)) {
            return Err(FvError::invalid_config(
                "valueFraction",
                f.to_string(),
                "必须位于 [0, 1]",
            ));
        }
        let mut field = Self {
            base,
            ref_value,
            ref_grad,
            value_fraction,
        };
        field.assign_from(internal);
        Ok(field)
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        let size = args.fv_patch().size();
        let ref_value = args.lookup_values("refValue")?;
        let ref_grad = args.lookup_values("refGradient")?;
        let value_fraction = args.dict.lookup_field::<f64>("valueFraction", size)?;
        Ok(Box::new(Self::new(
            args.mesh,
            args.patch,
            ref_value,
            ref_grad,
            value_fraction,
            args.internal,
        )?))
    }

    /// 参考值
    pub fn ref_value(&self) -> &[T] {
        &self.ref_value
    }

    /// 参考梯度
    pub fn ref_grad(&self) -> &[T] {
        &self.ref_grad
    }

    /// 值权重
    pub fn value_fraction(&self) -> &[f64] {
        &self.value_fraction
    }

    fn assign_from(&mut self, internal: &[T]) {
        let pi = self.base.internal_values(internal);
        let mesh = Arc::clone(&self.base.mesh);
        let dc = mesh.boundary()[self.base.patch].delta_coeffs();
        for (i, v) in self.base.values.iter_mut().enumerate() {
            let f = self.value_fraction[i];
            *v = self.ref_value[i].scale(f) + (pi[i] + self.ref_grad[i].scale(1.0 / dc[i])).scale(1.0 - f);
        }
    }
}

impl<T: FieldValue> PatchField<T> for MixedPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "mixed"
    }

    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        self.assign_from(ctx.internal);
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(self.value_fraction.iter().map(|&f| T::splat(1.0 - f)).collect())
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        let dc = self.base.fv_patch().delta_coeffs();
        Ok((0..self.base.size())
            .map(|i| {
                let f = self.value_fraction[i];
                self.ref_value[i].scale(f) + self.ref_grad[i].scale((1.0 - f) / dc[i])
            })
            .collect())
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        let dc = self.base.fv_patch().delta_coeffs();
        Ok(self
            .value_fraction
            .iter()
            .zip(dc)
            .map(|(&f, &d)| T::splat(-f * d))
            .collect())
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        let dc = self.base.fv_patch().delta_coeffs();
        Ok((0..self.base.size())
            .map(|i| {
                let f = self.value_fraction[i];
                self.ref_value[i].scale(f * dc[i]) + self.ref_grad[i].scale(1.0 - f)
            })
            .collect())
    }

    fn sn_grad(&self, internal: &[T]) -> Vec<T> {
        let pi = self.base.internal_values(internal);
        let dc = self.base.fv_patch().delta_coeffs();
        (0..self.base.size())
            .map(|i| {
                let f = self.value_fraction[i];
                (self.ref_value[i] - pi[i]).scale(f * dc[i]) + self.ref_grad[i].scale(1.0 - f)
            })
            .collect()
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())?;
        self.base.write_values(dict, "refValue", &self.ref_value)?;
        self.base.write_values(dict, "refGradient", &self.ref_grad)?;
        dict.set(
            "valueFraction",
            fv_config::dictionary::field_to_json(&self.value_fraction),
        )?;
        self.base.write_values(dict, "value", &self.base.values)
    }
}

// ============================================================================
// calculated
// ============================================================================

/// 计算值：面值由外部直接赋值，不能用于隐式算子
#[derive(Debug, Clone)]
pub struct CalculatedPatchField<T> {
    base: PatchBase<T>,
}

impl<T: FieldValue> CalculatedPatchField<T> {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, values: Vec<T>) -> FvResult<Self> {
        Ok(Self {
            base: PatchBase::new(mesh, patch, values)?,
        })
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        let values = args.value_or_internal()?;
        Ok(Box::new(Self::new(args.mesh, args.patch, values)?))
    }

    fn not_implicit(&self) -> FvError {
        FvError::invalid_config(
            format!("boundaryField.{}.type", self.base.fv_patch().name()),
            "calculated",
            "calculated 边界条件不提供隐式离散系数",
        )
    }
}

impl<T: FieldValue> PatchField<T> for CalculatedPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "calculated"
    }

    fn evaluate(&mut self, _ctx: &PatchContext<'_, T>) -> FvResult<()> {
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Err(self.not_implicit())
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Err(self.not_implicit())
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        Err(self.not_implicit())
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        Err(self.not_implicit())
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())?;
        self.base.write_values(dict, "value", &self.base.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::PatchState;
    use fv_mesh::BlockMesh;

    fn line_mesh() -> Arc<FvMesh> {
        let poly = BlockMesh::one_dimensional(3, 3.0).build().unwrap();
        Arc::new(FvMesh::serial(poly).unwrap())
    }

    fn ctx<'a>(internal: &'a [f64]) -> PatchContext<'a, f64> {
        PatchContext {
            field_name: "T",
            internal,
        }
    }

    #[test]
    fn test_fixed_value_ignores_internal() {
        let mesh = line_mesh();
        let xmax = mesh.find_patch("xmax").unwrap();
        let mut bc = FixedValuePatchField::uniform(&mesh, xmax, 10.0).unwrap();
        for cell_value in [-5.0, 0.0, 123.0] {
            bc.evaluate(&ctx(&[cell_value; 3])).unwrap();
            assert_eq!(bc.values(), &[10.0]);
        }
        // 半个单元距离 0.5
        assert_eq!(bc.gradient_internal_coeffs().unwrap(), vec![-2.0]);
        assert_eq!(bc.gradient_boundary_coeffs().unwrap(), vec![20.0]);
        assert_eq!(bc.sn_grad(&[0.0, 0.0, 4.0]), vec![12.0]);
        assert_eq!(bc.state(), PatchState::Configured);
    }

    #[test]
    fn test_fixed_gradient_extrapolates() {
        let mesh = line_mesh();
        let xmax = mesh.find_patch("xmax").unwrap();
        let internal = [0.0, 0.0, 1.0];
        let mut bc = FixedGradientPatchField::new(&mesh, xmax, vec![4.0], &internal).unwrap();
        assert_eq!(bc.values(), &[3.0]);
        bc.evaluate(&ctx(&[0.0, 0.0, 2.0])).unwrap();
        assert_eq!(bc.values(), &[4.0]);
        assert_eq!(bc.value_boundary_coeffs(&[1.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_mixed_limits() {
        let mesh = line_mesh();
        let xmin = mesh.find_patch("xmin").unwrap();
        let internal = [1.0, 0.0, 0.0];
        let dirichlet =
            MixedPatchField::new(&mesh, xmin, vec![5.0], vec![0.0], vec![1.0], &internal).unwrap();
        assert_eq!(dirichlet.values(), &[5.0]);
        assert_eq!(dirichlet.value_internal_coeffs(&[1.0]).unwrap(), vec![0.0]);

        let neumann =
            MixedPatchField::new(&mesh, xmin, vec![5.0], vec![2.0], vec![0.0], &internal).unwrap();
        assert_eq!(neumann.values(), &[2.0]);
        assert_eq!(neumann.gradient_boundary_coeffs().unwrap(), vec![2.0]);

        assert!(
            MixedPatchField::new(&mesh, xmin, vec![5.0], vec![0.0], vec![1.5], &internal).is_err()
        );
    }

    #[test]
    fn test_calculated_rejects_implicit_use() {
        let mesh = line_mesh();
        let bc = CalculatedPatchField::new(&mesh, 0, vec![1.0]).unwrap();
        assert!(bc.gradient_internal_coeffs().is_err());
    }
}
