// crates/fv_core/src/boundary/mapped.rs

//! 区域间映射边界
//!
//! 面值取自另一区域某个边界片的相邻单元值。另一区域在每次
//! `correct_boundary_conditions` 之后把这些值发布到共享的
//! [`RegionRegistry`](crate::mesh::RegionRegistry)，本边界条件在求值时读取。
//! 对离散算子而言等同固定值。
//!
//! 采样目标必须是已登记到注册表的某个区域的 mapped 边界片，否则求值报错；
//! 目标存在但对侧尚未求值时保留当前面值。

use std::sync::Arc;

use fv_config::Dictionary;
use fv_foundation::{FieldValue, FvError, FvResult};
use fv_mesh::PatchKind;

use crate::mesh::FvMesh;
use crate::parallel::unflatten;

use super::{patch_base_access, PatchBase, PatchContext, PatchField, PatchFieldArgs};

/// 区域间映射边界
#[derive(Debug, Clone)]
pub struct MappedPatchField<T> {
    base: PatchBase<T>,
    sample_region: String,
    sample_patch: String,
    received: bool,
}

impl<T: FieldValue> MappedPatchField<T> {
    /// 创建，采样目标取自边界片定义
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, values: Vec<T>) -> FvResult<Self> {
        let fv_patch = &mesh.boundary()[patch];
        let PatchKind::Mapped {
            sample_region,
            sample_patch,
        } = fv_patch.kind()
        else {
            return Err(FvError::invalid_config(
                format!("boundaryField.{}.type", fv_patch.name()),
                "mapped",
                "边界片不是 mapped 类型",
            ));
        };
        Ok(Self {
            sample_region: sample_region.clone(),
            sample_patch: sample_patch.clone(),
            base: PatchBase::new(mesh, patch, values)?,
            received: false,
        })
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        let values = args.value_or_internal()?;
        Ok(Box::new(Self::new(args.mesh, args.patch, values)?))
    }

    /// 采样区域
    pub fn sample_region(&self) -> &str {
        &self.sample_region
    }

    /// 采样边界片
    pub fn sample_patch(&self) -> &str {
        &self.sample_patch
    }

    /// 是否已收到过远端值
    pub fn received(&self) -> bool {
        self.received
    }
}

impl<T: FieldValue> PatchField<T> for MappedPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "mapped"
    }

    fn update_coeffs(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        let published = self.base.mesh.regions().fetch(
            &self.sample_region,
            &self.sample_patch,
            ctx.field_name,
        );
        match published {
            Some(data) => {
                let n = self.base.size();
                FvError::check_size(
                    &format!("{}/{}.{}", self.sample_region, self.sample_patch, ctx.field_name),
                    n * T::N_COMPONENTS,
                    data.len(),
                )?;
                self.base.values = unflatten(&data);
                self.received = true;
            }
            None if !self.received => {
                let regions = self.base.mesh.regions();
                if !regions.is_declared(&self.sample_region, &self.sample_patch) {
                    return Err(FvError::invalid_config(
                        format!("{}.boundaryField.{}", ctx.field_name, self.base.fv_patch().name()),
                        format!("{}/{}", self.sample_region, self.sample_patch),
                        "采样区域或边界片不存在（未登记到区域注册表）",
                    ));
                }
                tracing::debug!(
                    "{}.{}: 区域 '{}' 尚未发布 {}，保留当前面值",
                    ctx.field_name,
                    self.base.fv_patch().name(),
                    self.sample_region,
                    self.sample_patch
                );
            }
            None => {}
        }
        Ok(())
    }

    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        self.update_coeffs(ctx)
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
