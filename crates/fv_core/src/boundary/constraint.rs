// crates/fv_core/src/boundary/constraint.rs

//! 约束型边界条件：由边界片类型决定，不由用户任选
//!
//! - `empty`: 降维方向，不参与离散
//! - `processor`: 分区边界，面值为两侧单元的加权插值

use std::sync::Arc;

use fv_config::Dictionary;
use fv_foundation::{FieldValue, FvError, FvResult};

use crate::matrix::{LduInterface, ProcessorInterface};
use crate::mesh::FvMesh;
use crate::parallel::{flatten, unflatten};

use super::{patch_base_access, PatchBase, PatchContext, PatchField, PatchFieldArgs};

// ============================================================================
// empty
// ============================================================================

/// 空边界
#[derive(Debug, Clone)]
pub struct EmptyPatchField<T> {
    base: PatchBase<T>,
}

impl<T: FieldValue> EmptyPatchField<T> {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, patch: usize) -> FvResult<Self> {
        Ok(Self {
            base: PatchBase::new(mesh, patch, Vec::new())?,
        })
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        Ok(Box::new(Self::new(args.mesh, args.patch)?))
    }
}

impl<T: FieldValue> PatchField<T> for EmptyPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "empty"
    }

    fn evaluate(&mut self, _ctx: &PatchContext<'_, T>) -> FvResult<()> {
        Ok(())
    }

    fn value_internal_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(Vec::new())
    }

    fn value_boundary_coeffs(&self, _weights: &[f64]) -> FvResult<Vec<T>> {
        Ok(Vec::new())
    }

    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(Vec::new())
    }

    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>> {
        Ok(Vec::new())
    }

    fn sn_grad(&self, _internal: &[T]) -> Vec<T> {
        Vec::new()
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())
    }
}

// ============================================================================
// processor
// ============================================================================

/// 分区边界
///
/// 求值分两阶段：`init_evaluate` 把本侧相邻单元值发给对侧进程，
/// `evaluate` 接收对侧值并插值得到面值。
#[derive(Debug, Clone)]
pub struct ProcessorPatchField<T> {
    base: PatchBase<T>,
    neighbour: Vec<T>,
}

impl<T: FieldValue> ProcessorPatchField<T> {
    /// 创建，对侧值在第一次求值前取本侧值
    pub fn new(mesh: &Arc<FvMesh>, patch: usize, internal: &[T]) -> FvResult<Self> {
        if mesh.interface(patch).is_none() {
            return Err(FvError::invalid_config(
                format!("boundaryField.{}.type", mesh.boundary()[patch].name()),
                "processor",
                "边界片不是进程边界",
            ));
        }
        let values = super::patch_internal_values(&mesh.boundary()[patch], internal);
        Ok(Self {
            neighbour: values.clone(),
            base: PatchBase::new(mesh, patch, values)?,
        })
    }

    pub(crate) fn create(args: &PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>> {
        Ok(Box::new(Self::new(args.mesh, args.patch, args.internal)?))
    }

    fn interface(&self) -> FvResult<&ProcessorInterface> {
        self.base.mesh.interface(self.base.patch).ok_or_else(|| {
            FvError::addressing(format!(
                "边界片 '{}' 没有进程接口",
                self.base.fv_patch().name()
            ))
        })
    }
}

impl<T: FieldValue> PatchField<T> for ProcessorPatchField<T> {
    patch_base_access!();

    fn type_name(&self) -> &'static str {
        "processor"
    }

    fn init_evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        let own = self.base.internal_values(ctx.internal);
        self.interface()?
            .send(self.base.mesh.comm(), flatten(&own))
    }

    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()> {
        let n = self.base.size();
        let data = self
            .interface()?
            .recv(self.base.mesh.comm(), n * T::N_COMPONENTS)?;
        self.neighbour = unflatten(&data);

        let own = self.base.internal_values(ctx.internal);
        let mesh = Arc::clone(&self.base.mesh);
        let w = mesh.boundary()[self.base.patch].weights();
        for i in 0..n {
            self.base.values[i] = own[i].scale(w[i]) + self.neighbour[i].scale(1.0 - w[i]);
        }
        Ok(())
    }

    fn value_internal_coeffs(&self, weights: &[f64]) -> FvResult<Vec<T>> {
        FvError::check_size("weights", self.base.size(), weights.len())?;
        Ok(weights.iter().map(|&w| T::splat(w)).collect())
    }

    fn value_boundary_coeffs(&self, weights: &[f64]) -> FvResult<Vec<T>> {
        FvError::check_size("weights", self.base.size(), weights.len())?;
        Ok(weights.iter().map(|&w| T::splat(1.0 - w)).collect())
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
            .fv_patch()
            .delta_coeffs()
            .iter()
            .map(|&dc| T::splat(dc))
            .collect())
    }

    fn sn_grad(&self, internal: &[T]) -> Vec<T> {
        let own = self.base.internal_values(internal);
        own.iter()
            .zip(&self.neighbour)
            .zip(self.base.fv_patch().delta_coeffs())
            .map(|((&p, &n), &dc)| (n - p).scale(dc))
            .collect()
    }

    fn coupled(&self) -> bool {
        true
    }

    fn patch_neighbour_values(&self) -> Option<&[T]> {
        Some(&self.neighbour)
    }

    fn as_interface(&self) -> Option<&dyn LduInterface> {
        self.base
            .mesh
            .interface(self.base.patch)
            .map(|i| i as &dyn LduInterface)
    }

    fn write(&self, dict: &mut Dictionary) -> FvResult<()> {
        self.base.write_header(dict, self.type_name())?;
        self.base.write_values(dict, "value", &self.base.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{Communicator, ThreadCommunicator};
    use fv_mesh::BlockMesh;
    use std::thread;

    #[test]
    fn test_empty_has_no_faces() {
        let poly = BlockMesh::one_dimensional(2, 1.0).build().unwrap();
        let mesh = Arc::new(FvMesh::serial(poly).unwrap());
        let ymin = mesh.find_patch("ymin").unwrap();
        let bc = EmptyPatchField::<f64>::new(&mesh, ymin).unwrap();
        assert!(bc.values().is_empty());
        assert!(bc.gradient_internal_coeffs().unwrap().is_empty());
    }

    #[test]
    fn test_processor_requires_interface() {
        let poly = BlockMesh::one_dimensional(2, 1.0).build().unwrap();
        let mesh = Arc::new(FvMesh::serial(poly).unwrap());
        assert!(ProcessorPatchField::<f64>::new(&mesh, 0, &[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_processor_interpolates_across_partitions() {
        let parts = BlockMesh::one_dimensional(4, 4.0).decompose_x(2).unwrap();
        let handles: Vec<_> = parts
            .into_iter()
            .zip(ThreadCommunicator::create(2))
            .map(|(poly, comm)| {
                thread::spawn(move || {
                    let rank = comm.rank();
                    let mesh = Arc::new(FvMesh::new(poly, Arc::new(comm)).unwrap());
                    let patch = mesh
                        .boundary()
                        .iter()
                        .position(|p| p.coupled())
                        .unwrap();
                    let internal = vec![rank as f64 * 10.0; 2];
                    let mut bc = ProcessorPatchField::new(&mesh, patch, &internal).unwrap();
                    let ctx = PatchContext {
                        field_name: "T",
                        internal: &internal,
                    };
                    bc.init_evaluate(&ctx).unwrap();
                    bc.evaluate(&ctx).unwrap();
                    (bc.values()[0], bc.patch_neighbour_values().unwrap()[0])
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], (5.0, 10.0));
        assert_eq!(results[1], (5.0, 0.0));
    }
}
