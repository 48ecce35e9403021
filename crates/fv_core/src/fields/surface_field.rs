// crates/fv_core/src/fields/surface_field.rs

//! 面场

use std::sync::Arc;

use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult};

use crate::mesh::FvMesh;

/// 面场：内部面值 + 每个边界片的面值
#[derive(Debug, Clone)]
pub struct SurfaceField<T> {
    name: String,
    mesh: Arc<FvMesh>,
    dimensions: DimensionSet,
    internal: Vec<T>,
    boundary: Vec<Vec<T>>,
}

impl<T: FieldValue> SurfaceField<T> {
    /// 创建并检查各部分长度
    pub fn new(
        name: impl Into<String>,
        mesh: &Arc<FvMesh>,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary: Vec<Vec<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&format!("{name}.internal"), mesh.n_internal_faces(), internal.len())?;
        FvError::check_size(&format!("{name}.boundary"), mesh.boundary().len(), boundary.len())?;
        for (patch, values) in mesh.boundary().iter().zip(boundary.iter()) {
            FvError::check_size(
                &format!("{name}.{}", patch.name()),
                patch.size(),
                values.len(),
            )?;
        }
        Ok(Self {
            name,
            mesh: Arc::clone(mesh),
            dimensions,
            internal,
            boundary,
        })
    }

    /// 均匀面场
    pub fn uniform(
        name: impl Into<String>,
        mesh: &Arc<FvMesh>,
        dimensions: DimensionSet,
        value: T,
    ) -> Self {
        Self {
            name: name.into(),
            mesh: Arc::clone(mesh),
            dimensions,
            internal: vec![value; mesh.n_internal_faces()],
            boundary: mesh.boundary().iter().map(|p| vec![value; p.size()]).collect(),
        }
    }

    /// 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 改名
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 网格
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    /// 量纲
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 内部面值
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// 可写内部面值
    pub fn internal_mut(&mut self) -> &mut [T] {
        &mut self.internal
    }

    /// 全部边界片面值
    pub fn boundary(&self) -> &[Vec<T>] {
        &self.boundary
    }

    /// 可写边界片面值
    pub fn boundary_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.boundary
    }

    /// 单个边界片面值
    pub fn patch(&self, patch: usize) -> &[T] {
        &self.boundary[patch]
    }

    /// 逐面变换（内部面与边界面一致处理）
    pub fn map<U: FieldValue>(
        &self,
        name: impl Into<String>,
        dimensions: DimensionSet,
        f: impl Fn(T) -> U,
    ) -> SurfaceField<U> {
        SurfaceField {
            name: name.into(),
            mesh: Arc::clone(&self.mesh),
            dimensions,
            internal: self.internal.iter().map(|&v| f(v)).collect(),
            boundary: self
                .boundary
                .iter()
                .map(|p| p.iter().map(|&v| f(v)).collect())
                .collect(),
        }
    }

    /// 与标量面场逐面相乘，量纲相乘
    pub fn scaled_by(&self, s: &SurfaceField<f64>) -> SurfaceField<T> {
        let mut out = self.clone();
        for (v, &k) in out.internal.iter_mut().zip(s.internal.iter()) {
            *v = v.scale(k);
        }
        for (bp, sp) in out.boundary.iter_mut().zip(s.boundary.iter()) {
            for (v, &k) in bp.iter_mut().zip(sp.iter()) {
                *v = v.scale(k);
            }
        }
        out.dimensions = self.dimensions * s.dimensions;
        out.name = format!("({}*{})", self.name, s.name);
        out
    }

    /// 同量纲面场相加
    pub fn try_add(&self, other: &SurfaceField<T>) -> FvResult<SurfaceField<T>> {
        self.dimensions
            .check_same(&other.dimensions, &format!("{} + {}", self.name, other.name))?;
        let mut out = self.clone();
        for (a, &b) in out.internal.iter_mut().zip(other.internal.iter()) {
            *a += b;
        }
        for (ap, bp) in out.boundary.iter_mut().zip(other.boundary.iter()) {
            for (a, &b) in ap.iter_mut().zip(bp.iter()) {
                *a += b;
            }
        }
        out.name = format!("({}+{})", self.name, other.name);
        Ok(out)
    }
}

impl SurfaceField<f64> {
    /// 面积模
    pub fn mag_sf(mesh: &Arc<FvMesh>) -> Self {
        Self {
            name: "magSf".into(),
            mesh: Arc::clone(mesh),
            dimensions: DimensionSet::AREA,
            internal: mesh.mag_sf().to_vec(),
            boundary: mesh.boundary().iter().map(|p| p.mag_sf().to_vec()).collect(),
        }
    }

    /// 线性插值权重（边界片取网格权重）
    pub fn linear_weights(mesh: &Arc<FvMesh>) -> Self {
        Self {
            name: "weights".into(),
            mesh: Arc::clone(mesh),
            dimensions: DimensionSet::DIMLESS,
            internal: mesh.weights().to_vec(),
            boundary: mesh.boundary().iter().map(|p| p.weights().to_vec()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::BlockMesh;

    #[test]
    fn test_sizes_checked() {
        let mesh = Arc::new(
            FvMesh::serial(BlockMesh::one_dimensional(3, 1.0).build().unwrap()).unwrap(),
        );
        let boundary: Vec<Vec<f64>> = mesh.boundary().iter().map(|p| vec![0.0; p.size()]).collect();
        assert!(SurfaceField::new("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, vec![0.0; 2], boundary.clone()).is_ok());
        assert!(SurfaceField::new("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, vec![0.0; 3], boundary).is_err());
    }

    #[test]
    fn test_scaled_dimensions() {
        let mesh = Arc::new(
            FvMesh::serial(BlockMesh::one_dimensional(2, 1.0).build().unwrap()).unwrap(),
        );
        let u = SurfaceField::uniform("U", &mesh, DimensionSet::VELOCITY, 2.0);
        let flux = u.scaled_by(&SurfaceField::mag_sf(&mesh));
        assert_eq!(flux.dimensions(), DimensionSet::VOLUMETRIC_FLUX);
        assert_eq!(flux.internal(), &[2.0]);
        let nu = SurfaceField::uniform("nu", &mesh, DimensionSet::KINEMATIC_VISCOSITY, 1.0);
        assert!(flux.try_add(&nu).is_err());
    }
}
