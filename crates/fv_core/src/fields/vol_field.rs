// crates/fv_core/src/fields/vol_field.rs

//! 体场
//!
//! 单元中心值 + 每个边界片一个边界条件 + 旧时间层。
//!
//! ```text
//! boundaryField 匹配顺序:
//!   1. 与边界片同名的条目
//!   2. 约束型边界片（empty / processor）使用约束类型
//!   3. 键名模式，多个匹配时取最后配置的
//!   4. 都没有 → MissingKey
//! ```

use std::sync::Arc;

use fv_config::dictionary::{field_to_json, field_value_to_json};
use fv_config::Dictionary;
use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult};
use fv_mesh::PatchKind;

use crate::boundary::{
    constraint_type, new_patch_field, patch_internal_values, CalculatedPatchField,
    EmptyPatchField, PatchContext, PatchField, PatchFieldArgs, PatchState, ProcessorPatchField,
};
use crate::mesh::FvMesh;
use crate::parallel::{flatten, reduce};
use crate::registry::RegisteredType;

use super::{ComponentField, DimensionedScalar};

/// 体场
#[derive(Debug, Clone)]
pub struct VolField<T: FieldValue> {
    name: String,
    mesh: Arc<FvMesh>,
    dimensions: DimensionSet,
    internal: Vec<T>,
    boundary: Vec<Box<dyn PatchField<T>>>,
    old_times: Vec<Vec<T>>,
    n_old_required: usize,
    time_index: Option<usize>,
}

impl<T: RegisteredType> VolField<T> {
    /// 从场字典创建（`dimensions`、`internalField`、`boundaryField`）
    ///
    /// 创建后立即求值边界条件；并行时所有分区必须同时调用。
    pub fn from_dict(name: &str, mesh: &Arc<FvMesh>, dict: &Dictionary) -> FvResult<Self> {
        let dimensions: DimensionSet = dict.lookup_or("dimensions", DimensionSet::DIMLESS)?;
        let internal: Vec<T> = dict.lookup_field("internalField", mesh.n_cells())?;
        let bf = dict.sub_dict("boundaryField")?;

        let mut boundary = Vec::with_capacity(mesh.boundary().len());
        for (index, patch) in mesh.boundary().iter().enumerate() {
            let patch_dict = match (bf.found(patch.name()), constraint_type(patch.kind())) {
                (true, _) => bf.sub_dict(patch.name())?,
                (false, Some(required)) => {
                    let mut d = Dictionary::new(format!("{}.{}", bf.scope(), patch.name()));
                    d.set("type", required)?;
                    d
                }
                (false, None) => match bf.sub_dict_matching(patch.name())? {
                    Some(d) => d,
                    None => return Err(FvError::missing_key(bf.scope(), patch.name())),
                },
            };
            boundary.push(new_patch_field(&PatchFieldArgs {
                mesh,
                patch: index,
                field_name: name,
                dict: &patch_dict,
                internal: &internal,
            })?);
        }

        let mut field = Self::assemble(name, mesh, dimensions, internal, boundary);
        field.correct_boundary_conditions()?;
        tracing::debug!(
            "读取场 {} [{}]: {} 单元, 边界 [{}]",
            name,
            dimensions,
            mesh.n_cells(),
            field
                .boundary
                .iter()
                .map(|p| format!("{}:{}", p.patch().name(), p.type_name()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(field)
    }

    /// 均匀场，非约束边界片统一使用 `patch_type`
    pub fn uniform(
        name: &str,
        mesh: &Arc<FvMesh>,
        dimensions: DimensionSet,
        value: T,
        patch_type: &str,
    ) -> FvResult<Self> {
        let mut dict = Dictionary::new(name);
        dict.set("dimensions", dimensions)?;
        dict.set("internalField", field_value_to_json(&value))?;
        let mut bf = Dictionary::new(format!("{name}.boundaryField"));
        for patch in mesh.boundary() {
            if constraint_type(patch.kind()).is_some() {
                continue;
            }
            let mut pd = Dictionary::new(patch.name());
            pd.set("type", patch_type)?;
            pd.set("value", field_value_to_json(&value))?;
            bf.set_dict(patch.name(), pd);
        }
        dict.set_dict("boundaryField", bf);
        Self::from_dict(name, mesh, &dict)
    }
}

impl<T: FieldValue> VolField<T> {
    fn assemble(
        name: &str,
        mesh: &Arc<FvMesh>,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary: Vec<Box<dyn PatchField<T>>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mesh: Arc::clone(mesh),
            dimensions,
            internal,
            boundary,
            old_times: Vec::new(),
            n_old_required: 0,
            time_index: None,
        }
    }

    /// 计算场：边界面值取相邻单元值（约束型边界片保持约束类型）
    ///
    /// 用于显式算子的结果。会交换进程边界值，并行时所有分区必须同时调用。
    pub fn calculated(
        name: &str,
        mesh: &Arc<FvMesh>,
        dimensions: DimensionSet,
        internal: Vec<T>,
    ) -> FvResult<Self> {
        FvError::check_size(name, mesh.n_cells(), internal.len())?;
        let boundary = mesh
            .boundary()
            .iter()
            .enumerate()
            .map(|(index, patch)| -> FvResult<Box<dyn PatchField<T>>> {
                Ok(match patch.kind() {
                    PatchKind::Empty => Box::new(EmptyPatchField::new(mesh, index)?),
                    PatchKind::Processor { .. } => {
                        Box::new(ProcessorPatchField::new(mesh, index, &internal)?)
                    }
                    _ => Box::new(CalculatedPatchField::new(
                        mesh,
                        index,
                        patch_internal_values(patch, &internal),
                    )?),
                })
            })
            .collect::<FvResult<Vec<_>>>()?;
        let mut field = Self::assemble(name, mesh, dimensions, internal, boundary);
        field.correct_boundary_conditions()?;
        Ok(field)
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 网格
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    /// 量纲
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 单元值
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// 可写单元值，全部边界条件退回 `Configured`
    pub fn internal_mut(&mut self) -> &mut [T] {
        self.mark_configured();
        &mut self.internal
    }

    /// 边界条件
    pub fn boundary(&self) -> &[Box<dyn PatchField<T>>] {
        &self.boundary
    }

    /// 可写边界条件
    pub fn boundary_mut(&mut self) -> &mut [Box<dyn PatchField<T>>] {
        &mut self.boundary
    }

    /// 按名称查找边界条件
    pub fn patch_field(&self, name: &str) -> Option<&dyn PatchField<T>> {
        self.mesh.find_patch(name).map(|i| self.boundary[i].as_ref())
    }

    fn mark_configured(&mut self) {
        for p in &mut self.boundary {
            p.set_state(PatchState::Configured);
        }
    }

    // ========================================================================
    // 边界条件
    // ========================================================================

    /// 按通信调度求值全部边界条件
    ///
    /// 调度保证所有进程边界片先发送（init）再接收（complete）。
    /// 求值后把 mapped 边界片的相邻单元值发布给其他区域。
    pub fn correct_boundary_conditions(&mut self) -> FvResult<()> {
        let ctx = PatchContext {
            field_name: &self.name,
            internal: &self.internal,
        };
        for entry in self.mesh.schedule().iter() {
            let patch = &mut self.boundary[entry.interface];
            match entry.phase {
                crate::parallel::SchedulePhase::Init => patch.init_evaluate(&ctx)?,
                crate::parallel::SchedulePhase::Complete => {
                    patch.evaluate(&ctx)?;
                    patch.set_state(PatchState::Evaluated);
                }
            }
        }

        for patch in self.mesh.boundary() {
            if let PatchKind::Mapped { .. } = patch.kind() {
                self.mesh.regions().publish(
                    self.mesh.name(),
                    patch.name(),
                    &self.name,
                    flatten(&patch_internal_values(patch, &self.internal)),
                );
            }
        }
        Ok(())
    }

    /// 检查全部边界条件已求值
    pub fn check_evaluated(&self) -> FvResult<()> {
        match self
            .boundary
            .iter()
            .find(|p| p.state() != PatchState::Evaluated)
        {
            Some(p) => Err(FvError::boundary_not_evaluated(&self.name, p.patch().name())),
            None => Ok(()),
        }
    }

    // ========================================================================
    // 旧时间层
    // ========================================================================

    /// 时间步序号变化时保存当前值为旧时间层
    ///
    /// 超出请求深度（至少 1 层）的旧值被丢弃。
    pub fn store_old_times(&mut self, time_index: usize) {
        if self.time_index == Some(time_index) {
            return;
        }
        self.old_times.insert(0, self.internal.clone());
        self.old_times.truncate(self.n_old_required.max(1));
        self.time_index = Some(time_index);
    }

    /// 请求保留 `n` 层旧值
    pub fn request_old_times(&mut self, n: usize) {
        self.n_old_required = self.n_old_required.max(n);
    }

    /// 已保存的旧时间层数
    pub fn n_old_times(&self) -> usize {
        self.old_times.len()
    }

    /// 第 `level` 层旧值（1 为上一时间步）
    ///
    /// 尚未保存到该深度时退回最旧的一层；没有旧值时返回当前值。
    pub fn old_time(&self, level: usize) -> &[T] {
        let level = level.max(1);
        self.old_times
            .get(level - 1)
            .or_else(|| self.old_times.last())
            .map(Vec::as_slice)
            .unwrap_or(&self.internal)
    }

    // ========================================================================
    // 分量与算术
    // ========================================================================

    /// 第 `c` 分量
    pub fn component_field(&self, c: usize) -> ComponentField {
        ComponentField::new(
            self.internal.iter().map(|v| v.component(c)).collect(),
            self.boundary
                .iter()
                .map(|p| p.values().iter().map(|v| v.component(c)).collect())
                .collect(),
        )
    }

    /// 写入第 `c` 分量的单元值
    pub fn set_component(&mut self, c: usize, values: &[f64]) -> FvResult<()> {
        FvError::check_size(&self.name, self.internal.len(), values.len())?;
        for (v, &x) in self.internal_mut().iter_mut().zip(values) {
            v.set_component(c, x);
        }
        Ok(())
    }

    /// 加上同量纲的场
    pub fn add_assign_field(&mut self, other: &VolField<T>) -> FvResult<()> {
        self.dimensions
            .check_same(&other.dimensions, &format!("{} += {}", self.name, other.name))?;
        for (a, &b) in self.internal_mut().iter_mut().zip(other.internal.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// 减去同量纲的场
    pub fn sub_assign_field(&mut self, other: &VolField<T>) -> FvResult<()> {
        self.dimensions
            .check_same(&other.dimensions, &format!("{} -= {}", self.name, other.name))?;
        for (a, &b) in self.internal_mut().iter_mut().zip(other.internal.iter()) {
            *a -= b;
        }
        Ok(())
    }

    /// 乘以带量纲标量
    pub fn scale_by(&mut self, s: &DimensionedScalar) {
        self.dimensions = self.dimensions * s.dimensions;
        let k = s.value;
        for v in self.internal_mut() {
            *v = v.scale(k);
        }
    }

    /// 体积加权全局平均
    pub fn g_average(&self) -> FvResult<T> {
        let comm = self.mesh.comm();
        let volumes = self.mesh.volumes();
        let mut sums = vec![0.0; T::N_COMPONENTS + 1];
        for (v, &vol) in self.internal.iter().zip(volumes) {
            for (c, s) in sums.iter_mut().take(T::N_COMPONENTS).enumerate() {
                *s += v.component(c) * vol;
            }
            sums[T::N_COMPONENTS] += vol;
        }
        reduce::all_reduce(comm, &mut sums, |a, b| a + b)?;
        let total = sums[T::N_COMPONENTS].max(fv_foundation::VSMALL);
        let mut out = T::ZERO;
        for c in 0..T::N_COMPONENTS {
            out.set_component(c, sums[c] / total);
        }
        Ok(out)
    }

    /// 全局最大模
    pub fn g_max_mag(&self) -> FvResult<f64> {
        let local = self.internal.iter().map(FieldValue::mag).fold(0.0, f64::max);
        reduce::max(self.mesh.comm(), local)
    }

    // ========================================================================
    // 输出
    // ========================================================================

    /// 写回场字典
    pub fn write(&self) -> FvResult<Dictionary> {
        let mut dict = Dictionary::new(self.name.clone());
        dict.set("dimensions", self.dimensions)?;
        dict.set("internalField", field_to_json(&self.internal))?;
        let mut bf = Dictionary::new(format!("{}.boundaryField", self.name));
        for p in &self.boundary {
            let mut pd = Dictionary::new(p.patch().name());
            p.write(&mut pd)?;
            bf.set_dict(p.patch().name(), pd);
        }
        dict.set_dict("boundaryField", bf);
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use fv_foundation::Vector;
    use fv_mesh::BlockMesh;
    use serde_json::json;

    fn line_mesh(n: usize) -> Arc<FvMesh> {
        Arc::new(FvMesh::serial(BlockMesh::one_dimensional(n, n as f64).build().unwrap()).unwrap())
    }

    fn t_dict() -> Dictionary {
        Dictionary::from_value(
            "T",
            json!({
                "dimensions": [0, 0, 0, 1, 0, 0, 0],
                "internalField": 1.0,
                "boundaryField": {
                    "xmin": { "type": "fixedValue", "value": 0.0 },
                    "x.*": { "type": "zeroGradient" }
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_from_dict_exact_name_then_pattern() {
        registry::initialise().unwrap();
        let mesh = line_mesh(3);
        let t = VolField::<f64>::from_dict("T", &mesh, &t_dict()).unwrap();
        assert_eq!(t.patch_field("xmin").unwrap().type_name(), "fixedValue");
        assert_eq!(t.patch_field("xmax").unwrap().type_name(), "zeroGradient");
        assert_eq!(t.patch_field("ymin").unwrap().type_name(), "empty");
        assert_eq!(t.dimensions(), DimensionSet::TEMPERATURE);
        t.check_evaluated().unwrap();
    }

    #[test]
    fn test_missing_patch_entry() {
        registry::initialise().unwrap();
        let mesh = line_mesh(3);
        let dict = Dictionary::from_value(
            "T",
            json!({
                "internalField": 1.0,
                "boundaryField": { "xmin": { "type": "zeroGradient" } }
            }),
        )
        .unwrap();
        let err = VolField::<f64>::from_dict("T", &mesh, &dict).unwrap_err();
        assert!(matches!(err, FvError::MissingKey { ref key, .. } if key == "xmax"));
    }

    #[test]
    fn test_unknown_type_names_category() {
        registry::initialise().unwrap();
        let mesh = line_mesh(2);
        let dict = Dictionary::from_value(
            "T",
            json!({
                "internalField": 0.0,
                "boundaryField": { ".*": { "type": "fixedValu", "value": 0.0 } }
            }),
        )
        .unwrap();
        let err = VolField::<f64>::from_dict("T", &mesh, &dict).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fixedValu") && msg.contains("fvPatchField<scalar>"));
    }

    #[test]
    fn test_mutation_resets_state() {
        registry::initialise().unwrap();
        let mesh = line_mesh(3);
        let mut t = VolField::<f64>::from_dict("T", &mesh, &t_dict()).unwrap();
        t.internal_mut()[2] = 5.0;
        assert!(matches!(
            t.check_evaluated(),
            Err(FvError::BoundaryNotEvaluated { .. })
        ));
        t.correct_boundary_conditions().unwrap();
        t.check_evaluated().unwrap();
        assert_eq!(t.patch_field("xmax").unwrap().values(), &[5.0]);
        assert_eq!(t.patch_field("xmin").unwrap().values(), &[0.0]);
    }

    #[test]
    fn test_old_time_chain_depth() {
        registry::initialise().unwrap();
        let mesh = line_mesh(2);
        let mut t = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 0.0, "zeroGradient")
            .unwrap();
        t.request_old_times(2);
        for step in 0..5 {
            t.store_old_times(step);
            t.internal_mut().fill(step as f64);
        }
        assert_eq!(t.n_old_times(), 2);
        assert_eq!(t.old_time(1), &[3.0, 3.0]);
        assert_eq!(t.old_time(2), &[2.0, 2.0]);
        assert_eq!(t.old_time(3), &[2.0, 2.0]);
    }

    #[test]
    fn test_vector_write_round_trip() {
        registry::initialise().unwrap();
        let mesh = line_mesh(2);
        let u = VolField::uniform(
            "U",
            &mesh,
            DimensionSet::VELOCITY,
            Vector::new(1.0, 0.0, 0.0),
            "fixedValue",
        )
        .unwrap();
        let dict = u.write().unwrap();
        let back = VolField::<Vector>::from_dict("U", &mesh, &dict).unwrap();
        assert_eq!(back.internal(), u.internal());
        assert_eq!(back.dimensions(), DimensionSet::VELOCITY);
        assert_eq!(back.component_field(0).internal, vec![1.0, 1.0]);
    }
}
