// crates/fv_core/src/boundary/mod.rs

//! 多态边界条件层
//!
//! 每个边界片上的场值由一个 [`PatchField`] 实例管理，按字典中的 `type`
//! 从 `fvPatchField<T>` 选择表创建。离散算子不在边界面上插值，而是查询
//! 四组系数：
//!
//! | 系数 | 用途 | 含义 |
//! |---|---|---|
//! | `value_internal_coeffs` | 对流 | 面值中相邻单元值的系数 |
//! | `value_boundary_coeffs` | 对流 | 面值中的常数部分 |
//! | `gradient_internal_coeffs` | 扩散 | 面法向梯度中相邻单元值的系数 |
//! | `gradient_boundary_coeffs` | 扩散 | 面法向梯度中的常数部分 |
//!
//! # 状态机
//!
//! ```text
//! Uninitialised ──构造──▶ Configured ──evaluate──▶ Evaluated
//!                             ▲                        │
//!                             └──── 内部场被修改 ◀─────┘
//! ```
//!
//! 算子只接受全部边界片处于 `Evaluated` 的场。

mod basic;
mod constraint;
mod mapped;

use std::fmt;
use std::sync::Arc;

use fv_config::Dictionary;
use fv_foundation::{FieldValue, FvError, FvResult};
use fv_mesh::PatchKind;

use crate::matrix::LduInterface;
use crate::mesh::{FvMesh, FvPatch};
use crate::registry::RegisteredType;

pub use basic::{
    CalculatedPatchField, FixedGradientPatchField, FixedValuePatchField, MixedPatchField,
    ZeroGradientPatchField,
};
pub use constraint::{EmptyPatchField, ProcessorPatchField};
pub use mapped::MappedPatchField;

// ============================================================================
// 状态与上下文
// ============================================================================

/// 边界条件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchState {
    /// 尚未构造完成
    #[default]
    Uninitialised,
    /// 已配置，面值可能过期
    Configured,
    /// 面值与当前内部场一致
    Evaluated,
}

/// 求值时可见的内部场
#[derive(Debug, Clone, Copy)]
pub struct PatchContext<'a, T> {
    /// 场名
    pub field_name: &'a str,
    /// 单元值
    pub internal: &'a [T],
}

/// 构造参数
#[derive(Debug, Clone, Copy)]
pub struct PatchFieldArgs<'a, T> {
    /// 网格
    pub mesh: &'a Arc<FvMesh>,
    /// 边界片索引
    pub patch: usize,
    /// 场名
    pub field_name: &'a str,
    /// 该边界片的字典（含 `type`）
    pub dict: &'a Dictionary,
    /// 单元值
    pub internal: &'a [T],
}

impl<'a, T: FieldValue> PatchFieldArgs<'a, T> {
    /// 边界片
    pub fn fv_patch(&self) -> &'a FvPatch {
        &self.mesh.boundary()[self.patch]
    }

    /// 读取 `key` 指定的面值列表（均匀值或 `nonuniform`）
    pub fn lookup_values(&self, key: &str) -> FvResult<Vec<T>> {
        Ok(self.dict.lookup_field(key, self.fv_patch().size())?)
    }

    /// 读取 `value`，缺省时取相邻单元值
    pub fn value_or_internal(&self) -> FvResult<Vec<T>> {
        if self.dict.found("value") {
            self.lookup_values("value")
        } else {
            Ok(patch_internal_values(self.fv_patch(), self.internal))
        }
    }
}

/// 边界条件构造函数
pub type PatchFieldCtor<T> = fn(&PatchFieldArgs<'_, T>) -> FvResult<Box<dyn PatchField<T>>>;

// ============================================================================
// 边界条件接口
// ============================================================================

/// 边界条件
pub trait PatchField<T: FieldValue>: Send + Sync + fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 网格
    fn mesh(&self) -> &FvMesh;

    /// 边界片索引
    fn patch_index(&self) -> usize;

    /// 边界片
    fn patch(&self) -> &FvPatch {
        &self.mesh().boundary()[self.patch_index()]
    }

    /// 面值
    fn values(&self) -> &[T];

    /// 可写面值
    fn values_mut(&mut self) -> &mut [T];

    /// 状态
    fn state(&self) -> PatchState;

    /// 设置状态
    fn set_state(&mut self, state: PatchState);

    /// 更新依赖外部数据的系数（如映射边界读取远端值）
    fn update_coeffs(&mut self, _ctx: &PatchContext<'_, T>) -> FvResult<()> {
        Ok(())
    }

    /// 求值第一阶段（耦合边界片在此发送本侧值）
    fn init_evaluate(&mut self, _ctx: &PatchContext<'_, T>) -> FvResult<()> {
        Ok(())
    }

    /// 由内部场计算面值
    fn evaluate(&mut self, ctx: &PatchContext<'_, T>) -> FvResult<()>;

    /// 对流项：面值对相邻单元值的系数
    fn value_internal_coeffs(&self, weights: &[f64]) -> FvResult<Vec<T>>;

    /// 对流项：面值的常数部分
    fn value_boundary_coeffs(&self, weights: &[f64]) -> FvResult<Vec<T>>;

    /// 扩散项：面法向梯度对相邻单元值的系数
    fn gradient_internal_coeffs(&self) -> FvResult<Vec<T>>;

    /// 扩散项：面法向梯度的常数部分
    fn gradient_boundary_coeffs(&self) -> FvResult<Vec<T>>;

    /// 面法向梯度
    fn sn_grad(&self, internal: &[T]) -> Vec<T> {
        let patch = self.patch();
        self.values()
            .iter()
            .zip(patch.face_cells())
            .zip(patch.delta_coeffs())
            .map(|((&vf, &c), &dc)| (vf - internal[c]).scale(dc))
            .collect()
    }

    /// 是否与另一侧单元隐式耦合
    fn coupled(&self) -> bool {
        false
    }

    /// 是否固定面值
    fn fixes_value(&self) -> bool {
        false
    }

    /// 另一侧单元值（仅耦合边界片）
    fn patch_neighbour_values(&self) -> Option<&[T]> {
        None
    }

    /// 矩阵耦合接口（仅耦合边界片）
    fn as_interface(&self) -> Option<&dyn LduInterface> {
        None
    }

    /// 写回字典
    fn write(&self, dict: &mut Dictionary) -> FvResult<()>;

    /// 复制
    fn clone_box(&self) -> Box<dyn PatchField<T>>;
}

impl<T: FieldValue> Clone for Box<dyn PatchField<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ============================================================================
// 共享状态
// ============================================================================

/// 各边界条件共用的数据
#[derive(Debug, Clone)]
pub(crate) struct PatchBase<T> {
    pub(crate) mesh: Arc<FvMesh>,
    pub(crate) patch: usize,
    pub(crate) values: Vec<T>,
    pub(crate) state: PatchState,
}

impl<T: FieldValue> PatchBase<T> {
    pub(crate) fn new(mesh: &Arc<FvMesh>, patch: usize, values: Vec<T>) -> FvResult<Self> {
        let size = mesh.boundary()[patch].size();
        FvError::check_size(
            &format!("patch '{}' values", mesh.boundary()[patch].name()),
            size,
            values.len(),
        )?;
        Ok(Self {
            mesh: Arc::clone(mesh),
            patch,
            values,
            state: PatchState::Configured,
        })
    }

    pub(crate) fn fv_patch(&self) -> &FvPatch {
        &self.mesh.boundary()[self.patch]
    }

    pub(crate) fn size(&self) -> usize {
        self.values.len()
    }

    /// 相邻单元值
    pub(crate) fn internal_values(&self, internal: &[T]) -> Vec<T> {
        patch_internal_values(self.fv_patch(), internal)
    }

    pub(crate) fn uniform(&self, v: f64) -> Vec<T> {
        vec![T::splat(v); self.size()]
    }

    pub(crate) fn write_header(&self, dict: &mut Dictionary, type_name: &str) -> FvResult<()> {
        dict.set("type", type_name)?;
        Ok(())
    }

    pub(crate) fn write_values(&self, dict: &mut Dictionary, key: &str, values: &[T]) -> FvResult<()> {
        dict.set(key, fv_config::dictionary::field_to_json(values))?;
        Ok(())
    }
}

/// 为持有 `base: PatchBase<T>` 的类型实现访问方法
macro_rules! patch_base_access {
    () => {
        fn mesh(&self) -> &$crate::mesh::FvMesh {
            &self.base.mesh
        }

        fn patch_index(&self) -> usize {
            self.base.patch
        }

        fn values(&self) -> &[T] {
            &self.base.values
        }

        fn values_mut(&mut self) -> &mut [T] {
            &mut self.base.values
        }

        fn state(&self) -> $crate::boundary::PatchState {
            self.base.state
        }

        fn set_state(&mut self, state: $crate::boundary::PatchState) {
            self.base.state = state;
        }

        fn clone_box(&self) -> Box<dyn $crate::boundary::PatchField<T>> {
            Box::new(self.clone())
        }
    };
}
pub(crate) use patch_base_access;

/// 相邻单元值
pub fn patch_internal_values<T: FieldValue>(patch: &FvPatch, internal: &[T]) -> Vec<T> {
    patch.face_cells().iter().map(|&c| internal[c]).collect()
}

// ============================================================================
// 创建与注册
// ============================================================================

/// 约束型边界条件与边界片类型必须一致
fn check_patch_kind(kind: &PatchKind, type_name: &str, patch_name: &str) -> FvResult<()> {
    let required = match kind {
        PatchKind::Empty => Some("empty"),
        PatchKind::Processor { .. } => Some("processor"),
        _ => None,
    };
    match required {
        Some(req) if req != type_name => Err(FvError::invalid_config(
            format!("boundaryField.{patch_name}.type"),
            type_name,
            format!("{} 类型边界片只能使用 '{req}'", kind.type_name()),
        )),
        None if matches!(type_name, "empty" | "processor") => Err(FvError::invalid_config(
            format!("boundaryField.{patch_name}.type"),
            type_name,
            format!("'{type_name}' 需要同类型的边界片，实际为 {}", kind.type_name()),
        )),
        _ if type_name == "mapped" && !matches!(kind, PatchKind::Mapped { .. }) => {
            Err(FvError::invalid_config(
                format!("boundaryField.{patch_name}.type"),
                type_name,
                format!("'mapped' 需要 mapped 边界片，实际为 {}", kind.type_name()),
            ))
        }
        _ => Ok(()),
    }
}

/// 按字典中的 `type` 创建边界条件
pub fn new_patch_field<T: RegisteredType>(
    args: &PatchFieldArgs<'_, T>,
) -> FvResult<Box<dyn PatchField<T>>> {
    let type_name: String = args.dict.lookup("type")?;
    let patch = args.fv_patch();
    check_patch_kind(patch.kind(), &type_name, patch.name())?;
    let ctor = T::patch_fields().lookup(&type_name)?;
    let field = ctor(args)?;
    tracing::trace!(
        "{}.{}: {} ({} 面)",
        args.field_name,
        patch.name(),
        field.type_name(),
        patch.size()
    );
    Ok(field)
}

/// 约束型边界片的默认边界条件（字典可省略）
pub(crate) fn constraint_type(kind: &PatchKind) -> Option<&'static str> {
    match kind {
        PatchKind::Empty => Some("empty"),
        PatchKind::Processor { .. } => Some("processor"),
        _ => None,
    }
}

/// 注册值类型 `T` 的内置边界条件
pub fn register_builtin<T: RegisteredType>() -> FvResult<()> {
    let table = T::patch_fields();
    table.register("fixedValue", FixedValuePatchField::<T>::create)?;
    table.register("fixedGradient", FixedGradientPatchField::<T>::create)?;
    table.register("zeroGradient", ZeroGradientPatchField::<T>::create)?;
    table.register("mixed", MixedPatchField::<T>::create)?;
    table.register("calculated", CalculatedPatchField::<T>::create)?;
    table.register("empty", EmptyPatchField::<T>::create)?;
    table.register("processor", ProcessorPatchField::<T>::create)?;
    table.register("mapped", MappedPatchField::<T>::create)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_patch_kinds() {
        let proc = PatchKind::Processor {
            my_rank: 0,
            neighb_rank: 1,
            tag: 0,
        };
        assert!(check_patch_kind(&proc, "processor", "p").is_ok());
        assert!(check_patch_kind(&proc, "fixedValue", "p").is_err());
        assert!(check_patch_kind(&PatchKind::Empty, "empty", "e").is_ok());
        assert!(check_patch_kind(&PatchKind::Wall, "empty", "w").is_err());
        assert!(check_patch_kind(&PatchKind::Wall, "mapped", "w").is_err());
        assert!(check_patch_kind(&PatchKind::Patch, "mixed", "w").is_ok());
    }
}
