// crates/fv_core/src/models/mod.rs

//! 可替换的物理子模型
//!
//! 目前只有粘性（湍流）模型一个类别，由 `momentumTransport.model` 选择。

mod turbulence;

pub use turbulence::{
    new_turbulence_model, ConstantEddyViscosity, Laminar, TurbulenceCtor, TurbulenceModel,
};

use fv_foundation::FvResult;

/// 注册内置子模型
pub(crate) fn register_builtin() -> FvResult<()> {
    let table = crate::registry::turbulence_models();
    table.register("laminar", Laminar::create)?;
    table.register("constantEddyViscosity", ConstantEddyViscosity::create)
}
