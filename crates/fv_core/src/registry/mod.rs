// crates/fv_core/src/registry/mod.rs

//! 运行时选择表
//!
//! 每个抽象类别一张表，按名称映射到构造函数。表是进程级静态量：
//!
//! 1. [`initialise`] 注册全部内置类型并封存（幂等）
//! 2. 封存之前任何查找都返回 `RegistryNotReady`（显式就绪屏障）
//! 3. 封存之后表只读，注册返回 `RegistrySealed`
//!
//! 应用可通过 [`initialise_with`] 在封存前加入自己的类型。
//!
//! ```
//! use fv_core::registry;
//!
//! registry::initialise().unwrap();
//! assert!(registry::solvers().contains("PCG"));
//! let err = registry::solvers().lookup("GAMG").unwrap_err();
//! assert!(err.to_string().contains("GAMG"));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use parking_lot::{Mutex, RwLock};

use fv_foundation::{FieldValue, FvError, FvResult, Tensor, Vector};

use crate::boundary::PatchFieldCtor;
use crate::models::TurbulenceCtor;
use crate::schemes::{DdtCtor, GradCtor, InterpolationCtor, SnGradCtor};
use crate::solvers::{PreconditionerCtor, SmootherCtor, SolverCtor};

/// 按名称的构造函数表
pub struct SelectionTable<C: Copy + 'static> {
    category: String,
    entries: RwLock<BTreeMap<String, C>>,
    sealed: AtomicBool,
}

impl<C: Copy + 'static> std::fmt::Debug for SelectionTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionTable")
            .field("category", &self.category)
            .field("names", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl<C: Copy + 'static> SelectionTable<C> {
    /// 创建空表
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            entries: RwLock::new(BTreeMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// 类别名
    pub fn category(&self) -> &str {
        &self.category
    }

    /// 注册构造函数
    ///
    /// # 错误
    ///
    /// - 已封存: `RegistrySealed`
    /// - 同名已注册: `DuplicateEntry`
    pub fn register(&self, name: &str, ctor: C) -> FvResult<()> {
        if self.is_sealed() {
            return Err(FvError::RegistrySealed {
                category: self.category.clone(),
                name: name.to_string(),
            });
        }
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(FvError::DuplicateEntry {
                category: self.category.clone(),
                name: name.to_string(),
            });
        }
        entries.insert(name.to_string(), ctor);
        tracing::trace!("注册 {}: {}", self.category, name);
        Ok(())
    }

    /// 封存（之后只读）
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// 是否已封存
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// 查找构造函数
    ///
    /// # 错误
    ///
    /// - 未封存: `RegistryNotReady`
    /// - 未注册: `UnknownType`，列出已注册名称
    pub fn lookup(&self, name: &str) -> FvResult<C> {
        if !self.is_sealed() {
            return Err(FvError::RegistryNotReady {
                category: self.category.clone(),
            });
        }
        self.entries
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| FvError::unknown_type(&self.category, name, self.names()))
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// 已注册名称（字典序）
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

// ============================================================================
// 按值类型区分的表
// ============================================================================

/// 值类型相关的选择表
pub trait RegisteredType: FieldValue {
    /// 边界条件表 `fvPatchField<T>`
    fn patch_fields() -> &'static SelectionTable<PatchFieldCtor<Self>>;

    /// 时间格式表 `ddtScheme<T>`
    fn ddt_schemes() -> &'static SelectionTable<DdtCtor<Self>>;

    /// 插值格式表 `surfaceInterpolationScheme<T>`
    fn interpolation_schemes() -> &'static SelectionTable<InterpolationCtor<Self>>;
}

macro_rules! registered_type {
    ($t:ty, $name:literal) => {
        impl RegisteredType for $t {
            fn patch_fields() -> &'static SelectionTable<PatchFieldCtor<Self>> {
                static TABLE: OnceLock<SelectionTable<PatchFieldCtor<$t>>> = OnceLock::new();
                TABLE.get_or_init(|| SelectionTable::new(concat!("fvPatchField<", $name, ">")))
            }

            fn ddt_schemes() -> &'static SelectionTable<DdtCtor<Self>> {
                static TABLE: OnceLock<SelectionTable<DdtCtor<$t>>> = OnceLock::new();
                TABLE.get_or_init(|| SelectionTable::new(concat!("ddtScheme<", $name, ">")))
            }

            fn interpolation_schemes() -> &'static SelectionTable<InterpolationCtor<Self>> {
                static TABLE: OnceLock<SelectionTable<InterpolationCtor<$t>>> = OnceLock::new();
                TABLE.get_or_init(|| {
                    SelectionTable::new(concat!("surfaceInterpolationScheme<", $name, ">"))
                })
            }
        }
    };
}

registered_type!(f64, "scalar");
registered_type!(Vector, "vector");
registered_type!(Tensor, "tensor");

macro_rules! global_table {
    ($(#[$doc:meta])* $fn_name:ident, $ctor:ty, $category:literal) => {
        $(#[$doc])*
        pub fn $fn_name() -> &'static SelectionTable<$ctor> {
            static TABLE: OnceLock<SelectionTable<$ctor>> = OnceLock::new();
            TABLE.get_or_init(|| SelectionTable::new($category))
        }
    };
}

global_table!(
    /// 线性求解器表
    solvers, SolverCtor, "lduMatrix::solver"
);
global_table!(
    /// 预条件器表
    preconditioners, PreconditionerCtor, "lduMatrix::preconditioner"
);
global_table!(
    /// 光顺器表
    smoothers, SmootherCtor, "lduMatrix::smoother"
);
global_table!(
    /// 面法向梯度格式表
    sn_grad_schemes, SnGradCtor, "snGradScheme"
);
global_table!(
    /// 梯度格式表
    grad_schemes, GradCtor, "gradScheme"
);
global_table!(
    /// 湍流（粘性）模型表
    turbulence_models, TurbulenceCtor, "turbulenceModel"
);

// ============================================================================
// 初始化
// ============================================================================

fn init_state() -> &'static Mutex<bool> {
    static INIT: OnceLock<Mutex<bool>> = OnceLock::new();
    INIT.get_or_init(|| Mutex::new(false))
}

fn register_value_type<T: RegisteredType>() -> FvResult<()> {
    crate::boundary::register_builtin::<T>()?;
    crate::schemes::register_value_type::<T>()
}

fn register_all() -> FvResult<()> {
    register_value_type::<f64>()?;
    register_value_type::<Vector>()?;
    register_value_type::<Tensor>()?;
    crate::schemes::register_builtin()?;
    crate::solvers::register_builtin()?;
    crate::models::register_builtin()
}

fn seal_value_type<T: RegisteredType>() {
    T::patch_fields().seal();
    T::ddt_schemes().seal();
    T::interpolation_schemes().seal();
}

fn seal_all() {
    seal_value_type::<f64>();
    seal_value_type::<Vector>();
    seal_value_type::<Tensor>();
    solvers().seal();
    preconditioners().seal();
    smoothers().seal();
    sn_grad_schemes().seal();
    grad_schemes().seal();
    turbulence_models().seal();
}

/// 注册全部内置类型并封存（可重复调用）
pub fn initialise() -> FvResult<()> {
    let mut done = init_state().lock();
    if *done {
        return Ok(());
    }
    register_all()?;
    seal_all();
    *done = true;
    tracing::debug!("运行时选择表已就绪");
    Ok(())
}

/// 注册内置类型与应用自定义类型，然后封存
///
/// # 错误
///
/// 已经初始化过时返回 `RegistrySealed`。
pub fn initialise_with<F>(extra: F) -> FvResult<()>
where
    F: FnOnce() -> FvResult<()>,
{
    let mut done = init_state().lock();
    if *done {
        return Err(FvError::RegistrySealed {
            category: "registry".into(),
            name: "initialise_with".into(),
        });
    }
    register_all()?;
    extra()?;
    seal_all();
    *done = true;
    tracing::debug!("运行时选择表已就绪（含自定义类型）");
    Ok(())
}

/// 是否已初始化
pub fn is_initialised() -> bool {
    *init_state().lock()
}

/// 全部类别及其已注册名称
pub fn catalogue() -> Vec<(String, Vec<String>)> {
    fn entry<C: Copy + 'static>(t: &SelectionTable<C>) -> (String, Vec<String>) {
        (t.category().to_string(), t.names())
    }
    vec![
        entry(<f64 as RegisteredType>::patch_fields()),
        entry(<Vector as RegisteredType>::patch_fields()),
        entry(<Tensor as RegisteredType>::patch_fields()),
        entry(<f64 as RegisteredType>::ddt_schemes()),
        entry(<Vector as RegisteredType>::ddt_schemes()),
        entry(<Tensor as RegisteredType>::ddt_schemes()),
        entry(<f64 as RegisteredType>::interpolation_schemes()),
        entry(<Vector as RegisteredType>::interpolation_schemes()),
        entry(<Tensor as RegisteredType>::interpolation_schemes()),
        entry(sn_grad_schemes()),
        entry(grad_schemes()),
        entry(solvers()),
        entry(preconditioners()),
        entry(smoothers()),
        entry(turbulence_models()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    type Ctor = fn() -> u32;

    fn one() -> u32 {
        1
    }

    fn two() -> u32 {
        2
    }

    #[test]
    fn test_lookup_requires_seal() {
        let table: SelectionTable<Ctor> = SelectionTable::new("test");
        table.register("one", one).unwrap();
        assert!(matches!(
            table.lookup("one"),
            Err(FvError::RegistryNotReady { .. })
        ));
        table.seal();
        assert_eq!(table.lookup("one").unwrap()(), 1);
    }

    #[test]
    fn test_duplicate_and_sealed_rejected() {
        let table: SelectionTable<Ctor> = SelectionTable::new("test");
        table.register("one", one).unwrap();
        assert!(matches!(
            table.register("one", two),
            Err(FvError::DuplicateEntry { .. })
        ));
        table.seal();
        assert!(matches!(
            table.register("two", two),
            Err(FvError::RegistrySealed { .. })
        ));
    }

    #[test]
    fn test_unknown_lists_available() {
        let table: SelectionTable<Ctor> = SelectionTable::new("test");
        table.register("b", two).unwrap();
        table.register("a", one).unwrap();
        table.seal();
        match table.lookup("c") {
            Err(FvError::UnknownType {
                category,
                name,
                available,
            }) => {
                assert_eq!(category, "test");
                assert_eq!(name, "c");
                assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_initialise_idempotent() {
        initialise().unwrap();
        initialise().unwrap();
        assert!(is_initialised());
        assert!(initialise_with(|| Ok(())).is_err());
        assert!(<f64 as RegisteredType>::patch_fields().contains("fixedValue"));
    }
}
