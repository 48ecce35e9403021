// crates/fv_core/src/solvers/mod.rs

//! 迭代线性求解器
//!
//! 三个运行时选择的抽象：
//!
//! - [`LduSolver`]: `diagonal`、`PCG`、`PBiCGStab`、`smoothSolver`
//! - [`LduPreconditioner`]: `none`、`diagonal`、`DIC`、`DILU`
//! - [`LduSmoother`]: `GaussSeidel`、`symGaussSeidel`、`DIC`、`DILU`
//!
//! 求解器面对的是 [`LduSystem`]（矩阵 + 耦合接口 + 通信器），所有内积与
//! 范数都是全局归约，因此同一份代码在单进程和多分区下行为一致。
//!
//! 残差归一化：
//!
//! ```text
//! normFactor = Σ(|Aψ − A·x̄| + |b − A·x̄|) + SMALL，x̄ 为 ψ 的全局平均
//! residual   = Σ|b − Aψ| / normFactor
//! ```

mod diagonal;
mod pbicgstab;
mod pcg;
mod preconditioner;
mod smooth_solver;
mod smoother;
mod system;
pub mod vector_ops;

use fv_config::SolverControls;
use fv_foundation::FvResult;

use crate::matrix::{LduMatrix, SolverPerformance};

pub use diagonal::DiagonalSolver;
pub use pbicgstab::PBiCGStab;
pub use pcg::Pcg;
pub use preconditioner::{
    DicPreconditioner, DiagonalPreconditioner, DiluPreconditioner, NoPreconditioner,
};
pub use smooth_solver::SmoothSolver;
pub use smoother::{GaussSeidelSmoother, PreconditionedSmoother, SymGaussSeidelSmoother};
pub use system::{IterationControl, LduSystem};

/// 线性求解器
pub trait LduSolver: Send {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 原地求解 `A·ψ = source`
    fn solve(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
    ) -> FvResult<SolverPerformance>;
}

/// 预条件器：`w = M⁻¹·r`
pub trait LduPreconditioner: Send {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 作用于残差
    fn precondition(&self, w_a: &mut [f64], r_a: &[f64]);
}

/// 光顺器
pub trait LduSmoother: Send {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 执行 `n_sweeps` 次扫描
    fn smooth(
        &mut self,
        system: &LduSystem<'_>,
        psi: &mut [f64],
        source: &[f64],
        n_sweeps: usize,
    ) -> FvResult<()>;
}

/// 求解器构造函数：(场名, 控制参数)
pub type SolverCtor = fn(&str, &SolverControls) -> FvResult<Box<dyn LduSolver>>;

/// 预条件器构造函数
pub type PreconditionerCtor = fn(&LduMatrix, &SolverControls) -> FvResult<Box<dyn LduPreconditioner>>;

/// 光顺器构造函数
pub type SmootherCtor = fn(&LduMatrix, &SolverControls) -> FvResult<Box<dyn LduSmoother>>;

/// 按控制参数创建求解器
pub fn new_solver(field_name: &str, controls: &SolverControls) -> FvResult<Box<dyn LduSolver>> {
    let ctor = crate::registry::solvers().lookup(&controls.solver)?;
    ctor(field_name, controls)
}

/// 按控制参数创建预条件器
pub fn new_preconditioner(
    matrix: &LduMatrix,
    controls: &SolverControls,
) -> FvResult<Box<dyn LduPreconditioner>> {
    let ctor = crate::registry::preconditioners().lookup(&controls.preconditioner)?;
    ctor(matrix, controls)
}

/// 按控制参数创建光顺器
pub fn new_smoother(matrix: &LduMatrix, controls: &SolverControls) -> FvResult<Box<dyn LduSmoother>> {
    let ctor = crate::registry::smoothers().lookup(&controls.smoother)?;
    ctor(matrix, controls)
}

/// 注册内置求解器、预条件器与光顺器
pub(crate) fn register_builtin() -> FvResult<()> {
    let solvers = crate::registry::solvers();
    solvers.register("diagonal", DiagonalSolver::create)?;
    solvers.register("PCG", Pcg::create)?;
    solvers.register("PBiCGStab", PBiCGStab::create)?;
    solvers.register("smoothSolver", SmoothSolver::create)?;

    let preconditioners = crate::registry::preconditioners();
    preconditioners.register("none", NoPreconditioner::create)?;
    preconditioners.register("diagonal", DiagonalPreconditioner::create)?;
    preconditioners.register("DIC", DicPreconditioner::create)?;
    preconditioners.register("DILU", DiluPreconditioner::create)?;

    let smoothers = crate::registry::smoothers();
    smoothers.register("GaussSeidel", GaussSeidelSmoother::create)?;
    smoothers.register("symGaussSeidel", SymGaussSeidelSmoother::create)?;
    smoothers.register("DIC", PreconditionedSmoother::create_dic)?;
    smoothers.register("DILU", PreconditionedSmoother::create_dilu)?;
    Ok(())
}
