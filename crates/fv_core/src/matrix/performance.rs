// crates/fv_core/src/matrix/performance.rs

//! 求解性能报告
//!
//! 每次线性求解返回一个不可变的 [`SolverPerformance`]。不收敛和发散是数据
//! 而不是错误，由外迭代决定如何处理。

use std::fmt;

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// 收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterations,
    /// 发散（残差超过初始残差的 divergenceFactor 倍）
    Diverged,
    /// 矩阵奇异
    Singular,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::MaxIterations => "max iterations",
            Self::Diverged => "diverged",
            Self::Singular => "singular",
        };
        f.write_str(s)
    }
}

/// 求解性能
#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    solver_name: String,
    field_name: String,
    initial_residual: f64,
    final_residual: f64,
    n_iterations: usize,
    status: SolverStatus,
}

impl SolverPerformance {
    /// 创建
    pub fn new(
        solver_name: impl Into<String>,
        field_name: impl Into<String>,
        initial_residual: f64,
        final_residual: f64,
        n_iterations: usize,
        status: SolverStatus,
    ) -> Self {
        Self {
            solver_name: solver_name.into(),
            field_name: field_name.into(),
            initial_residual,
            final_residual,
            n_iterations,
            status,
        }
    }

    /// 求解器名
    pub fn solver_name(&self) -> &str {
        &self.solver_name
    }

    /// 场名（分离求解时带分量后缀，如 `Ux`）
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// 初始残差
    pub fn initial_residual(&self) -> f64 {
        self.initial_residual
    }

    /// 最终残差
    pub fn final_residual(&self) -> f64 {
        self.final_residual
    }

    /// 迭代次数
    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    /// 状态
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// 是否收敛
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// 是否奇异
    pub fn singular(&self) -> bool {
        self.status == SolverStatus::Singular
    }

    /// 是否发散
    pub fn diverged(&self) -> bool {
        self.status == SolverStatus::Diverged
    }

    /// 替换场名
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// 合并分量结果：取初始残差最大的分量
    pub fn max(self, other: SolverPerformance) -> SolverPerformance {
        if other.initial_residual > self.initial_residual {
            other
        } else {
            self
        }
    }

    /// 写日志：收敛为 info，其余为 warn
    pub fn log(&self) {
        if self.converged() {
            tracing::info!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
    }
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:  Solving for {}, Initial residual = {:.6e}, Final residual = {:.6e}, No Iterations {} ({})",
            self.solver_name,
            self.field_name,
            self.initial_residual,
            self.final_residual,
            self.n_iterations,
            self.status
        )
    }
}
