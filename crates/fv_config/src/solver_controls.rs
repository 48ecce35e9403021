// crates/fv_config/src/solver_controls.rs

//! 线性求解器控制参数
//!
//! 对应 `fvSolution.solvers` 中每个场的条目：
//!
//! ```json
//! "T": {
//!     "solver": "PCG",
//!     "preconditioner": "DIC",
//!     "tolerance": 1e-8,
//!     "relTol": 0.01,
//!     "maxIter": 500
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// 线性求解器控制参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverControls {
    /// 求解器类型名
    pub solver: String,
    /// 预条件器类型名
    #[serde(default = "default_preconditioner")]
    pub preconditioner: String,
    /// 光顺器类型名（smoothSolver 使用）
    #[serde(default = "default_smoother")]
    pub smoother: String,
    /// 绝对收敛容差（归一化残差）
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// 相对收敛容差（相对初始残差），0 表示不使用
    #[serde(default)]
    pub rel_tol: f64,
    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// 最小迭代次数
    #[serde(default)]
    pub min_iter: usize,
    /// 每次光顺的扫描次数
    #[serde(default = "default_n_sweeps")]
    pub n_sweeps: usize,
    /// 发散判据：最终残差超过初始残差的该倍数即视为发散
    #[serde(default = "default_divergence_factor")]
    pub divergence_factor: f64,
}

fn default_preconditioner() -> String {
    "none".into()
}

fn default_smoother() -> String {
    "GaussSeidel".into()
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iter() -> usize {
    1000
}

fn default_n_sweeps() -> usize {
    1
}

fn default_divergence_factor() -> f64 {
    1e5
}

impl SolverControls {
    /// 以默认参数创建指定求解器
    pub fn new(solver: impl Into<String>) -> Self {
        Self {
            solver: solver.into(),
            preconditioner: default_preconditioner(),
            smoother: default_smoother(),
            tolerance: default_tolerance(),
            rel_tol: 0.0,
            max_iter: default_max_iter(),
            min_iter: 0,
            n_sweeps: default_n_sweeps(),
            divergence_factor: default_divergence_factor(),
        }
    }

    /// 设置预条件器
    pub fn with_preconditioner(mut self, name: impl Into<String>) -> Self {
        self.preconditioner = name.into();
        self
    }

    /// 设置光顺器
    pub fn with_smoother(mut self, name: impl Into<String>) -> Self {
        self.smoother = name.into();
        self
    }

    /// 设置容差
    pub fn with_tolerance(mut self, tolerance: f64, rel_tol: f64) -> Self {
        self.tolerance = tolerance;
        self.rel_tol = rel_tol;
        self
    }

    /// 设置迭代次数范围
    pub fn with_iterations(mut self, min_iter: usize, max_iter: usize) -> Self {
        self.min_iter = min_iter;
        self.max_iter = max_iter;
        self
    }

    /// 校验参数
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.tolerance >= 0.0) {
            return Err(ConfigError::invalid("tolerance", self.tolerance, "必须非负"));
        }
        if !(0.0..1.0).contains(&self.rel_tol) {
            return Err(ConfigError::invalid("relTol", self.rel_tol, "必须在 [0, 1) 内"));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::invalid("maxIter", self.max_iter, "必须为正"));
        }
        if self.min_iter > self.max_iter {
            return Err(ConfigError::invalid(
                "minIter",
                self.min_iter,
                format!("不能大于 maxIter={}", self.max_iter),
            ));
        }
        if !(self.divergence_factor > 1.0) {
            return Err(ConfigError::invalid(
                "divergenceFactor",
                self.divergence_factor,
                "必须大于 1",
            ));
        }
        Ok(())
    }
}
