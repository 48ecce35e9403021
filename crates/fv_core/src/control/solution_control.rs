// crates/fv_core/src/control/solution_control.rs

//! SIMPLE / PIMPLE 外迭代控制
//!
//! ```json
//! "PIMPLE": {
//!     "nOuterCorrectors": 3,
//!     "residualControl": { "T": 1e-6, "(U|k)": 1e-4 }
//! }
//! ```
//!
//! 每个时间步内：
//!
//! 1. [`SolutionControl::loop_outer`] 开始一次外迭代
//! 2. 每次求解后 [`SolutionControl::record`] 记录该场在本次外迭代中的
//!    第一个初始残差
//! 3. 所有受控场都低于目标时提前结束；否则迭代到 `nOuterCorrectors`
//!
//! 最后一次外迭代使用 `Final` 求解器设置与松弛因子。

use std::collections::BTreeMap;

use fv_config::{Dictionary, FvSolution};
use fv_foundation::{FvError, FvResult};

use crate::matrix::SolverPerformance;

/// 外迭代控制
#[derive(Debug, Clone)]
pub struct SolutionControl {
    algorithm: String,
    solution: FvSolution,
    n_outer_correctors: usize,
    residual_control: Dictionary,
    corr: usize,
    first_residuals: BTreeMap<String, f64>,
    converged: bool,
}

/// 去掉分量后缀（`Ux` → `U`）的候选名
fn base_names(field: &str) -> [&str; 2] {
    for suffix in ["xx", "xy", "xz", "yx", "yy", "yz", "zx", "zy", "zz", "x", "y", "z"] {
        if let Some(base) = field.strip_suffix(suffix) {
            if !base.is_empty() {
                return [field, base];
            }
        }
    }
    [field, field]
}

impl SolutionControl {
    /// 读取 `fvSolution.<algorithm>`
    pub fn new(solution: &FvSolution, algorithm: &str) -> FvResult<Self> {
        if algorithm != "SIMPLE" && algorithm != "PIMPLE" {
            return Err(FvError::unknown_type(
                "solutionControl",
                algorithm,
                vec!["PIMPLE".to_string(), "SIMPLE".to_string()],
            ));
        }
        let dict = solution.algorithm(algorithm)?;
        let n_outer_correctors: usize = dict.lookup_or("nOuterCorrectors", 1)?;
        if n_outer_correctors == 0 {
            return Err(FvError::invalid_config(
                format!("{}.nOuterCorrectors", dict.scope()),
                "0",
                "至少需要一次外迭代",
            ));
        }
        let residual_control = dict.sub_dict_or_empty("residualControl")?;
        for key in residual_control.keys() {
            let _: f64 = residual_control.lookup(key)?;
        }
        Ok(Self {
            algorithm: algorithm.to_string(),
            solution: solution.clone(),
            n_outer_correctors,
            residual_control,
            corr: 0,
            first_residuals: BTreeMap::new(),
            converged: false,
        })
    }

    /// 算法名
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// 每个时间步的最大外迭代次数
    pub fn n_outer_correctors(&self) -> usize {
        self.n_outer_correctors
    }

    /// 当前外迭代序号（从 1 开始，循环外为 0）
    pub fn corr(&self) -> usize {
        self.corr
    }

    /// 是否为本时间步的第一次外迭代
    pub fn first_iter(&self) -> bool {
        self.corr == 1
    }

    /// 是否为本时间步的最后一次外迭代
    pub fn final_iter(&self) -> bool {
        self.corr >= self.n_outer_correctors
    }

    /// 上一时间步是否因残差控制提前结束
    pub fn converged_last_step(&self) -> bool {
        self.converged
    }

    /// 开始下一次外迭代；本时间步结束时返回 `false` 并复位
    pub fn loop_outer(&mut self) -> bool {
        if self.corr > 0 && self.converged() {
            tracing::info!(
                "{}: 第 {} 次外迭代后满足残差控制",
                self.algorithm,
                self.corr
            );
            self.converged = true;
            self.reset();
            return false;
        }
        if self.corr >= self.n_outer_correctors {
            self.converged = false;
            self.reset();
            return false;
        }
        self.corr += 1;
        self.first_residuals.clear();
        tracing::debug!("{}: 外迭代 {}/{}", self.algorithm, self.corr, self.n_outer_correctors);
        true
    }

    fn reset(&mut self) {
        self.corr = 0;
        self.first_residuals.clear();
    }

    /// 记录求解结果（每个场只保留本次外迭代的第一个初始残差）
    pub fn record(&mut self, perf: &SolverPerformance) {
        self.first_residuals
            .entry(perf.field_name().to_string())
            .or_insert(perf.initial_residual());
    }

    /// 本次外迭代记录到的初始残差
    pub fn residuals(&self) -> &BTreeMap<String, f64> {
        &self.first_residuals
    }

    fn target(&self, field: &str) -> Option<f64> {
        base_names(field).iter().find_map(|name| {
            let (key, _) = self.residual_control.select(name)?;
            self.residual_control.lookup::<f64>(key).ok()
        })
    }

    /// 所有受控且已求解的场都低于目标（至少一个受控场）
    pub fn converged(&self) -> bool {
        let mut checked = 0;
        for (field, &residual) in &self.first_residuals {
            if let Some(target) = self.target(field) {
                checked += 1;
                if residual > target {
                    return false;
                }
            }
        }
        checked > 0
    }

    /// 当前外迭代的场松弛因子
    pub fn field_relaxation_factor(&self, name: &str) -> FvResult<Option<f64>> {
        Ok(self.solution.field_relaxation_factor(name, self.final_iter())?)
    }

    /// 当前外迭代的方程松弛因子
    pub fn equation_relaxation_factor(&self, name: &str) -> FvResult<Option<f64>> {
        Ok(self.solution.equation_relaxation_factor(name, self.final_iter())?)
    }
}
