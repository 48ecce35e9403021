// crates/fv_config/src/solution.rs

//! `fvSolution` 字典
//!
//! - `solvers`: 每个场的线性求解器控制参数，键可以是模式；
//!   外迭代的最后一次使用 `<field>Final` 条目（不存在时回退到普通条目）
//! - `relaxationFactors`: `fields`（显式场松弛）与 `equations`（方程隐式松弛）
//! - `SIMPLE` / `PIMPLE`: 压力-速度耦合算法参数

use crate::dictionary::Dictionary;
use crate::error::{ConfigError, ConfigResult};
use crate::solver_controls::SolverControls;

/// 最后一次外迭代使用的后缀
pub const FINAL_SUFFIX: &str = "Final";

/// `fvSolution` 字典
#[derive(Debug, Clone, Default)]
pub struct FvSolution {
    dict: Dictionary,
}

impl FvSolution {
    /// 从字典创建
    pub fn new(dict: Dictionary) -> Self {
        Self { dict }
    }

    /// 底层字典
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// 场 `field` 的求解器控制参数
    pub fn solver_controls(&self, field: &str, final_iter: bool) -> ConfigResult<SolverControls> {
        let solvers = self.dict.sub_dict("solvers")?;

        let entry = if final_iter {
            match solvers.sub_dict_matching(&format!("{field}{FINAL_SUFFIX}"))? {
                Some(d) => Some(d),
                None => solvers.sub_dict_matching(field)?,
            }
        } else {
            solvers.sub_dict_matching(field)?
        };

        let entry = entry.ok_or_else(|| ConfigError::missing(solvers.scope(), field))?;
        let controls: SolverControls = serde_json::from_value(entry.to_value())
            .map_err(|e| ConfigError::invalid(entry.scope(), entry.to_value(), e.to_string()))?;
        controls.validate()?;
        Ok(controls)
    }

    fn relaxation_factor(&self, section: &str, name: &str, final_iter: bool) -> ConfigResult<Option<f64>> {
        let factors = self
            .dict
            .sub_dict_or_empty("relaxationFactors")?
            .sub_dict_or_empty(section)?;
        let key = if final_iter {
            format!("{name}{FINAL_SUFFIX}")
        } else {
            name.to_string()
        };
        match factors.select(&key) {
            Some((k, _)) => {
                let k = k.to_string();
                let alpha: f64 = factors.lookup(&k)?;
                if !(alpha > 0.0 && alpha <= 1.0) {
                    return Err(ConfigError::invalid(
                        format!("{}.{k}", factors.scope()),
                        alpha,
                        "松弛因子必须在 (0, 1] 内",
                    ));
                }
                Ok(Some(alpha))
            }
            None => Ok(None),
        }
    }

    /// 场松弛因子
    pub fn field_relaxation_factor(&self, name: &str, final_iter: bool) -> ConfigResult<Option<f64>> {
        self.relaxation_factor("fields", name, final_iter)
    }

    /// 方程松弛因子
    pub fn equation_relaxation_factor(&self, name: &str, final_iter: bool) -> ConfigResult<Option<f64>> {
        self.relaxation_factor("equations", name, final_iter)
    }

    /// 算法字典（`SIMPLE`、`PIMPLE`），缺失时为空字典
    pub fn algorithm(&self, name: &str) -> ConfigResult<Dictionary> {
        self.dict.sub_dict_or_empty(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn solution() -> FvSolution {
        FvSolution::new(
            Dictionary::from_value(
                "fvSolution",
                json!({
                    "solvers": {
                        "T": { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-8, "relTol": 0.1 },
                        "TFinal": { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-8 },
                        "(U|k)": { "solver": "smoothSolver", "smoother": "symGaussSeidel" }
                    },
                    "relaxationFactors": {
                        "equations": { "U": 0.7, ".*": 0.9 }
                    }
                }),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_final_entry_selected() {
        let s = solution();
        assert_eq!(s.solver_controls("T", false).unwrap().rel_tol, 0.1);
        assert_eq!(s.solver_controls("T", true).unwrap().rel_tol, 0.0);
        // 没有 kFinal 时回退到模式条目
        assert_eq!(s.solver_controls("k", true).unwrap().solver, "smoothSolver");
    }

    #[test]
    fn test_missing_field_entry() {
        let err = solution().solver_controls("p", false).unwrap_err();
        assert!(err.to_string().contains("fvSolution.solvers"));
    }

    #[test]
    fn test_relaxation_factors() {
        let s = solution();
        assert_eq!(s.equation_relaxation_factor("U", false).unwrap(), Some(0.7));
        assert_eq!(s.equation_relaxation_factor("T", false).unwrap(), Some(0.9));
        assert_eq!(s.field_relaxation_factor("p", false).unwrap(), None);
    }
}
