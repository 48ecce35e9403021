// apps/fv_cli/src/commands/validate.rs

//! 算例校验
//!
//! 在不推进时间的情况下完成一次完整的初始化：读取网格与场、创建边界条件、
//! 离散格式、粘性模型与线性求解器。任何未注册的类型名或缺失的键都在这里报告。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use fv_config::CaseConfig;
use fv_core::parallel::SerialCommunicator;
use fv_foundation::Vector;
use tracing::{error, info, warn};

use super::run::{block_mesh, build_mesh};
use crate::transport::ScalarTransport;

/// 校验参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 算例文件
    #[arg(short, long)]
    pub case: PathBuf,

    /// 计划使用的分区数
    #[arg(short, long, default_value = "1")]
    pub partitions: usize,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 校验结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行校验命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== FinVol 算例校验: {} ===", args.case.display());
    let mut result = ValidationResult::default();

    match CaseConfig::from_file(&args.case) {
        Ok(case) => validate_case(&case, args.partitions, &mut result),
        Err(e) => result.add_error(format!("无法加载算例: {e}")),
    }

    print_validation_result(&result, args.strict)
}

fn validate_case(case: &CaseConfig, partitions: usize, result: &mut ValidationResult) {
    let block = match block_mesh(case) {
        Ok(b) => b,
        Err(e) => {
            result.add_error(format!("{e:#}"));
            return;
        }
    };
    println!("  ✓ 网格 {:?} 单元", block.cells);

    if partitions > 1 {
        if let Err(e) = block.decompose_x(partitions) {
            result.add_error(format!("无法切分为 {partitions} 个分区: {e}"));
        }
    }

    let mesh = match block
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|poly| build_mesh(case, poly, Arc::new(SerialCommunicator)))
    {
        Ok(m) => m,
        Err(e) => {
            result.add_error(format!("{e:#}"));
            return;
        }
    };

    match ScalarTransport::new(case, &mesh) {
        Ok(_) => println!("  ✓ 场、边界条件、格式与求解器设置有效"),
        Err(e) => result.add_error(format!("{e:#}")),
    }

    check_courant(case, &block.cells, &block.extent, result);

    let control = case.control();
    if control.write_interval > control.n_steps() {
        result.add_warning(format!(
            "writeInterval = {} 超过总步数 {}，只在结束时输出",
            control.write_interval,
            control.n_steps()
        ));
    }
}

/// 均匀速度下的 Courant 数
fn check_courant(case: &CaseConfig, cells: &[usize; 3], extent: &[f64; 3], result: &mut ValidationResult) {
    let velocity: Vector = match case.physical_properties() {
        Ok(p) if p.found("U") => match p.lookup_field_value("U") {
            Ok(u) => u,
            Err(e) => {
                result.add_error(e.to_string());
                return;
            }
        },
        _ => {
            result.add_warning("physicalProperties 未给出 U，只计算扩散");
            return;
        }
    };
    let dt = case.control().delta_t;
    let courant = (0..3)
        .filter(|&d| cells[d] > 1)
        .map(|d| velocity[d].abs() * dt * cells[d] as f64 / extent[d])
        .fold(0.0, f64::max);
    if courant > 1.0 {
        result.add_warning(format!("Courant 数 {courant:.3} 大于 1，瞬态精度可能不足"));
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 校验结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("{}", err);
            println!("  ✗ {}", err);
        }
    }

    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("{}", warning);
            println!("  ⚠ {}", warning);
        }
    }

    if result.is_ok(strict) {
        println!("\n✓ 校验通过");
        Ok(())
    } else {
        println!("\n✗ 校验失败");
        bail!(
            "校验失败：{} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_config::Dictionary;
    use serde_json::json;

    fn case(scheme: &str) -> CaseConfig {
        let root = Dictionary::from_value(
            "case",
            json!({
                "controlDict": { "endTime": 1.0, "deltaT": 0.1 },
                "mesh": { "cells": [10, 1, 1], "extent": [1.0, 1.0, 1.0],
                          "patches": { "ymin": "empty", "ymax": "empty", "zmin": "empty", "zmax": "empty" } },
                "physicalProperties": { "nu": 0.01, "U": [1.0, 0.0, 0.0] },
                "fields": {
                    "T": {
                        "internalField": 0.0,
                        "boundaryField": {
                            "xmin": { "type": "fixedValue", "value": 1.0 },
                            "xmax": { "type": "zeroGradient" }
                        }
                    }
                },
                "fvSchemes": {
                    "ddtSchemes": { "default": "Euler" },
                    "gradSchemes": { "default": "Gauss linear" },
                    "divSchemes": { "default": scheme },
                    "laplacianSchemes": { "default": "Gauss linear corrected" },
                    "interpolationSchemes": { "default": "linear" },
                    "snGradSchemes": { "default": "corrected" }
                },
                "fvSolution": {
                    "solvers": { "T.*": { "solver": "PBiCGStab", "preconditioner": "DILU" } }
                }
            }),
        )
        .unwrap();
        CaseConfig::from_dict(root).unwrap()
    }

    #[test]
    fn test_valid_case_passes() {
        fv_core::registry::initialise().unwrap();
        let mut result = ValidationResult::default();
        validate_case(&case("Gauss upwind"), 2, &mut result);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.is_ok(false));
    }

    #[test]
    fn test_unknown_scheme_reported() {
        fv_core::registry::initialise().unwrap();
        let mut result = ValidationResult::default();
        validate_case(&case("Gauss QUICK"), 1, &mut result);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("QUICK"));
    }

    #[test]
    fn test_too_many_partitions() {
        fv_core::registry::initialise().unwrap();
        let mut result = ValidationResult::default();
        validate_case(&case("Gauss upwind"), 11, &mut result);
        assert!(!result.is_ok(false));
    }
}
