// crates/fv_config/src/case.rs

//! 算例文件
//!
//! 一个算例是一个 JSON 文件，顶层字典：
//!
//! | 键 | 内容 |
//! |---|---|
//! | `controlDict` | 时间控制 |
//! | `mesh` | 结构化块网格描述 |
//! | `fields` | 每个场的量纲、内部值与边界条件 |
//! | `physicalProperties` | 物性参数 |
//! | `momentumTransport` | 湍流/粘性子模型选择（可选） |
//! | `fvSchemes` | 离散格式 |
//! | `fvSolution` | 求解器与算法控制 |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{ConfigError, ConfigResult};
use crate::schemes::FvSchemes;
use crate::solution::FvSolution;

/// 必需的顶层字典
const REQUIRED_SECTIONS: [&str; 5] = ["controlDict", "mesh", "fields", "fvSchemes", "fvSolution"];

/// 时间控制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDict {
    /// 起始时间
    #[serde(default)]
    pub start_time: f64,
    /// 结束时间
    pub end_time: f64,
    /// 时间步长
    pub delta_t: f64,
    /// 每隔多少步输出一次，0 表示只在结束时输出
    #[serde(default)]
    pub write_interval: usize,
}

impl ControlDict {
    /// 校验
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.delta_t > 0.0) {
            return Err(ConfigError::invalid("controlDict.deltaT", self.delta_t, "必须为正"));
        }
        if self.end_time < self.start_time {
            return Err(ConfigError::invalid(
                "controlDict.endTime",
                self.end_time,
                format!("不能小于 startTime={}", self.start_time),
            ));
        }
        Ok(())
    }

    /// 计算步数
    pub fn n_steps(&self) -> usize {
        ((self.end_time - self.start_time) / self.delta_t - 1e-9).ceil().max(0.0) as usize
    }
}

/// 算例配置
#[derive(Debug, Clone)]
pub struct CaseConfig {
    root: Dictionary,
    control: ControlDict,
}

impl CaseConfig {
    /// 从顶层字典创建并校验
    pub fn from_dict(root: Dictionary) -> ConfigResult<Self> {
        for section in REQUIRED_SECTIONS {
            if !root.is_dict(section) {
                return Err(ConfigError::missing(root.scope(), section));
            }
        }
        let control: ControlDict = root.lookup("controlDict")?;
        control.validate()?;
        Ok(Self { root, control })
    }

    /// 从文件加载
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let root = Dictionary::from_file(path)?;
        Self::from_dict(root)
    }

    /// 保存到文件
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self.root.to_value())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 顶层字典
    pub fn root(&self) -> &Dictionary {
        &self.root
    }

    /// 时间控制
    pub fn control(&self) -> &ControlDict {
        &self.control
    }

    /// 网格描述
    pub fn mesh(&self) -> ConfigResult<Dictionary> {
        self.root.sub_dict("mesh")
    }

    /// 场字典
    pub fn fields(&self) -> ConfigResult<Dictionary> {
        self.root.sub_dict("fields")
    }

    /// 物性参数
    pub fn physical_properties(&self) -> ConfigResult<Dictionary> {
        self.root.sub_dict_or_empty("physicalProperties")
    }

    /// 子模型选择
    pub fn momentum_transport(&self) -> ConfigResult<Dictionary> {
        self.root.sub_dict_or_empty("momentumTransport")
    }

    /// 离散格式
    pub fn fv_schemes(&self) -> ConfigResult<FvSchemes> {
        Ok(FvSchemes::new(self.root.sub_dict("fvSchemes")?))
    }

    /// 求解控制
    pub fn fv_solution(&self) -> ConfigResult<FvSolution> {
        Ok(FvSolution::new(self.root.sub_dict("fvSolution")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "controlDict": { "endTime": 1.0, "deltaT": 0.25 },
            "mesh": {},
            "fields": {},
            "fvSchemes": {},
            "fvSolution": {}
        })
    }

    #[test]
    fn test_from_dict() {
        let case = CaseConfig::from_dict(Dictionary::from_value("case", minimal()).unwrap()).unwrap();
        assert_eq!(case.control().n_steps(), 4);
        assert_eq!(case.control().write_interval, 0);
        assert!(case.physical_properties().unwrap().is_empty());
    }

    #[test]
    fn test_missing_section() {
        let mut v = minimal();
        v.as_object_mut().unwrap().remove("fvSolution");
        let err = CaseConfig::from_dict(Dictionary::from_value("case", v).unwrap()).unwrap_err();
        assert!(err.to_string().contains("fvSolution"));
    }

    #[test]
    fn test_invalid_delta_t() {
        let mut v = minimal();
        v["controlDict"]["deltaT"] = json!(0.0);
        assert!(CaseConfig::from_dict(Dictionary::from_value("case", v).unwrap()).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let case = CaseConfig::from_dict(Dictionary::from_value("case", minimal()).unwrap()).unwrap();
        let path = std::env::temp_dir().join("fv_config_case_roundtrip.json");
        case.save_to_file(&path).unwrap();
        let loaded = CaseConfig::from_file(&path).unwrap();
        assert_eq!(loaded.control(), case.control());
        let _ = std::fs::remove_file(path);
    }
}
