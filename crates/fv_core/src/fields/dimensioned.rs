// crates/fv_core/src/fields/dimensioned.rs

//! 带量纲的标量

use serde::{Deserialize, Serialize};

use fv_config::Dictionary;
use fv_foundation::{DimensionSet, FvResult};

/// 带量纲的标量常数（如扩散系数 `DT`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionedScalar {
    /// 名称
    pub name: String,
    /// 量纲
    pub dimensions: DimensionSet,
    /// 值
    pub value: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionedEntry {
    Plain(f64),
    Full {
        dimensions: DimensionSet,
        value: f64,
    },
}

impl DimensionedScalar {
    /// 创建
    pub fn new(name: impl Into<String>, dimensions: DimensionSet, value: f64) -> Self {
        Self {
            name: name.into(),
            dimensions,
            value,
        }
    }

    /// 无量纲标量
    pub fn dimensionless(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, DimensionSet::DIMLESS, value)
    }

    /// 从字典读取
    ///
    /// 条目可写作纯数字（采用期望量纲），或 `{"dimensions": [...], "value": x}`，
    /// 后者的量纲必须与期望一致。
    pub fn lookup(dict: &Dictionary, key: &str, expected: DimensionSet) -> FvResult<Self> {
        let entry: DimensionedEntry = dict.lookup(key)?;
        match entry {
            DimensionedEntry::Plain(value) => Ok(Self::new(key, expected, value)),
            DimensionedEntry::Full { dimensions, value } => {
                dimensions.check_same(&expected, &format!("{}.{}", dict.scope(), key))?;
                Ok(Self::new(key, dimensions, value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::FvError;
    use serde_json::json;

    #[test]
    fn test_lookup_plain_and_full() {
        let dict = Dictionary::from_value(
            "physicalProperties",
            json!({
                "DT": 0.01,
                "nu": { "dimensions": [0, 2, -1, 0, 0, 0, 0], "value": 1e-5 }
            }),
        )
        .unwrap();
        let dt = DimensionedScalar::lookup(&dict, "DT", DimensionSet::KINEMATIC_VISCOSITY).unwrap();
        assert_eq!(dt.value, 0.01);
        let nu = DimensionedScalar::lookup(&dict, "nu", DimensionSet::KINEMATIC_VISCOSITY).unwrap();
        assert_eq!(nu.dimensions, DimensionSet::KINEMATIC_VISCOSITY);

        let err = DimensionedScalar::lookup(&dict, "nu", DimensionSet::VELOCITY).unwrap_err();
        assert!(matches!(err, FvError::DimensionMismatch { .. }));
    }
}
