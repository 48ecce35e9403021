// crates/fv_config/src/dictionary.rs

//! 配置字典
//!
//! 对 JSON 对象的薄封装：保留键的配置顺序，并记录作用域路径
//! （如 `fvSolution.solvers.T`），缺失键或类型错误时在错误信息中给出完整路径。
//!
//! ```
//! use fv_config::Dictionary;
//! use serde_json::json;
//!
//! let dict = Dictionary::from_value("fvSolution", json!({
//!     "solvers": { "T": { "solver": "PCG", "tolerance": 1e-8 } }
//! })).unwrap();
//!
//! let t = dict.sub_dict("solvers").unwrap().sub_dict("T").unwrap();
//! assert_eq!(t.scope(), "fvSolution.solvers.T");
//! let tol: f64 = t.lookup("tolerance").unwrap();
//! assert_eq!(tol, 1e-8);
//! ```

use std::path::Path;

use fv_foundation::FieldValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::pattern::select_key;

/// 配置字典
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    scope: String,
    entries: Map<String, Value>,
}

impl Dictionary {
    /// 创建空字典
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: Map::new(),
        }
    }

    /// 从 JSON 值创建，值必须是对象
    pub fn from_value(scope: impl Into<String>, value: Value) -> ConfigResult<Self> {
        let scope = scope.into();
        match value {
            Value::Object(entries) => Ok(Self { scope, entries }),
            other => Err(ConfigError::invalid(scope, other, "期望字典（JSON 对象）")),
        }
    }

    /// 从 JSON 字符串解析
    pub fn parse(scope: impl Into<String>, text: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(scope, value)
    }

    /// 从文件加载
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let scope = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("case")
            .to_string();
        Self::parse(scope, &content)
    }

    /// 作用域路径
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按配置顺序的键
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 是否存在字面键
    pub fn found(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 原始值
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// 该键是否为子字典
    pub fn is_dict(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Object(_)))
    }

    /// 子作用域路径
    fn child_scope(&self, key: &str) -> String {
        if self.scope.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.scope, key)
        }
    }

    /// 类型化查找，键缺失时报错
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<T> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::missing(&self.scope, key))?;
        self.convert(key, value)
    }

    /// 类型化查找，键缺失时返回默认值；存在但类型错误时报错
    pub fn lookup_or<T: DeserializeOwned>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.entries.get(key) {
            Some(value) => self.convert(key, value),
            None => Ok(default),
        }
    }

    fn convert<T: DeserializeOwned>(&self, key: &str, value: &Value) -> ConfigResult<T> {
        serde_json::from_value(value.clone()).map_err(|e| {
            ConfigError::invalid(self.child_scope(key), value, e.to_string())
        })
    }

    /// 子字典，缺失或不是对象时报错
    pub fn sub_dict(&self, key: &str) -> ConfigResult<Dictionary> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::missing(&self.scope, key))?;
        Self::from_value(self.child_scope(key), value.clone())
    }

    /// 子字典，缺失时返回空字典
    pub fn sub_dict_or_empty(&self, key: &str) -> ConfigResult<Dictionary> {
        if self.found(key) {
            self.sub_dict(key)
        } else {
            Ok(Dictionary::new(self.child_scope(key)))
        }
    }

    /// 按名称选择条目：字面键优先，否则取最后配置的匹配模式
    ///
    /// 返回选中的键与被覆盖的其它匹配模式。
    pub fn select(&self, name: &str) -> Option<(&str, Vec<&str>)> {
        select_key(self.keys(), name)
    }

    /// 模式查找子字典
    pub fn sub_dict_matching(&self, name: &str) -> ConfigResult<Option<Dictionary>> {
        let key = match self.select(name) {
            Some((key, shadowed)) => {
                if !shadowed.is_empty() {
                    tracing::warn!(
                        "{}: '{}' 同时匹配多个模式 {:?}，使用最后配置的 '{}'",
                        self.scope,
                        name,
                        shadowed,
                        key
                    );
                }
                key.to_string()
            }
            None => return Ok(None),
        };
        let value = self.entries.get(&key).cloned().unwrap_or(Value::Null);
        Self::from_value(self.child_scope(name), value).map(Some)
    }

    /// 设置条目
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> ConfigResult<()> {
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.into(), value);
        Ok(())
    }

    /// 设置子字典
    pub fn set_dict(&mut self, key: impl Into<String>, dict: Dictionary) {
        self.entries.insert(key.into(), Value::Object(dict.entries));
    }

    /// 转换为 JSON 值
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }

    // ========================================================================
    // 场值
    // ========================================================================

    /// 读取单个场值：标量写作数字，矢量/张量写作数组
    pub fn lookup_field_value<T: FieldValue>(&self, key: &str) -> ConfigResult<T> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::missing(&self.scope, key))?;
        parse_field_value(value).ok_or_else(|| {
            ConfigError::invalid(
                self.child_scope(key),
                value,
                format!("期望 {} 值", T::TYPE_NAME),
            )
        })
    }

    /// 读取长度为 `size` 的场
    ///
    /// 接受均匀值（数字或数组）或 `{"nonuniform": [...]}` 列表。
    pub fn lookup_field<T: FieldValue>(&self, key: &str, size: usize) -> ConfigResult<Vec<T>> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::missing(&self.scope, key))?;

        if let Some(list) = value.get("nonuniform").and_then(Value::as_array) {
            if list.len() != size {
                return Err(ConfigError::invalid(
                    self.child_scope(key),
                    list.len(),
                    format!("非均匀场长度应为 {size}"),
                ));
            }
            return list
                .iter()
                .map(|v| {
                    parse_field_value(v).ok_or_else(|| {
                        ConfigError::invalid(
                            self.child_scope(key),
                            v,
                            format!("期望 {} 值", T::TYPE_NAME),
                        )
                    })
                })
                .collect();
        }

        let uniform: T = self.lookup_field_value(key)?;
        Ok(vec![uniform; size])
    }
}

/// 场值转 JSON
pub fn field_value_to_json<T: FieldValue>(v: &T) -> Value {
    if T::N_COMPONENTS == 1 {
        Value::from(v.component(0))
    } else {
        Value::from(v.components())
    }
}

/// 场列表转 JSON（全部相同时写成均匀值）
pub fn field_to_json<T: FieldValue>(values: &[T]) -> Value {
    match values.first() {
        Some(first) if values.iter().all(|v| v == first) => field_value_to_json(first),
        _ => serde_json::json!({
            "nonuniform": values.iter().map(field_value_to_json).collect::<Vec<_>>()
        }),
    }
}

fn parse_field_value<T: FieldValue>(value: &Value) -> Option<T> {
    match value {
        Value::Number(n) if T::N_COMPONENTS == 1 => n.as_f64().map(T::splat),
        Value::Array(items) => {
            let comps: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
            T::from_components(&comps?)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Vector;
    use serde_json::json;

    fn sample() -> Dictionary {
        Dictionary::from_value(
            "T",
            json!({
                "internalField": 300.0,
                "boundaryField": {
                    "(inlet|outlet)": { "type": "zeroGradient" },
                    "inlet": { "type": "fixedValue", "value": 350.0 },
                    "wall.*": { "type": "fixedValue", "value": 1.0 },
                    "wall_.*": { "type": "fixedValue", "value": 2.0 }
                },
                "U": [1.0, 0.0, 0.0],
                "profile": { "nonuniform": [1.0, 2.0, 3.0] }
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_key_names_scope() {
        let dict = sample();
        let err = dict.lookup::<f64>("value").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'T'"));
        assert!(msg.contains("value"));
    }

    #[test]
    fn test_sub_dict_matching() {
        let bf = sample().sub_dict("boundaryField").unwrap();
        let inlet = bf.sub_dict_matching("inlet").unwrap().unwrap();
        assert_eq!(inlet.lookup::<String>("type").unwrap(), "fixedValue");

        let outlet = bf.sub_dict_matching("outlet").unwrap().unwrap();
        assert_eq!(outlet.lookup::<String>("type").unwrap(), "zeroGradient");

        let wall = bf.sub_dict_matching("wall_top").unwrap().unwrap();
        assert_eq!(wall.lookup::<f64>("value").unwrap(), 2.0);

        assert!(bf.sub_dict_matching("symmetry").unwrap().is_none());
    }

    #[test]
    fn test_field_values() {
        let dict = sample();
        let u: Vector = dict.lookup_field_value("U").unwrap();
        assert_eq!(u, Vector::X);
        let t: Vec<f64> = dict.lookup_field("internalField", 4).unwrap();
        assert_eq!(t, vec![300.0; 4]);
        let p: Vec<f64> = dict.lookup_field("profile", 3).unwrap();
        assert_eq!(p, vec![1.0, 2.0, 3.0]);
        assert!(dict.lookup_field::<f64>("profile", 2).is_err());
        assert!(dict.lookup_field_value::<Vector>("internalField").is_err());
    }

    #[test]
    fn test_field_to_json_uniform() {
        assert_eq!(field_to_json(&[1.0, 1.0]), json!(1.0));
        assert_eq!(
            field_to_json(&[1.0, 2.0]),
            json!({ "nonuniform": [1.0, 2.0] })
        );
    }

    #[test]
    fn test_lookup_or_rejects_wrong_type() {
        let dict = Dictionary::from_value("d", json!({ "maxIter": "many" })).unwrap();
        assert!(dict.lookup_or("maxIter", 10_usize).is_err());
        assert_eq!(dict.lookup_or("minIter", 0_usize).unwrap(), 0);
    }
}
