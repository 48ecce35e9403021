// crates/fv_config/src/schemes.rs

//! `fvSchemes` 字典
//!
//! 每一类离散项有自己的子字典，按项名查找格式描述，找不到时回退到
//! `default`。两者都缺失（或 `default` 为 `"none"`）是致命配置错误。
//!
//! ```json
//! "fvSchemes": {
//!     "ddtSchemes":       { "default": "Euler" },
//!     "gradSchemes":      { "default": "Gauss linear" },
//!     "divSchemes":       { "default": "none", "div(phi,T)": "Gauss upwind" },
//!     "laplacianSchemes": { "default": "Gauss linear corrected" },
//!     "interpolationSchemes": { "default": "linear" },
//!     "snGradSchemes":    { "default": "corrected" }
//! }
//! ```

use crate::dictionary::Dictionary;
use crate::error::{ConfigError, ConfigResult};
use crate::scheme_stream::SchemeStream;

/// 离散项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    /// 时间导数
    Ddt,
    /// 梯度
    Grad,
    /// 散度（对流）
    Div,
    /// 拉普拉斯（扩散）
    Laplacian,
    /// 面插值
    Interpolation,
    /// 面法向梯度
    SnGrad,
}

impl SchemeKind {
    /// 子字典名
    pub fn section(&self) -> &'static str {
        match self {
            Self::Ddt => "ddtSchemes",
            Self::Grad => "gradSchemes",
            Self::Div => "divSchemes",
            Self::Laplacian => "laplacianSchemes",
            Self::Interpolation => "interpolationSchemes",
            Self::SnGrad => "snGradSchemes",
        }
    }

    /// 全部类别
    pub const ALL: [SchemeKind; 6] = [
        Self::Ddt,
        Self::Grad,
        Self::Div,
        Self::Laplacian,
        Self::Interpolation,
        Self::SnGrad,
    ];
}

/// `fvSchemes` 字典
#[derive(Debug, Clone, Default)]
pub struct FvSchemes {
    dict: Dictionary,
}

impl FvSchemes {
    /// 从字典创建
    pub fn new(dict: Dictionary) -> Self {
        Self { dict }
    }

    /// 底层字典
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// 查找项 `term` 的格式描述
    pub fn lookup(&self, kind: SchemeKind, term: &str) -> ConfigResult<SchemeStream> {
        let section = self.dict.sub_dict_or_empty(kind.section())?;

        let key = match section.select(term) {
            Some((key, _)) => Some(key.to_string()),
            None if section.found("default") => Some("default".to_string()),
            None => None,
        };

        let Some(key) = key else {
            return Err(ConfigError::missing(section.scope(), term));
        };
        let spec: String = section.lookup(&key)?;
        if key == "default" && spec.trim() == "none" {
            return Err(ConfigError::missing(section.scope(), term));
        }
        Ok(SchemeStream::new(term, &spec))
    }

    /// 时间格式
    pub fn ddt(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::Ddt, term)
    }

    /// 梯度格式
    pub fn grad(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::Grad, term)
    }

    /// 散度格式
    pub fn div(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::Div, term)
    }

    /// 拉普拉斯格式
    pub fn laplacian(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::Laplacian, term)
    }

    /// 插值格式
    pub fn interpolation(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::Interpolation, term)
    }

    /// 面法向梯度格式
    pub fn sn_grad(&self, term: &str) -> ConfigResult<SchemeStream> {
        self.lookup(SchemeKind::SnGrad, term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemes() -> FvSchemes {
        FvSchemes::new(
            Dictionary::from_value(
                "fvSchemes",
                json!({
                    "ddtSchemes": { "default": "Euler" },
                    "divSchemes": { "default": "none", "div(phi,T)": "Gauss upwind" },
                    "laplacianSchemes": { "default": "Gauss linear corrected" }
                }),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_term_then_default() {
        let s = schemes();
        assert_eq!(s.div("div(phi,T)").unwrap().source(), "Gauss upwind");
        assert_eq!(s.ddt("ddt(T)").unwrap().source(), "Euler");
    }

    #[test]
    fn test_default_none_is_missing() {
        let err = schemes().div("div(phi,U)").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert!(err.to_string().contains("div(phi,U)"));
    }

    #[test]
    fn test_missing_section_is_missing() {
        let err = schemes().grad("grad(T)").unwrap_err();
        assert!(err.to_string().contains("gradSchemes"));
    }
}
