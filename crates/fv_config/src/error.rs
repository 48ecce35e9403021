// crates/fv_config/src/error.rs

//! 配置层错误类型

use fv_foundation::FvError;

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("字典 '{dictionary}' 缺少键 '{key}'")]
    Missing {
        /// 字典作用域
        dictionary: String,
        /// 缺失的键
        key: String,
    },
}

impl ConfigError {
    /// 无效值
    pub fn invalid(
        key: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 缺失键
    pub fn missing(dictionary: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Missing {
            dictionary: dictionary.into(),
            key: key.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<ConfigError> for FvError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => FvError::io_with_source("读取配置失败", e),
            ConfigError::Parse(msg) => FvError::invalid_config("<file>", "", msg),
            ConfigError::InvalidValue { key, value, reason } => {
                FvError::InvalidConfig { key, value, reason }
            }
            ConfigError::Missing { dictionary, key } => FvError::MissingKey { dictionary, key },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("relTol", "-1", "必须在 [0, 1) 内");
        assert!(err.to_string().contains("relTol"));
    }

    #[test]
    fn test_missing_maps_to_missing_key() {
        let err: FvError = ConfigError::missing("fvSolution.solvers", "T").into();
        assert!(matches!(err, FvError::MissingKey { .. }));
        assert!(err.to_string().contains("fvSolution.solvers"));
    }
}
