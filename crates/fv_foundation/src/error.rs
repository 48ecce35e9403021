// crates/fv_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `FvError` 枚举和 `FvResult` 类型别名。
//!
//! 错误分类：
//!
//! - 配置错误：未知类型名、缺失键、无效值
//! - 量纲错误：对量纲不一致的场或方程执行运算
//! - 拓扑错误：面-单元寻址不一致
//! - 通信错误：消息长度不符、通道断开
//! - 状态错误：边界未求值、注册表未就绪
//!
//! 迭代求解不收敛不是错误，而是通过 `SolverPerformance` 以数据形式返回。
//!
//! # 示例
//!
//! ```
//! use fv_foundation::error::{FvError, FvResult};
//!
//! fn lookup_tolerance(found: bool) -> FvResult<f64> {
//!     if !found {
//!         return Err(FvError::missing_key("solvers.T", "tolerance"));
//!     }
//!     Ok(1e-6)
//! }
//!
//! assert!(lookup_tolerance(false).is_err());
//! ```

use thiserror::Error;

/// 统一结果类型
pub type FvResult<T> = Result<T, FvError>;

/// FinVol 错误类型
#[derive(Error, Debug)]
pub enum FvError {
    // ========================================================================
    // 配置相关错误
    // ========================================================================
    /// 运行时选择时请求了未注册的类型名
    #[error("未知的 {category} 类型 '{name}'，可用类型: {available:?}")]
    UnknownType {
        /// 类别名称（如 fvPatchField<scalar>）
        category: String,
        /// 请求的类型名
        name: String,
        /// 已注册的类型名
        available: Vec<String>,
    },

    /// 字典缺少必需的键
    #[error("字典 '{dictionary}' 缺少必需的键 '{key}'")]
    MissingKey {
        /// 字典作用域路径
        dictionary: String,
        /// 缺失的键
        key: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    // ========================================================================
    // 注册表错误
    // ========================================================================
    /// 注册表尚未完成初始化
    #[error("注册表 '{category}' 尚未初始化，请先调用 registry::initialise()")]
    RegistryNotReady {
        /// 类别名称
        category: String,
    },

    /// 重复注册同名类型
    #[error("{category} 类型 '{name}' 已注册")]
    DuplicateEntry {
        /// 类别名称
        category: String,
        /// 重复的类型名
        name: String,
    },

    /// 注册表已封存，不再接受注册
    #[error("注册表 '{category}' 已封存，无法注册 '{name}'")]
    RegistrySealed {
        /// 类别名称
        category: String,
        /// 尝试注册的类型名
        name: String,
    },

    // ========================================================================
    // 数值与量纲错误
    // ========================================================================
    /// 量纲不一致
    #[error("量纲不一致: {operation} 的左操作数 {lhs} 与右操作数 {rhs}")]
    DimensionMismatch {
        /// 运算名称
        operation: String,
        /// 左侧量纲
        lhs: String,
        /// 右侧量纲
        rhs: String,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: String,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    // ========================================================================
    // 拓扑与状态错误
    // ========================================================================
    /// 面-单元寻址不一致
    #[error("寻址错误: {message}")]
    Addressing {
        /// 具体错误信息
        message: String,
    },

    /// 在边界条件求值前使用了场
    #[error("场 '{field}' 的边界 '{patch}' 尚未求值")]
    BoundaryNotEvaluated {
        /// 场名
        field: String,
        /// 边界名
        patch: String,
    },

    // ========================================================================
    // 通信错误
    // ========================================================================
    /// 接收到的消息长度与期望不符
    #[error("消息长度不符: 进程 {from} -> {to} (tag {tag}) 期望 {expected}, 实际 {actual}")]
    MessageSizeMismatch {
        /// 发送方
        from: usize,
        /// 接收方
        to: usize,
        /// 消息标签
        tag: u32,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 通信失败
    #[error("通信失败: {message}")]
    Communication {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // IO
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl FvError {
    /// 未知类型
    pub fn unknown_type(
        category: impl Into<String>,
        name: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::UnknownType {
            category: category.into(),
            name: name.into(),
            available,
        }
    }

    /// 缺失键
    pub fn missing_key(dictionary: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            dictionary: dictionary.into(),
            key: key.into(),
        }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 量纲不一致
    pub fn dimension_mismatch(
        operation: impl Into<String>,
        lhs: impl ToString,
        rhs: impl ToString,
    ) -> Self {
        Self::DimensionMismatch {
            operation: operation.into(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 寻址错误
    pub fn addressing(message: impl Into<String>) -> Self {
        Self::Addressing {
            message: message.into(),
        }
    }

    /// 边界未求值
    pub fn boundary_not_evaluated(field: impl Into<String>, patch: impl Into<String>) -> Self {
        Self::BoundaryNotEvaluated {
            field: field.into(),
            patch: patch.into(),
        }
    }

    /// 通信失败
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// IO 错误（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl FvError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &str, expected: usize, actual: usize) -> FvResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> FvResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

impl From<std::io::Error> for FvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时返回给定错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// 解包 `Option`，为 `None` 时返回给定错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_names_category_and_request() {
        let err = FvError::unknown_type(
            "fvPatchField<scalar>",
            "fixedValu",
            vec!["fixedValue".into(), "zeroGradient".into()],
        );
        let msg = err.to_string();
        assert!(msg.contains("fvPatchField<scalar>"));
        assert!(msg.contains("fixedValu"));
        assert!(msg.contains("zeroGradient"));
    }

    #[test]
    fn test_message_size_mismatch_display() {
        let err = FvError::MessageSizeMismatch {
            from: 1,
            to: 0,
            tag: 7,
            expected: 4,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("期望 4"));
        assert!(msg.contains("实际 3"));
    }

    #[test]
    fn test_check_size() {
        assert!(FvError::check_size("diag", 10, 10).is_ok());
        assert!(FvError::check_size("diag", 10, 5).is_err());
    }

    #[test]
    fn test_check_index() {
        assert!(FvError::check_index("Cell", 5, 10).is_ok());
        assert!(FvError::check_index("Cell", 10, 10).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: FvError = io_err.into();
        assert!(matches!(err, FvError::Io { .. }));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: i32) -> FvResult<()> {
            ensure!(value > 0, FvError::addressing("value must be positive"));
            Ok(())
        }

        assert!(check(1).is_ok());
        assert!(check(-1).is_err());
    }

    #[test]
    fn test_require_macro() {
        fn get_value(opt: Option<i32>) -> FvResult<i32> {
            let v = require!(opt, FvError::missing_key("dict", "value"));
            Ok(v)
        }

        assert_eq!(get_value(Some(42)).unwrap(), 42);
        assert!(get_value(None).is_err());
    }
}
