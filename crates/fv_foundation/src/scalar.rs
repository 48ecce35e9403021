// crates/fv_foundation/src/scalar.rs

//! 标量类型与数值常量

/// 计算标量类型
pub type Scalar = f64;

/// 小量，用于避免除零与残差归一化
pub const SMALL: Scalar = 1.0e-15;

/// 极小量，用于奇异性判断
pub const VSMALL: Scalar = 1.0e-300;

/// 大量
pub const GREAT: Scalar = 1.0e15;

/// 极大量
pub const VGREAT: Scalar = 1.0e300;
