// crates/fv_core/src/solvers/vector_ops.rs

//! 向量运算（BLAS Level 1 风格）
//!
//! 迭代求解器使用的本地向量运算。跨分区的内积与范数由
//! [`LduSystem`](super::LduSystem) 在此基础上做全局归约。
//!
//! ```
//! use fv_core::solvers::vector_ops::{axpy, dot, sum_mag};
//!
//! let x = vec![1.0, 2.0, 3.0];
//! let mut y = vec![4.0, 5.0, 6.0];
//! assert_eq!(dot(&x, &y), 32.0);
//! axpy(2.0, &x, &mut y);
//! assert_eq!(y, vec![6.0, 9.0, 12.0]);
//! assert_eq!(sum_mag(&[-1.0, 2.0]), 3.0);
//! ```

/// 点积 x·y
#[inline]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(&xi, &yi)| xi * yi).sum()
}

/// 绝对值之和 Σ|x|
#[inline]
pub fn sum_mag(x: &[f64]) -> f64 {
    x.iter().map(|v| v.abs()).sum()
}

/// 平方和 Σx²
#[inline]
pub fn sum_sqr(x: &[f64]) -> f64 {
    dot(x, x)
}

/// AXPY: y = α*x + y
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// XPAY: y = x + α*y
#[inline]
pub fn xpay(x: &[f64], alpha: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = xi + alpha * *yi;
    }
}
