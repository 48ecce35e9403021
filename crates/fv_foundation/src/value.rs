// crates/fv_foundation/src/value.rs

//! 场值类型
//!
//! 有限体积场的值类型是封闭集合：标量 `f64`、矢量 [`Vector`]、张量 [`Tensor`]。
//! [`FieldValue`] 为它们提供统一的逐分量访问，使离散算子、边界条件和
//! 分离求解（逐分量求解）可以对值类型泛型化。
//!
//! 张量分量按行主序编号：`xx, xy, xz, yx, ..., zz`。

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use glam::{DMat3, DVec3};

/// 三维矢量
pub type Vector = DVec3;

/// 二阶张量
pub type Tensor = DMat3;

/// 场值类型的统一接口
pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// 零值
    const ZERO: Self;

    /// 分量数
    const N_COMPONENTS: usize;

    /// 类型名（用于注册表类别与日志）
    const TYPE_NAME: &'static str;

    /// 所有分量均为 `v`
    fn splat(v: f64) -> Self;

    /// 读取分量
    fn component(&self, c: usize) -> f64;

    /// 写入分量
    fn set_component(&mut self, c: usize, v: f64);

    /// 数乘
    fn scale(self, s: f64) -> Self;

    /// 模
    fn mag(&self) -> f64;

    /// 逐分量乘积
    fn cmpt_mul(self, other: Self) -> Self {
        let mut out = self;
        for c in 0..Self::N_COMPONENTS {
            out.set_component(c, self.component(c) * other.component(c));
        }
        out
    }

    /// 分量平均值
    fn cmpt_av(&self) -> f64 {
        (0..Self::N_COMPONENTS).map(|c| self.component(c)).sum::<f64>()
            / Self::N_COMPONENTS as f64
    }

    /// 从分量切片构造，长度不符时返回 `None`
    fn from_components(values: &[f64]) -> Option<Self> {
        if values.len() != Self::N_COMPONENTS {
            return None;
        }
        let mut out = Self::ZERO;
        for (c, &v) in values.iter().enumerate() {
            out.set_component(c, v);
        }
        Some(out)
    }

    /// 全部分量
    fn components(&self) -> Vec<f64> {
        (0..Self::N_COMPONENTS).map(|c| self.component(c)).collect()
    }
}

impl FieldValue for f64 {
    const ZERO: Self = 0.0;
    const N_COMPONENTS: usize = 1;
    const TYPE_NAME: &'static str = "scalar";

    #[inline]
    fn splat(v: f64) -> Self {
        v
    }

    #[inline]
    fn component(&self, _c: usize) -> f64 {
        *self
    }

    #[inline]
    fn set_component(&mut self, _c: usize, v: f64) {
        *self = v;
    }

    #[inline]
    fn scale(self, s: f64) -> Self {
        self * s
    }

    #[inline]
    fn mag(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn cmpt_mul(self, other: Self) -> Self {
        self * other
    }
}

impl FieldValue for Vector {
    const ZERO: Self = DVec3::ZERO;
    const N_COMPONENTS: usize = 3;
    const TYPE_NAME: &'static str = "vector";

    #[inline]
    fn splat(v: f64) -> Self {
        DVec3::splat(v)
    }

    #[inline]
    fn component(&self, c: usize) -> f64 {
        self[c]
    }

    #[inline]
    fn set_component(&mut self, c: usize, v: f64) {
        self[c] = v;
    }

    #[inline]
    fn scale(self, s: f64) -> Self {
        self * s
    }

    #[inline]
    fn mag(&self) -> f64 {
        self.length()
    }

    #[inline]
    fn cmpt_mul(self, other: Self) -> Self {
        self * other
    }
}

impl FieldValue for Tensor {
    const ZERO: Self = DMat3::ZERO;
    const N_COMPONENTS: usize = 9;
    const TYPE_NAME: &'static str = "tensor";

    #[inline]
    fn splat(v: f64) -> Self {
        DMat3::from_cols(DVec3::splat(v), DVec3::splat(v), DVec3::splat(v))
    }

    #[inline]
    fn component(&self, c: usize) -> f64 {
        self.col(c % 3)[c / 3]
    }

    #[inline]
    fn set_component(&mut self, c: usize, v: f64) {
        self.col_mut(c % 3)[c / 3] = v;
    }

    #[inline]
    fn scale(self, s: f64) -> Self {
        self * s
    }

    fn mag(&self) -> f64 {
        (0..9).map(|c| self.component(c).powi(2)).sum::<f64>().sqrt()
    }
}

/// 可求梯度的值类型：标量的梯度是矢量，矢量的梯度是张量
pub trait Gradient: FieldValue {
    /// 梯度类型
    type Grad: FieldValue;

    /// 由各分量的梯度矢量组装梯度，`g[j]` 为第 j 分量的梯度
    ///
    /// 约定 `grad(U)[i][j] = ∂U_j/∂x_i`。
    fn from_component_gradients(g: &[Vector]) -> Self::Grad;
}

impl Gradient for f64 {
    type Grad = Vector;

    fn from_component_gradients(g: &[Vector]) -> Vector {
        g.first().copied().unwrap_or(DVec3::ZERO)
    }
}

impl Gradient for Vector {
    type Grad = Tensor;

    fn from_component_gradients(g: &[Vector]) -> Tensor {
        let col = |j: usize| g.get(j).copied().unwrap_or(DVec3::ZERO);
        DMat3::from_cols(col(0), col(1), col(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_components_row_major() {
        let mut t = Tensor::ZERO;
        t.set_component(1, 2.0); // xy
        t.set_component(3, 5.0); // yx
        assert_eq!(t.component(1), 2.0);
        assert_eq!(t.component(3), 5.0);
        assert_eq!(t.col(1)[0], 2.0);
    }

    #[test]
    fn test_from_components_length_checked() {
        assert!(Vector::from_components(&[1.0, 2.0]).is_none());
        let v = Vector::from_components(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.components(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_gradient_layout() {
        let g = [DVec3::X, DVec3::new(0.0, 2.0, 0.0), DVec3::ZERO];
        let grad = Vector::from_component_gradients(&g);
        // ∂U_y/∂y
        assert_eq!(grad.component(4), 2.0);
        // ∂U_x/∂x
        assert_eq!(grad.component(0), 1.0);
    }

    #[test]
    fn test_cmpt_av() {
        assert_eq!(DVec3::new(1.0, 2.0, 3.0).cmpt_av(), 2.0);
        assert_eq!(4.0_f64.cmpt_av(), 4.0);
    }
}
