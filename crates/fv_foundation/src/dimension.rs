// crates/fv_foundation/src/dimension.rs

//! 物理量纲集合
//!
//! 以七个 SI 基本量纲的指数描述一个物理量的量纲：
//! 质量、长度、时间、温度、物质的量、电流、发光强度。
//!
//! 场与方程都携带量纲；相加、相减、方程合并时要求量纲一致，
//! 相乘、相除时指数相加减。
//!
//! ```
//! use fv_foundation::DimensionSet;
//!
//! let flux = DimensionSet::VELOCITY * DimensionSet::AREA;
//! assert_eq!(flux, DimensionSet::VOLUMETRIC_FLUX);
//! assert!(DimensionSet::LENGTH.check_same(&DimensionSet::TIME, "a + b").is_err());
//! ```

use std::fmt;
use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{FvError, FvResult};

/// 指数比较容差
const EXPONENT_TOLERANCE: f64 = 1e-10;

/// 基本量纲名称（用于显示）
const NAMES: [&str; 7] = ["kg", "m", "s", "K", "mol", "A", "cd"];

/// 七个 SI 基本量纲的指数
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 7]", into = "[f64; 7]")]
pub struct DimensionSet {
    exponents: [f64; 7],
}

impl DimensionSet {
    /// 无量纲
    pub const DIMLESS: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 质量
    pub const MASS: Self = Self::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 长度
    pub const LENGTH: Self = Self::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 时间
    pub const TIME: Self = Self::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
    /// 温度
    pub const TEMPERATURE: Self = Self::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0);
    /// 面积
    pub const AREA: Self = Self::new(0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 体积
    pub const VOLUME: Self = Self::new(0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 速度
    pub const VELOCITY: Self = Self::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 运动粘度 / 扩散系数
    pub const KINEMATIC_VISCOSITY: Self = Self::new(0.0, 2.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 体积通量
    pub const VOLUMETRIC_FLUX: Self = Self::new(0.0, 3.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 密度
    pub const DENSITY: Self = Self::new(1.0, -3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 运动压力（压力 / 密度）
    pub const KINEMATIC_PRESSURE: Self = Self::new(0.0, 2.0, -2.0, 0.0, 0.0, 0.0, 0.0);

    /// 按分量创建
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        mass: f64,
        length: f64,
        time: f64,
        temperature: f64,
        moles: f64,
        current: f64,
        luminous_intensity: f64,
    ) -> Self {
        Self {
            exponents: [
                mass,
                length,
                time,
                temperature,
                moles,
                current,
                luminous_intensity,
            ],
        }
    }

    /// 指数数组
    pub fn exponents(&self) -> &[f64; 7] {
        &self.exponents
    }

    /// 是否无量纲
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMLESS
    }

    /// 幂运算
    pub fn pow(&self, p: f64) -> Self {
        let mut exponents = self.exponents;
        exponents.iter_mut().for_each(|e| *e *= p);
        Self { exponents }
    }

    /// 倒数
    pub fn inv(&self) -> Self {
        self.pow(-1.0)
    }

    /// 检查两个量纲一致，否则返回带运算名的 `DimensionMismatch`
    pub fn check_same(&self, other: &Self, operation: &str) -> FvResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(FvError::dimension_mismatch(operation, self, other))
        }
    }
}

impl PartialEq for DimensionSet {
    fn eq(&self, other: &Self) -> bool {
        self.exponents
            .iter()
            .zip(other.exponents.iter())
            .all(|(a, b)| (a - b).abs() < EXPONENT_TOLERANCE)
    }
}

impl Mul for DimensionSet {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut exponents = self.exponents;
        for (e, r) in exponents.iter_mut().zip(rhs.exponents.iter()) {
            *e += r;
        }
        Self { exponents }
    }
}

impl Div for DimensionSet {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self * rhs.inv()
    }
}

impl From<[f64; 7]> for DimensionSet {
    fn from(exponents: [f64; 7]) -> Self {
        Self { exponents }
    }
}

impl From<DimensionSet> for [f64; 7] {
    fn from(d: DimensionSet) -> Self {
        d.exponents
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "[-]");
        }
        let parts: Vec<String> = self
            .exponents
            .iter()
            .zip(NAMES.iter())
            .filter(|(e, _)| e.abs() > EXPONENT_TOLERANCE)
            .map(|(e, n)| {
                if (e - 1.0).abs() < EXPONENT_TOLERANCE {
                    (*n).to_string()
                } else {
                    format!("{n}^{e}")
                }
            })
            .collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products() {
        assert_eq!(
            DimensionSet::KINEMATIC_VISCOSITY * DimensionSet::TIME,
            DimensionSet::AREA
        );
        assert_eq!(
            DimensionSet::VOLUME / DimensionSet::AREA,
            DimensionSet::LENGTH
        );
        assert_eq!(DimensionSet::AREA.pow(0.5), DimensionSet::LENGTH);
    }

    #[test]
    fn test_check_same_reports_operation() {
        let err = DimensionSet::VELOCITY
            .check_same(&DimensionSet::TEMPERATURE, "fvMatrix + fvMatrix")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fvMatrix + fvMatrix"));
        assert!(msg.contains("K"));
    }

    #[test]
    fn test_display() {
        assert_eq!(DimensionSet::DIMLESS.to_string(), "[-]");
        assert_eq!(DimensionSet::VELOCITY.to_string(), "[m s^-1]");
    }

    #[test]
    fn test_from_exponent_array() {
        let d = DimensionSet::from([0.0, 2.0, -1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(d, DimensionSet::KINEMATIC_VISCOSITY);
        let back: [f64; 7] = d.into();
        assert_eq!(back[2], -1.0);
    }
}
