// crates/fv_core/src/fields/component.rs

//! 分量场

/// 体场单个分量的标量视图
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentField {
    /// 单元值
    pub internal: Vec<f64>,
    /// 每个边界片的面值
    pub boundary: Vec<Vec<f64>>,
}

impl ComponentField {
    /// 创建
    pub fn new(internal: Vec<f64>, boundary: Vec<Vec<f64>>) -> Self {
        Self { internal, boundary }
    }
}
