// crates/fv_core/src/mesh/region.rs

//! 区域注册表
//!
//! 多区域算例中，映射边界条件从其他区域的边界片取值。每次边界求值后，
//! 场把映射边界片的值以 `(区域, 边界片, 场名)` 为键发布到共享注册表，
//! 对侧区域在下次求值时读取。
//!
//! 各区域网格在加入注册表时登记自己的 mapped 边界片，映射边界条件据此
//! 区分“对侧尚未求值”与“采样目标不存在”。

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// 区域间共享的边界片数据
#[derive(Debug, Default)]
pub struct RegionRegistry {
    data: RwLock<HashMap<(String, String, String), Vec<f64>>>,
    patches: RwLock<HashSet<(String, String)>>,
}

impl RegionRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记区域的 mapped 边界片
    pub fn declare(&self, region: &str, patch: &str) {
        self.patches
            .write()
            .insert((region.to_string(), patch.to_string()));
    }

    /// 边界片是否已登记
    pub fn is_declared(&self, region: &str, patch: &str) -> bool {
        self.patches
            .read()
            .contains(&(region.to_string(), patch.to_string()))
    }

    /// 发布边界片数据（分量展平）
    pub fn publish(&self, region: &str, patch: &str, field: &str, values: Vec<f64>) {
        self.data
            .write()
            .insert((region.to_string(), patch.to_string(), field.to_string()), values);
    }

    /// 获取边界片数据
    pub fn fetch(&self, region: &str, patch: &str, field: &str) -> Option<Vec<f64>> {
        self.data
            .read()
            .get(&(region.to_string(), patch.to_string(), field.to_string()))
            .cloned()
    }

    /// 已发布条目数
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
