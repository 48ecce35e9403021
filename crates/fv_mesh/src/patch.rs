// crates/fv_mesh/src/patch.rs

//! 边界片
//!
//! 每个边界片占据一段连续的边界面编号 `start..start + size`。

use serde::{Deserialize, Serialize};

/// 边界片类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatchKind {
    /// 普通边界
    Patch,
    /// 壁面
    Wall,
    /// 降维方向上的空边界（不参与离散）
    Empty,
    /// 与相邻分区共享的进程边界
    Processor {
        /// 本进程号
        my_rank: usize,
        /// 相邻进程号
        neighb_rank: usize,
        /// 消息标签（两侧相同）
        tag: u32,
    },
    /// 映射到另一区域某个边界片的耦合边界
    Mapped {
        /// 采样区域名
        sample_region: String,
        /// 采样边界片名
        sample_patch: String,
    },
}

impl PatchKind {
    /// 类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Wall => "wall",
            Self::Empty => "empty",
            Self::Processor { .. } => "processor",
            Self::Mapped { .. } => "mapped",
        }
    }

    /// 是否为跨进程耦合边界
    pub fn is_processor(&self) -> bool {
        matches!(self, Self::Processor { .. })
    }

    /// 是否为空边界
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// 相邻进程号
    pub fn neighbour_rank(&self) -> Option<usize> {
        match self {
            Self::Processor { neighb_rank, .. } => Some(*neighb_rank),
            _ => None,
        }
    }
}

/// 边界片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyPatch {
    /// 名称
    pub name: String,
    /// 类型
    pub kind: PatchKind,
    /// 第一个面的全局面编号
    pub start: usize,
    /// 面数
    pub size: usize,
}

impl PolyPatch {
    /// 创建
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
        }
    }

    /// 面编号范围
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let p = PatchKind::Processor {
            my_rank: 0,
            neighb_rank: 1,
            tag: 3,
        };
        assert_eq!(p.type_name(), "processor");
        assert_eq!(p.neighbour_rank(), Some(1));
        assert!(PatchKind::Wall.neighbour_rank().is_none());
    }

    #[test]
    fn test_range() {
        let p = PolyPatch::new("inlet", PatchKind::Patch, 10, 4);
        assert_eq!(p.range(), 10..14);
    }
}
