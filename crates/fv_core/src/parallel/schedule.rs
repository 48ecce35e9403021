// crates/fv_core/src/parallel/schedule.rs

//! 接口交换的确定性调度
//!
//! 对一组接口（边界片）生成有序的 `(接口, 阶段)` 序列，每个接口恰好出现两次：
//! 先 `Init`（发送本侧数据），后 `Complete`（接收对侧数据并求值）。
//!
//! - 非进程间接口排在前面，按索引顺序，`Init` 紧跟 `Complete`
//! - 进程间接口按 (相邻进程号, 索引) 排序
//!   - `NonBlocking`: 全部 `Init` 在全部 `Complete` 之前
//!   - `Blocking`: 每个 `Init` 紧跟其 `Complete`
//!
//! 发送是缓冲的，两种方式都不会死锁；所有进程按相同规则生成调度，
//! 顺序与线程时序无关。

use serde::{Deserialize, Serialize};

/// 通信方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommsType {
    /// 逐个接口发送并接收
    Blocking,
    /// 先全部发送，再全部接收
    #[default]
    NonBlocking,
}

/// 调度阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePhase {
    /// 发起交换
    Init,
    /// 完成交换
    Complete,
}

/// 调度条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// 接口索引
    pub interface: usize,
    /// 阶段
    pub phase: SchedulePhase,
}

impl ScheduleEntry {
    fn init(interface: usize) -> Self {
        Self {
            interface,
            phase: SchedulePhase::Init,
        }
    }

    fn complete(interface: usize) -> Self {
        Self {
            interface,
            phase: SchedulePhase::Complete,
        }
    }
}

/// 通信调度
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommsSchedule {
    entries: Vec<ScheduleEntry>,
}

impl CommsSchedule {
    /// 生成调度
    ///
    /// `neighbours[i]` 为接口 i 的相邻进程号，`None` 表示非进程间接口。
    pub fn build(neighbours: &[Option<usize>], comms_type: CommsType) -> Self {
        let mut entries = Vec::with_capacity(2 * neighbours.len());

        for (i, _) in neighbours.iter().enumerate().filter(|(_, n)| n.is_none()) {
            entries.push(ScheduleEntry::init(i));
            entries.push(ScheduleEntry::complete(i));
        }

        let mut coupled: Vec<(usize, usize)> = neighbours
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.map(|rank| (rank, i)))
            .collect();
        coupled.sort_unstable();

        match comms_type {
            CommsType::NonBlocking => {
                entries.extend(coupled.iter().map(|&(_, i)| ScheduleEntry::init(i)));
                entries.extend(coupled.iter().map(|&(_, i)| ScheduleEntry::complete(i)));
            }
            CommsType::Blocking => {
                for &(_, i) in &coupled {
                    entries.push(ScheduleEntry::init(i));
                    entries.push(ScheduleEntry::complete(i));
                }
            }
        }

        Self { entries }
    }

    /// 调度条目
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 遍历条目
    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter()
    }

    /// 每个接口恰好一次 `Init`、一次 `Complete`，且 `Init` 在前
    pub fn is_well_formed(&self, n_interfaces: usize) -> bool {
        let mut init_pos = vec![None; n_interfaces];
        let mut complete_pos = vec![None; n_interfaces];
        for (pos, e) in self.entries.iter().enumerate() {
            let slot = match e.phase {
                SchedulePhase::Init => init_pos.get_mut(e.interface),
                SchedulePhase::Complete => complete_pos.get_mut(e.interface),
            };
            match slot {
                Some(s) if s.is_none() => *s = Some(pos),
                _ => return false,
            }
        }
        init_pos
            .iter()
            .zip(complete_pos.iter())
            .all(|(i, c)| matches!((i, c), (Some(i), Some(c)) if i < c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_entries_per_interface() {
        let neighbours = [None, Some(2), Some(1), None, Some(1)];
        for comms_type in [CommsType::Blocking, CommsType::NonBlocking] {
            let s = CommsSchedule::build(&neighbours, comms_type);
            assert_eq!(s.len(), 2 * neighbours.len());
            assert!(s.is_well_formed(neighbours.len()));
        }
    }

    #[test]
    fn test_non_blocking_order() {
        let s = CommsSchedule::build(&[Some(3), None, Some(1)], CommsType::NonBlocking);
        let e = s.entries();
        assert_eq!(e[0], ScheduleEntry::init(1));
        assert_eq!(e[1], ScheduleEntry::complete(1));
        // 按相邻进程号排序，全部 Init 先于全部 Complete
        assert_eq!(e[2], ScheduleEntry::init(2));
        assert_eq!(e[3], ScheduleEntry::init(0));
        assert_eq!(e[4], ScheduleEntry::complete(2));
        assert_eq!(e[5], ScheduleEntry::complete(0));
    }

    #[test]
    fn test_deterministic() {
        let n = [Some(1), Some(0), None, Some(1)];
        assert_eq!(
            CommsSchedule::build(&n, CommsType::NonBlocking),
            CommsSchedule::build(&n, CommsType::NonBlocking)
        );
    }

    #[test]
    fn test_malformed_detected() {
        let s = CommsSchedule {
            entries: vec![ScheduleEntry::complete(0), ScheduleEntry::init(0)],
        };
        assert!(!s.is_well_formed(1));
    }
}
