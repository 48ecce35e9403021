// crates/fv_core/src/matrix/interface.rs

//! 耦合接口
//!
//! 分区边界（进程边界片）两侧的单元属于不同进程，矩阵乘积中的跨分区项
//! 通过接口交换完成：`Init` 阶段发送本侧单元值，`Complete` 阶段接收对侧值，
//! 并以 `result[c] -= coeff·ψ_nbr` 计入乘积。顺序由 [`CommsSchedule`] 决定。

use std::fmt;

use fv_foundation::{FvError, FvResult};

use crate::parallel::{CommsSchedule, Communicator, SchedulePhase};

/// 矩阵耦合接口
pub trait LduInterface: Send + Sync + fmt::Debug {
    /// 接口相邻的本侧单元
    fn face_cells(&self) -> &[usize];

    /// 相邻进程号
    fn neighbour_rank(&self) -> usize;

    /// 发送本侧单元值
    fn init_transfer(&self, comm: &dyn Communicator, psi: &[f64]) -> FvResult<()>;

    /// 接收对侧单元值（每个面一个值）
    fn complete_transfer(&self, comm: &dyn Communicator) -> FvResult<Vec<f64>>;
}

/// 进程间接口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInterface {
    face_cells: Vec<usize>,
    my_rank: usize,
    neighb_rank: usize,
    tag: u32,
}

impl ProcessorInterface {
    /// 创建接口
    pub fn new(face_cells: Vec<usize>, my_rank: usize, neighb_rank: usize, tag: u32) -> Self {
        Self {
            face_cells,
            my_rank,
            neighb_rank,
            tag,
        }
    }

    /// 本进程号
    pub fn my_rank(&self) -> usize {
        self.my_rank
    }

    /// 相邻进程号
    pub fn neighb_rank(&self) -> usize {
        self.neighb_rank
    }

    /// 消息标签（两侧相同）
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// 发送任意分量序列
    pub fn send(&self, comm: &dyn Communicator, data: Vec<f64>) -> FvResult<()> {
        comm.send(self.neighb_rank, self.tag, data)
    }

    /// 接收任意分量序列
    pub fn recv(&self, comm: &dyn Communicator, len: usize) -> FvResult<Vec<f64>> {
        comm.recv(self.neighb_rank, self.tag, len)
    }
}

impl LduInterface for ProcessorInterface {
    fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }

    fn neighbour_rank(&self) -> usize {
        self.neighb_rank
    }

    fn init_transfer(&self, comm: &dyn Communicator, psi: &[f64]) -> FvResult<()> {
        let data = self.face_cells.iter().map(|&c| psi[c]).collect();
        self.send(comm, data)
    }

    fn complete_transfer(&self, comm: &dyn Communicator) -> FvResult<Vec<f64>> {
        self.recv(comm, self.face_cells.len())
    }
}

/// 一次求解中使用的全部耦合接口及其系数
///
/// `entries` 按边界片索引排列，非耦合边界片为 `None`。
#[derive(Debug)]
pub struct CoupledInterfaces<'a> {
    comm: &'a dyn Communicator,
    schedule: &'a CommsSchedule,
    entries: Vec<Option<(&'a dyn LduInterface, Vec<f64>)>>,
}

impl<'a> CoupledInterfaces<'a> {
    /// 创建
    pub fn new(
        comm: &'a dyn Communicator,
        schedule: &'a CommsSchedule,
        entries: Vec<Option<(&'a dyn LduInterface, Vec<f64>)>>,
    ) -> FvResult<Self> {
        for (patch, entry) in entries.iter().enumerate() {
            if let Some((iface, coeffs)) = entry {
                if iface.face_cells().len() != coeffs.len() {
                    return Err(FvError::size_mismatch(
                        format!("interface[{patch}].coeffs"),
                        iface.face_cells().len(),
                        coeffs.len(),
                    ));
                }
            }
        }
        Ok(Self {
            comm,
            schedule,
            entries,
        })
    }

    /// 通信器
    pub fn comm(&self) -> &'a dyn Communicator {
        self.comm
    }

    /// 是否没有耦合接口
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// 行和中扣除接口系数（相当于对侧值取 1 时的接口贡献）
    pub fn subtract_coeffs(&self, out: &mut [f64]) {
        for (iface, coeffs) in self.entries.iter().flatten() {
            for (&c, &k) in iface.face_cells().iter().zip(coeffs.iter()) {
                out[c] -= k;
            }
        }
    }

    /// 按调度交换并累加 `result[c] -= coeff·ψ_nbr`
    pub fn update(&self, psi: &[f64], result: &mut [f64]) -> FvResult<()> {
        self.exchange(psi, |iface, coeffs, nbr| {
            for ((&c, &k), &v) in iface.face_cells().iter().zip(coeffs).zip(nbr) {
                result[c] -= k * v;
            }
        })
    }

    /// 按调度交换，把对侧值交给 `apply`
    pub fn exchange<F>(&self, psi: &[f64], mut apply: F) -> FvResult<()>
    where
        F: FnMut(&dyn LduInterface, &[f64], &[f64]),
    {
        for entry in self.schedule.iter() {
            let Some(Some((iface, coeffs))) = self.entries.get(entry.interface) else {
                continue;
            };
            match entry.phase {
                SchedulePhase::Init => iface.init_transfer(self.comm, psi)?,
                SchedulePhase::Complete => {
                    let nbr = iface.complete_transfer(self.comm)?;
                    apply(*iface, coeffs, &nbr);
                }
            }
        }
        Ok(())
    }
}
