// crates/fv_core/src/parallel/mod.rs

//! 并行通信
//!
//! 每个分区（rank）只持有本地单元；相邻分区通过 processor 边界片交换 halo 值。
//!
//! - [`Communicator`]: 点对点缓冲发送、阻塞接收（长度不符为致命错误）
//! - [`SerialCommunicator`]: 单进程
//! - [`ThreadCommunicator`]: 进程内多线程分区，每个分区一个线程
//! - [`reduce`]: 全局归约（求和、最大、最小、逻辑与）
//! - [`CommsSchedule`]: 接口交换的确定性调度

mod comm;
pub mod reduce;
mod schedule;
mod thread_comm;

pub use comm::{flatten, unflatten, Communicator, SerialCommunicator, SERIAL};
pub use schedule::{CommsSchedule, CommsType, ScheduleEntry, SchedulePhase};
pub use thread_comm::ThreadCommunicator;
