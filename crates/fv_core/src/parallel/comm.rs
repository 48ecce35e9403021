// crates/fv_core/src/parallel/comm.rs

//! 通信器抽象

use std::fmt;

use fv_foundation::{FieldValue, FvError, FvResult};

/// 点对点通信器
///
/// 发送是缓冲的（立即返回），接收阻塞直到匹配 `(from, tag)` 的消息到达。
/// 同一 `(from, tag)` 的消息按发送顺序投递。
pub trait Communicator: Send + Sync + fmt::Debug {
    /// 本进程号
    fn rank(&self) -> usize;

    /// 进程总数
    fn n_ranks(&self) -> usize;

    /// 缓冲发送
    fn send(&self, to: usize, tag: u32, data: Vec<f64>) -> FvResult<()>;

    /// 阻塞接收，长度必须为 `expected_len`
    ///
    /// # 错误
    ///
    /// 长度不符时返回 `MessageSizeMismatch`。
    fn recv(&self, from: usize, tag: u32, expected_len: usize) -> FvResult<Vec<f64>>;

    /// 是否并行运行
    fn is_parallel(&self) -> bool {
        self.n_ranks() > 1
    }

    /// 是否为主进程
    fn is_master(&self) -> bool {
        self.rank() == 0
    }
}

/// 单进程通信器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

/// 全局单进程通信器实例
pub static SERIAL: SerialCommunicator = SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn n_ranks(&self) -> usize {
        1
    }

    fn send(&self, to: usize, tag: u32, _data: Vec<f64>) -> FvResult<()> {
        Err(FvError::communication(format!(
            "单进程运行中无法发送到进程 {to} (tag {tag})"
        )))
    }

    fn recv(&self, from: usize, tag: u32, _expected_len: usize) -> FvResult<Vec<f64>> {
        Err(FvError::communication(format!(
            "单进程运行中无法从进程 {from} 接收 (tag {tag})"
        )))
    }
}

/// 场值展平为分量序列
pub fn flatten<T: FieldValue>(values: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len() * T::N_COMPONENTS);
    for v in values {
        for c in 0..T::N_COMPONENTS {
            out.push(v.component(c));
        }
    }
    out
}

/// 分量序列还原为场值
pub fn unflatten<T: FieldValue>(data: &[f64]) -> Vec<T> {
    data.chunks_exact(T::N_COMPONENTS)
        .map(|chunk| T::from_components(chunk).unwrap_or(T::ZERO))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Vector;

    #[test]
    fn test_serial_has_no_peers() {
        assert!(!SERIAL.is_parallel());
        assert!(SERIAL.is_master());
        assert!(SERIAL.send(1, 0, vec![1.0]).is_err());
    }

    #[test]
    fn test_flatten_vectors() {
        let v = vec![Vector::new(1.0, 2.0, 3.0), Vector::new(4.0, 5.0, 6.0)];
        let flat = flatten(&v);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(unflatten::<Vector>(&flat), v);
    }
}
