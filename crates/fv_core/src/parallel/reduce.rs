// crates/fv_core/src/parallel/reduce.rs

//! 全局归约
//!
//! 各进程把本地值发送到主进程，主进程合并后广播。所有进程必须以相同顺序
//! 调用归约。单进程时直接返回本地值。

use fv_foundation::FvResult;

use super::comm::Communicator;

/// 归约消息标签
const REDUCE_TAG: u32 = u32::MAX - 1;
/// 广播消息标签
const BROADCAST_TAG: u32 = u32::MAX - 2;

/// 对一组值逐元素归约
pub fn all_reduce(
    comm: &dyn Communicator,
    values: &mut [f64],
    op: fn(f64, f64) -> f64,
) -> FvResult<()> {
    if !comm.is_parallel() {
        return Ok(());
    }
    let n = values.len();
    if comm.is_master() {
        for from in 1..comm.n_ranks() {
            let remote = comm.recv(from, REDUCE_TAG, n)?;
            for (v, r) in values.iter_mut().zip(remote) {
                *v = op(*v, r);
            }
        }
        for to in 1..comm.n_ranks() {
            comm.send(to, BROADCAST_TAG, values.to_vec())?;
        }
    } else {
        comm.send(0, REDUCE_TAG, values.to_vec())?;
        let result = comm.recv(0, BROADCAST_TAG, n)?;
        values.copy_from_slice(&result);
    }
    Ok(())
}

/// 全局求和
pub fn sum(comm: &dyn Communicator, value: f64) -> FvResult<f64> {
    let mut v = [value];
    all_reduce(comm, &mut v, |a, b| a + b)?;
    Ok(v[0])
}

/// 全局最大值
pub fn max(comm: &dyn Communicator, value: f64) -> FvResult<f64> {
    let mut v = [value];
    all_reduce(comm, &mut v, f64::max)?;
    Ok(v[0])
}

/// 全局最小值
pub fn min(comm: &dyn Communicator, value: f64) -> FvResult<f64> {
    let mut v = [value];
    all_reduce(comm, &mut v, f64::min)?;
    Ok(v[0])
}

/// 全局逻辑与
pub fn and(comm: &dyn Communicator, value: bool) -> FvResult<bool> {
    let v = min(comm, if value { 1.0 } else { 0.0 })?;
    Ok(v > 0.5)
}

/// 全局整数求和
pub fn sum_count(comm: &dyn Communicator, value: usize) -> FvResult<usize> {
    Ok(sum(comm, value as f64)?.round() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{ThreadCommunicator, SERIAL};

    #[test]
    fn test_serial_passthrough() {
        assert_eq!(sum(&SERIAL, 3.5).unwrap(), 3.5);
        assert!(and(&SERIAL, true).unwrap());
    }

    #[test]
    fn test_threaded_reductions() {
        let comms = ThreadCommunicator::create(3);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    let r = comm.rank() as f64;
                    let s = sum(&comm, r + 1.0).unwrap();
                    let m = max(&comm, r).unwrap();
                    let all = and(&comm, comm.rank() != 1).unwrap();
                    (s, m, all)
                })
            })
            .collect();
        for h in handles {
            let (s, m, all) = h.join().unwrap();
            assert_eq!(s, 6.0);
            assert_eq!(m, 2.0);
            assert!(!all);
        }
    }
}
