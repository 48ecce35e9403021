// crates/fv_core/src/parallel/thread_comm.rs

//! 进程内多线程通信器
//!
//! 每个分区运行在独立线程中，分区之间通过通道传递消息。
//! 每个进程有一个收件箱：先到的、暂时不需要的消息按 `(from, tag)` 暂存。

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use parking_lot::Mutex;

use fv_foundation::{FvError, FvResult};

use super::comm::Communicator;

/// 默认接收超时
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Envelope {
    from: usize,
    tag: u32,
    data: Vec<f64>,
}

/// 进程内多线程通信器
#[derive(Debug)]
pub struct ThreadCommunicator {
    rank: usize,
    senders: Vec<Sender<Envelope>>,
    receiver: Mutex<Receiver<Envelope>>,
    mailbox: Mutex<HashMap<(usize, u32), VecDeque<Vec<f64>>>>,
    timeout: Duration,
}

impl ThreadCommunicator {
    /// 创建 `n_ranks` 个互相连接的通信器，第 i 个属于进程 i
    pub fn create(n_ranks: usize) -> Vec<ThreadCommunicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..n_ranks).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ThreadCommunicator {
                rank,
                senders: senders.clone(),
                receiver: Mutex::new(receiver),
                mailbox: Mutex::new(HashMap::new()),
                timeout: DEFAULT_TIMEOUT,
            })
            .collect()
    }

    /// 设置接收超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn take_from_mailbox(&self, from: usize, tag: u32) -> Option<Vec<f64>> {
        self.mailbox
            .lock()
            .get_mut(&(from, tag))
            .and_then(VecDeque::pop_front)
    }

    fn check_len(&self, from: usize, tag: u32, expected: usize, data: Vec<f64>) -> FvResult<Vec<f64>> {
        if data.len() != expected {
            return Err(FvError::MessageSizeMismatch {
                from,
                to: self.rank,
                tag,
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn n_ranks(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, to: usize, tag: u32, data: Vec<f64>) -> FvResult<()> {
        let sender = self
            .senders
            .get(to)
            .ok_or_else(|| FvError::index_out_of_bounds("Rank", to, self.senders.len()))?;
        sender
            .send(Envelope {
                from: self.rank,
                tag,
                data,
            })
            .map_err(|_| FvError::communication(format!("进程 {to} 已退出")))
    }

    fn recv(&self, from: usize, tag: u32, expected_len: usize) -> FvResult<Vec<f64>> {
        if let Some(data) = self.take_from_mailbox(from, tag) {
            return self.check_len(from, tag, expected_len, data);
        }

        let receiver = self.receiver.lock();
        loop {
            let envelope = receiver.recv_timeout(self.timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => FvError::communication(format!(
                    "进程 {} 等待来自进程 {from} 的消息 (tag {tag}) 超时",
                    self.rank
                )),
                RecvTimeoutError::Disconnected => {
                    FvError::communication(format!("进程 {} 的通道已断开", self.rank))
                }
            })?;

            if envelope.from == from && envelope.tag == tag {
                return self.check_len(from, tag, expected_len, envelope.data);
            }
            self.mailbox
                .lock()
                .entry((envelope.from, envelope.tag))
                .or_default()
                .push_back(envelope.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_messages_are_held() {
        let comms = ThreadCommunicator::create(2);
        comms[0].send(1, 7, vec![7.0]).unwrap();
        comms[0].send(1, 3, vec![3.0, 3.0]).unwrap();
        assert_eq!(comms[1].recv(0, 3, 2).unwrap(), vec![3.0, 3.0]);
        assert_eq!(comms[1].recv(0, 7, 1).unwrap(), vec![7.0]);
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let comms = ThreadCommunicator::create(2);
        comms[1].send(0, 1, vec![1.0, 2.0, 3.0]).unwrap();
        let err = comms[0].recv(1, 1, 4).unwrap_err();
        assert!(matches!(
            err,
            FvError::MessageSizeMismatch { expected: 4, actual: 3, .. }
        ));
    }

    #[test]
    fn test_timeout() {
        let mut comms = ThreadCommunicator::create(2);
        let c0 = comms.remove(0).with_timeout(Duration::from_millis(10));
        assert!(c0.recv(1, 0, 1).is_err());
    }
}
