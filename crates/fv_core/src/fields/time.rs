// crates/fv_core/src/fields/time.rs

//! 时间状态

use fv_config::ControlDict;

/// 时间步状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeState {
    value: f64,
    delta_t: f64,
    delta_t0: f64,
    last_step: f64,
    index: usize,
    end_time: f64,
}

impl TimeState {
    /// 创建
    pub fn new(start_time: f64, delta_t: f64, end_time: f64) -> Self {
        Self {
            value: start_time,
            delta_t,
            delta_t0: delta_t,
            last_step: delta_t,
            index: 0,
            end_time,
        }
    }

    /// 从 controlDict 创建
    pub fn from_control(control: &ControlDict) -> Self {
        Self::new(control.start_time, control.delta_t, control.end_time)
    }

    /// 当前时间
    pub fn value(&self) -> f64 {
        self.value
    }

    /// 当前时间步长
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// 上一时间步长
    pub fn delta_t0(&self) -> f64 {
        self.delta_t0
    }

    /// 时间步序号（初始为 0）
    pub fn index(&self) -> usize {
        self.index
    }

    /// 结束时间
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// 修改下一步的时间步长
    pub fn set_delta_t(&mut self, delta_t: f64) {
        self.delta_t = delta_t;
    }

    /// 是否还需推进
    pub fn running(&self) -> bool {
        self.value < self.end_time - 1e-6 * self.delta_t
    }

    /// 推进一个时间步
    pub fn advance(&mut self) {
        if self.index > 0 {
            self.delta_t0 = self.last_step;
        }
        self.value += self.delta_t;
        self.last_step = self.delta_t;
        self.index += 1;
    }
}
