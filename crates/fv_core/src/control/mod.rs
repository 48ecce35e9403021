// crates/fv_core/src/control/mod.rs

//! 外迭代控制

mod solution_control;

pub use solution_control::SolutionControl;
