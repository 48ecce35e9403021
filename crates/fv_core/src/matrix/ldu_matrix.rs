// crates/fv_core/src/matrix/ldu_matrix.rs

//! LDU 稀疏矩阵
//!
//! 按网格面寻址的稀疏矩阵：每个单元一个对角系数，每个内部面一个上三角系数
//! （`lower` 行、`upper` 列）与一个下三角系数（`upper` 行、`lower` 列）。
//! 下三角缺省时矩阵对称，`lower == upper`。
//!
//! ```text
//! 行 l: ... diag[l]·ψ[l] + upper[f]·ψ[u] ...
//! 行 u: ... lower[f]·ψ[l] + diag[u]·ψ[u] ...
//! ```
//!
//! 系数只能加到存在的单元或面上，拓扑与网格完全一致。

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use fv_foundation::{FvError, FvResult};
use fv_mesh::LduAddressing;

use super::interface::CoupledInterfaces;

/// 对角系数视图
#[derive(Debug, Clone, Copy)]
pub struct DiagonalView<'a> {
    /// 对角系数
    pub diag: &'a [f64],
}

/// 非对角系数视图
#[derive(Debug, Clone, Copy)]
pub struct OffDiagonalView<'a> {
    /// 面 owner
    pub l: &'a [usize],
    /// 面 neighbour
    pub u: &'a [usize],
    /// 上三角系数
    pub upper: &'a [f64],
    /// 下三角系数（对称矩阵时与 `upper` 相同）
    pub lower: &'a [f64],
}

/// LDU 稀疏矩阵
#[derive(Debug, Clone)]
pub struct LduMatrix {
    addr: Arc<LduAddressing>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    lower: Option<Vec<f64>>,
}

impl LduMatrix {
    /// 创建零矩阵（对称）
    pub fn new(addr: Arc<LduAddressing>) -> Self {
        let n_cells = addr.size();
        let n_faces = addr.n_faces();
        Self {
            addr,
            diag: vec![0.0; n_cells],
            upper: vec![0.0; n_faces],
            lower: None,
        }
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 寻址
    #[inline]
    pub fn addr(&self) -> &LduAddressing {
        &self.addr
    }

    /// 共享寻址
    #[inline]
    pub fn shared_addr(&self) -> &Arc<LduAddressing> {
        &self.addr
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.diag.len()
    }

    /// 内部面数（非对角系数对数）
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.upper.len()
    }

    /// 对角系数
    #[inline]
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    /// 可变对角系数
    #[inline]
    pub fn diag_mut(&mut self) -> &mut [f64] {
        &mut self.diag
    }

    /// 上三角系数
    #[inline]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// 可变上三角系数
    ///
    /// 对称矩阵修改上三角即同时修改下三角。
    #[inline]
    pub fn upper_mut(&mut self) -> &mut [f64] {
        &mut self.upper
    }

    /// 下三角系数
    #[inline]
    pub fn lower(&self) -> &[f64] {
        self.lower.as_deref().unwrap_or(&self.upper)
    }

    /// 可变下三角系数，对称矩阵先转为非对称
    pub fn lower_mut(&mut self) -> &mut [f64] {
        let upper = &self.upper;
        self.lower.get_or_insert_with(|| upper.clone())
    }

    /// 是否对称（未单独存储下三角）
    #[inline]
    pub fn is_symmetric(&self) -> bool {
        self.lower.is_none()
    }

    /// 是否非对称
    #[inline]
    pub fn is_asymmetric(&self) -> bool {
        self.lower.is_some()
    }

    /// 对角视图
    pub fn diagonal_view(&self) -> DiagonalView<'_> {
        DiagonalView { diag: &self.diag }
    }

    /// 非对角视图
    pub fn off_diagonal_view(&self) -> OffDiagonalView<'_> {
        OffDiagonalView {
            l: self.addr.lower(),
            u: self.addr.upper(),
            upper: &self.upper,
            lower: self.lower(),
        }
    }

    // ========================================================================
    // 装配
    // ========================================================================

    /// 对角系数累加
    pub fn add_to_diagonal(&mut self, cell: usize, value: f64) -> FvResult<()> {
        let n = self.diag.len();
        let d = self
            .diag
            .get_mut(cell)
            .ok_or_else(|| FvError::addressing(format!("单元 {cell} 不存在（共 {n} 个单元）")))?;
        *d += value;
        Ok(())
    }

    /// 对称非对角系数累加（owner 行与 neighbour 行同值）
    pub fn add_to_off_diagonal(&mut self, face: usize, value: f64) -> FvResult<()> {
        self.check_face(face)?;
        self.upper[face] += value;
        if let Some(lower) = &mut self.lower {
            lower[face] += value;
        }
        Ok(())
    }

    /// 上三角系数累加（owner 行、neighbour 列）
    pub fn add_to_upper(&mut self, face: usize, value: f64) -> FvResult<()> {
        self.check_face(face)?;
        // 对称矩阵只改上三角时下三角要先分离
        self.lower_mut();
        self.upper[face] += value;
        Ok(())
    }

    /// 下三角系数累加（neighbour 行、owner 列）
    pub fn add_to_lower(&mut self, face: usize, value: f64) -> FvResult<()> {
        self.check_face(face)?;
        self.lower_mut()[face] += value;
        Ok(())
    }

    fn check_face(&self, face: usize) -> FvResult<()> {
        if face >= self.upper.len() {
            return Err(FvError::addressing(format!(
                "面 {face} 不是内部面（共 {} 个内部面）",
                self.upper.len()
            )));
        }
        Ok(())
    }

    /// 对角取为非对角系数之和的相反数
    pub fn neg_sum_diag(&mut self) {
        let l = self.addr.lower();
        let u = self.addr.upper();
        let lower = self.lower.as_deref().unwrap_or(&self.upper);
        for f in 0..self.upper.len() {
            self.diag[l[f]] -= lower[f];
            self.diag[u[f]] -= self.upper[f];
        }
    }

    /// 对角加上非对角系数之和
    pub fn sum_diag(&mut self) {
        let l = self.addr.lower();
        let u = self.addr.upper();
        let lower = self.lower.as_deref().unwrap_or(&self.upper);
        for f in 0..self.upper.len() {
            self.diag[l[f]] += lower[f];
            self.diag[u[f]] += self.upper[f];
        }
    }

    /// 每行非对角系数绝对值之和
    pub fn sum_mag_off_diag(&self) -> Vec<f64> {
        let l = self.addr.lower();
        let u = self.addr.upper();
        let lower = self.lower();
        let mut out = vec![0.0; self.n_cells()];
        for f in 0..self.upper.len() {
            out[l[f]] += self.upper[f].abs();
            out[u[f]] += lower[f].abs();
        }
        out
    }

    /// 全部系数乘以标量
    pub fn scale(&mut self, s: f64) {
        self.diag.iter_mut().for_each(|d| *d *= s);
        self.upper.iter_mut().for_each(|v| *v *= s);
        if let Some(lower) = &mut self.lower {
            lower.iter_mut().for_each(|v| *v *= s);
        }
    }

    /// 取负
    pub fn negate(&mut self) {
        self.scale(-1.0);
    }

    /// 矩阵相加（寻址必须一致）
    pub fn add(&mut self, other: &LduMatrix) -> FvResult<()> {
        if !Arc::ptr_eq(&self.addr, &other.addr) && *self.addr != *other.addr {
            return Err(FvError::addressing("矩阵寻址不一致，无法相加"));
        }
        for (a, b) in self.diag.iter_mut().zip(other.diag.iter()) {
            *a += b;
        }
        if other.is_asymmetric() {
            let lower = self.lower_mut();
            for (a, b) in lower.iter_mut().zip(other.lower().iter()) {
                *a += b;
            }
        } else if let Some(lower) = &mut self.lower {
            for (a, b) in lower.iter_mut().zip(other.upper.iter()) {
                *a += b;
            }
        }
        for (a, b) in self.upper.iter_mut().zip(other.upper.iter()) {
            *a += b;
        }
        Ok(())
    }

    // ========================================================================
    // 矩阵运算
    // ========================================================================

    /// 单行乘积（不含耦合接口）
    #[inline]
    fn row_product(&self, cell: usize, psi: &[f64]) -> f64 {
        let u = self.addr.upper();
        let l = self.addr.lower();
        let lower = self.lower();
        let mut sum = self.diag[cell] * psi[cell];
        for f in self.addr.owner_faces(cell) {
            sum += self.upper[f] * psi[u[f]];
        }
        for &f in self.addr.neighbour_faces(cell) {
            sum += lower[f] * psi[l[f]];
        }
        sum
    }

    /// `result = A·ψ`，含耦合接口贡献
    pub fn amul(
        &self,
        psi: &[f64],
        result: &mut [f64],
        interfaces: Option<&CoupledInterfaces<'_>>,
    ) -> FvResult<()> {
        FvError::check_size("psi", self.n_cells(), psi.len())?;
        FvError::check_size("result", self.n_cells(), result.len())?;

        #[cfg(feature = "parallel")]
        result
            .par_iter_mut()
            .enumerate()
            .for_each(|(cell, r)| *r = self.row_product(cell, psi));

        #[cfg(not(feature = "parallel"))]
        for (cell, r) in result.iter_mut().enumerate() {
            *r = self.row_product(cell, psi);
        }

        if let Some(interfaces) = interfaces {
            interfaces.update(psi, result)?;
        }
        Ok(())
    }

    /// 残差 `r = b - A·ψ`，含耦合接口贡献
    pub fn residual(
        &self,
        psi: &[f64],
        source: &[f64],
        interfaces: Option<&CoupledInterfaces<'_>>,
        r: &mut [f64],
    ) -> FvResult<()> {
        FvError::check_size("source", self.n_cells(), source.len())?;
        self.amul(psi, r, interfaces)?;
        for (ri, &bi) in r.iter_mut().zip(source.iter()) {
            *ri = bi - *ri;
        }
        Ok(())
    }

    /// H 算子：`H(ψ) = -Σ_N a_N ψ_N`（非对角部分作用）
    pub fn h_operator(&self, psi: &[f64]) -> Vec<f64> {
        let l = self.addr.lower();
        let u = self.addr.upper();
        let lower = self.lower();
        let mut h = vec![0.0; self.n_cells()];
        for f in 0..self.upper.len() {
            h[u[f]] -= lower[f] * psi[l[f]];
            h[l[f]] -= self.upper[f] * psi[u[f]];
        }
        h
    }

    /// 稠密形式（按行），用于诊断与小规模测试
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.n_cells();
        let mut a = vec![vec![0.0; n]; n];
        for (c, row) in a.iter_mut().enumerate() {
            row[c] = self.diag[c];
        }
        let l = self.addr.lower();
        let u = self.addr.upper();
        let lower = self.lower();
        for f in 0..self.upper.len() {
            a[l[f]][u[f]] += self.upper[f];
            a[u[f]][l[f]] += lower[f];
        }
        a
    }
}
