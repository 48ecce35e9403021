// crates/fv_mesh/src/addressing.rs

//! LDU 寻址
//!
//! 稀疏矩阵按内部面寻址：面 `f` 连接 `lower[f]`（owner）与 `upper[f]`
//! （neighbour），且 `lower[f] < upper[f]`。面按 (lower, upper) 升序排列，
//! 因此每个单元作为 owner 的面是连续的一段（`owner_start`），
//! 作为 neighbour 的面通过 `losort` 间接访问。
//!
//! ```
//! use fv_mesh::LduAddressing;
//!
//! // 三个单元连成一条线
//! let addr = LduAddressing::new(3, vec![0, 1], vec![1, 2]).unwrap();
//! assert_eq!(addr.owner_faces(1), 1..2);
//! assert_eq!(addr.neighbour_faces(1), &[0]);
//! ```

use std::ops::Range;

use fv_foundation::{FvError, FvResult};

/// LDU 寻址
#[derive(Debug, Clone, PartialEq)]
pub struct LduAddressing {
    /// 单元数
    n_cells: usize,
    /// 每个面的 owner
    lower: Vec<usize>,
    /// 每个面的 neighbour
    upper: Vec<usize>,
    /// 单元作为 owner 的面起始位置（长度 n_cells + 1）
    owner_start: Vec<usize>,
    /// 按 upper 排序的面索引
    losort: Vec<usize>,
    /// 单元在 losort 中的起始位置（长度 n_cells + 1）
    losort_start: Vec<usize>,
}

impl LduAddressing {
    /// 创建并校验寻址
    ///
    /// # 错误
    ///
    /// - `lower`/`upper` 长度不同
    /// - 某个面两侧单元相同、`lower >= upper` 或单元索引越界
    /// - 面不是按 (lower, upper) 升序排列
    pub fn new(n_cells: usize, lower: Vec<usize>, upper: Vec<usize>) -> FvResult<Self> {
        FvError::check_size("upper", lower.len(), upper.len())?;

        for (face, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if u >= n_cells {
                return Err(FvError::addressing(format!(
                    "面 {face} 的 neighbour {u} 超出单元数 {n_cells}"
                )));
            }
            if l >= u {
                return Err(FvError::addressing(format!(
                    "面 {face} 的 owner {l} 必须小于 neighbour {u}"
                )));
            }
            if face > 0 && (lower[face - 1], upper[face - 1]) > (l, u) {
                return Err(FvError::addressing(format!(
                    "面 {face} ({l}, {u}) 不满足上三角顺序，前一面为 ({}, {})",
                    lower[face - 1],
                    upper[face - 1]
                )));
            }
        }

        let owner_start = Self::start_table(n_cells, &lower);

        // losort：按 upper 计数排序，同一 upper 内保持面序
        let losort_start = Self::start_table_unsorted(n_cells, &upper);
        let mut losort = vec![0usize; lower.len()];
        let mut cursor = losort_start.clone();
        for (face, &u) in upper.iter().enumerate() {
            losort[cursor[u]] = face;
            cursor[u] += 1;
        }

        Ok(Self {
            n_cells,
            lower,
            upper,
            owner_start,
            losort,
            losort_start,
        })
    }

    /// 已排序序列的起始表
    fn start_table(n_cells: usize, sorted: &[usize]) -> Vec<usize> {
        let mut start = vec![0usize; n_cells + 1];
        let mut face = 0;
        for (cell, s) in start.iter_mut().enumerate().take(n_cells) {
            *s = face;
            while face < sorted.len() && sorted[face] == cell {
                face += 1;
            }
        }
        start[n_cells] = sorted.len();
        start
    }

    /// 计数得到的起始表
    fn start_table_unsorted(n_cells: usize, cells: &[usize]) -> Vec<usize> {
        let mut count = vec![0usize; n_cells];
        for &c in cells {
            count[c] += 1;
        }
        let mut start = Vec::with_capacity(n_cells + 1);
        start.push(0);
        for &c in &count {
            let last = start.last().copied().unwrap_or(0);
            start.push(last + c);
        }
        start
    }

    /// 单元数（矩阵阶数）
    #[inline]
    pub fn size(&self) -> usize {
        self.n_cells
    }

    /// 内部面数（每个上/下三角的非零元数）
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.lower.len()
    }

    /// owner 数组
    #[inline]
    pub fn lower(&self) -> &[usize] {
        &self.lower
    }

    /// neighbour 数组
    #[inline]
    pub fn upper(&self) -> &[usize] {
        &self.upper
    }

    /// owner 起始表
    #[inline]
    pub fn owner_start(&self) -> &[usize] {
        &self.owner_start
    }

    /// 按 upper 排序的面
    #[inline]
    pub fn losort(&self) -> &[usize] {
        &self.losort
    }

    /// losort 起始表
    #[inline]
    pub fn losort_start(&self) -> &[usize] {
        &self.losort_start
    }

    /// 单元作为 owner 的面
    #[inline]
    pub fn owner_faces(&self, cell: usize) -> Range<usize> {
        self.owner_start[cell]..self.owner_start[cell + 1]
    }

    /// 单元作为 neighbour 的面
    #[inline]
    pub fn neighbour_faces(&self, cell: usize) -> &[usize] {
        &self.losort[self.losort_start[cell]..self.losort_start[cell + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 网格：0-1, 0-2, 1-3, 2-3
    fn quad() -> LduAddressing {
        LduAddressing::new(4, vec![0, 0, 1, 2], vec![1, 2, 3, 3]).unwrap()
    }

    #[test]
    fn test_owner_start() {
        let a = quad();
        assert_eq!(a.owner_start(), &[0, 2, 3, 4, 4]);
        assert_eq!(a.owner_faces(0), 0..2);
        assert!(a.owner_faces(3).is_empty());
    }

    #[test]
    fn test_losort() {
        let a = quad();
        assert_eq!(a.losort_start(), &[0, 0, 1, 2, 4]);
        assert_eq!(a.neighbour_faces(3), &[2, 3]);
        assert_eq!(a.neighbour_faces(0), &[] as &[usize]);
    }

    #[test]
    fn test_rejects_same_cell() {
        let err = LduAddressing::new(2, vec![1], vec![1]).unwrap_err();
        assert!(matches!(err, FvError::Addressing { .. }));
    }

    #[test]
    fn test_rejects_out_of_order() {
        assert!(LduAddressing::new(3, vec![1, 0], vec![2, 1]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(LduAddressing::new(2, vec![0], vec![5]).is_err());
    }
}
