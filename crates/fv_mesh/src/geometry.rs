// crates/fv_mesh/src/geometry.rs

//! 多面体几何
//!
//! - 面：以顶点平均点为公共顶点做三角剖分，面心为各三角形形心的面积加权平均，
//!   面积矢量为各三角形面积矢量之和（方向由顶点顺序按右手定则确定）
//! - 单元：以面心平均点为公共顶点做棱锥剖分，单元中心为各棱锥形心的体积加权平均
//!
//! 面积矢量由 owner 指向 neighbour（边界面指向域外）。

use glam::DVec3;

use fv_foundation::VSMALL;

/// 计算单个面的面心与面积矢量
pub fn face_centre_and_area(points: &[DVec3], face: &[usize]) -> (DVec3, DVec3) {
    let n = face.len();
    if n == 3 {
        let (a, b, c) = (points[face[0]], points[face[1]], points[face[2]]);
        return ((a + b + c) / 3.0, 0.5 * (b - a).cross(c - a));
    }

    let estimate = face.iter().map(|&p| points[p]).sum::<DVec3>() / n as f64;

    let mut sum_n = DVec3::ZERO;
    let mut sum_a = 0.0;
    let mut sum_ac = DVec3::ZERO;
    for i in 0..n {
        let p = points[face[i]];
        let next = points[face[(i + 1) % n]];
        let c = p + next + estimate;
        let normal = (next - p).cross(estimate - p);
        let a = normal.length();
        sum_n += normal;
        sum_a += a;
        sum_ac += a * c;
    }

    let centre = if sum_a < VSMALL {
        estimate
    } else {
        sum_ac / (3.0 * sum_a)
    };
    (centre, 0.5 * sum_n)
}

/// 计算全部单元的中心与体积
///
/// `owner` 覆盖全部面，`neighbour` 只覆盖内部面。
pub fn cell_centres_and_volumes(
    n_cells: usize,
    owner: &[usize],
    neighbour: &[usize],
    face_centres: &[DVec3],
    face_areas: &[DVec3],
) -> (Vec<DVec3>, Vec<f64>) {
    // 面心平均作为估计中心
    let mut estimate = vec![DVec3::ZERO; n_cells];
    let mut n_faces = vec![0usize; n_cells];
    for (f, &o) in owner.iter().enumerate() {
        estimate[o] += face_centres[f];
        n_faces[o] += 1;
    }
    for (f, &n) in neighbour.iter().enumerate() {
        estimate[n] += face_centres[f];
        n_faces[n] += 1;
    }
    for (e, &k) in estimate.iter_mut().zip(n_faces.iter()) {
        if k > 0 {
            *e /= k as f64;
        }
    }

    let mut centres = vec![DVec3::ZERO; n_cells];
    let mut volumes = vec![0.0; n_cells];

    let mut accumulate = |cell: usize, face: usize, sign: f64| {
        let pyr3_vol = sign * face_areas[face].dot(face_centres[face] - estimate[cell]);
        let pyr_centre = 0.75 * face_centres[face] + 0.25 * estimate[cell];
        centres[cell] += pyr3_vol * pyr_centre;
        volumes[cell] += pyr3_vol;
    };

    for (f, &o) in owner.iter().enumerate() {
        accumulate(o, f, 1.0);
    }
    for (f, &n) in neighbour.iter().enumerate() {
        accumulate(n, f, -1.0);
    }

    for cell in 0..n_cells {
        if volumes[cell].abs() > VSMALL {
            centres[cell] /= volumes[cell];
        } else {
            centres[cell] = estimate[cell];
        }
        volumes[cell] /= 3.0;
    }

    (centres, volumes)
}
