// crates/fv_core/tests/parallel_solve.rs

//! 分区并行求解一致性测试
//!
//! 每个分区一个线程，通过 [`ThreadCommunicator`] 交换 processor 边界值。
//! 分区求解结果必须与串行求解一致。

use std::sync::Arc;
use std::thread;

use fv_config::{Dictionary, FvSchemes, FvSolution, SolverControls};
use fv_core::parallel::{reduce, CommsType};
use fv_core::prelude::*;
use fv_core::registry;
use fv_mesh::{BlockMesh, PolyMesh};
use serde_json::json;

// ============================================================================
// 测试辅助函数
// ============================================================================

const N_CELLS: usize = 9;

fn schemes() -> FvSchemes {
    FvSchemes::new(
        Dictionary::from_value(
            "fvSchemes",
            json!({
                "ddtSchemes": { "default": "Euler" },
                "gradSchemes": { "default": "Gauss linear" },
                "divSchemes": { "default": "none", "div(phi,T)": "Gauss upwind" },
                "laplacianSchemes": { "default": "Gauss linear corrected" },
                "interpolationSchemes": { "default": "linear" },
                "snGradSchemes": { "default": "corrected" }
            }),
        )
        .unwrap(),
    )
}

fn solution(solver: &str, preconditioner: &str) -> FvSolution {
    FvSolution::new(
        Dictionary::from_value(
            "fvSolution",
            json!({
                "solvers": {
                    "T": { "solver": solver, "preconditioner": preconditioner, "tolerance": 1e-13 }
                }
            }),
        )
        .unwrap(),
    )
}

fn temperature(mesh: &Arc<FvMesh>) -> VolField<f64> {
    let dict = Dictionary::from_value(
        "T",
        json!({
            "dimensions": [0, 0, 0, 1, 0, 0, 0],
            "internalField": 0.0,
            "boundaryField": {
                "xmin": { "type": "fixedValue", "value": 0.0 },
                "xmax": { "type": "fixedValue", "value": 9.0 }
            }
        }),
    )
    .unwrap();
    VolField::from_dict("T", mesh, &dict).unwrap()
}

/// 速度 (1, 0, 0) 的体积通量 `U·Sf`，processor 面按本侧外法向取号
fn unit_x_flux(mesh: &Arc<FvMesh>) -> SurfaceField<f64> {
    let internal = mesh.sf().iter().map(|s| s.x).collect();
    let boundary = mesh
        .boundary()
        .iter()
        .map(|p| p.sf().iter().map(|s| s.x).collect())
        .collect();
    SurfaceField::new("phi", mesh, DimensionSet::VOLUMETRIC_FLUX, internal, boundary).unwrap()
}

/// 每个分区求解 `-∇·(DT∇T) + ∇·(φT) = 0`，返回 (单元中心 x, 解)
fn solve_partition(mesh: Arc<FvMesh>, with_convection: bool) -> Vec<(f64, f64)> {
    let mut t = temperature(&mesh);
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 0.5);
    let mut eqn = -fvm::laplacian(&dt, &t).unwrap();
    if with_convection {
        let phi = unit_x_flux(&mesh);
        eqn = (eqn + fvm::div(&phi, &t).unwrap()).unwrap();
    }
    let perf = eqn.solve(&mut t).unwrap();
    assert!(perf.converged(), "rank {}: {perf}", mesh.comm().rank());
    mesh.cell_centres()
        .iter()
        .map(|c| c.x)
        .zip(t.internal().iter().copied())
        .collect()
}

fn run_parallel(
    n_parts: usize,
    solution: FvSolution,
    comms_type: CommsType,
    with_convection: bool,
) -> Vec<(f64, f64)> {
    registry::initialise().unwrap();
    let parts: Vec<PolyMesh> = BlockMesh::one_dimensional(N_CELLS, N_CELLS as f64)
        .decompose_x(n_parts)
        .unwrap();
    let handles: Vec<_> = parts
        .into_iter()
        .zip(ThreadCommunicator::create(n_parts))
        .map(|(poly, comm)| {
            let solution = solution.clone();
            thread::spawn(move || {
                let mesh = Arc::new(
                    FvMesh::new(poly, Arc::new(comm))
                        .unwrap()
                        .with_schemes(schemes())
                        .with_solution(solution)
                        .with_comms_type(comms_type),
                );
                assert!(mesh.schedule().is_well_formed(mesh.boundary().len()));
                solve_partition(mesh, with_convection)
            })
        })
        .collect();
    let mut all: Vec<(f64, f64)> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0));
    all
}

fn run_serial(solution: FvSolution, with_convection: bool) -> Vec<(f64, f64)> {
    registry::initialise().unwrap();
    let poly = BlockMesh::one_dimensional(N_CELLS, N_CELLS as f64).build().unwrap();
    let mesh = Arc::new(
        FvMesh::serial(poly)
            .unwrap()
            .with_schemes(schemes())
            .with_solution(solution),
    );
    solve_partition(mesh, with_convection)
}

fn assert_close(parallel: &[(f64, f64)], serial: &[(f64, f64)], tol: f64) {
    assert_eq!(parallel.len(), serial.len());
    for ((xp, vp), (xs, vs)) in parallel.iter().zip(serial) {
        assert!((xp - xs).abs() < 1e-12);
        assert!((vp - vs).abs() < tol, "x = {xp}: {vp} vs {vs}");
    }
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_two_partition_diffusion_matches_serial() {
    let parallel = run_parallel(2, solution("PCG", "DIC"), CommsType::NonBlocking, false);
    let serial = run_serial(solution("PCG", "DIC"), false);
    assert_close(&parallel, &serial, 1e-9);
    // 线性剖面在离散后仍精确
    for (x, v) in &parallel {
        assert!((v - x).abs() < 1e-9);
    }
}

#[test]
fn test_three_partitions_blocking() {
    let parallel = run_parallel(3, solution("PCG", "diagonal"), CommsType::Blocking, false);
    let serial = run_serial(solution("PCG", "diagonal"), false);
    assert_close(&parallel, &serial, 1e-9);
}

#[test]
fn test_partitioned_convection_diffusion() {
    let parallel = run_parallel(3, solution("PBiCGStab", "DILU"), CommsType::NonBlocking, true);
    let serial = run_serial(solution("PBiCGStab", "DILU"), true);
    assert_close(&parallel, &serial, 1e-8);
}

#[test]
fn test_global_reductions_agree_on_every_rank() {
    let handles: Vec<_> = ThreadCommunicator::create(4)
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let r = comm.rank() as f64;
                (
                    reduce::sum(&comm, r).unwrap(),
                    reduce::max(&comm, r).unwrap(),
                    reduce::min(&comm, r).unwrap(),
                    reduce::and(&comm, comm.rank() < 4).unwrap(),
                )
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), (6.0, 3.0, 0.0, true));
    }
}

#[test]
fn test_single_iteration_limit_reported_consistently() {
    let handles: Vec<_> = BlockMesh::one_dimensional(N_CELLS, N_CELLS as f64)
        .decompose_x(2)
        .unwrap()
        .into_iter()
        .zip(ThreadCommunicator::create(2))
        .map(|(poly, comm)| {
            thread::spawn(move || {
                registry::initialise().unwrap();
                let mesh = Arc::new(FvMesh::new(poly, Arc::new(comm)).unwrap().with_schemes(schemes()));
                let mut t = temperature(&mesh);
                let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1.0);
                let controls = SolverControls::new("PCG")
                    .with_tolerance(1e-14, 0.0)
                    .with_iterations(0, 1);
                let perf = (-fvm::laplacian(&dt, &t).unwrap())
                    .solve_with(&mut t, &controls)
                    .unwrap();
                (perf.n_iterations(), perf.initial_residual(), perf.status())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // 归约后的残差与状态在各分区相同
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0, 1);
    assert_eq!(results[0].2, SolverStatus::MaxIterations);
}
