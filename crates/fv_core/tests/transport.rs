// crates/fv_core/tests/transport.rs

//! 标量输运集成测试：fvm 装配 → 求解 → 边界更新
//!
//! # 测试覆盖
//!
//! - 一维稳态扩散（解析解）
//! - 瞬态扩散的守恒性（Euler / backward）
//! - 对流扩散收敛到稳态
//! - 按 fvSolution 选择求解器与外迭代控制
//! - 场字典读写往返

use std::sync::Arc;

use fv_config::{Dictionary, FvSchemes, FvSolution, SolverControls};
use fv_core::control::SolutionControl;
use fv_core::prelude::*;
use fv_core::registry;
use fv_mesh::BlockMesh;
use serde_json::{json, Value};

// ============================================================================
// 测试辅助函数
// ============================================================================

fn schemes(ddt: &str, div: &str) -> FvSchemes {
    FvSchemes::new(
        Dictionary::from_value(
            "fvSchemes",
            json!({
                "ddtSchemes": { "default": ddt },
                "gradSchemes": { "default": "Gauss linear" },
                "divSchemes": { "default": "none", "div(phi,T)": div },
                "laplacianSchemes": { "default": "Gauss linear corrected" },
                "interpolationSchemes": { "default": "linear" },
                "snGradSchemes": { "default": "corrected" }
            }),
        )
        .unwrap(),
    )
}

fn solution() -> FvSolution {
    FvSolution::new(
        Dictionary::from_value(
            "fvSolution",
            json!({
                "solvers": {
                    "T": { "solver": "PBiCGStab", "preconditioner": "DILU", "tolerance": 1e-12 },
                    "TFinal": { "solver": "PBiCGStab", "preconditioner": "DILU", "tolerance": 1e-13 }
                },
                "PIMPLE": {
                    "nOuterCorrectors": 2,
                    "residualControl": { "T": 1e-20 }
                }
            }),
        )
        .unwrap(),
    )
}

fn line_mesh(n: usize, length: f64, schemes: FvSchemes) -> Arc<FvMesh> {
    registry::initialise().unwrap();
    let poly = BlockMesh::one_dimensional(n, length).build().unwrap();
    Arc::new(
        FvMesh::serial(poly)
            .unwrap()
            .with_schemes(schemes)
            .with_solution(solution()),
    )
}

fn field(mesh: &Arc<FvMesh>, internal: Value, xmin: Value, xmax: Value) -> VolField<f64> {
    let dict = Dictionary::from_value(
        "T",
        json!({
            "dimensions": [0, 0, 0, 1, 0, 0, 0],
            "internalField": internal,
            "boundaryField": { "xmin": xmin, "xmax": xmax }
        }),
    )
    .unwrap();
    VolField::from_dict("T", mesh, &dict).unwrap()
}

fn total(t: &VolField<f64>) -> f64 {
    t.internal()
        .iter()
        .zip(t.mesh().volumes())
        .map(|(v, vol)| v * vol)
        .sum()
}

fn tight() -> SolverControls {
    SolverControls::new("PCG")
        .with_preconditioner("DIC")
        .with_tolerance(1e-13, 0.0)
}

// ============================================================================
// 稳态扩散
// ============================================================================

#[test]
fn test_steady_diffusion_three_cells() {
    let mesh = line_mesh(3, 3.0, schemes("steadyState", "Gauss upwind"));
    let mut t = field(
        &mesh,
        json!(0.0),
        json!({ "type": "fixedValue", "value": 0.0 }),
        json!({ "type": "fixedValue", "value": 10.0 }),
    );
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1.0);

    let eqn = -fvm::laplacian(&dt, &t).unwrap();
    let perf = eqn.solve_with(&mut t, &tight()).unwrap();
    assert!(perf.converged(), "{perf}");

    for (got, want) in t.internal().iter().zip([10.0 / 6.0, 5.0, 50.0 / 6.0]) {
        assert!((got - want).abs() < 1e-9, "{:?}", t.internal());
    }
    // 边界值不受求解影响
    let xmax = mesh.find_patch("xmax").unwrap();
    assert_eq!(t.boundary()[xmax].values(), &[10.0]);
}

#[test]
fn test_steady_diffusion_is_linear_profile() {
    let mesh = line_mesh(20, 1.0, schemes("steadyState", "Gauss upwind"));
    let mut t = field(
        &mesh,
        json!(0.0),
        json!({ "type": "fixedValue", "value": 1.0 }),
        json!({ "type": "fixedValue", "value": 3.0 }),
    );
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 0.1);
    (-fvm::laplacian(&dt, &t).unwrap())
        .solve_with(&mut t, &tight())
        .unwrap();

    for (v, c) in t.internal().iter().zip(mesh.cell_centres()) {
        assert!((v - (1.0 + 2.0 * c.x)).abs() < 1e-8);
    }
    let grad = fvc::grad(&t).unwrap();
    assert!(grad.internal().iter().all(|g| (g.x - 2.0).abs() < 1e-6));
}

#[test]
fn test_fixed_gradient_outlet() {
    let mesh = line_mesh(10, 1.0, schemes("steadyState", "Gauss upwind"));
    let mut t = field(
        &mesh,
        json!(0.0),
        json!({ "type": "fixedValue", "value": 0.0 }),
        json!({ "type": "fixedGradient", "gradient": 4.0 }),
    );
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1.0);
    (-fvm::laplacian(&dt, &t).unwrap())
        .solve_with(&mut t, &tight())
        .unwrap();

    for (v, c) in t.internal().iter().zip(mesh.cell_centres()) {
        assert!((v - 4.0 * c.x).abs() < 1e-8);
    }
    let xmax = mesh.find_patch("xmax").unwrap();
    assert!((t.boundary()[xmax].values()[0] - 4.0).abs() < 1e-8);
}

// ============================================================================
// 瞬态
// ============================================================================

fn pulse(n: usize) -> Value {
    let mut v = vec![0.0; n];
    v[n / 2] = 10.0;
    json!({ "nonuniform": v })
}

fn run_insulated(ddt_scheme: &str, steps: usize) -> (f64, f64, VolField<f64>) {
    let n = 11;
    let mesh = line_mesh(n, 1.0, schemes(ddt_scheme, "Gauss upwind"));
    let mut t = field(
        &mesh,
        pulse(n),
        json!({ "type": "zeroGradient" }),
        json!({ "type": "zeroGradient" }),
    );
    t.request_old_times(2);
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 0.01);
    let mut time = TimeState::new(0.0, 0.5, steps as f64 * 0.5);
    let before = total(&t);

    while time.running() {
        time.advance();
        t.store_old_times(time.index());
        let eqn = (fvm::ddt(&t, &time).unwrap() - fvm::laplacian(&dt, &t).unwrap()).unwrap();
        eqn.solve(&mut t).unwrap();
    }
    (before, total(&t), t)
}

#[test]
fn test_euler_diffusion_conserves_total() {
    let (before, after, t) = run_insulated("Euler", 10);
    assert!((before - after).abs() < 1e-9 * before);
    // 峰值被抹平但保持对称
    let n = t.internal().len();
    assert!(t.internal()[n / 2] < 10.0);
    for i in 0..n / 2 {
        assert!((t.internal()[i] - t.internal()[n - 1 - i]).abs() < 1e-9);
    }
}

#[test]
fn test_backward_diffusion_conserves_total() {
    let (before, after, t) = run_insulated("backward", 6);
    assert!((before - after).abs() < 1e-9 * before);
    assert_eq!(t.n_old_times(), 2);
}

#[test]
fn test_explicit_ddt_matches_implicit_residual() {
    let n = 5;
    let mesh = line_mesh(n, 1.0, schemes("Euler", "Gauss upwind"));
    let mut t = field(
        &mesh,
        pulse(n),
        json!({ "type": "zeroGradient" }),
        json!({ "type": "zeroGradient" }),
    );
    let mut time = TimeState::new(0.0, 0.25, 1.0);
    time.advance();
    t.store_old_times(time.index());
    t.internal_mut().iter_mut().for_each(|v| *v += 1.0);
    t.correct_boundary_conditions().unwrap();

    // ddt(T) 的隐式残差为 A·T - b，显式值乘体积后应一致
    let eqn = fvm::ddt(&t, &time).unwrap();
    let explicit = fvc::ddt(&t, &time).unwrap();
    let residual = eqn.residual(&t).unwrap();
    for ((r, e), vol) in residual.iter().zip(explicit.internal()).zip(mesh.volumes()) {
        assert!((-r - e * vol).abs() < 1e-12);
        assert!((e - 4.0).abs() < 1e-12);
    }
}

#[test]
fn test_convection_diffusion_reaches_steady_state() {
    let n = 20;
    let mesh = line_mesh(n, 1.0, schemes("Euler", "Gauss upwind"));
    let mut t = field(
        &mesh,
        json!(0.0),
        json!({ "type": "fixedValue", "value": 1.0 }),
        json!({ "type": "zeroGradient" }),
    );
    let area = mesh.mag_sf()[0];
    let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, area);
    let mut phi = phi;
    let xmin = mesh.find_patch("xmin").unwrap();
    phi.boundary_mut()[xmin].iter_mut().for_each(|v| *v = -*v);

    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1e-3);
    let mut time = TimeState::new(0.0, 0.05, 5.0);
    while time.running() {
        time.advance();
        t.store_old_times(time.index());
        let eqn = (fvm::ddt(&t, &time).unwrap() + fvm::div(&phi, &t).unwrap()).unwrap();
        let eqn = (eqn - fvm::laplacian(&dt, &t).unwrap()).unwrap();
        eqn.solve(&mut t).unwrap();
    }
    // 入口值被输运到整个区域，且上风格式保持有界
    assert!(t.internal().iter().all(|&v| v > 0.99 && v <= 1.0 + 1e-9));
}

// ============================================================================
// 外迭代
// ============================================================================

#[test]
fn test_outer_loop_uses_final_controls() {
    let mesh = line_mesh(8, 1.0, schemes("Euler", "Gauss upwind"));
    let mut t = field(
        &mesh,
        json!(0.0),
        json!({ "type": "fixedValue", "value": 2.0 }),
        json!({ "type": "fixedValue", "value": 0.0 }),
    );
    let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 0.1);
    let mut time = TimeState::new(0.0, 0.1, 0.1);
    let mut pimple = SolutionControl::new(mesh.solution(), "PIMPLE").unwrap();

    time.advance();
    t.store_old_times(time.index());
    let mut n_outer = 0;
    while pimple.loop_outer() {
        n_outer += 1;
        let eqn = (fvm::ddt(&t, &time).unwrap() - fvm::laplacian(&dt, &t).unwrap()).unwrap();
        let perf = if pimple.final_iter() {
            eqn.solve_final(&mut t).unwrap()
        } else {
            eqn.solve(&mut t).unwrap()
        };
        assert_eq!(perf.solver_name(), "PBiCGStab");
        pimple.record(&perf);
    }
    assert_eq!(n_outer, 2);
    assert!(!pimple.converged_last_step());
    assert!(t.internal()[0] > 0.0);
}

#[test]
fn test_missing_solver_entry_is_reported() {
    let mesh = line_mesh(3, 1.0, schemes("Euler", "Gauss upwind"));
    let dict = Dictionary::from_value(
        "U",
        json!({
            "dimensions": [0, 0, 0, 1, 0, 0, 0],
            "internalField": 0.0,
            "boundaryField": { ".*": { "type": "zeroGradient" } }
        }),
    )
    .unwrap();
    let mut u: VolField<f64> = VolField::from_dict("U", &mesh, &dict).unwrap();
    let time = TimeState::new(0.0, 1.0, 1.0);
    u.store_old_times(1);
    let err = fvm::ddt(&u, &time).unwrap().solve(&mut u).unwrap_err();
    assert!(err.to_string().contains("U"));
}

// ============================================================================
// 场读写
// ============================================================================

#[test]
fn test_field_write_round_trip() {
    let mesh = line_mesh(4, 1.0, schemes("Euler", "Gauss upwind"));
    let t = field(
        &mesh,
        json!({ "nonuniform": [1.0, 2.0, 3.0, 4.0] }),
        json!({ "type": "fixedValue", "value": 7.5 }),
        json!({ "type": "zeroGradient" }),
    );
    let written = t.write().unwrap();
    let back: VolField<f64> = VolField::from_dict("T", &mesh, &written).unwrap();

    assert_eq!(back.internal(), t.internal());
    assert_eq!(back.dimensions(), DimensionSet::TEMPERATURE);
    let xmin = mesh.find_patch("xmin").unwrap();
    let xmax = mesh.find_patch("xmax").unwrap();
    assert_eq!(back.boundary()[xmin].type_name(), "fixedValue");
    assert_eq!(back.boundary()[xmin].values(), &[7.5]);
    assert_eq!(back.boundary()[xmax].values(), &[4.0]);
}

#[test]
fn test_unknown_boundary_type_rejected() {
    let mesh = line_mesh(2, 1.0, schemes("Euler", "Gauss upwind"));
    let dict = Dictionary::from_value(
        "T",
        json!({
            "internalField": 0.0,
            "boundaryField": {
                "xmin": { "type": "slip" },
                "xmax": { "type": "zeroGradient" }
            }
        }),
    )
    .unwrap();
    let err = VolField::<f64>::from_dict("T", &mesh, &dict).unwrap_err();
    assert!(err.to_string().contains("slip"));
}
