// apps/fv_cli/src/transport.rs

//! 标量输运
//!
//! 对 `fields` 中的每个标量场，每次外迭代求解
//!
//! ```text
//! ddt(T) + div(phi,T) - laplacian(nuEff,T) = 0
//! ```
//!
//! 通量 `phi = U·Sf` 取自 `physicalProperties.U`（均匀速度，缺省为零），
//! 扩散系数为粘性模型给出的有效粘度。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fv_config::CaseConfig;
use fv_core::control::SolutionControl;
use fv_core::models::{new_turbulence_model, TurbulenceModel};
use fv_core::prelude::*;
use fv_core::schemes::new_ddt_scheme;
use fv_core::solvers::new_solver;
use tracing::{debug, info};

/// 标量输运求解器（一个分区）
pub struct ScalarTransport {
    mesh: Arc<FvMesh>,
    time: TimeState,
    control: SolutionControl,
    phi: SurfaceField<f64>,
    turbulence: Box<dyn TurbulenceModel>,
    fields: Vec<VolField<f64>>,
    write_interval: usize,
}

impl ScalarTransport {
    /// 读取场与子模型，并检查全部格式与求解器设置
    pub fn new(case: &CaseConfig, mesh: &Arc<FvMesh>) -> Result<Self> {
        let physical = case.physical_properties()?;
        let turbulence = new_turbulence_model(mesh, &case.momentum_transport()?, &physical)?;

        let velocity: Vector = if physical.found("U") {
            physical.lookup_field_value("U")?
        } else {
            Vector::ZERO
        };
        let phi = uniform_flux(mesh, velocity)?;

        let algorithm = if mesh.solution().dict().is_dict("SIMPLE") {
            "SIMPLE"
        } else {
            "PIMPLE"
        };
        let control = SolutionControl::new(mesh.solution(), algorithm)?;

        let fields_dict = case.fields()?;
        let mut fields = Vec::with_capacity(fields_dict.len());
        for name in fields_dict.keys() {
            let dict = fields_dict.sub_dict(name)?;
            let field = VolField::<f64>::from_dict(name, mesh, &dict)
                .with_context(|| format!("读取场 {name} 失败"))?;
            fields.push(field);
        }

        let mut transport = Self {
            mesh: Arc::clone(mesh),
            time: TimeState::from_control(case.control()),
            control,
            phi,
            turbulence,
            fields,
            write_interval: case.control().write_interval,
        };
        transport.check()?;
        Ok(transport)
    }

    /// 创建每个场用到的格式与求解器，并申请旧时间层
    fn check(&mut self) -> Result<()> {
        let nu_eff = self.turbulence.nu_eff()?;
        let solution = self.mesh.solution();
        for field in &mut self.fields {
            let name = field.name().to_string();
            let mut stream = self.mesh.schemes().ddt(&format!("ddt({name})"))?;
            let ddt = new_ddt_scheme::<f64>(&self.mesh, &mut stream)?;
            field.request_old_times(ddt.n_old_times());

            fvm::div(&self.phi, field).with_context(|| format!("{name}: 对流项"))?;
            fvm::laplacian_vol(&nu_eff, field).with_context(|| format!("{name}: 扩散项"))?;
            for final_iter in [false, true] {
                let controls = solution.solver_controls(&name, final_iter)?;
                new_solver(&name, &controls)?;
            }
            debug!("{}: ddt {}, {} 层旧值", name, ddt.type_name(), ddt.n_old_times());
        }
        Ok(())
    }

    /// 分区网格
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    /// 推进一个时间步
    pub fn step(&mut self) -> Result<()> {
        self.time.advance();
        info!("时间 = {:.6}", self.time.value());
        for field in &mut self.fields {
            field.store_old_times(self.time.index());
        }
        self.turbulence.correct()?;
        let nu_eff = self.turbulence.nu_eff()?;

        while self.control.loop_outer() {
            let final_iter = self.control.final_iter();
            for field in &mut self.fields {
                let mut eqn = transport_equation(&self.phi, &nu_eff, field, &self.time)?;
                eqn.relax_configured(field, final_iter)?;
                let perf = if final_iter {
                    eqn.solve_final(field)?
                } else {
                    eqn.solve(field)?
                };
                self.control.record(&perf);
            }
        }
        Ok(())
    }

    /// 推进到结束时间，按 `writeInterval` 输出
    pub fn run(&mut self, output: &Path) -> Result<()> {
        let mut n_steps = 0;
        while self.time.running() {
            self.step()?;
            n_steps += 1;
            if self.write_interval > 0 && n_steps % self.write_interval == 0 {
                self.write(output)?;
            }
        }
        if self.write_interval == 0 || n_steps % self.write_interval != 0 {
            self.write(output)?;
        }
        info!("完成 {} 步", n_steps);
        Ok(())
    }

    /// 写出 `<output>/<time>/<field>.json`
    pub fn write(&self, output: &Path) -> Result<PathBuf> {
        let dir = output.join(time_name(self.time.value()));
        std::fs::create_dir_all(&dir).with_context(|| format!("无法创建 {}", dir.display()))?;
        for field in &self.fields {
            let path = dir.join(format!("{}.json", field.name()));
            let content = serde_json::to_string_pretty(&field.write()?.to_value())?;
            std::fs::write(&path, content).with_context(|| format!("无法写入 {}", path.display()))?;
        }
        debug!("输出 {}", dir.display());
        Ok(dir)
    }
}

fn transport_equation(
    phi: &SurfaceField<f64>,
    nu_eff: &VolField<f64>,
    field: &VolField<f64>,
    time: &TimeState,
) -> FvResult<FvMatrix<f64>> {
    let eqn = (fvm::ddt(field, time)? + fvm::div(phi, field)?)?;
    eqn - fvm::laplacian_vol(nu_eff, field)?
}

/// 均匀速度的体积通量 `U·Sf`
fn uniform_flux(mesh: &Arc<FvMesh>, velocity: Vector) -> FvResult<SurfaceField<f64>> {
    let internal = mesh.sf().iter().map(|s| velocity.dot(*s)).collect();
    let boundary = mesh
        .boundary()
        .iter()
        .map(|p| p.sf().iter().map(|s| velocity.dot(*s)).collect())
        .collect();
    SurfaceField::new("phi", mesh, DimensionSet::VOLUMETRIC_FLUX, internal, boundary)
}

/// 时间目录名，去掉多余的零
fn time_name(t: f64) -> String {
    let s = format!("{t:.6}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_name() {
        assert_eq!(time_name(0.30000000000000004), "0.3");
        assert_eq!(time_name(2.0), "2");
        assert_eq!(time_name(0.125), "0.125");
    }
}
