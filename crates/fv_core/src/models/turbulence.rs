// crates/fv_core/src/models/turbulence.rs

//! 粘性模型
//!
//! ```json
//! "physicalProperties": { "nu": 1e-5 },
//! "momentumTransport": {
//!     "model": "constantEddyViscosity",
//!     "constantEddyViscosityCoeffs": { "nut": 1e-3 }
//! }
//! ```
//!
//! 模型对外只提供有效粘度 `nu_eff = nu + nut`，由扩散项使用。

use std::fmt;
use std::sync::Arc;

use fv_config::Dictionary;
use fv_foundation::{DimensionSet, FvError, FvResult};

use crate::fields::{DimensionedScalar, VolField};
use crate::mesh::FvMesh;

/// 粘性模型构造函数：网格、模型系数字典、分子粘度
pub type TurbulenceCtor =
    fn(&Arc<FvMesh>, &Dictionary, DimensionedScalar) -> FvResult<Box<dyn TurbulenceModel>>;

/// 粘性模型
pub trait TurbulenceModel: Send + Sync + fmt::Debug {
    /// 注册名
    fn type_name(&self) -> &'static str;

    /// 网格
    fn mesh(&self) -> &Arc<FvMesh>;

    /// 分子运动粘度
    fn nu(&self) -> &DimensionedScalar;

    /// 湍流运动粘度
    fn nut(&self) -> FvResult<VolField<f64>>;

    /// 有效粘度 `nu + nut`
    fn nu_eff(&self) -> FvResult<VolField<f64>> {
        let nut = self.nut()?;
        let nu = self.nu().value;
        let internal = nut.internal().iter().map(|&v| v + nu).collect();
        VolField::calculated("nuEff", self.mesh(), DimensionSet::KINEMATIC_VISCOSITY, internal)
    }

    /// 每个时间步更新模型状态
    fn correct(&mut self) -> FvResult<()> {
        Ok(())
    }
}

/// 按 `momentumTransport.model`（缺省 `laminar`）创建模型
///
/// 分子粘度取 `physicalProperties.nu`，模型系数取 `<model>Coeffs`。
pub fn new_turbulence_model(
    mesh: &Arc<FvMesh>,
    momentum_transport: &Dictionary,
    physical_properties: &Dictionary,
) -> FvResult<Box<dyn TurbulenceModel>> {
    let name: String = momentum_transport.lookup_or("model", "laminar".to_string())?;
    let nu = DimensionedScalar::lookup(physical_properties, "nu", DimensionSet::KINEMATIC_VISCOSITY)?;
    let coeffs = momentum_transport.sub_dict_or_empty(&format!("{name}Coeffs"))?;
    let ctor = crate::registry::turbulence_models().lookup(&name)?;
    let model = ctor(mesh, &coeffs, nu)?;
    tracing::info!("粘性模型: {} (nu = {})", model.type_name(), model.nu().value);
    Ok(model)
}

// ============================================================================

/// 层流：`nut = 0`
#[derive(Debug, Clone)]
pub struct Laminar {
    mesh: Arc<FvMesh>,
    nu: DimensionedScalar,
}

impl Laminar {
    /// 创建
    pub fn new(mesh: &Arc<FvMesh>, nu: DimensionedScalar) -> Self {
        Self {
            mesh: Arc::clone(mesh),
            nu,
        }
    }

    pub(crate) fn create(
        mesh: &Arc<FvMesh>,
        _coeffs: &Dictionary,
        nu: DimensionedScalar,
    ) -> FvResult<Box<dyn TurbulenceModel>> {
        Ok(Box::new(Self::new(mesh, nu)))
    }
}

impl TurbulenceModel for Laminar {
    fn type_name(&self) -> &'static str {
        "laminar"
    }

    fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    fn nu(&self) -> &DimensionedScalar {
        &self.nu
    }

    fn nut(&self) -> FvResult<VolField<f64>> {
        VolField::calculated(
            "nut",
            &self.mesh,
            DimensionSet::KINEMATIC_VISCOSITY,
            vec![0.0; self.mesh.n_cells()],
        )
    }
}

/// 常数涡粘
#[derive(Debug, Clone)]
pub struct ConstantEddyViscosity {
    mesh: Arc<FvMesh>,
    nu: DimensionedScalar,
    nut: DimensionedScalar,
}

impl ConstantEddyViscosity {
    /// 创建，`nut` 必须非负
    pub fn new(mesh: &Arc<FvMesh>, nu: DimensionedScalar, nut: DimensionedScalar) -> FvResult<Self> {
        if nut.value < 0.0 {
            return Err(FvError::invalid_config(
                "constantEddyViscosityCoeffs.nut",
                nut.value.to_string(),
                "涡粘必须非负",
            ));
        }
        Ok(Self {
            mesh: Arc::clone(mesh),
            nu,
            nut,
        })
    }

    pub(crate) fn create(
        mesh: &Arc<FvMesh>,
        coeffs: &Dictionary,
        nu: DimensionedScalar,
    ) -> FvResult<Box<dyn TurbulenceModel>> {
        let nut = DimensionedScalar::lookup(coeffs, "nut", DimensionSet::KINEMATIC_VISCOSITY)?;
        Ok(Box::new(Self::new(mesh, nu, nut)?))
    }
}

impl TurbulenceModel for ConstantEddyViscosity {
    fn type_name(&self) -> &'static str {
        "constantEddyViscosity"
    }

    fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    fn nu(&self) -> &DimensionedScalar {
        &self.nu
    }

    fn nut(&self) -> FvResult<VolField<f64>> {
        VolField::calculated(
            "nut",
            &self.mesh,
            DimensionSet::KINEMATIC_VISCOSITY,
            vec![self.nut.value; self.mesh.n_cells()],
        )
    }
}
