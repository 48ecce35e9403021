// apps/fv_cli/src/commands/run.rs

//! 运行算例
//!
//! 单分区时直接在主线程求解；多分区时沿 x 方向切分块网格，每个分区一个线程，
//! 分区之间通过 processor 边界交换数据，输出写到 `processor<N>/` 子目录。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use fv_config::CaseConfig;
use fv_core::mesh::FvMesh;
use fv_core::parallel::{Communicator, SerialCommunicator, ThreadCommunicator};
use fv_mesh::{BlockMesh, PolyMesh};
use tracing::{info, info_span};

use crate::transport::ScalarTransport;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 算例文件
    #[arg(short, long)]
    pub case: PathBuf,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// 分区数（每个分区一个线程）
    #[arg(short, long, default_value = "1")]
    pub partitions: usize,
}

/// 读取算例中的块网格描述
pub fn block_mesh(case: &CaseConfig) -> Result<BlockMesh> {
    let block: BlockMesh = serde_json::from_value(case.mesh()?.to_value()).context("mesh 字典无效")?;
    block.validate()?;
    Ok(block)
}

/// 按算例设置创建分区网格
pub fn build_mesh(case: &CaseConfig, poly: PolyMesh, comm: Arc<dyn Communicator>) -> Result<Arc<FvMesh>> {
    Ok(Arc::new(
        FvMesh::new(poly, comm)?
            .with_schemes(case.fv_schemes()?)
            .with_solution(case.fv_solution()?),
    ))
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== FinVol 算例: {} ===", args.case.display());
    let case = CaseConfig::from_file(&args.case)
        .with_context(|| format!("无法加载算例 {}", args.case.display()))?;
    let block = block_mesh(&case)?;
    info!(
        "网格: {} × {} × {} 单元, {} 分区",
        block.cells[0], block.cells[1], block.cells[2], args.partitions
    );

    let start = Instant::now();
    if args.partitions <= 1 {
        let mesh = build_mesh(&case, block.build()?, Arc::new(SerialCommunicator))?;
        let mut solver = ScalarTransport::new(&case, &mesh)?;
        solver.run(&args.output)?;
    } else {
        run_partitioned(&case, &block, args.partitions, &args.output)?;
    }

    info!("=== 完成，耗时 {:.2} s ===", start.elapsed().as_secs_f64());
    Ok(())
}

fn run_partitioned(case: &CaseConfig, block: &BlockMesh, n_parts: usize, output: &Path) -> Result<()> {
    let parts = block.decompose_x(n_parts)?;
    let handles: Vec<_> = parts
        .into_iter()
        .zip(ThreadCommunicator::create(n_parts))
        .map(|(poly, comm)| {
            let case = case.clone();
            let output = output.join(format!("processor{}", comm.rank()));
            thread::spawn(move || -> Result<()> {
                let rank = comm.rank();
                let _span = info_span!("rank", rank).entered();
                let mesh = build_mesh(&case, poly, Arc::new(comm))?;
                let mut solver = ScalarTransport::new(&case, &mesh)?;
                info!("{} 单元", solver.mesh().n_cells());
                solver.run(&output)
            })
        })
        .collect();

    let mut first_error = None;
    for (rank, handle) in handles.into_iter().enumerate() {
        let result = handle
            .join()
            .map_err(|_| anyhow!("分区 {rank} 的线程异常退出"))
            .and_then(|r| r.with_context(|| format!("分区 {rank}")));
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
