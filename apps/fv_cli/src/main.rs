// apps/fv_cli/src/main.rs

//! FinVol 命令行界面
//!
//! - `run`: 读取算例，按分区（线程）推进标量输运并输出场
//! - `validate`: 在时间推进前检查算例引用的全部类型与键
//! - `info`: 列出运行时注册表中的类型名

mod commands;
mod transport;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// FinVol 有限体积求解器命令行工具
#[derive(Parser)]
#[command(name = "fv_cli")]
#[command(author = "FinVol Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FinVol finite-volume transport solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行算例
    Run(commands::run::RunArgs),
    /// 显示已注册类型
    Info(commands::info::InfoArgs),
    /// 校验算例
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    fv_core::registry::initialise()?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
