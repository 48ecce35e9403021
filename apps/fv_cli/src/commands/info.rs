// apps/fv_cli/src/commands/info.rs

//! 列出运行时注册表中的类型

use anyhow::Result;
use clap::Args;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 只显示名称包含该字符串的类别
    #[arg(long)]
    pub category: Option<String>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== FinVol 已注册类型 ===");
    println!("FinVol CLI 版本: {}", env!("CARGO_PKG_VERSION"));

    for (category, names) in fv_core::registry::catalogue() {
        if let Some(filter) = &args.category {
            if !category.contains(filter.as_str()) {
                continue;
            }
        }
        println!("\n{category} ({}):", names.len());
        for name in names {
            println!("  - {name}");
        }
    }
    Ok(())
}
