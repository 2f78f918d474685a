//! 用 sokol-shdc 编译 `src` 下的全部 `.glsl`，已是最新的文件会被跳过

use clap::Parser;
use spear_crate_tools::cli::CommonArgs;
use spear_crate_tools::init_log::init_log;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// 忽略修改时间，全部重新编译
    #[arg(short, long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    init_log();

    let cli = Cli::parse();
    let paths = cli.common.load()?;

    let summary = spear_xtask::shdc::run(&paths, cli.force)?;
    log::info!("sokol-shdc: {} compiled, {} up to date", summary.compiled, summary.skipped);
    Ok(())
}
