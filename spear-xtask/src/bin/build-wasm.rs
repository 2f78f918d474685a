//! 用 emscripten 编译链接 WASM 版本

use clap::Parser;
use spear_crate_tools::cli::CommonArgs;
use spear_crate_tools::init_log::init_log;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// 使用 -O2 编译，默认 -g
    #[arg(short, long)]
    optimize: bool,
}

fn main() -> anyhow::Result<()> {
    init_log();

    let cli = Cli::parse();
    let paths = cli.common.load()?;

    spear_xtask::wasm::run(&paths, cli.optimize)?;
    log::info!("WASM build completed.");
    Ok(())
}
