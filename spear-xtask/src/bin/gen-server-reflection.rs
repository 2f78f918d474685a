//! 根据 `src/server/ServerState.h` 生成 `ServerStateRefletion.cpp`

use std::path::PathBuf;

use clap::Parser;
use spear_crate_tools::cli::CommonArgs;
use spear_crate_tools::init_log::init_log;
use spear_xtask::reflection;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// 输入头文件，默认 <src>/server/ServerState.h
    #[arg(long)]
    input: Option<PathBuf>,

    /// 输出文件，默认 <src>/server/ServerStateRefletion.cpp
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_log();

    let cli = Cli::parse();
    let paths = cli.common.load()?;

    let input = cli.input.unwrap_or_else(|| reflection::default_input(&paths));
    let output = cli.output.unwrap_or_else(|| reflection::default_output(&paths));
    reflection::run(&input, &output)
}
