//! Shader permutation 编译工具
//!
//! 对配置中的每个目标平台编译 `<shader root>/shader` 下的全部 shader，
//! 生成 `GameShaders_<target>.h` 和 `GameShadersImp_<target>.h`。

use anyhow::Context;
use clap::Parser;
use spear_crate_tools::cli::CommonArgs;
use spear_crate_tools::config::TargetConfig;
use spear_crate_tools::init_log::init_log;
use spear_shader_processor::shader::ShaderSource;
use spear_shader_processor::target::build_target;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// 只构建指定的目标，可重复；默认构建全部
    #[arg(long = "target")]
    targets: Vec<String>,
}

/// 按名字筛选目标，名字未知时报错
fn select_targets<'a>(all: &'a [TargetConfig], names: &[String]) -> anyhow::Result<Vec<&'a TargetConfig>> {
    if names.is_empty() {
        return Ok(all.iter().collect());
    }

    names
        .iter()
        .map(|name| {
            all.iter()
                .find(|t| &t.name == name)
                .with_context(|| format!("Unknown shader target `{name}`"))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    init_log();

    let cli = Cli::parse();
    let paths = cli.common.load()?;

    let shader_dir = paths.shader_src_path();
    let shaders = ShaderSource::discover(&shader_dir)?;
    log::info!("Found {} shader(s) in {:?}", shaders.len(), shader_dir);

    for target in select_targets(&paths.config().shader.targets, &cli.targets)? {
        let files = build_target(&paths, target, &shaders)
            .with_context(|| format!("Failed to build shader target `{}`", target.name))?;
        log::info!("Wrote {:?} and {:?}", files.header, files.implementation);
    }

    log::info!("Shader processing completed.");
    Ok(())
}
