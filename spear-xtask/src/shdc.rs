//! 用 sokol-shdc 编译 `src` 下的 `.glsl` 文件
//!
//! 每个 `foo.glsl` 生成同目录下的 `foo.h`，`.inc.glsl` 只被 include，不单独编译。

use std::path::{Path, PathBuf};

use spear_crate_tools::command::ToolCommand;
use spear_crate_tools::config::ShdcConfig;
use spear_crate_tools::resource::SpearPath;
use spear_crate_tools::staleness::is_up_to_date;

use crate::{slash_path, sorted_files};

/// 一次运行的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShdcSummary {
    pub compiled: usize,
    pub skipped: usize,
}

/// 需要编译的输入文件
pub fn collect_inputs(src: &Path, exclude: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let inputs = sorted_files(src)?
        .into_iter()
        .filter(|path| {
            let path = slash_path(path);
            path.ends_with(".glsl")
                && !path.ends_with(".inc.glsl")
                && !exclude.iter().any(|fragment| path.contains(fragment.as_str()))
        })
        .collect();
    Ok(inputs)
}

pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("h")
}

pub fn shdc_command(shdc: &Path, config: &ShdcConfig, input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new(shdc)
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .arg("-b")
        .args(["-l", config.languages.as_str()])
        .args(["-f", config.format.as_str()])
}

pub fn run(paths: &SpearPath, force: bool) -> anyhow::Result<ShdcSummary> {
    let config = &paths.config().shdc;
    let shdc = paths.tool_exe("sokol-shdc");
    let mut summary = ShdcSummary::default();

    for input in collect_inputs(&paths.src_path(), &config.exclude)? {
        let output = output_path(&input);
        if !force && is_up_to_date(&input, &output) {
            log::info!("Up to date: {:?}", input);
            summary.skipped += 1;
            continue;
        }

        shdc_command(&shdc, config, &input, &output).run()?;
        summary.compiled += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_inputs() {
        let dir = std::env::temp_dir().join(format!("spear-shdc-{}", std::process::id()));
        for file in [
            "sky.glsl",
            "common.inc.glsl",
            "render/blit.glsl",
            "render/blit.h",
            "game/shader2/shader/quad.glsl",
        ] {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let inputs = collect_inputs(&dir, &["game/shader2".to_string()]).unwrap();
        assert_eq!(inputs, vec![dir.join("render/blit.glsl"), dir.join("sky.glsl")]);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_command_line() {
        let config = ShdcConfig::default();
        let input = Path::new("src/render/blit.glsl");
        let output = output_path(input);
        assert_eq!(output, PathBuf::from("src/render/blit.h"));

        let cmd = shdc_command(Path::new("tool/linux/sokol-shdc"), &config, input, &output);
        assert_eq!(
            cmd.arg_strings(),
            vec![
                "-i",
                "src/render/blit.glsl",
                "-o",
                "src/render/blit.h",
                "-b",
                "-l",
                "glsl300es:glsl330:hlsl5:metal_macos:metal_ios",
                "-f",
                "sokol_impl",
            ]
        );
    }
}
