//! GLSL 450 -> SPIR-V -> Metal
//!
//! 依赖工具目录下的 `glslangValidator` 和 `spirv-cross`。

use std::path::{Path, PathBuf};

use spear_crate_tools::command::ToolCommand;
use spear_crate_tools::config::TranslateKind;
use spear_crate_tools::resource::SpearPath;

use crate::error::ShaderError;
use crate::types::Stage;

#[derive(Debug, Clone)]
pub struct MetalTranslator {
    glslang: PathBuf,
    spirv_cross: PathBuf,
    ios: bool,
}

impl MetalTranslator {
    pub fn new(glslang: impl Into<PathBuf>, spirv_cross: impl Into<PathBuf>, ios: bool) -> Self {
        Self {
            glslang: glslang.into(),
            spirv_cross: spirv_cross.into(),
            ios,
        }
    }

    pub fn from_kind(paths: &SpearPath, kind: TranslateKind) -> Self {
        Self::new(
            paths.tool_exe("glslangValidator"),
            paths.tool_exe("spirv-cross"),
            kind == TranslateKind::MetalIos,
        )
    }

    /// 翻译所需的两条命令，以及最终 `.metal` 文件的路径
    pub fn commands(&self, stage: Stage, src: &Path) -> (ToolCommand, ToolCommand, PathBuf) {
        let metal = src.with_extension("metal");
        let mut spv = src.as_os_str().to_owned();
        spv.push(".spv");
        let spv = PathBuf::from(spv);

        let glslang = ToolCommand::new(&self.glslang)
            .args(["-V", "-e", "main", "-o"])
            .arg(&spv)
            .args(["-S", stage.tool_stage()])
            .arg(src);

        let mut spirv_cross = ToolCommand::new(&self.spirv_cross).arg("--msl");
        if self.ios {
            spirv_cross = spirv_cross.arg("--msl-ios");
        }
        let spirv_cross = spirv_cross
            .args(["--entry", "main", "--output"])
            .arg(&metal)
            .args(["--stage", stage.tool_stage()])
            .arg(&spv);

        (glslang, spirv_cross, metal)
    }

    /// 翻译 `src`，返回 Metal 源码
    pub fn translate(&self, stage: Stage, src: &Path) -> Result<String, ShaderError> {
        let (glslang, spirv_cross, metal) = self.commands(stage, src);
        let failed = |e: anyhow::Error| ShaderError::Translate {
            path: src.to_path_buf(),
            message: format!("{e:#}"),
        };

        glslang.run().map_err(failed)?;
        spirv_cross.run().map_err(failed)?;

        std::fs::read_to_string(&metal).map_err(|e| ShaderError::io(&metal, e))
    }
}
