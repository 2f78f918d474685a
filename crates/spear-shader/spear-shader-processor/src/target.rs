//! 构建一个目标平台：编译全部 shader 并写出两个生成文件

use std::path::PathBuf;

use spear_crate_tools::config::TargetConfig;
use spear_crate_tools::resource::SpearPath;

use crate::backend::create_backend;
use crate::codegen;
use crate::error::ShaderError;
use crate::package::{ShaderPackage, TargetBuild};
use crate::preprocess::FsLoader;
use crate::shader::{CompileContext, ShaderSource};
use crate::translate::MetalTranslator;

/// 写出的生成文件
#[derive(Debug, Clone)]
pub struct TargetFiles {
    pub header: PathBuf,
    pub implementation: PathBuf,
}

pub fn build_target(
    paths: &SpearPath,
    target: &TargetConfig,
    shaders: &[ShaderSource],
) -> Result<TargetFiles, ShaderError> {
    log::info!("Building shader target `{}` ({:?} {})", target.name, target.backend, target.version);

    let backend = create_backend(target.backend, &target.version);
    let include_paths = paths.shader_include_paths();
    let build = TargetBuild {
        ctx: CompileContext {
            loader: &FsLoader,
            backend: backend.as_ref(),
            include_paths: &include_paths,
        },
        temp_dir: paths.shader_temp_path(&target.name),
        translator: target.translate.map(|kind| MetalTranslator::from_kind(paths, kind)),
    };

    let package = ShaderPackage::build(&build, shaders)?;
    let compressed = package.compressed()?;
    log::info!(
        "Target `{}`: {} variant(s), {} bytes -> {} bytes compressed",
        target.name,
        package.variants.len(),
        package.data.len(),
        compressed.len()
    );

    let out_dir = paths.shader_root_path();
    let files = TargetFiles {
        header: out_dir.join(codegen::header_file_name(&target.name)),
        implementation: out_dir.join(codegen::impl_file_name(&target.name)),
    };

    let header = codegen::generate_header(&package, compressed.len());
    std::fs::write(&files.header, header).map_err(|e| ShaderError::io(&files.header, e))?;

    let implementation = codegen::generate_impl(&package, &target.name, &compressed);
    std::fs::write(&files.implementation, implementation).map_err(|e| ShaderError::io(&files.implementation, e))?;

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spear_crate_tools::config::{BackendKind, SpearConfig};

    #[test]
    fn test_build_hlsl_target() {
        let root = std::env::temp_dir().join(format!("spear-target-{}", std::process::id()));
        let paths = SpearPath::new(&root, SpearConfig::default());
        let shader_dir = paths.shader_src_path();
        std::fs::create_dir_all(&shader_dir).unwrap();
        std::fs::write(paths.shader_root_path().join("common.glsl"), "#define TINT vec4(1.0, 0.5, 0.5, 1.0)\n").unwrap();
        std::fs::write(
            shader_dir.join("tint.glsl"),
            "\
#include \"common.glsl\"
attribute vec2 a_position;
out vec4 sp_fragColor;
void main()
{
#if SP_VS
    gl_Position = vec4(a_position, 0.0, 1.0);
#else
    gl_FragColor = TINT;
#endif
}
",
        )
        .unwrap();

        let target = TargetConfig {
            name: "hlsl".to_string(),
            backend: BackendKind::Hlsl,
            version: "5".to_string(),
            translate: None,
        };
        let shaders = ShaderSource::discover(&shader_dir).unwrap();
        assert_eq!(shaders.len(), 1);

        let files = build_target(&paths, &target, &shaders).unwrap();

        let header = std::fs::read_to_string(&files.header).unwrap();
        assert!(header.contains("#define SpShader_tint 0"));
        assert!(header.contains("#define ATTRIB_a_position 1"));
        let implementation = std::fs::read_to_string(&files.implementation).unwrap();
        assert!(implementation.starts_with("#include \"GameShaders_hlsl.h\""));

        let fragment = std::fs::read_to_string(paths.shader_temp_path("hlsl").join("tint_fs_0.hlsl")).unwrap();
        assert!(fragment.contains("sp_out.sp_fragColor = float4(1.0, 0.5, 0.5, 1.0);"));

        std::fs::remove_dir_all(root).ok();
    }
}
