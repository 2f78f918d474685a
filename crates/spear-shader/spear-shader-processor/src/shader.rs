//! 单个着色器源文件：permutation 的收集、展开与编译

use std::path::{Path, PathBuf};

use crate::backend::{Backend, TEMP_PREFIX};
use crate::compiler::{LineCompiler, ShaderInterface};
use crate::error::ShaderError;
use crate::preprocess::{evaluate, tokenize, Preprocessor, SourceLoader};
use crate::types::{PermutationDecl, PermutationValue, Stage};

/// 编译一个目标时共享的环境
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub loader: &'a dyn SourceLoader,
    pub backend: &'a dyn Backend,
    pub include_paths: &'a [PathBuf],
}

impl CompileContext<'_> {
    /// stage 宏 + 后端宏
    fn base_defines(&self, stage: Stage) -> Vec<(String, String)> {
        let mut defines = vec![(stage.define().to_string(), "1".to_string())];
        defines.extend(self.backend.defines());
        defines
    }
}

/// 某个 permutation 编译后的结果
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub source: String,
    pub interface: ShaderInterface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// 文件名去掉扩展名
    pub name: String,
    pub path: PathBuf,
}

impl ShaderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }

    /// 目录下所有以 `glsl` 结尾的文件，按路径排序
    pub fn discover(dir: &Path) -> Result<Vec<ShaderSource>, ShaderError> {
        let mut shaders = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                ShaderError::io(path, e.into())
            })?;
            if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with("glsl") {
                shaders.push(ShaderSource::new(entry.path()));
            }
        }
        shaders.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(shaders)
    }

    /// 收集 `#pragma permutation NAME COUNT`
    ///
    /// 使用 lenient 模式预处理，条件编译中被排除的声明不会被收集。
    pub fn permutations(&self, ctx: &CompileContext, stage: Stage) -> Result<Vec<PermutationDecl>, ShaderError> {
        let text = Preprocessor::new(ctx.loader)
            .defines(ctx.base_defines(stage))
            .include_paths(ctx.include_paths.iter().cloned())
            .lenient(true)
            .run_file(&self.path)?;

        text.lines().filter_map(|line| self.parse_permutation(line)).collect()
    }

    fn parse_permutation(&self, line: &str) -> Option<Result<PermutationDecl, ShaderError>> {
        let rest = line.trim_start().strip_prefix('#')?.trim_start();
        let rest = rest.strip_prefix("pragma")?.trim_start();
        let rest = rest.strip_prefix("permutation")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let invalid = || ShaderError::Permutation {
            file: self.path.display().to_string(),
            declaration: line.trim().to_string(),
        };

        let rest = rest.trim();
        let Some((name, count)) = rest.split_once(char::is_whitespace) else {
            return Some(Err(invalid()));
        };
        let count = evaluate(&tokenize(count))
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|&v| v > 0);

        Some(match count {
            Some(count) => Ok(PermutationDecl {
                name: name.to_string(),
                count,
            }),
            None => Err(invalid()),
        })
    }

    /// 编译一个 permutation
    pub fn compile(
        &self,
        ctx: &CompileContext,
        stage: Stage,
        permutation: &[PermutationValue],
    ) -> Result<CompiledShader, ShaderError> {
        let text = Preprocessor::new(ctx.loader)
            .defines(ctx.base_defines(stage))
            .defines(permutation.iter().map(|p| (p.name.as_str(), p.value.to_string())))
            .include_paths(ctx.include_paths.iter().cloned())
            .run_file(&self.path)?;

        let body = LineCompiler::new(ctx.backend, stage, self.path.display().to_string()).compile(&text)?;

        let mut lines = ctx.backend.header(stage, &body.interface);
        lines.extend(body.lines);
        let generated = lines.join("\n");

        let text = Preprocessor::new(ctx.loader).run(&generated, &self.path)?;

        let mut interface = body.interface;
        if stage == Stage::Fragment {
            interface.attribs.clear();
        }

        Ok(CompiledShader {
            source: normalize(&text),
            interface,
        })
    }
}

/// 去掉临时前缀和 `#line`，合并连续空行，去掉首尾空行
fn normalize(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut prev_blank = true;

    for line in text.lines() {
        let trimmed = line.trim();
        let blank = trimmed.is_empty() || trimmed.starts_with("#line");
        if blank {
            if !prev_blank {
                lines.push(String::new());
            }
        } else {
            lines.push(line.replace(TEMP_PREFIX, ""));
        }
        prev_blank = blank;
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    let mut source = lines.join("\n");
    source.push('\n');
    source
}

/// 所有取值组合，先声明的开关在最外层（最后声明的变化最快）
///
/// 没有开关时返回一个空组合。
pub fn expand_permutations(decls: &[PermutationDecl]) -> Vec<Vec<PermutationValue>> {
    let total: usize = decls.iter().map(|d| d.count as usize).product();
    let mut result = Vec::with_capacity(total);
    let mut values = vec![0u32; decls.len()];

    for _ in 0..total {
        result.push(
            decls
                .iter()
                .zip(&values)
                .map(|(d, &value)| PermutationValue {
                    name: d.name.clone(),
                    value,
                })
                .collect(),
        );

        // 里程表式进位
        for (value, decl) in values.iter_mut().zip(decls).rev() {
            *value += 1;
            if *value < decl.count {
                break;
            }
            *value = 0;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GlslBackend, HlslBackend};
    use crate::preprocess::MemoryLoader;

    const QUAD: &str = "\
#include \"common.glsl\"

#pragma permutation SP_ALPHA 2
#if defined(SP_FS)
#pragma permutation SP_DEBUG 3
#endif

attribute vec2 a_position;
varying vec2 v_uv;
out vec4 sp_fragColor;
uniform sampler2D albedo;

uniform Pixel {
    vec4 tint;
};

void main()
{
#if SP_VS
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
#else
    vec4 c = texture(albedo, v_uv) * tint;
#if SP_ALPHA
    c.a = saturate(c.a);
#endif
    gl_FragColor = c;
#endif
}
";

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_file("root/shader/quad.glsl", QUAD)
            .with_file("root/common.glsl", "#define SP_COMMON 1\n")
    }

    fn decl(name: &str, count: u32) -> PermutationDecl {
        PermutationDecl {
            name: name.to_string(),
            count,
        }
    }

    #[test]
    fn test_expand_order() {
        let combos = expand_permutations(&[decl("A", 2), decl("B", 3)]);
        let values: Vec<Vec<u32>> = combos.iter().map(|c| c.iter().map(|p| p.value).collect()).collect();
        assert_eq!(values, vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1, 0], vec![1, 1], vec![1, 2]]);
        assert_eq!(combos[4][0].name, "A");
        assert_eq!(combos[4][1].name, "B");
    }

    #[test]
    fn test_expand_empty() {
        assert_eq!(expand_permutations(&[]), vec![Vec::<PermutationValue>::new()]);
    }

    #[test]
    fn test_permutations_per_stage() {
        let loader = loader();
        let backend = GlslBackend::new("300 es");
        let includes = [PathBuf::from("root")];
        let ctx = CompileContext {
            loader: &loader,
            backend: &backend,
            include_paths: &includes,
        };
        let shader = ShaderSource::new("root/shader/quad.glsl");
        assert_eq!(shader.name, "quad");

        assert_eq!(shader.permutations(&ctx, Stage::Vertex).unwrap(), vec![decl("SP_ALPHA", 2)]);
        assert_eq!(
            shader.permutations(&ctx, Stage::Fragment).unwrap(),
            vec![decl("SP_ALPHA", 2), decl("SP_DEBUG", 3)]
        );
    }

    #[test]
    fn test_invalid_permutation_count() {
        let loader = MemoryLoader::new().with_file("a.glsl", "#pragma permutation SP_X 0\n");
        let backend = GlslBackend::new("300");
        let ctx = CompileContext {
            loader: &loader,
            backend: &backend,
            include_paths: &[],
        };
        let err = ShaderSource::new("a.glsl").permutations(&ctx, Stage::Vertex).unwrap_err();
        assert!(matches!(err, ShaderError::Permutation { .. }));
    }

    #[test]
    fn test_compile_glsl_fragment() {
        let loader = loader();
        let backend = GlslBackend::new("300 es");
        let includes = [PathBuf::from("root")];
        let ctx = CompileContext {
            loader: &loader,
            backend: &backend,
            include_paths: &includes,
        };
        let shader = ShaderSource::new("root/shader/quad.glsl");
        let perm = [
            PermutationValue {
                name: "SP_ALPHA".to_string(),
                value: 1,
            },
            PermutationValue {
                name: "SP_DEBUG".to_string(),
                value: 0,
            },
        ];

        let compiled = shader.compile(&ctx, Stage::Fragment, &perm).unwrap();
        let src = &compiled.source;

        assert!(src.starts_with("#version 300 es\n"));
        assert!(src.ends_with("}\n"));
        assert!(!src.contains("\n\n\n"));
        assert!(!src.contains("#pragma"));
        assert!(src.contains("in vec2 v_uv;"));
        assert!(src.contains("layout(location=0) out vec4 sp_fragColor;"));
        assert!(src.contains("c.a = clamp(c.a, 0.0, 1.0);"));
        assert!(src.contains("sp_fragColor = c;"));
        assert!(!src.contains("a_position"));

        assert!(compiled.interface.attribs.is_empty());
        assert_eq!(compiled.interface.samplers[0].name, "albedo");
        assert_eq!(compiled.interface.uniform_blocks[0].size, 4);
    }

    #[test]
    fn test_compile_hlsl_vertex() {
        let loader = loader();
        let backend = HlslBackend::new();
        let includes = [PathBuf::from("root")];
        let ctx = CompileContext {
            loader: &loader,
            backend: &backend,
            include_paths: &includes,
        };
        let shader = ShaderSource::new("root/shader/quad.glsl");
        let perm = [PermutationValue {
            name: "SP_ALPHA".to_string(),
            value: 0,
        }];

        let compiled = shader.compile(&ctx, Stage::Vertex, &perm).unwrap();
        let src = &compiled.source;

        assert!(!src.contains(TEMP_PREFIX));
        assert!(!src.contains("#define"));
        assert!(src.contains("\tfloat2 a_position : TEXCOORD0;"));
        assert!(src.contains("SP_Varyings main(SP_Attribs sp_in) {"));
        assert!(src.contains("sp_out.v_uv = sp_in.a_position * 0.5 + 0.5;"));
        assert!(src.contains("sp_out.sp_vertexPosition = float4(sp_in.a_position, 0.0, 1.0);"));
        assert!(src.contains("\treturn sp_out;"));
        assert_eq!(compiled.interface.attribs.len(), 1);
    }

    #[test]
    fn test_normalize() {
        let text = "\n\n#version 300 es\n\n\n#line 4\nfoo __sp__temp__bar\n\n";
        assert_eq!(normalize(text), "#version 300 es\n\nfoo bar\n");
    }
}
