//! 一个目标平台的着色器包
//!
//! 收集所有 shader 的所有 permutation，拼接源码数据、登记全局名字表，最后整体压缩。

use std::path::PathBuf;

use rayon::prelude::*;

use crate::compiler::ShaderInterface;
use crate::error::ShaderError;
use crate::layout::irregular_arrays;
use crate::registry::{NameTable, PermutationNames};
use crate::shader::{expand_permutations, CompileContext, CompiledShader, ShaderSource};
use crate::translate::MetalTranslator;
use crate::types::{Attribute, Sampler, Stage, UniformBlock};

const COMPRESSION_LEVEL: i32 = 10;

/// 一个 stage 的 permutation 信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInfo {
    /// (开关的全局索引, 取值个数)
    pub permutations: Vec<(usize, u32)>,
    /// 在 variant 表中的起始位置
    pub base: usize,
    pub num: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub name: String,
    pub vertex: StageInfo,
    pub fragment: StageInfo,
}

impl ShaderInfo {
    pub fn stage(&self, stage: Stage) -> &StageInfo {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }
}

/// 编译后的一个 permutation，名字表索引均为 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub uniform_blocks: Vec<u32>,
    pub samplers: Vec<u32>,
    pub attribs: Vec<u32>,
    /// 在未压缩数据中的偏移，单位字节
    pub offset: usize,
    /// 含结尾的 NUL
    pub size: usize,
}

/// 编译输出的去向
pub struct TargetBuild<'a> {
    pub ctx: CompileContext<'a>,
    /// 中间文件目录 `<temp>/shaders/<target>`
    pub temp_dir: PathBuf,
    pub translator: Option<MetalTranslator>,
}

#[derive(Debug, Clone)]
pub struct ShaderPackage {
    pub shaders: Vec<ShaderInfo>,
    pub variants: Vec<VariantInfo>,
    pub permutation_names: PermutationNames,
    pub uniform_blocks: NameTable<UniformBlock>,
    pub samplers: NameTable<Sampler>,
    pub attribs: NameTable<Attribute>,
    /// 未压缩的源码数据
    pub data: Vec<u8>,
}

impl Default for ShaderPackage {
    fn default() -> Self {
        Self {
            shaders: Vec::new(),
            variants: Vec::new(),
            permutation_names: PermutationNames::default(),
            uniform_blocks: NameTable::new("uniform block"),
            samplers: NameTable::new("sampler"),
            attribs: NameTable::new("attribute"),
            data: Vec::new(),
        }
    }
}

impl ShaderPackage {
    pub fn build(build: &TargetBuild, shaders: &[ShaderSource]) -> Result<Self, ShaderError> {
        std::fs::create_dir_all(&build.temp_dir).map_err(|e| ShaderError::io(&build.temp_dir, e))?;

        let mut package = Self::default();
        for shader in shaders {
            let vertex = package.build_stage(build, shader, Stage::Vertex)?;
            let fragment = package.build_stage(build, shader, Stage::Fragment)?;
            package.shaders.push(ShaderInfo {
                name: shader.name.clone(),
                vertex,
                fragment,
            });
        }

        Ok(package)
    }

    fn build_stage(&mut self, build: &TargetBuild, shader: &ShaderSource, stage: Stage) -> Result<StageInfo, ShaderError> {
        let decls = shader.permutations(&build.ctx, stage)?;
        let permutations = decls
            .iter()
            .map(|d| (self.permutation_names.add(&d.name), d.count))
            .collect();

        let combinations = expand_permutations(&decls);
        log::info!(
            "Compiling {} ({}): {} permutation(s)",
            shader.name,
            stage.suffix(),
            combinations.len()
        );

        // 各 permutation 相互独立，并行编译，结果保持展开顺序
        let compiled: Vec<CompiledShader> = combinations
            .par_iter()
            .map(|values| shader.compile(&build.ctx, stage, values))
            .collect::<Result<_, _>>()?;

        let base = self.variants.len();
        for (ix, variant) in compiled.into_iter().enumerate() {
            let file_name = format!("{}_{}_{}.{}", shader.name, stage.suffix(), ix, build.ctx.backend.extension());
            let temp_path = build.temp_dir.join(file_name);
            std::fs::write(&temp_path, &variant.source).map_err(|e| ShaderError::io(&temp_path, e))?;

            let source = match &build.translator {
                Some(translator) => translator.translate(stage, &temp_path)?,
                None => variant.source,
            };
            self.add_variant(&source, &variant.interface)?;
        }

        Ok(StageInfo {
            permutations,
            base,
            num: self.variants.len() - base,
        })
    }

    /// 追加一个 variant 的源码并登记它引用的名字
    pub fn add_variant(&mut self, source: &str, interface: &ShaderInterface) -> Result<(), ShaderError> {
        let uniform_blocks = interface
            .uniform_blocks
            .iter()
            .map(|b| {
                if self.uniform_blocks.index_of(&b.name).is_none() {
                    for uniform in irregular_arrays(&b.uniforms) {
                        log::warn!(
                            "uniform array `{}.{}` of {} is not a multiple of 4 words, std140 stride will differ",
                            b.name,
                            uniform.name,
                            uniform.ty.name()
                        );
                    }
                }
                self.uniform_blocks.add(b.clone())
            })
            .collect::<Result<_, _>>()?;
        let samplers = interface
            .samplers
            .iter()
            .map(|s| self.samplers.add(s.clone()))
            .collect::<Result<_, _>>()?;
        let attribs = interface
            .attribs
            .iter()
            .map(|a| self.attribs.add(a.clone()))
            .collect::<Result<_, _>>()?;

        let offset = self.data.len();
        self.data.extend_from_slice(source.as_bytes());
        self.data.push(0);

        self.variants.push(VariantInfo {
            uniform_blocks,
            samplers,
            attribs,
            offset,
            size: self.data.len() - offset,
        });
        Ok(())
    }

    /// zstd 压缩后的数据，引擎加载时用 `ZSTD_decompress` 解压
    pub fn compressed(&self) -> Result<Vec<u8>, ShaderError> {
        zstd::bulk::compress(&self.data, COMPRESSION_LEVEL).map_err(ShaderError::Compress)
    }
}
