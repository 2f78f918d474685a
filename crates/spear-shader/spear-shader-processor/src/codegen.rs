//! 生成运行时使用的 C++ 头文件
//!
//! - `GameShaders_<target>.h`：索引宏、UBO 结构体与 extern 声明
//! - `GameShadersImp_<target>.h`：各个表的定义与压缩后的源码数据

use itertools::Itertools;

use crate::layout::{BlockLayout, LayoutItem};
use crate::package::{ShaderPackage, StageInfo};
use crate::types::{Stage, Uniform, UniformBlock};

/// 每行输出的数据字节数
const DATA_COLUMNS: usize = 32;

pub fn header_file_name(target: &str) -> String {
    format!("GameShaders_{target}.h")
}

pub fn impl_file_name(target: &str) -> String {
    format!("GameShadersImp_{target}.h")
}

fn cpp_field(uniform: &Uniform) -> String {
    let (ty, dim) = uniform.ty.cpp_name();
    let count = uniform.count.map(|c| format!("[{c}]")).unwrap_or_default();
    let dim = dim.map(|d| format!("[{d}]")).unwrap_or_default();
    format!("\t{} {}{}{};", ty, uniform.name, count, dim)
}

fn ubo_struct(lines: &mut Vec<String>, index: u32, block: &UniformBlock) {
    lines.push(format!("struct UBO_{} {{", block.name));
    lines.push(format!("\tstatic const constexpr uint32_t UboIndex = {index};"));
    lines.push(String::new());

    let mut pad = 0;
    for item in BlockLayout::new(&block.uniforms).items {
        match item {
            LayoutItem::Padding { words } => {
                lines.push(format!("\tuint32_t _sp_pad{pad}[{words}];"));
                pad += 1;
            }
            LayoutItem::Field { uniform, .. } => lines.push(cpp_field(uniform)),
        }
    }

    lines.push("};".to_string());
    lines.push(String::new());
}

/// `GameShaders_<target>.h`
pub fn generate_header(package: &ShaderPackage, compressed_len: usize) -> String {
    let mut lines = vec![
        "#pragma once".to_string(),
        String::new(),
        "#include \"sf/Vector.h\"".to_string(),
        "#include \"sf/Matrix.h\"".to_string(),
        String::new(),
    ];

    for (ix, shader) in package.shaders.iter().enumerate() {
        lines.push(format!("#define SpShader_{} {}", shader.name, ix));
    }
    lines.push(format!("#define SpShaderDataSize {}", package.data.len()));
    lines.push(String::new());

    for (ix, name) in package.permutation_names.iter().enumerate() {
        lines.push(format!("#define {name} {ix}"));
    }
    lines.push(format!("#define SP_NUM_PERMUTATIONS {}", package.permutation_names.len()));
    lines.push(String::new());

    for (ix, block) in package.uniform_blocks.iter().enumerate() {
        ubo_struct(&mut lines, ix as u32 + 1, block);
    }

    for (ix, sampler) in package.samplers.iter().enumerate() {
        lines.push(format!("#define TEX_{} {}", sampler.name, ix + 1));
    }
    lines.push(String::new());

    for (ix, attrib) in package.attribs.iter().enumerate() {
        lines.push(format!("#define ATTRIB_{} {}", attrib.name, ix + 1));
    }
    lines.push(String::new());

    lines.extend(
        [
            "struct SpShaderInfo;",
            "struct SpPermutationInfo;",
            "struct SpUniformBlockInfo;",
            "struct SpSamplerInfo;",
            "struct SpAttribInfo;",
        ]
        .map(String::from),
    );
    lines.push(format!("extern const SpShaderInfo spShaders[{}];", package.shaders.len()));
    lines.push(format!("extern const SpPermutationInfo spPermutations[{}];", package.variants.len()));
    lines.push(format!("extern const SpUniformBlockInfo spUniformBlocks[{}];", package.uniform_blocks.len() + 1));
    lines.push(format!("extern const SpSamplerInfo spSamplers[{}];", package.samplers.len() + 1));
    lines.push(format!("extern const SpAttribInfo spAttribs[{}];", package.attribs.len() + 1));
    lines.push(format!("extern const char spShaderData[{}];", compressed_len + 1));

    lines.join("\n") + "\n"
}

fn stage_entry(lines: &mut Vec<String>, info: &StageInfo) {
    let perms = info.permutations.iter().map(|(ix, count)| format!("{{{ix},{count}}}")).join(", ");
    lines.push(format!("\t\t\t{{ {perms} }},"));
    lines.push(format!("\t\t\t{}, {},", info.base, info.num));
}

/// `GameShadersImp_<target>.h`
pub fn generate_impl(package: &ShaderPackage, target: &str, compressed: &[u8]) -> String {
    let mut lines = vec![
        format!("#include \"{}\"", header_file_name(target)),
        "#include \"game/ShadersDesc.h\"".to_string(),
        String::new(),
    ];

    lines.push("const SpShaderInfo spShaders[] = {".to_string());
    for shader in &package.shaders {
        lines.push("\t{".to_string());
        lines.push(format!("\t\t\"{}\",", shader.name));
        lines.push("\t\t{ {".to_string());
        stage_entry(&mut lines, shader.stage(Stage::Vertex));
        lines.push("\t\t}, {".to_string());
        stage_entry(&mut lines, shader.stage(Stage::Fragment));
        lines.push("\t\t} }".to_string());
        lines.push("\t},".to_string());
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("const SpPermutationInfo spPermutations[] = {".to_string());
    for variant in &package.variants {
        lines.push(format!(
            "\t{{ {{ {} }}, {{ {} }}, {{ {} }}, {}, {} }},",
            variant.uniform_blocks.iter().join(","),
            variant.samplers.iter().join(","),
            variant.attribs.iter().join(","),
            variant.offset,
            variant.size
        ));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("const SpUniformBlockInfo spUniformBlocks[] = {".to_string());
    lines.push("\t{ }, // Null uniform block".to_string());
    for block in package.uniform_blocks.iter() {
        lines.push(format!("\t{{ \"{}\", {} }},", block.name, block.size_bytes()));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("const SpSamplerInfo spSamplers[] = {".to_string());
    lines.push("\t{ }, // Null sampler".to_string());
    for sampler in package.samplers.iter() {
        lines.push(format!("\t{{ \"{}\", (uint32_t){} }},", sampler.name, sampler.kind.image_type()));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("const SpAttribInfo spAttribs[] = {".to_string());
    lines.push("\t{ }, // Null attrib".to_string());
    for attrib in package.attribs.iter() {
        lines.push(format!("\t{{ \"{}\", {} }},", attrib.name, attrib.location));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("const char spShaderData[] = ".to_string());
    for chunk in compressed.chunks(DATA_COLUMNS) {
        let escaped: String = chunk.iter().map(|b| format!("\\x{b:02x}")).collect();
        lines.push(format!("\t\"{escaped}\""));
    }
    lines.push(";".to_string());

    lines.join("\n") + "\n"
}
