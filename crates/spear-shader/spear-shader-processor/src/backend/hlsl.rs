use super::{block_members, Backend, TEMP_PREFIX};
use crate::compiler::ShaderInterface;
use crate::types::{Stage, ValueType, Varying};

/// Shader Model 5
#[derive(Default)]
pub struct HlslBackend;

impl HlslBackend {
    pub fn new() -> Self {
        Self
    }
}

fn varying_struct(lines: &mut Vec<String>, varyings: &[Varying], with_position: bool) {
    lines.push(String::new());
    lines.push("struct SP_Varyings {".to_string());
    for (ix, v) in varyings.iter().enumerate() {
        let interp = v.interp.map(|i| format!("{} ", i.hlsl_name())).unwrap_or_default();
        lines.push(format!("\t{}{} {}{} : TEXCOORD{};", interp, v.ty.name(), TEMP_PREFIX, v.name, ix));
    }
    if with_position {
        lines.push("\tvec4 sp_vertexPosition : SV_Position;".to_string());
    }
    lines.push("};".to_string());
}

fn name_macro(var: &str, name: &str) -> String {
    format!("#define {name} {var}.{TEMP_PREFIX}{name}")
}

impl Backend for HlslBackend {
    fn extension(&self) -> &'static str {
        "hlsl"
    }

    fn defines(&self) -> Vec<(String, String)> {
        vec![("SP_HLSL".to_string(), "1".to_string())]
    }

    fn header(&self, stage: Stage, interface: &ShaderInterface) -> Vec<String> {
        let mut lines: Vec<String> = ValueType::ALL
            .into_iter()
            .filter(|t| t.name() != t.hlsl_name())
            .map(|t| format!("#define {} {}", t.name(), t.hlsl_name()))
            .collect();

        lines.extend(
            [
                "#define asVec2(a) (a)",
                "#define asVec3(a) (a)",
                "#define asVec4(a) (a)",
                "#define texture(s, p) s.Sample(s##_spSampler, p)",
                "#define textureLod(s, p, l) s.SampleLevel(s##_spSampler, p, l)",
            ]
            .map(String::from),
        );

        match stage {
            Stage::Vertex => {
                lines.push(String::new());
                lines.push("struct SP_Attribs {".to_string());
                for a in &interface.attribs {
                    lines.push(format!("\t{} {}{} : TEXCOORD{};", a.ty.name(), TEMP_PREFIX, a.name, a.location));
                }
                lines.push("};".to_string());

                varying_struct(&mut lines, &interface.varyings, true);

                lines.push(String::new());
                lines.extend(interface.attribs.iter().map(|a| name_macro("sp_in", &a.name)));
                lines.extend(interface.varyings.iter().map(|v| name_macro("sp_out", &v.name)));
            }
            Stage::Fragment => {
                varying_struct(&mut lines, &interface.varyings, false);

                lines.push(String::new());
                lines.extend(interface.varyings.iter().map(|v| name_macro("sp_in", &v.name)));

                lines.push(String::new());
                lines.push("struct SP_Targets {".to_string());
                for (ix, o) in interface.outputs.iter().enumerate() {
                    lines.push(format!("\t{} {}{} : SV_Target{};", o.ty.name(), TEMP_PREFIX, o.name, ix));
                }
                lines.push("};".to_string());
                lines.extend(interface.outputs.iter().map(|o| name_macro("sp_out", &o.name)));
            }
        }

        for (ix, s) in interface.samplers.iter().enumerate() {
            lines.push(format!("{} {} : register(t{});", s.kind.hlsl_texture(), s.name, ix));
            lines.push(format!("SamplerState {}_spSampler : register(s{});", s.name, ix));
        }

        for (ix, block) in interface.uniform_blocks.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!("cbuffer {} : register(b{}) {{", block.name, ix));
            lines.extend(block_members(block, |ty| match ty {
                ValueType::Mat4 => "row_major float4x4",
                other => other.name(),
            }));
            lines.push("};".to_string());
        }

        lines.push(String::new());
        lines
    }

    fn main_begin(&self, stage: Stage) -> Vec<String> {
        let (ret, input) = match stage {
            Stage::Vertex => ("SP_Varyings", "SP_Attribs"),
            Stage::Fragment => ("SP_Targets", "SP_Varyings"),
        };
        vec![format!("{ret} main({input} sp_in) {{"), format!("\t{ret} sp_out;")]
    }

    fn main_end(&self, _stage: Stage) -> Vec<String> {
        vec!["\treturn sp_out;".to_string(), "}".to_string()]
    }

    fn position(&self, _interface: &ShaderInterface, indent: &str, expr: &str) -> Vec<String> {
        vec![format!("{indent}sp_out.sp_vertexPosition = {expr};")]
    }

    fn frag_color(&self, indent: &str, expr: &str) -> Vec<String> {
        vec![format!("{indent}sp_out.{TEMP_PREFIX}sp_fragColor = {expr};")]
    }
}
