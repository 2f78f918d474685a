use super::{block_members, Backend};
use crate::compiler::ShaderInterface;
use crate::types::{SamplerKind, Stage, ValueType};

pub struct GlslBackend {
    version: String,
}

impl GlslBackend {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    fn is_es(&self) -> bool {
        self.version.ends_with("es")
    }

    /// 桌面 GLSL 4.20 起支持 `layout(binding=)` 和 varying 的 `layout(location=)`
    fn explicit_bindings(&self) -> bool {
        !self.is_es() && self.version.trim().parse::<u32>().is_ok_and(|v| v >= 420)
    }
}

impl Backend for GlslBackend {
    fn extension(&self) -> &'static str {
        "glsl"
    }

    fn defines(&self) -> Vec<(String, String)> {
        vec![("SP_GLSL".to_string(), "1".to_string())]
    }

    fn header(&self, stage: Stage, interface: &ShaderInterface) -> Vec<String> {
        let explicit = self.explicit_bindings();
        let mut lines = vec![
            format!("#version {}", self.version),
            String::new(),
            "#define mul(a, b) ((b) * (a))".to_string(),
            "#define lerp(a, b, t) mix(a, b, t)".to_string(),
            "#define saturate(a) clamp(a, 0.0, 1.0)".to_string(),
            "#define asVec2(a) vec2(a)".to_string(),
            "#define asVec3(a) vec3(a)".to_string(),
            "#define asVec4(a) vec4(a)".to_string(),
        ];

        if self.is_es() {
            lines.push("precision mediump float;".to_string());
            for kind in [SamplerKind::Sampler2DArray, SamplerKind::Sampler3D] {
                if interface.samplers.iter().any(|s| s.kind == kind) {
                    lines.push(format!("precision lowp {};", kind.glsl_name()));
                }
            }
        }

        if stage == Stage::Vertex && !interface.attribs.is_empty() {
            lines.push(String::new());
            for a in &interface.attribs {
                lines.push(format!("layout(location={}) in {} {};", a.location, a.ty.name(), a.name));
            }
        }

        if !interface.varyings.is_empty() {
            lines.push(String::new());
        }
        let kw = match stage {
            Stage::Vertex => "out",
            Stage::Fragment => "in",
        };
        for (ix, v) in interface.varyings.iter().enumerate() {
            let interp = v.interp.map(|i| format!("{} ", i.glsl_name())).unwrap_or_default();
            if explicit {
                lines.push(format!("layout(location={}) {}{} {} {};", ix, interp, kw, v.ty.name(), v.name));
            } else {
                lines.push(format!("{}{} {} {};", interp, kw, v.ty.name(), v.name));
            }
        }

        if stage == Stage::Fragment {
            lines.push(String::new());
            for (ix, o) in interface.outputs.iter().enumerate() {
                lines.push(format!("layout(location={}) out {} {};", ix, o.ty.name(), o.name));
            }
        }

        if !interface.samplers.is_empty() {
            lines.push(String::new());
        }
        for (ix, s) in interface.samplers.iter().enumerate() {
            if explicit {
                lines.push(format!("layout(binding={}) uniform {} {};", ix, s.kind.glsl_name(), s.name));
            } else {
                lines.push(format!("uniform {} {};", s.kind.glsl_name(), s.name));
            }
        }

        for (ix, block) in interface.uniform_blocks.iter().enumerate() {
            lines.push(String::new());
            if explicit {
                lines.push(format!("layout(binding={}) layout(std140) uniform {} {{", ix, block.name));
            } else {
                lines.push(format!("layout(std140) uniform {} {{", block.name));
            }
            lines.extend(block_members(block, ValueType::name));
            lines.push("};".to_string());
        }

        lines.push(String::new());
        lines
    }

    fn main_begin(&self, _stage: Stage) -> Vec<String> {
        vec!["void main() {".to_string()]
    }

    fn main_end(&self, _stage: Stage) -> Vec<String> {
        vec!["}".to_string()]
    }

    fn position(&self, interface: &ShaderInterface, indent: &str, expr: &str) -> Vec<String> {
        if interface.glsl_flip {
            vec![
                format!("{indent}vec4 sp_tmpFlip = {expr};"),
                format!("{indent}sp_tmpFlip.y = -sp_tmpFlip.y;"),
                format!("{indent}gl_Position = sp_tmpFlip;"),
                String::new(),
            ]
        } else {
            vec![format!("{indent}gl_Position = {expr};")]
        }
    }

    fn frag_color(&self, indent: &str, expr: &str) -> Vec<String> {
        vec![format!("{indent}sp_fragColor = {expr};")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attribute, Interpolation, Output, Sampler, Uniform, UniformBlock, Varying};

    fn interface() -> ShaderInterface {
        ShaderInterface {
            attribs: vec![Attribute {
                location: 0,
                ty: ValueType::Vec3,
                name: "a_position".to_string(),
            }],
            varyings: vec![Varying {
                interp: Some(Interpolation::Flat),
                ty: ValueType::IVec2,
                name: "v_cell".to_string(),
            }],
            outputs: vec![Output {
                ty: ValueType::Vec4,
                name: "sp_fragColor".to_string(),
            }],
            samplers: vec![Sampler {
                kind: SamplerKind::Sampler2DArray,
                name: "atlas".to_string(),
            }],
            uniform_blocks: vec![UniformBlock {
                name: "Vertex".to_string(),
                uniforms: vec![Uniform {
                    ty: ValueType::Mat4,
                    name: "worldToClip".to_string(),
                    count: None,
                }],
                size: 16,
            }],
            glsl_flip: false,
        }
    }

    #[test]
    fn test_es_vertex_header() {
        let lines = GlslBackend::new("300 es").header(Stage::Vertex, &interface());
        assert_eq!(lines[0], "#version 300 es");
        assert!(lines.contains(&"precision mediump float;".to_string()));
        assert!(lines.contains(&"precision lowp sampler2DArray;".to_string()));
        assert!(!lines.contains(&"precision lowp sampler3D;".to_string()));
        assert!(lines.contains(&"layout(location=0) in vec3 a_position;".to_string()));
        assert!(lines.contains(&"flat out ivec2 v_cell;".to_string()));
        assert!(lines.contains(&"uniform sampler2DArray atlas;".to_string()));
        assert!(lines.contains(&"layout(std140) uniform Vertex {".to_string()));
        assert!(lines.contains(&"\tmat4 worldToClip;".to_string()));
        assert!(!lines.iter().any(|l| l.contains("sp_fragColor")));
    }

    #[test]
    fn test_450_fragment_header() {
        let lines = GlslBackend::new("450").header(Stage::Fragment, &interface());
        assert!(!lines.iter().any(|l| l.starts_with("precision")));
        assert!(!lines.iter().any(|l| l.contains("a_position")));
        assert!(lines.contains(&"layout(location=0) flat in ivec2 v_cell;".to_string()));
        assert!(lines.contains(&"layout(location=0) out vec4 sp_fragColor;".to_string()));
        assert!(lines.contains(&"layout(binding=0) uniform sampler2DArray atlas;".to_string()));
        assert!(lines.contains(&"layout(binding=0) layout(std140) uniform Vertex {".to_string()));
    }

    #[test]
    fn test_desktop_300_has_no_bindings() {
        let lines = GlslBackend::new("300").header(Stage::Fragment, &interface());
        assert!(lines.contains(&"flat in ivec2 v_cell;".to_string()));
        assert!(!lines.iter().any(|l| l.contains("binding")));
    }

    #[test]
    fn test_frag_color() {
        assert_eq!(GlslBackend::new("300").frag_color("  ", "c"), vec!["  sp_fragColor = c;"]);
    }
}
