//! 逐行改写预处理后的着色器
//!
//! 顶层的 attribute / varying / out / sampler / uniform block 声明被收集到 [`ShaderInterface`]，
//! 由后端统一生成声明；`main` 的入口和 `gl_Position` / `gl_FragColor` 赋值交给后端改写，
//! 其余行原样保留。

use crate::backend::Backend;
use crate::error::ShaderError;
use crate::layout;
use crate::preprocess::{evaluate, tokenize};
use crate::types::{
    Attribute, Interpolation, Output, Sampler, SamplerKind, Stage, Uniform, UniformBlock, ValueType, Varying,
};

/// 一个 stage 的输入输出声明
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    pub attribs: Vec<Attribute>,
    pub varyings: Vec<Varying>,
    pub outputs: Vec<Output>,
    pub samplers: Vec<Sampler>,
    pub uniform_blocks: Vec<UniformBlock>,
    /// `#pragma glsl_flip`：GLSL 输出时翻转裁剪空间的 y
    pub glsl_flip: bool,
}

/// 改写后的结果：接口声明 + 函数体等其余代码
#[derive(Debug, Clone)]
pub struct CompiledBody {
    pub interface: ShaderInterface,
    pub lines: Vec<String>,
}

enum State {
    TopLevel,
    UniformBlock { name: String, uniforms: Vec<Uniform> },
    /// `void main()` 之后、`{` 之前
    MainPrologue,
    MainBody,
}

pub struct LineCompiler<'a> {
    backend: &'a dyn Backend,
    stage: Stage,
    file: String,
    line: usize,
    interface: ShaderInterface,
    state: State,
}

impl<'a> LineCompiler<'a> {
    pub fn new(backend: &'a dyn Backend, stage: Stage, file: impl Into<String>) -> Self {
        Self {
            backend,
            stage,
            file: file.into(),
            line: 0,
            interface: ShaderInterface::default(),
            state: State::TopLevel,
        }
    }

    /// 处理整段预处理后的源码
    pub fn compile(mut self, source: &str) -> Result<CompiledBody, ShaderError> {
        let mut lines = Vec::new();
        for (index, line) in source.lines().enumerate() {
            self.line = index + 1;
            match self.do_line(line)? {
                Some(replacement) => lines.extend(replacement),
                None => lines.push(line.to_string()),
            }
        }

        let unclosed = match &self.state {
            State::TopLevel => None,
            State::UniformBlock { name, .. } => Some(format!("uniform block `{name}` is not closed")),
            State::MainPrologue | State::MainBody => Some("main() is not closed".to_string()),
        };
        if let Some(message) = unclosed {
            return Err(self.error(message));
        }

        Ok(CompiledBody {
            interface: self.interface,
            lines,
        })
    }

    fn error(&self, message: String) -> ShaderError {
        ShaderError::Parse {
            file: self.file.clone(),
            line: self.line,
            message,
        }
    }

    fn value_type(&self, name: &str) -> Result<ValueType, ShaderError> {
        ValueType::from_name(name).ok_or_else(|| self.error(format!("unknown type `{name}`")))
    }

    /// 返回 `None` 表示原样保留该行
    fn do_line(&mut self, line: &str) -> Result<Option<Vec<String>>, ShaderError> {
        match self.state {
            State::UniformBlock { .. } => self.do_uniform_line(line).map(|()| Some(Vec::new())),
            State::MainPrologue => {
                if line.trim() == "{" {
                    self.state = State::MainBody;
                }
                Ok(Some(Vec::new()))
            }
            State::MainBody => Ok(self.do_main_line(line)),
            State::TopLevel => self.do_top_line(line),
        }
    }

    fn do_uniform_line(&mut self, line: &str) -> Result<(), ShaderError> {
        if line.trim() == "};" {
            if let State::UniformBlock { name, uniforms } = std::mem::replace(&mut self.state, State::TopLevel) {
                let size = layout::block_size(&uniforms);
                self.interface.uniform_blocks.push(UniformBlock { name, uniforms, size });
            }
            return Ok(());
        }

        let Some((ty, name, count)) = parse_uniform_member(line) else {
            return Ok(());
        };
        let ty = self.value_type(ty)?;
        let count = match count {
            Some(expr) => Some(self.array_count(expr)?),
            None => None,
        };

        if let State::UniformBlock { uniforms, .. } = &mut self.state {
            uniforms.push(Uniform {
                ty,
                name: name.to_string(),
                count,
            });
        }
        Ok(())
    }

    fn array_count(&self, expr: &str) -> Result<u32, ShaderError> {
        let value = evaluate(&tokenize(expr)).map_err(|e| self.error(format!("invalid array size `{expr}`: {e}")))?;
        u32::try_from(value)
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| self.error(format!("array size must be positive, got {value}")))
    }

    fn do_main_line(&mut self, line: &str) -> Option<Vec<String>> {
        if let Some((indent, expr)) = parse_assignment(line, "gl_Position") {
            return Some(self.backend.position(&self.interface, indent, expr));
        }
        if let Some((indent, expr)) = parse_assignment(line, "gl_FragColor") {
            return Some(self.backend.frag_color(indent, expr));
        }
        if line == "}" {
            self.state = State::TopLevel;
            return Some(self.backend.main_end(self.stage));
        }
        None
    }

    fn do_top_line(&mut self, line: &str) -> Result<Option<Vec<String>>, ShaderError> {
        let consumed = Some(Vec::new());

        if let Some((location, ty, name)) = parse_attribute(line) {
            let ty = self.value_type(ty)?;
            let location = location.unwrap_or(self.interface.attribs.len() as u32);
            self.interface.attribs.push(Attribute {
                location,
                ty,
                name: name.to_string(),
            });
            return Ok(consumed);
        }

        if let Some((interp, ty, name)) = parse_varying(line) {
            let ty = self.value_type(ty)?;
            self.interface.varyings.push(Varying {
                interp,
                ty,
                name: name.to_string(),
            });
            return Ok(consumed);
        }

        if let Some((ty, name)) = parse_output(line) {
            let ty = self.value_type(ty)?;
            self.interface.outputs.push(Output {
                ty,
                name: name.to_string(),
            });
            return Ok(consumed);
        }

        if let Some((kind, name)) = parse_sampler(line) {
            self.interface.samplers.push(Sampler {
                kind,
                name: name.to_string(),
            });
            return Ok(consumed);
        }

        match parse_block_start(line) {
            Some(BlockStart::Block(name)) => {
                self.state = State::UniformBlock {
                    name: name.to_string(),
                    uniforms: Vec::new(),
                };
                return Ok(consumed);
            }
            Some(BlockStart::Loose(name)) => {
                return Err(self.error(format!("uniform `{name}` must be declared inside a uniform block")));
            }
            None => {}
        }

        if let Some(brace_on_same_line) = parse_main(line) {
            self.state = if brace_on_same_line {
                State::MainBody
            } else {
                State::MainPrologue
            };
            return Ok(Some(self.backend.main_begin(self.stage)));
        }

        if is_pragma(line, "glsl_flip") {
            self.interface.glsl_flip = true;
            return Ok(consumed);
        }

        if is_pragma(line, "permutation") {
            return Ok(consumed);
        }

        Ok(None)
    }
}

/// 行内扫描器
#[derive(Clone, Copy)]
struct Cursor<'s> {
    rest: &'s str,
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl<'s> Cursor<'s> {
    fn new(line: &'s str) -> Self {
        Self { rest: line }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn ident(&mut self) -> Option<&'s str> {
        self.skip_ws();
        let first = self.rest.chars().next()?;
        if !(first == '_' || first.is_ascii_alphabetic()) {
            return None;
        }
        let end = self.rest.find(|c| !is_ident_char(c)).unwrap_or(self.rest.len());
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(ident)
    }

    fn keyword(&mut self, kw: &str) -> bool {
        let mut probe = *self;
        if probe.ident() == Some(kw) {
            *self = probe;
            true
        } else {
            false
        }
    }

    fn punct(&mut self, c: char) -> bool {
        self.skip_ws();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn number(&mut self) -> Option<u32> {
        self.skip_ws();
        let end = self.rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(self.rest.len());
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    fn rest(&self) -> &'s str {
        self.rest
    }
}

/// `[layout(location = N)] attribute TYPE NAME;`
fn parse_attribute(line: &str) -> Option<(Option<u32>, &str, &str)> {
    let mut c = Cursor::new(line);
    let mut location = None;
    if c.keyword("layout") {
        if !(c.punct('(') && c.keyword("location") && c.punct('=')) {
            return None;
        }
        location = Some(c.number()?);
        if !c.punct(')') {
            return None;
        }
    }
    if !c.keyword("attribute") {
        return None;
    }
    Some((location, c.ident()?, c.ident()?))
}

/// `[smooth|flat|noperspective] varying TYPE NAME;`
fn parse_varying(line: &str) -> Option<(Option<Interpolation>, &str, &str)> {
    let mut c = Cursor::new(line);
    let first = c.ident()?;
    let interp = match first {
        "varying" => None,
        other => {
            let interp = Interpolation::from_name(other)?;
            if !c.keyword("varying") {
                return None;
            }
            Some(interp)
        }
    };
    Some((interp, c.ident()?, c.ident()?))
}

/// `out TYPE NAME;`
fn parse_output(line: &str) -> Option<(&str, &str)> {
    let mut c = Cursor::new(line);
    if !c.keyword("out") {
        return None;
    }
    Some((c.ident()?, c.ident()?))
}

/// `uniform sampler2D NAME;`
fn parse_sampler(line: &str) -> Option<(SamplerKind, &str)> {
    let mut c = Cursor::new(line);
    if !c.keyword("uniform") {
        return None;
    }
    let kind = SamplerKind::from_name(c.ident()?)?;
    let name = c.ident()?;
    c.punct(';').then_some((kind, name))
}

enum BlockStart<'s> {
    Block(&'s str),
    /// `uniform TYPE NAME;` 这种块外的 uniform
    Loose(&'s str),
}

/// `uniform NAME [{]`
fn parse_block_start(line: &str) -> Option<BlockStart<'_>> {
    let mut c = Cursor::new(line);
    if !c.keyword("uniform") {
        return None;
    }
    let name = c.ident()?;
    match c.ident() {
        Some(member) => Some(BlockStart::Loose(member)),
        None => Some(BlockStart::Block(name)),
    }
}

/// `void main()`，返回 `{` 是否在同一行
fn parse_main(line: &str) -> Option<bool> {
    let mut c = Cursor::new(line);
    if c.keyword("void") && c.keyword("main") && c.punct('(') && c.punct(')') {
        Some(c.punct('{'))
    } else {
        None
    }
}

/// `#pragma NAME ...`
fn is_pragma(line: &str, name: &str) -> bool {
    let mut c = Cursor::new(line);
    c.punct('#') && c.keyword("pragma") && c.keyword(name)
}

/// uniform block 中的 `TYPE NAME[COUNT];`
fn parse_uniform_member(line: &str) -> Option<(&str, &str, Option<&str>)> {
    let mut c = Cursor::new(line);
    let ty = c.ident()?;
    let name = c.ident()?;
    let count = if c.punct('[') {
        let rest = c.rest();
        let end = rest.rfind(']')?;
        Some(rest[..end].trim())
    } else {
        None
    };
    Some((ty, name, count))
}

/// `<indent>TARGET = EXPR;`，返回缩进和表达式
fn parse_assignment<'s>(line: &'s str, target: &str) -> Option<(&'s str, &'s str)> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let mut c = Cursor::new(body);
    if !c.keyword(target) || !c.punct('=') || c.rest().starts_with('=') {
        return None;
    }
    let expr = c.rest().trim_end();
    let expr = expr.strip_suffix(';')?.trim();
    Some((indent, expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GlslBackend, HlslBackend};

    fn compile(src: &str, stage: Stage) -> CompiledBody {
        let backend = GlslBackend::new("300 es");
        LineCompiler::new(&backend, stage, "test.glsl").compile(src).unwrap()
    }

    #[test]
    fn test_collects_interface() {
        let src = "\
#pragma permutation SP_DEBUG 2
layout(location=0) attribute vec3 a_position;
attribute vec2 a_uv;
flat varying ivec2 v_cell;
varying vec2 v_uv;
out vec4 sp_fragColor;
uniform sampler2D albedo;
uniform Pixel {
    float numLightsF;
    vec3 cameraPosition;
    vec4 pointLightData[16 * 4];
};
float helper() { return 1.0; }
";
        let body = compile(src, Stage::Vertex);
        let i = &body.interface;

        assert_eq!(i.attribs.len(), 2);
        assert_eq!(i.attribs[0].location, 0);
        assert_eq!(i.attribs[1].location, 1);
        assert_eq!(i.attribs[1].ty, ValueType::Vec2);
        assert_eq!(i.varyings[0].interp, Some(Interpolation::Flat));
        assert_eq!(i.varyings[1].interp, None);
        assert_eq!(i.outputs[0].name, "sp_fragColor");
        assert_eq!(i.samplers[0].kind, SamplerKind::Sampler2D);

        let block = &i.uniform_blocks[0];
        assert_eq!(block.name, "Pixel");
        assert_eq!(block.uniforms.len(), 3);
        assert_eq!(block.uniforms[2].count, Some(64));
        assert_eq!(block.size, 8 + 256);

        assert_eq!(body.lines, vec!["float helper() { return 1.0; }"]);
    }

    #[test]
    fn test_main_rewrite() {
        let src = "\
#pragma glsl_flip
void main()
{
    vec4 p = vec4(1.0);
    gl_Position = p;
}
";
        let body = compile(src, Stage::Vertex);
        assert!(body.interface.glsl_flip);
        assert_eq!(
            body.lines,
            vec![
                "void main() {",
                "    vec4 p = vec4(1.0);",
                "    vec4 sp_tmpFlip = p;",
                "    sp_tmpFlip.y = -sp_tmpFlip.y;",
                "    gl_Position = sp_tmpFlip;",
                "",
                "}",
            ]
        );
    }

    #[test]
    fn test_main_brace_on_same_line() {
        let src = "void main() {\n\tgl_FragColor = vec4(1.0);\n}\n";
        let body = compile(src, Stage::Fragment);
        assert_eq!(body.lines, vec!["void main() {", "\tsp_fragColor = vec4(1.0);", "}"]);
    }

    #[test]
    fn test_hlsl_main() {
        let backend = HlslBackend::new();
        let src = "void main()\n{\n\tgl_Position = mul(m, p);\n}\n";
        let body = LineCompiler::new(&backend, Stage::Vertex, "a").compile(src).unwrap();
        assert_eq!(
            body.lines,
            vec![
                "SP_Varyings main(SP_Attribs sp_in) {",
                "\tSP_Varyings sp_out;",
                "\tsp_out.sp_vertexPosition = mul(m, p);",
                "\treturn sp_out;",
                "}",
            ]
        );
    }

    #[test]
    fn test_unknown_type_is_error() {
        let backend = GlslBackend::new("300");
        let err = LineCompiler::new(&backend, Stage::Vertex, "a.glsl")
            .compile("uniform Block {\n\tdvec3 x;\n};\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "a.glsl:2: unknown type `dvec3`");
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let backend = GlslBackend::new("300");
        let result = LineCompiler::new(&backend, Stage::Vertex, "a").compile("uniform Block\n{\n\tvec4 x;\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_loose_uniform_is_error() {
        let backend = GlslBackend::new("300");
        let result = LineCompiler::new(&backend, Stage::Vertex, "a").compile("uniform vec4 color;\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_attribute("layout (location = 3) attribute vec4 a;"), Some((Some(3), "vec4", "a")));
        assert_eq!(parse_attribute("attributes vec4 a;"), None);
        assert_eq!(parse_varying("noperspective varying vec2 uv;"), Some((Some(Interpolation::NoPerspective), "vec2", "uv")));
        assert_eq!(parse_varying("vec2 uv;"), None);
        assert_eq!(parse_output("outColor = x;"), None);
        assert!(parse_sampler("uniform sampler3D volume").is_none());
        assert_eq!(parse_main("void  main ( )"), Some(false));
        assert_eq!(parse_assignment("  gl_Position = a;", "gl_Position"), Some(("  ", "a")));
        assert_eq!(parse_assignment("gl_Position == a;", "gl_Position"), None);
        assert_eq!(parse_uniform_member("\tvec4 data[N + 1];"), Some(("vec4", "data", Some("N + 1"))));
        assert!(is_pragma("  #pragma  glsl_flip", "glsl_flip"));
        assert!(!is_pragma("#pragma glsl_flipped", "glsl_flip"));
    }
}
