//! 扫描 `ServerState.h`，生成服务端状态的反射注册代码
//!
//! 只做逐行匹配，不解析 C++：结构体的开头必须独占一行，`};` 结束当前结构体。

use std::path::{Path, PathBuf};

use anyhow::Context;
use spear_crate_tools::resource::SpearPath;

/// 结构体所属的多态基类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Component,
    Event,
    Edit,
    /// 带 `sv_reflect` 标记的普通结构体
    Reflect,
}

impl StructKind {
    const POLYMORPHIC: [StructKind; 3] = [StructKind::Component, StructKind::Event, StructKind::Edit];

    fn base_name(self) -> Option<&'static str> {
        match self {
            StructKind::Component => Some("Component"),
            StructKind::Event => Some("Event"),
            StructKind::Edit => Some("Edit"),
            StructKind::Reflect => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedStruct {
    pub kind: StructKind,
    pub type_name: String,
    pub enum_name: String,
    pub fields: Vec<Field>,
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn split_ident(s: &str) -> (&str, &str) {
    let end = s.find(|c| !is_ident_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// `struct T : XxxBase<Xxx::E>` 或 `struct T ... sv_reflect ...`
fn parse_struct_header(line: &str) -> Option<ReflectedStruct> {
    let rest = line.strip_prefix("struct ")?;
    let (type_name, rest) = split_ident(rest);
    if type_name.is_empty() {
        return None;
    }

    for kind in StructKind::POLYMORPHIC {
        let base = kind.base_name()?;
        let Some(enum_part) = rest
            .strip_prefix(" : ")
            .and_then(|r| r.strip_prefix(base))
            .and_then(|r| r.strip_prefix("Base<"))
            .and_then(|r| r.strip_prefix(base))
            .and_then(|r| r.strip_prefix("::"))
        else {
            continue;
        };
        let (enum_name, rest) = split_ident(enum_part);
        if !enum_name.is_empty() && rest.starts_with('>') {
            return Some(ReflectedStruct {
                kind,
                type_name: type_name.to_string(),
                enum_name: enum_name.to_string(),
                fields: Vec::new(),
            });
        }
    }

    rest.contains("sv_reflect").then(|| ReflectedStruct {
        kind: StructKind::Reflect,
        type_name: type_name.to_string(),
        enum_name: type_name.to_string(),
        fields: Vec::new(),
    })
}

/// `TYPE NAME ...`，TYPE 可以包含 `<>:*`
///
/// `=` 之前出现 `(` 的是函数声明，初始化表达式里的括号不影响。
fn parse_field(line: &str) -> Option<Field> {
    let declaration = line.split_once('=').map_or(line, |(declaration, _)| declaration);
    if line.starts_with("//") || declaration.contains('(') {
        return None;
    }

    let first = line.chars().next()?;
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return None;
    }
    let type_end = line
        .find(|c: char| !(is_ident_char(c) || matches!(c, '<' | '>' | ':' | '*')))
        .unwrap_or(line.len());
    let (type_name, rest) = line.split_at(type_end);
    if matches!(type_name, "static" | "using" | "typedef" | "enum" | "struct" | "friend") {
        return None;
    }

    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return None;
    }
    let (name, _) = split_ident(trimmed);
    if name.is_empty() || name == "operator" {
        return None;
    }

    Some(Field {
        type_name: type_name.to_string(),
        name: name.to_string(),
    })
}

pub fn parse(source: &str) -> Vec<ReflectedStruct> {
    let mut structs: Vec<ReflectedStruct> = Vec::new();
    let mut in_struct = false;

    for line in source.lines().map(str::trim) {
        if line == "};" {
            in_struct = false;
            continue;
        }
        if let Some(header) = parse_struct_header(line) {
            structs.push(header);
            in_struct = true;
            continue;
        }
        if !in_struct {
            continue;
        }
        if let (Some(field), Some(current)) = (parse_field(line), structs.last_mut()) {
            current.fields.push(field);
        }
    }

    structs
}

fn init_type(lines: &mut Vec<String>, s: &ReflectedStruct) {
    lines.push(format!("template<> void initType<{}>(Type *t)", s.type_name));
    lines.push("{".to_string());
    lines.push("\tstatic Field fields[] = {".to_string());
    for field in &s.fields {
        lines.push(format!("\t\tsf_field({}, {}),", s.type_name, field.name));
    }
    lines.push("\t};".to_string());
    match s.kind.base_name() {
        Some(base) => lines.push(format!("\tsf_struct_base(t, {}, {}, fields);", s.type_name, base)),
        None => lines.push(format!("\tsf_struct(t, {}, fields);", s.type_name)),
    }
    lines.push("}".to_string());
    lines.push(String::new());
}

pub fn generate(structs: &[ReflectedStruct]) -> String {
    let mut lines = vec![
        "#include \"ServerState.h\"".to_string(),
        "#include \"sf/Reflection.h\"".to_string(),
        String::new(),
        "namespace sf {".to_string(),
        "using namespace sv;".to_string(),
        String::new(),
    ];

    for kind in StructKind::POLYMORPHIC {
        let Some(base) = kind.base_name() else {
            continue;
        };
        lines.push(format!("template<> void initType<{base}>(Type *t)"));
        lines.push("{".to_string());
        lines.push("\tstatic PolymorphType polys[] = {".to_string());
        for s in structs.iter().filter(|s| s.kind == kind) {
            lines.push(format!("\t\tsf_poly({}, {}, {}),", base, s.enum_name, s.type_name));
        }
        lines.push("\t};".to_string());
        lines.push(format!("\tsf_struct_poly(t, {base}, type, {{ }}, polys);"));
        lines.push("}".to_string());
        lines.push(String::new());
    }

    for kind in [StructKind::Component, StructKind::Event, StructKind::Edit, StructKind::Reflect] {
        for s in structs.iter().filter(|s| s.kind == kind) {
            init_type(&mut lines, s);
        }
    }

    lines.push("}".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// 引擎的构建脚本引用的就是这个文件名（含拼写错误），不能更正
pub const OUTPUT_FILE_NAME: &str = "ServerStateRefletion.cpp";

pub fn default_input(paths: &SpearPath) -> PathBuf {
    paths.src_path().join("server").join("ServerState.h")
}

pub fn default_output(paths: &SpearPath) -> PathBuf {
    paths.src_path().join("server").join(OUTPUT_FILE_NAME)
}

pub fn run(input: &Path, output: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?;
    let structs = parse(&source);
    log::info!("Found {} reflected struct(s) in {:?}", structs.len(), input);

    std::fs::write(output, generate(&structs)).with_context(|| format!("Failed to write {:?}", output))?;
    log::info!("Wrote {:?}", output);
    Ok(())
}
