//! 着色器源码的 C 风格预处理器
//!
//! 支持 `#define`/`#undef`、条件编译、`#include`、`#error`；
//! `#pragma`、`#version`、`#extension`、`#line` 原样输出。
//! 未知指令在 strict 模式下报错，在 lenient 模式下原样输出（用于收集 permutation）。

mod expr;
mod loader;
mod macros;
mod token;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use expr::{evaluate, parse_int};
pub use loader::{FsLoader, MemoryLoader, SourceLoader};
pub use macros::{Macro, MacroTable};
pub use token::{Token, TokenKind, tokenize};

const MAX_INCLUDE_DEPTH: usize = 64;

/// 原样输出的指令
const PASSTHROUGH_DIRECTIVES: [&str; 4] = ["pragma", "version", "extension", "line"];

#[derive(Debug, Error)]
#[error("{file}:{line}: {kind}")]
pub struct PreprocessError {
    pub file: String,
    pub line: usize,
    pub kind: PreprocessErrorKind,
}

#[derive(Debug, Error)]
pub enum PreprocessErrorKind {
    #[error("invalid directive: {0}")]
    InvalidDirective(String),
    #[error("unknown directive #{0}")]
    UnknownDirective(String),
    #[error("invalid #if expression: {0}")]
    Expression(String),
    #[error("macro error: {0}")]
    Macro(String),
    #[error("#error {0}")]
    User(String),
    #[error("cannot find include file {0:?}")]
    IncludeNotFound(String),
    #[error("include nesting deeper than {MAX_INCLUDE_DEPTH}")]
    IncludeDepth,
    #[error("#{0} without matching #if")]
    UnbalancedConditional(String),
    #[error("unterminated conditional block")]
    UnterminatedConditional,
    #[error("failed to read source")]
    Io(#[source] std::io::Error),
}

/// 条件编译栈中的一层
#[derive(Debug, Clone, Copy)]
struct Conditional {
    /// 外层是否处于激活状态
    parent_active: bool,
    /// 当前分支是否激活
    active: bool,
    /// 是否已有分支被选中
    taken: bool,
    seen_else: bool,
}

/// 当前正在处理的文件
struct FileContext<'p> {
    name: String,
    dir: Option<&'p Path>,
    line: usize,
}

impl FileContext<'_> {
    fn error(&self, kind: PreprocessErrorKind) -> PreprocessError {
        PreprocessError {
            file: self.name.clone(),
            line: self.line,
            kind,
        }
    }
}

pub struct Preprocessor<'a> {
    loader: &'a dyn SourceLoader,
    macros: MacroTable,
    include_paths: Vec<PathBuf>,
    lenient: bool,
    output: Vec<String>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(loader: &'a dyn SourceLoader) -> Self {
        Self {
            loader,
            macros: MacroTable::default(),
            include_paths: Vec::new(),
            lenient: false,
            output: Vec::new(),
        }
    }

    /// 预定义 object-like 宏，等价于 `#define NAME VALUE`
    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.macros.define_value(name, value);
        self
    }

    pub fn defines<I, K, V>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in defines {
            self.macros.define_value(name.as_ref(), value.as_ref());
        }
        self
    }

    pub fn include_paths<I: IntoIterator<Item = PathBuf>>(mut self, paths: I) -> Self {
        self.include_paths.extend(paths);
        self
    }

    /// lenient 模式下未知指令原样输出
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// 读取并处理文件
    pub fn run_file(self, path: &Path) -> Result<String, PreprocessError> {
        let source = self.loader.load(path).map_err(|e| PreprocessError {
            file: path.display().to_string(),
            line: 0,
            kind: PreprocessErrorKind::Io(e),
        })?;
        self.run(&source, path)
    }

    /// 处理一段源码，`path` 用于错误信息和相对 include
    pub fn run(mut self, source: &str, path: &Path) -> Result<String, PreprocessError> {
        self.process(source, path, 0)?;
        let mut text = self.output.join("\n");
        text.push('\n');
        Ok(text)
    }

    fn process(&mut self, source: &str, path: &Path, depth: usize) -> Result<(), PreprocessError> {
        let mut ctx = FileContext {
            name: path.display().to_string(),
            dir: path.parent(),
            line: 0,
        };
        let mut conditionals: Vec<Conditional> = Vec::new();
        let mut pending: Vec<Token> = Vec::new();
        let stripped = token::strip_comments(source);

        for (index, line) in stripped.lines().enumerate() {
            ctx.line = index + 1;
            let active = conditionals.last().is_none_or(|c| c.active);

            let Some(directive) = line.trim_start().strip_prefix('#') else {
                if active {
                    pending.extend(tokenize(line));
                    pending.push(Token::newline());
                }
                continue;
            };

            let tokens = tokenize(directive);
            let mut iter = tokens.iter().enumerate().filter(|(_, t)| !t.is_space());
            let Some((name_index, name)) = iter.next() else {
                // 空指令
                continue;
            };
            let rest = &tokens[name_index + 1..];

            match name.text.as_str() {
                "if" | "ifdef" | "ifndef" => {
                    let taken = if active {
                        match name.text.as_str() {
                            "if" => self.eval_condition(rest, &ctx)?,
                            "ifdef" => self.macros.is_defined(&Self::directive_ident(rest, &ctx)?),
                            _ => !self.macros.is_defined(&Self::directive_ident(rest, &ctx)?),
                        }
                    } else {
                        false
                    };
                    conditionals.push(Conditional {
                        parent_active: active,
                        active: active && taken,
                        taken,
                        seen_else: false,
                    });
                }
                "elif" => {
                    let Some(mut top) = conditionals.pop() else {
                        return Err(ctx.error(PreprocessErrorKind::UnbalancedConditional("elif".to_string())));
                    };
                    if top.seen_else {
                        return Err(ctx.error(PreprocessErrorKind::InvalidDirective("#elif after #else".to_string())));
                    }
                    top.active = if top.parent_active && !top.taken {
                        self.eval_condition(rest, &ctx)?
                    } else {
                        false
                    };
                    top.taken |= top.active;
                    conditionals.push(top);
                }
                "else" => {
                    let Some(top) = conditionals.last_mut() else {
                        return Err(ctx.error(PreprocessErrorKind::UnbalancedConditional("else".to_string())));
                    };
                    if top.seen_else {
                        return Err(ctx.error(PreprocessErrorKind::InvalidDirective("duplicate #else".to_string())));
                    }
                    top.seen_else = true;
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                }
                "endif" => {
                    if conditionals.pop().is_none() {
                        return Err(ctx.error(PreprocessErrorKind::UnbalancedConditional("endif".to_string())));
                    }
                }
                _ if !active => {}
                "define" => {
                    self.flush(&mut pending, &ctx)?;
                    let (macro_name, m) = macros::parse_define(rest)
                        .map_err(|e| ctx.error(PreprocessErrorKind::InvalidDirective(e)))?;
                    self.macros.define(macro_name, m);
                }
                "undef" => {
                    self.flush(&mut pending, &ctx)?;
                    let macro_name = Self::directive_ident(rest, &ctx)?;
                    self.macros.undef(&macro_name);
                }
                "include" => {
                    self.flush(&mut pending, &ctx)?;
                    self.include(rest, &ctx, depth)?;
                }
                "error" => {
                    return Err(ctx.error(PreprocessErrorKind::User(token::join(token::trim(rest)))));
                }
                other if PASSTHROUGH_DIRECTIVES.contains(&other) => {
                    self.flush(&mut pending, &ctx)?;
                    self.output.push(line.trim_end().to_string());
                }
                other => {
                    if !self.lenient {
                        return Err(ctx.error(PreprocessErrorKind::UnknownDirective(other.to_string())));
                    }
                    self.flush(&mut pending, &ctx)?;
                    self.output.push(line.trim_end().to_string());
                }
            }
        }

        if !conditionals.is_empty() {
            return Err(ctx.error(PreprocessErrorKind::UnterminatedConditional));
        }
        self.flush(&mut pending, &ctx)
    }

    /// 展开缓存的文本行并写入输出
    fn flush(&mut self, pending: &mut Vec<Token>, ctx: &FileContext) -> Result<(), PreprocessError> {
        if pending.is_empty() {
            return Ok(());
        }
        let expanded = self
            .macros
            .expand(pending)
            .map_err(|e| ctx.error(PreprocessErrorKind::Macro(e)))?;
        pending.clear();

        let text = token::join(&expanded);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        self.output.extend(text.split('\n').map(|l| l.trim_end().to_string()));
        Ok(())
    }

    fn directive_ident(rest: &[Token], ctx: &FileContext) -> Result<String, PreprocessError> {
        match token::trim(rest) {
            [t, ..] if t.kind == TokenKind::Ident => Ok(t.text.clone()),
            _ => Err(ctx.error(PreprocessErrorKind::InvalidDirective("expected identifier".to_string()))),
        }
    }

    /// `defined` 先于宏展开处理
    fn eval_condition(&self, rest: &[Token], ctx: &FileContext) -> Result<bool, PreprocessError> {
        let mut resolved = Vec::with_capacity(rest.len());
        let mut i = 0;
        while i < rest.len() {
            if !rest[i].is_ident("defined") {
                resolved.push(rest[i].clone());
                i += 1;
                continue;
            }

            let next = |from: usize| (from..rest.len()).find(|&j| !rest[j].is_space());
            let (name, end) = match next(i + 1) {
                Some(j) if rest[j].is_punct("(") => {
                    let name = next(j + 1).filter(|&k| rest[k].kind == TokenKind::Ident);
                    let close = name.and_then(|k| next(k + 1)).filter(|&c| rest[c].is_punct(")"));
                    match (name, close) {
                        (Some(k), Some(c)) => (&rest[k].text, c),
                        _ => return Err(ctx.error(PreprocessErrorKind::Expression("malformed defined()".to_string()))),
                    }
                }
                Some(j) if rest[j].kind == TokenKind::Ident => (&rest[j].text, j),
                _ => return Err(ctx.error(PreprocessErrorKind::Expression("defined without name".to_string()))),
            };

            let value = if self.macros.is_defined(name) { "1" } else { "0" };
            resolved.push(Token::new(TokenKind::Number, value));
            i = end + 1;
        }

        let expanded = self
            .macros
            .expand(&resolved)
            .map_err(|e| ctx.error(PreprocessErrorKind::Macro(e)))?;
        let value = evaluate(&expanded).map_err(|e| ctx.error(PreprocessErrorKind::Expression(e)))?;
        Ok(value != 0)
    }

    fn include(&mut self, rest: &[Token], ctx: &FileContext, depth: usize) -> Result<(), PreprocessError> {
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(ctx.error(PreprocessErrorKind::IncludeDepth));
        }

        let operand = token::join(token::trim(rest));
        let (name, quoted) = if let Some(name) = operand.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            (name, true)
        } else if let Some(name) = operand.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            (name, false)
        } else {
            return Err(ctx.error(PreprocessErrorKind::InvalidDirective(format!("#include {operand}"))));
        };

        let local = ctx.dir.filter(|_| quoted).map(|dir| dir.join(name));
        let path = local
            .into_iter()
            .chain(self.include_paths.iter().map(|dir| dir.join(name)))
            .find(|candidate| self.loader.exists(candidate))
            .ok_or_else(|| ctx.error(PreprocessErrorKind::IncludeNotFound(name.to_string())))?;

        let source = self
            .loader
            .load(&path)
            .map_err(|e| ctx.error(PreprocessErrorKind::Io(e)))?;
        log::trace!("include {:?}", path);
        self.process(&source, &path, depth + 1)
    }
}
