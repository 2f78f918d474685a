//! 宏定义与展开
//!
//! 展开使用 hide set 防止递归：每个 token 记录展开出它的宏名，
//! 宏名出现在自己的 hide set 中时不再展开。

use std::collections::{HashMap, VecDeque};

use super::token::{self, Token, TokenKind};

/// 单个宏定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// `None` 表示 object-like 宏
    pub params: Option<Vec<String>>,
    pub body: Vec<Token>,
}

impl Macro {
    pub fn object(body: Vec<Token>) -> Self {
        Self {
            params: None,
            body: token::trim(&body).to_vec(),
        }
    }

    pub fn function(params: Vec<String>, body: Vec<Token>) -> Self {
        Self {
            params: Some(params),
            body: token::trim(&body).to_vec(),
        }
    }

    fn param_index(&self, token: &Token) -> Option<usize> {
        if token.kind != TokenKind::Ident {
            return None;
        }
        self.params.as_ref()?.iter().position(|p| *p == token.text)
    }
}

/// 解析 `#define` 之后的内容
///
/// 宏名后紧跟 `(`（中间没有空白）时为 function-like 宏。
pub fn parse_define(tokens: &[Token]) -> Result<(String, Macro), String> {
    let tokens = token::trim(tokens);
    let Some(name) = tokens.first().filter(|t| t.kind == TokenKind::Ident) else {
        return Err("macro name must be an identifier".to_string());
    };

    let rest = &tokens[1..];
    if !rest.first().is_some_and(|t| t.is_punct("(")) {
        return Ok((name.text.clone(), Macro::object(rest.to_vec())));
    }

    let mut params = Vec::new();
    let mut i = 1;
    let mut expect_param = true;
    loop {
        let Some(t) = rest.get(i) else {
            return Err(format!("unterminated parameter list in macro `{}`", name.text));
        };
        i += 1;
        match t.kind {
            TokenKind::Space | TokenKind::Newline => {}
            TokenKind::Ident if expect_param => {
                params.push(t.text.clone());
                expect_param = false;
            }
            TokenKind::Punct if t.text == "," && !expect_param => expect_param = true,
            TokenKind::Punct if t.text == ")" && (!expect_param || params.is_empty()) => break,
            _ => return Err(format!("invalid parameter list in macro `{}`", name.text)),
        }
    }

    Ok((name.text.clone(), Macro::function(params, rest[i..].to_vec())))
}

/// 带 hide set 的 token
#[derive(Debug, Clone)]
struct HToken {
    token: Token,
    hide: Vec<String>,
}

impl HToken {
    fn fresh(token: Token) -> Self {
        Self {
            token,
            hide: Vec::new(),
        }
    }

    fn hidden(&self, name: &str) -> bool {
        self.hide.iter().any(|h| h == name)
    }
}

/// 宏表
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

const MAX_EXPANSION_DEPTH: usize = 256;

impl MacroTable {
    pub fn define(&mut self, name: impl Into<String>, m: Macro) {
        self.macros.insert(name.into(), m);
    }

    /// 以 `NAME VALUE` 的形式定义 object-like 宏
    pub fn define_value(&mut self, name: &str, value: &str) {
        self.define(name, Macro::object(token::tokenize(value)));
    }

    pub fn undef(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    /// 完整展开一段 token
    pub fn expand(&self, tokens: &[Token]) -> Result<Vec<Token>, String> {
        let input = tokens.iter().cloned().map(HToken::fresh).collect();
        Ok(self.expand_htokens(input, 0)?.into_iter().map(|t| t.token).collect())
    }

    fn expand_htokens(&self, mut input: VecDeque<HToken>, depth: usize) -> Result<Vec<HToken>, String> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err("macro expansion too deep".to_string());
        }

        let mut out = Vec::with_capacity(input.len());
        while let Some(t) = input.pop_front() {
            let candidate = match t.token.kind {
                TokenKind::Ident if !t.hidden(&t.token.text) => self.macros.get(&t.token.text),
                _ => None,
            };
            let Some(m) = candidate else {
                out.push(t);
                continue;
            };

            let name = t.token.text.clone();
            let mut hide = t.hide.clone();
            hide.push(name.clone());

            let expansion = match &m.params {
                None => self.substitute(m, &[], depth)?,
                Some(params) => {
                    // function-like 宏名后面不是 `(` 时按普通标识符处理
                    let open = input.iter().position(|h| !h.token.is_space());
                    if !open.is_some_and(|idx| input[idx].token.is_punct("(")) {
                        out.push(t);
                        continue;
                    }
                    input.drain(..=open.unwrap_or_default());

                    let args = collect_args(&mut input).map_err(|e| format!("macro `{name}`: {e}"))?;
                    let args = if params.is_empty() && args.len() == 1 && args[0].is_empty() {
                        Vec::new()
                    } else {
                        args
                    };
                    if args.len() != params.len() {
                        return Err(format!(
                            "macro `{name}` expects {} arguments, got {}",
                            params.len(),
                            args.len()
                        ));
                    }
                    self.substitute(m, &args, depth)?
                }
            };

            for mut h in expansion.into_iter().rev() {
                for name in &hide {
                    if !h.hidden(name) {
                        h.hide.push(name.clone());
                    }
                }
                input.push_front(h);
            }
        }

        Ok(out)
    }

    /// 参数替换，处理 `#` 和 `##`
    fn substitute(&self, m: &Macro, args: &[Vec<HToken>], depth: usize) -> Result<Vec<HToken>, String> {
        let body = &m.body;
        let next_non_space = |from: usize| (from..body.len()).find(|&j| !body[j].is_space());
        let mut out: Vec<HToken> = Vec::new();
        let mut i = 0;

        while i < body.len() {
            let tok = &body[i];

            if m.params.is_some() && tok.is_punct("#") {
                if let Some((j, p)) = next_non_space(i + 1).and_then(|j| m.param_index(&body[j]).map(|p| (j, p))) {
                    out.push(HToken::fresh(Token::new(TokenKind::Str, stringize(&args[p]))));
                    i = j + 1;
                    continue;
                }
            }

            if tok.is_punct("##") {
                while out.last().is_some_and(|h| h.token.is_space()) {
                    out.pop();
                }
                let Some(j) = next_non_space(i + 1) else {
                    return Err("`##` cannot appear at the end of a macro".to_string());
                };
                let rhs: Vec<HToken> = match m.param_index(&body[j]) {
                    Some(p) => args[p].clone(),
                    None => vec![HToken::fresh(body[j].clone())],
                };
                let mut rhs = rhs.into_iter();
                match (out.pop(), rhs.next()) {
                    (Some(lhs), Some(first)) => {
                        let pasted = format!("{}{}", lhs.token.text, first.token.text);
                        out.extend(token::tokenize(&pasted).into_iter().map(HToken::fresh));
                    }
                    (Some(lhs), None) => out.push(lhs),
                    (None, Some(first)) => out.push(first),
                    (None, None) => {}
                }
                out.extend(rhs);
                i = j + 1;
                continue;
            }

            if let Some(p) = m.param_index(tok) {
                let pasted_next = next_non_space(i + 1).is_some_and(|j| body[j].is_punct("##"));
                if pasted_next {
                    out.extend(args[p].iter().cloned());
                } else {
                    out.extend(self.expand_htokens(args[p].iter().cloned().collect(), depth + 1)?);
                }
                i += 1;
                continue;
            }

            out.push(HToken::fresh(tok.clone()));
            i += 1;
        }

        Ok(out)
    }
}

/// 收集宏参数，输入的 `(` 已被消费；参数首尾空白被去掉
fn collect_args(input: &mut VecDeque<HToken>) -> Result<Vec<Vec<HToken>>, String> {
    let mut args = Vec::new();
    let mut current: Vec<HToken> = Vec::new();
    let mut nesting = 0usize;

    loop {
        let Some(mut h) = input.pop_front() else {
            return Err("unterminated argument list".to_string());
        };
        if h.token.kind == TokenKind::Newline {
            h.token = Token::new(TokenKind::Space, " ");
        }

        if h.token.is_punct("(") {
            nesting += 1;
        } else if h.token.is_punct(")") {
            if nesting == 0 {
                args.push(trim_htokens(current));
                return Ok(args);
            }
            nesting -= 1;
        } else if h.token.is_punct(",") && nesting == 0 {
            args.push(trim_htokens(std::mem::take(&mut current)));
            continue;
        }
        current.push(h);
    }
}

fn trim_htokens(mut tokens: Vec<HToken>) -> Vec<HToken> {
    while tokens.last().is_some_and(|h| h.token.is_space()) {
        tokens.pop();
    }
    let start = tokens.iter().position(|h| !h.token.is_space()).unwrap_or(tokens.len());
    tokens.drain(..start);
    tokens
}

fn stringize(arg: &[HToken]) -> String {
    let mut text = String::from("\"");
    let mut pending_space = false;
    for h in arg {
        if h.token.is_space() {
            pending_space = true;
            continue;
        }
        if pending_space && text.len() > 1 {
            text.push(' ');
        }
        pending_space = false;
        for c in h.token.text.chars() {
            if h.token.kind == TokenKind::Str && (c == '"' || c == '\\') {
                text.push('\\');
            }
            text.push(c);
        }
    }
    text.push('"');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(defines: &[&str]) -> MacroTable {
        let mut table = MacroTable::default();
        for define in defines {
            let (name, m) = parse_define(&token::tokenize(define)).unwrap();
            table.define(name, m);
        }
        table
    }

    fn expand(table: &MacroTable, src: &str) -> String {
        token::join(&table.expand(&token::tokenize(src)).unwrap())
    }

    #[test]
    fn test_object_macro() {
        let t = table(&["vec2 float2", "PI 3.14"]);
        assert_eq!(expand(&t, "vec2 a = vec2(PI);"), "float2 a = float2(3.14);");
    }

    #[test]
    fn test_function_macro() {
        let t = table(&["mul(a, b) ((b) * (a))"]);
        assert_eq!(expand(&t, "x = mul(m, v);"), "x = ((v) * (m));");
    }

    #[test]
    fn test_function_macro_without_call_is_identifier() {
        let t = table(&["mul(a, b) ((b) * (a))"]);
        assert_eq!(expand(&t, "float mul;"), "float mul;");
    }

    #[test]
    fn test_nested_arguments() {
        let t = table(&["lerp(a, b, t) mix(a, b, t)"]);
        assert_eq!(expand(&t, "lerp(f(1, 2), (3, 4), t)"), "mix(f(1, 2), (3, 4), t)");
    }

    #[test]
    fn test_self_reference_does_not_recurse() {
        let t = table(&["uv sp_in.uv", "A B", "B A"]);
        assert_eq!(expand(&t, "uv"), "sp_in.uv");
        assert_eq!(expand(&t, "A"), "A");
    }

    #[test]
    fn test_token_paste() {
        let t = table(&["texture(s, p) s.Sample(s##_spSampler, p)", "uv sp_in.__sp__temp__uv"]);
        assert_eq!(
            expand(&t, "texture(albedo, uv)"),
            "albedo.Sample(albedo_spSampler, sp_in.__sp__temp__uv)"
        );
    }

    #[test]
    fn test_rescan_uses_following_tokens() {
        let t = table(&["F G", "G(x) (x + 1)"]);
        assert_eq!(expand(&t, "F(2)"), "(2 + 1)");
    }

    #[test]
    fn test_invocation_spans_lines() {
        let t = table(&["asVec4(a) vec4(a)"]);
        assert_eq!(expand(&t, "asVec4(\n  x)"), "vec4(x)");
    }

    #[test]
    fn test_stringize() {
        let t = table(&["STR(x) #x"]);
        assert_eq!(expand(&t, "STR(a  +  b)"), "\"a + b\"");
    }

    #[test]
    fn test_argument_count_mismatch() {
        let t = table(&["mul(a, b) a*b"]);
        assert!(t.expand(&token::tokenize("mul(1)")).is_err());
    }

    #[test]
    fn test_parse_define_errors() {
        assert!(parse_define(&token::tokenize("1abc")).is_err());
        assert!(parse_define(&token::tokenize("F(a, ) a")).is_err());
        assert!(parse_define(&token::tokenize("F(a")).is_err());
    }

    #[test]
    fn test_zero_parameter_macro() {
        let t = table(&["ZERO() 0"]);
        assert_eq!(expand(&t, "ZERO()"), "0");
    }
}
