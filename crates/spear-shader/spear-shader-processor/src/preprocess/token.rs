//! 预处理 token
//!
//! 只区分预处理器关心的几类 token，输出时按原文拼接，因此不需要完整的 C 词法。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Punct,
    Space,
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn newline() -> Self {
        Self::new(TokenKind::Newline, "\n")
    }

    pub fn is_space(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Newline)
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }
}

const PUNCT3: [&str; 3] = ["<<=", ">>=", "..."];
const PUNCT2: [&str; 19] = [
    "##", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
];

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// 把一行（或一段不含注释的文本）切分为 token，换行符保留为 [`TokenKind::Newline`]
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        let kind = if c == '\n' {
            i += 1;
            TokenKind::Newline
        } else if c.is_whitespace() {
            while i < chars.len() && chars[i].is_whitespace() && chars[i] != '\n' {
                i += 1;
            }
            TokenKind::Space
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            TokenKind::Ident
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            // pp-number: 允许指数符号后跟 +/-
            i += 1;
            while i < chars.len() {
                let n = chars[i];
                if (n == '+' || n == '-') && matches!(chars[i - 1], 'e' | 'E' | 'p' | 'P') {
                    i += 1;
                } else if is_ident_continue(n) || n == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            TokenKind::Str
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let len = if PUNCT3.iter().any(|p| rest.starts_with(p)) {
                3
            } else if PUNCT2.iter().any(|p| rest.starts_with(p)) {
                2
            } else {
                1
            };
            i += len;
            TokenKind::Punct
        };

        tokens.push(Token::new(kind, chars[start..i].iter().collect::<String>()));
    }

    tokens
}

/// 按原文拼接 token
pub fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// 去除首尾空白 token
pub fn trim(tokens: &[Token]) -> &[Token] {
    let start = tokens.iter().position(|t| !t.is_space()).unwrap_or(tokens.len());
    let end = tokens.iter().rposition(|t| !t.is_space()).map_or(start, |e| e + 1);
    &tokens[start..end]
}

/// 合并以 `\` 结尾的续行，被合并掉的换行补在逻辑行之后
fn splice_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut removed = 0;
    let mut lines = source.split('\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let last = lines.peek().is_none();
        match line.strip_suffix('\\') {
            Some(body) if !last => {
                out.push_str(body);
                removed += 1;
            }
            _ => {
                out.push_str(line);
                if !last {
                    out.push('\n');
                }
                for _ in 0..removed {
                    out.push('\n');
                }
                removed = 0;
            }
        }
    }

    out
}

/// 合并续行并去掉注释，保留换行数量以便报告行号
pub fn strip_comments(source: &str) -> String {
    let spliced = splice_lines(source);
    let chars: Vec<char> = spliced.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            out.push(' ');
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    out.push('\n');
                }
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else if c == '"' {
            out.push(c);
            i += 1;
            while i < chars.len() && chars[i] != '"' && chars[i] != '\n' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    out.push(chars[i]);
                    i += 1;
                }
                out.push(chars[i]);
                i += 1;
            }
            if i < chars.len() && chars[i] == '"' {
                out.push('"');
                i += 1;
            }
        } else if c == '\r' && chars.get(i + 1) == Some(&'\n') {
            i += 1;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).into_iter().filter(|t| !t.is_space()).map(|t| t.text).collect()
    }

    #[test]
    fn test_splice_keeps_line_count() {
        let stripped = strip_comments("#define A 1 \\\n  + 2\r\nx\n");
        assert_eq!(stripped, "#define A 1   + 2\n\nx\n");
        assert_eq!(stripped.lines().nth(2), Some("x"));
    }

    #[test]
    fn test_tokenize_expression() {
        assert_eq!(texts("a<<2 >= 0x1F&&!b"), vec!["a", "<<", "2", ">=", "0x1F", "&&", "!", "b"]);
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(texts("1.0e-3 .5 2u"), vec!["1.0e-3", ".5", "2u"]);
    }

    #[test]
    fn test_tokenize_paste() {
        assert_eq!(texts("s##_spSampler"), vec!["s", "##", "_spSampler"]);
    }

    #[test]
    fn test_join_roundtrip_keeps_spacing() {
        let src = "  vec4 c = texture(tex,  uv);";
        assert_eq!(join(&tokenize(src)), src);
    }

    #[test]
    fn test_strip_comments_keeps_lines() {
        let src = "a // x\nb /* y\nz */ c\n\"// not\"";
        assert_eq!(strip_comments(src), "a \nb  \n c\n\"// not\"");
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(strip_comments("#define A \\\n 1\nB"), "#define A  1\nB");
    }
}
