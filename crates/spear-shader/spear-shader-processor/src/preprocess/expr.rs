//! `#if` 常量表达式求值
//!
//! 输入是已经完成 `defined` 替换和宏展开的 token，剩余的标识符按 C 的规则视为 0。

use super::token::{Token, TokenKind};

/// 对整数常量表达式求值
pub fn evaluate(tokens: &[Token]) -> Result<i64, String> {
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_space()).collect();
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        unevaluated: 0,
    };
    let value = parser.ternary()?;
    match parser.peek() {
        None => Ok(value),
        Some(t) => Err(format!("unexpected token `{}`", t.text)),
    }
}

/// 解析整数字面量，支持十六进制、八进制和 u/l 后缀
pub fn parse_int(text: &str) -> Result<i64, String> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i64>()
    };
    parsed.map_err(|_| format!("invalid integer literal `{text}`"))
}

struct Parser<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
    /// 大于 0 时处于短路掉的分支内，只解析不报求值错误
    unevaluated: usize,
}

/// 二元运算符的优先级，数值越大结合越紧
fn binary_precedence(op: &str) -> Option<u8> {
    let prec = match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | "<=" | ">" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    };
    Some(prec)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expect(&mut self, p: &str) -> Result<(), String> {
        match self.next() {
            Some(t) if t.is_punct(p) => Ok(()),
            Some(t) => Err(format!("expected `{p}`, found `{}`", t.text)),
            None => Err(format!("expected `{p}`")),
        }
    }

    fn parse_branch(
        &mut self,
        skipped: bool,
        parse: impl FnOnce(&mut Self) -> Result<i64, String>,
    ) -> Result<i64, String> {
        if skipped {
            self.unevaluated += 1;
        }
        let value = parse(self);
        if skipped {
            self.unevaluated -= 1;
        }
        value
    }

    fn ternary(&mut self) -> Result<i64, String> {
        let cond = self.binary(1)?;
        if self.peek().is_some_and(|t| t.is_punct("?")) {
            self.pos += 1;
            let then = self.parse_branch(cond == 0, Self::ternary)?;
            self.expect(":")?;
            let otherwise = self.parse_branch(cond != 0, Self::ternary)?;
            return Ok(if cond != 0 { then } else { otherwise });
        }
        Ok(cond)
    }

    fn binary(&mut self, min_prec: u8) -> Result<i64, String> {
        let mut lhs = self.unary()?;

        while let Some(op) = self.peek().filter(|t| t.kind == TokenKind::Punct) {
            let Some(prec) = binary_precedence(&op.text) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let skipped = match op.text.as_str() {
                "&&" => lhs == 0,
                "||" => lhs != 0,
                _ => false,
            };
            let rhs = self.parse_branch(skipped, |parser| parser.binary(prec + 1))?;
            lhs = match apply(&op.text, lhs, rhs) {
                Err(_) if self.unevaluated > 0 => 0,
                result => result?,
            };
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i64, String> {
        let Some(token) = self.next() else {
            return Err("unexpected end of expression".to_string());
        };

        match token.kind {
            TokenKind::Number => parse_int(&token.text),
            // 未定义的标识符为 0
            TokenKind::Ident => Ok(0),
            TokenKind::Punct => match token.text.as_str() {
                "(" => {
                    let value = self.ternary()?;
                    self.expect(")")?;
                    Ok(value)
                }
                "!" => Ok((self.unary()? == 0) as i64),
                "~" => Ok(!self.unary()?),
                "-" => Ok(self.unary()?.wrapping_neg()),
                "+" => self.unary(),
                other => Err(format!("unexpected token `{other}`")),
            },
            _ => Err(format!("unexpected token `{}`", token.text)),
        }
    }
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Result<i64, String> {
    let value = match op {
        "||" => (lhs != 0 || rhs != 0) as i64,
        "&&" => (lhs != 0 && rhs != 0) as i64,
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => (lhs == rhs) as i64,
        "!=" => (lhs != rhs) as i64,
        "<" => (lhs < rhs) as i64,
        "<=" => (lhs <= rhs) as i64,
        ">" => (lhs > rhs) as i64,
        ">=" => (lhs >= rhs) as i64,
        "<<" => lhs.wrapping_shl(rhs as u32),
        ">>" => lhs.wrapping_shr(rhs as u32),
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" | "%" if rhs == 0 => return Err("division by zero".to_string()),
        "/" => lhs.wrapping_div(rhs),
        "%" => lhs.wrapping_rem(rhs),
        _ => return Err(format!("unknown operator `{op}`")),
    };
    Ok(value)
}
