//! Seed expression scanner
//!
//! When the seed page does not carry a plain `"<epoch>.<delta>"` literal, the
//! marker holds a short script fragment instead, for example
//!
//! ```text
//! ((function(){var a\x3d4264492758;var b\x3d-1857761911;return 406375+\x27.\x27+(a+b)})())
//! ```
//!
//! Only a fixed shape is understood: integer assignments to `a` and `b`, a
//! `return` followed by the epoch literal, and at most one arithmetic operator
//! applied to the named operands. Nothing is executed.

use std::iter::Peekable;
use std::str::Chars;

use crate::token::error::{TokenError, TokenResult};
use crate::token::seed::Seed;

/// Operator combining the two named operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Add,
    Subtract,
    Multiply,
    Power,
    BitXor,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Power => "**",
            Operator::BitXor => "^",
        }
    }

    /// Checked integer evaluation of `a <op> b`
    pub fn apply(&self, a: i64, b: i64) -> TokenResult<i64> {
        let value = match self {
            Operator::Add => a.checked_add(b),
            Operator::Subtract => a.checked_sub(b),
            Operator::Multiply => a.checked_mul(b),
            Operator::Power => {
                let exponent = u32::try_from(b).map_err(|_| {
                    TokenError::MalformedExpression(format!(
                        "unsupported exponent in {} ** {}",
                        a, b
                    ))
                })?;
                a.checked_pow(exponent)
            }
            Operator::BitXor => Some(a ^ b),
        };
        value.ok_or_else(|| {
            TokenError::MalformedExpression(format!(
                "{} {} {} overflows a 64-bit integer",
                a,
                self.symbol(),
                b
            ))
        })
    }
}

/// Operands, epoch literal and operator extracted from a seed fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExpression {
    pub a: i64,
    pub b: i64,
    pub n: i64,
    pub operator: Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Ident(String),
    Int(i64),
    Str,
    Return,
    Assign,
    Op(Operator),
    Punct(char),
}

impl Lexeme {
    /// Whether this lexeme can end an operand, making a following operator binary
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Lexeme::Ident(_) | Lexeme::Int(_) | Lexeme::Str | Lexeme::Punct(')')
        )
    }

    fn ends_statement(&self) -> bool {
        matches!(self, Lexeme::Punct(';' | ',' | '}' | ')'))
    }
}

fn tokenize(source: &str) -> TokenResult<Vec<Lexeme>> {
    let chars: Vec<char> = source.chars().collect();
    let mut lexemes = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits.parse::<i64>().map_err(|_| {
                    TokenError::MalformedExpression(format!(
                        "integer literal out of range: {}",
                        digits
                    ))
                })?;
                lexemes.push(Lexeme::Int(value));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "return" {
                    lexemes.push(Lexeme::Return);
                } else {
                    lexemes.push(Lexeme::Ident(word));
                }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(TokenError::MalformedExpression(
                        "unterminated string literal".to_string(),
                    ));
                }
                i += 1;
                lexemes.push(Lexeme::Str);
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                lexemes.push(Lexeme::Op(Operator::Power));
                i += 2;
            }
            '*' => {
                lexemes.push(Lexeme::Op(Operator::Multiply));
                i += 1;
            }
            '+' => {
                lexemes.push(Lexeme::Op(Operator::Add));
                i += 1;
            }
            '-' => {
                lexemes.push(Lexeme::Op(Operator::Subtract));
                i += 1;
            }
            '^' => {
                lexemes.push(Lexeme::Op(Operator::BitXor));
                i += 1;
            }
            '=' => {
                // `==`/`===` are comparisons, not assignments
                if chars.get(i + 1) == Some(&'=') {
                    while i < chars.len() && chars[i] == '=' {
                        i += 1;
                    }
                    lexemes.push(Lexeme::Punct('='));
                } else {
                    lexemes.push(Lexeme::Assign);
                    i += 1;
                }
            }
            other => {
                lexemes.push(Lexeme::Punct(other));
                i += 1;
            }
        }
    }

    Ok(lexemes)
}

/// Integer literal at `pos`, optionally negated; returns the value and the index after it
fn signed_literal(lexemes: &[Lexeme], pos: usize) -> Option<(i64, usize)> {
    match (lexemes.get(pos), lexemes.get(pos + 1)) {
        (Some(Lexeme::Int(value)), _) => Some((*value, pos + 1)),
        (Some(Lexeme::Op(Operator::Subtract)), Some(Lexeme::Int(value))) => {
            Some((-*value, pos + 2))
        }
        _ => None,
    }
}

impl RawExpression {
    /// Parse an unescaped fragment
    pub fn parse(fragment: &str) -> TokenResult<Self> {
        let lexemes = tokenize(fragment)?;

        let (mut a, mut b) = (0, 0);
        for i in 0..lexemes.len() {
            let name = match (&lexemes[i], lexemes.get(i + 1)) {
                (Lexeme::Ident(name), Some(Lexeme::Assign)) => name,
                _ => continue,
            };
            let Some((value, next)) = signed_literal(&lexemes, i + 2) else {
                continue;
            };
            if !lexemes.get(next).is_none_or(Lexeme::ends_statement) {
                continue;
            }
            match name.as_str() {
                "a" => a = value,
                "b" => b = value,
                _ => {}
            }
        }

        let ret = lexemes
            .iter()
            .position(|lexeme| *lexeme == Lexeme::Return)
            .ok_or_else(|| {
                TokenError::MalformedExpression("no return statement in fragment".to_string())
            })?;
        let tail = &lexemes[ret + 1..];

        let n = tail
            .iter()
            .enumerate()
            .find_map(|(i, lexeme)| match lexeme {
                Lexeme::Int(value) => {
                    let negated = i > 0
                        && tail[i - 1] == Lexeme::Op(Operator::Subtract)
                        && (i < 2 || !tail[i - 2].ends_operand());
                    Some(if negated { -*value } else { *value })
                }
                _ => None,
            })
            .ok_or_else(|| {
                TokenError::MalformedExpression("no integer literal after return".to_string())
            })?;

        let mut operators = Vec::new();
        for (i, lexeme) in tail.iter().enumerate() {
            let Lexeme::Op(op) = lexeme else { continue };
            let prev = if i > 0 { tail.get(i - 1) } else { None };
            let next = tail.get(i + 1);
            if !prev.is_some_and(Lexeme::ends_operand) {
                continue; // unary
            }
            if prev == Some(&Lexeme::Str) || next == Some(&Lexeme::Str) {
                continue; // string concatenation
            }
            let names_operand = matches!(prev, Some(Lexeme::Ident(_)))
                || matches!(next, Some(Lexeme::Ident(_)));
            if names_operand {
                operators.push(*op);
            }
        }

        let operator = match operators.as_slice() {
            [] => Operator::default(),
            [op] => *op,
            many => {
                let symbols: Vec<&str> = many.iter().map(Operator::symbol).collect();
                return Err(TokenError::MalformedExpression(format!(
                    "expected a single operator, found {}",
                    symbols.join(" ")
                )));
            }
        };

        Ok(RawExpression { a, b, n, operator })
    }

    /// `a <op> b`
    pub fn evaluate(&self) -> TokenResult<i64> {
        self.operator.apply(self.a, self.b)
    }

    /// Seed `(n, a <op> b)`
    pub fn to_seed(&self) -> TokenResult<Seed> {
        Ok(Seed::new(self.n, self.evaluate()?))
    }
}

/// Turn raw marker content into a parseable fragment: drop `var ` keywords, then unescape
pub fn prepare_fragment(raw: &str) -> String {
    unescape(&raw.replace("var ", ""))
}

/// Resolve backslash escapes as they appear in served script string literals.
///
/// Unknown or incomplete escapes are kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => push_hex_escape(&mut out, &mut chars, 'x', 2),
            Some('u') => push_hex_escape(&mut out, &mut chars, 'u', 4),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn push_hex_escape(out: &mut String, chars: &mut Peekable<Chars<'_>>, marker: char, width: usize) {
    let digits: String = chars.clone().take(width).collect();
    let decoded = if digits.len() == width && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
    } else {
        None
    };
    match decoded {
        Some(ch) => {
            out.push(ch);
            for _ in 0..width {
                chars.next();
            }
        }
        None => {
            out.push('\\');
            out.push(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Parsing Tests ==========

    #[test]
    fn test_simple_fragment() {
        let expr = RawExpression::parse("a = 5; b = -2; return 406000").unwrap();
        assert_eq!(
            expr,
            RawExpression {
                a: 5,
                b: -2,
                n: 406000,
                operator: Operator::Add
            }
        );
        assert_eq!(expr.to_seed().unwrap(), Seed::new(406000, 3));
    }

    #[test]
    fn test_served_fragment() {
        let raw = r"((function(){var a\x3d4264492758;var b\x3d-1857761911;return 406375+\x27.\x27+(a+b)})())";
        let expr = RawExpression::parse(&prepare_fragment(raw)).unwrap();
        assert_eq!(expr.a, 4264492758);
        assert_eq!(expr.b, -1857761911);
        assert_eq!(expr.n, 406375);
        assert_eq!(expr.operator, Operator::Add);
        assert_eq!(expr.to_seed().unwrap(), Seed::new(406375, 2406730847));
    }

    #[test]
    fn test_each_operator() {
        let cases = [
            ("a-b", Operator::Subtract, 7),
            ("a*b", Operator::Multiply, 30),
            ("a**b", Operator::Power, 1000),
            ("a^b", Operator::BitXor, 9),
            ("a+b", Operator::Add, 13),
        ];
        for (body, operator, value) in cases {
            let fragment = format!("a=10;b=3;return 406000+'.'+({})", body);
            let expr = RawExpression::parse(&fragment).unwrap();
            assert_eq!(expr.operator, operator, "{}", body);
            assert_eq!(expr.evaluate().unwrap(), value, "{}", body);
        }
    }

    #[test]
    fn test_operands_default_to_zero() {
        let expr = RawExpression::parse("return 406000").unwrap();
        assert_eq!(expr.to_seed().unwrap(), Seed::new(406000, 0));
    }

    #[test]
    fn test_non_literal_assignment_ignored() {
        let expr = RawExpression::parse("a=5+3;b=1;return 406000").unwrap();
        assert_eq!(expr.a, 0);
        assert_eq!(expr.b, 1);
    }

    #[test]
    fn test_other_names_ignored() {
        let expr = RawExpression::parse("c=99;ab=4;b=2;return 1").unwrap();
        assert_eq!((expr.a, expr.b), (0, 2));
    }

    #[test]
    fn test_first_literal_after_return_is_epoch() {
        let expr = RawExpression::parse("a=1;b=2;return 406001+'.'+(a+b)+7").unwrap();
        assert_eq!(expr.n, 406001);
    }

    #[test]
    fn test_literal_operand_does_not_count_as_operator() {
        // `+` between the epoch and the parenthesised operands is not the seed operator
        let expr = RawExpression::parse("a=9;b=4;return 406000+(a-b)").unwrap();
        assert_eq!(expr.operator, Operator::Subtract);
        assert_eq!(expr.evaluate().unwrap(), 5);
    }

    // ========== Error Tests ==========

    #[test]
    fn test_multiple_operators_rejected() {
        let result = RawExpression::parse("a=1;b=2;return 406000+'.'+(a+b-a)");
        match result {
            Err(TokenError::MalformedExpression(msg)) => assert!(msg.contains("single operator")),
            other => panic!("Expected MalformedExpression, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_return() {
        assert!(matches!(
            RawExpression::parse("a=1;b=2"),
            Err(TokenError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_missing_literal_after_return() {
        assert!(matches!(
            RawExpression::parse("a=1;b=2;return a+b"),
            Err(TokenError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(RawExpression::parse("return 1+'.").is_err());
    }

    #[test]
    fn test_literal_out_of_range() {
        assert!(RawExpression::parse("a=99999999999999999999;return 1").is_err());
    }

    #[test]
    fn test_negative_exponent_rejected() {
        let expr = RawExpression::parse("a=2;b=-1;return 1+'.'+(a**b)").unwrap();
        assert!(matches!(
            expr.evaluate(),
            Err(TokenError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(Operator::Multiply.apply(i64::MAX, 2).is_err());
        assert!(Operator::Power.apply(10, 40).is_err());
        assert_eq!(Operator::BitXor.apply(i64::MAX, -1).unwrap(), i64::MIN);
    }

    // ========== Unescape Tests ==========

    #[test]
    fn test_unescape_hex_and_unicode() {
        assert_eq!(unescape(r"a\x3d5"), "a=5");
        assert_eq!(unescape(r"\x27.\x27"), "'.'");
        assert_eq!(unescape(r"\u0041b"), "Ab");
        assert_eq!(unescape(r"a=1"), "a=1");
    }

    #[test]
    fn test_unescape_simple_escapes() {
        assert_eq!(unescape(r"a\nb\tc\\d\'e"), "a\nb\tc\\d'e");
    }

    #[test]
    fn test_unescape_keeps_unknown_and_incomplete() {
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape(r"\x4"), r"\x4");
        assert_eq!(unescape(r"\xzz"), r"\xzz");
        assert_eq!(unescape("end\\"), "end\\");
    }

    #[test]
    fn test_prepare_strips_var() {
        assert_eq!(prepare_fragment(r"var a\x3d1;var b\x3d2;"), "a=1;b=2;");
    }
}
