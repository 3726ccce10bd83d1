//! Token scanner shared by the term and clause parsers.

use crate::error::{Result, RuleError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Identifier: `[A-Za-z_][A-Za-z0-9_.]*`.
    Ident(String),
    /// Numeric literal, already normalized by [`format_number`].
    Number(String),
    LParen,
    RParen,
    Comma,
    /// Conjunction inside an antecedent.
    Amp,
    /// `==>`
    Implies,
    /// `<==`
    ImpliedBy,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

/// Split clause text into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        let kind = match c {
            c if c.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            '&' => {
                i += 1;
                TokenKind::Amp
            }
            '=' if source[i..].starts_with("==>") => {
                i += 3;
                TokenKind::Implies
            }
            '<' if source[i..].starts_with("<==") => {
                i += 3;
                TokenKind::ImpliedBy
            }
            c if c.is_ascii_digit() || (c == '-' && next_is_digit(bytes, i)) => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &source[start..i];
                let value: f64 = text.parse().map_err(|_| {
                    RuleError::Parse(format!("invalid number `{text}` at column {}", start + 1))
                })?;
                TokenKind::Number(format_number(value))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                i += 1;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                TokenKind::Ident(source[start..i].trim_end_matches('.').to_string())
            }
            other => {
                return Err(RuleError::Parse(format!(
                    "unexpected character `{other}` at column {} in `{source}`",
                    start + 1
                )))
            }
        };
        tokens.push(Token { kind, offset: start });
    }

    Ok(tokens)
}

fn next_is_digit(bytes: &[u8], i: usize) -> bool {
    bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())
}

/// Deepest nesting accepted in terms and conditions.
pub(crate) const MAX_NESTING: usize = 64;

/// Canonical text for a numeric constant: integral values print without a
/// fractional part, so `11`, `11.0` and a measurement of `11.0` agree.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_rule() {
        assert_eq!(
            kinds("Daytime(Now) ==> Run(S)"),
            vec![
                TokenKind::Ident("Daytime".into()),
                TokenKind::LParen,
                TokenKind::Ident("Now".into()),
                TokenKind::RParen,
                TokenKind::Implies,
                TokenKind::Ident("Run".into()),
                TokenKind::LParen,
                TokenKind::Ident("S".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn numbers_are_normalized() {
        assert_eq!(kinds("11.0"), vec![TokenKind::Number("11".into())]);
        assert_eq!(kinds("-2.5"), vec![TokenKind::Number("-2.5".into())]);
    }

    #[test]
    fn dotted_identifiers_stay_whole() {
        assert_eq!(kinds("env.temp"), vec![TokenKind::Ident("env.temp".into())]);
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(matches!(tokenize("Run(x) ; Stop(x)"), Err(RuleError::Parse(_))));
        assert!(tokenize("1.2.3").is_err());
    }
}
