//! Tokenizer for the expression grammar

use crate::error::{ExprError, ExprResult};

/// A single token with its byte offset into the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Token kinds produced by [`tokenize`]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    And,
    Or,
    Not,
    In,
    True,
    False,
    None,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

/// Split `text` into tokens.
///
/// # Errors
/// Returns a `Syntax` error carrying `text` and the byte offset of the
/// first character that cannot start a token, or of an unterminated string.
pub fn tokenize(text: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => i = push(&mut tokens, TokenKind::LParen, i, 1),
            ')' => i = push(&mut tokens, TokenKind::RParen, i, 1),
            '[' => i = push(&mut tokens, TokenKind::LBracket, i, 1),
            ']' => i = push(&mut tokens, TokenKind::RBracket, i, 1),
            ',' => i = push(&mut tokens, TokenKind::Comma, i, 1),
            '+' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::PlusAssign, i, 2);
            }
            '+' => i = push(&mut tokens, TokenKind::Plus, i, 1),
            '-' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::MinusAssign, i, 2);
            }
            '-' => i = push(&mut tokens, TokenKind::Minus, i, 1),
            '*' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::StarAssign, i, 2);
            }
            '*' => i = push(&mut tokens, TokenKind::Star, i, 1),
            '/' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::SlashAssign, i, 2);
            }
            '/' => i = push(&mut tokens, TokenKind::Slash, i, 1),
            '%' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::PercentAssign, i, 2);
            }
            '%' => i = push(&mut tokens, TokenKind::Percent, i, 1),
            '=' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::EqEq, i, 2);
            }
            '=' => i = push(&mut tokens, TokenKind::Assign, i, 1),
            '!' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::NotEq, i, 2);
            }
            '<' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::Le, i, 2);
            }
            '<' => i = push(&mut tokens, TokenKind::Lt, i, 1),
            '>' if peek(bytes, i + 1) == Some('=') => {
                i = push(&mut tokens, TokenKind::Ge, i, 2);
            }
            '>' => i = push(&mut tokens, TokenKind::Gt, i, 1),
            '\'' | '"' => i = lex_string(text, &mut tokens, i, c)?,
            '0'..='9' => i = lex_number(text, &mut tokens, i)?,
            c if c.is_ascii_alphabetic() || c == '_' => i = lex_word(text, &mut tokens, i),
            _ => return Err(ExprError::syntax(text, i)),
        }
    }

    Ok(tokens)
}

fn push(tokens: &mut Vec<Token>, kind: TokenKind, offset: usize, width: usize) -> usize {
    tokens.push(Token { kind, offset });
    offset + width
}

fn peek(bytes: &[u8], i: usize) -> Option<char> {
    bytes.get(i).map(|b| *b as char)
}

fn lex_string(
    text: &str,
    tokens: &mut Vec<Token>,
    start: usize,
    quote: char,
) -> ExprResult<usize> {
    let bytes = text.as_bytes();
    let mut value = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        let c = text[i..].chars().next().unwrap_or('\0');
        if c == quote {
            tokens.push(Token {
                kind: TokenKind::Str(value),
                offset: start,
            });
            return Ok(i + 1);
        }
        if c == '\\' {
            let escaped = text[i + 1..].chars().next();
            match escaped {
                Some('\\') => value.push('\\'),
                Some('\'') => value.push('\''),
                Some('"') => value.push('"'),
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return Err(ExprError::syntax(text, i)),
            }
            i += 1 + escaped.map_or(0, char::len_utf8);
        } else {
            value.push(c);
            i += c.len_utf8();
        }
    }
    Err(ExprError::syntax(text, start))
}

fn lex_number(text: &str, tokens: &mut Vec<Token>, start: usize) -> ExprResult<usize> {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;
    if i < bytes.len() && bytes[i] == b'.' {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    let literal = &text[start..i];
    let kind = if is_float {
        let parsed = literal
            .parse::<f64>()
            .map_err(|_| ExprError::syntax(text, start))?;
        TokenKind::Float(parsed)
    } else {
        let parsed = literal
            .parse::<i64>()
            .map_err(|_| ExprError::syntax(text, start))?;
        TokenKind::Int(parsed)
    };
    tokens.push(Token {
        kind,
        offset: start,
    });
    Ok(i)
}

fn lex_word(text: &str, tokens: &mut Vec<Token>, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    let kind = match &text[start..i] {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        "None" => TokenKind::None,
        word => TokenKind::Ident(word.to_string()),
    };
    tokens.push(Token {
        kind,
        offset: start,
    });
    i
}
