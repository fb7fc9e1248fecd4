use crate::error::CleaningError;

use super::syntax_error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub(crate) fn tokenize(expression: &str) -> Result<Vec<Token>, CleaningError> {
    let bytes = expression.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];
        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let two = bytes.get(pos..pos + 2);
        let kind = match (ch, two) {
            (_, Some(b"&&")) => {
                pos += 2;
                TokenKind::And
            }
            (_, Some(b"||")) => {
                pos += 2;
                TokenKind::Or
            }
            (_, Some(b"<=")) => {
                pos += 2;
                TokenKind::Le
            }
            (_, Some(b">=")) => {
                pos += 2;
                TokenKind::Ge
            }
            (_, Some(b"==")) => {
                pos += 2;
                TokenKind::Eq
            }
            (_, Some(b"!=")) => {
                pos += 2;
                TokenKind::Ne
            }
            (b'<', _) => single(&mut pos, TokenKind::Lt),
            (b'>', _) => single(&mut pos, TokenKind::Gt),
            (b'!', _) => single(&mut pos, TokenKind::Not),
            (b'(', _) => single(&mut pos, TokenKind::LParen),
            (b')', _) => single(&mut pos, TokenKind::RParen),
            (b',', _) => single(&mut pos, TokenKind::Comma),
            (b'+', _) => single(&mut pos, TokenKind::Plus),
            (b'-', _) => single(&mut pos, TokenKind::Minus),
            (b'*', _) => single(&mut pos, TokenKind::Star),
            (b'/', _) => single(&mut pos, TokenKind::Slash),
            (c, _) if c.is_ascii_digit() || c == b'.' => {
                pos = scan_number(bytes, pos);
                let text = &expression[start..pos];
                let value = text.parse::<f64>().map_err(|_| {
                    syntax_error(expression, start, &format!("invalid number '{text}'"))
                })?;
                TokenKind::Number(value)
            }
            (c, _) if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                match &expression[start..pos] {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    ident => TokenKind::Ident(ident.to_string()),
                }
            }
            _ => {
                let found = expression[start..].chars().next().unwrap_or('?');
                return Err(syntax_error(
                    expression,
                    start,
                    &format!("unexpected character '{found}'"),
                ));
            }
        };
        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    Ok(tokens)
}

fn single(pos: &mut usize, kind: TokenKind) -> TokenKind {
    *pos += 1;
    kind
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}
