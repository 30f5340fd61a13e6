//! Quad-template string parsing
//!
//! A template string is four whitespace-separated tokens:
//! `?NAME` a pattern variable, `*` the wildcard, `"…"` a string literal
//! (quote-aware, `\"` and `\\` escapes), a numeric literal, and anything
//! else a Word.

use crate::{RuleError, RuleResult};
use quad_model::{pattern_var, word, Atom, Number};

/// Parse a four-token quad template
pub fn parse_template(input: &str) -> RuleResult<[Atom; 4]> {
    let tokens = tokenize(input)?;
    if tokens.len() != 4 {
        return Err(RuleError::Template(format!(
            "expected 4 tokens, found {} in {:?}",
            tokens.len(),
            input
        )));
    }
    let mut atoms = tokens.into_iter().map(classify);
    Ok([
        atoms.next().unwrap()?,
        atoms.next().unwrap()?,
        atoms.next().unwrap()?,
        atoms.next().unwrap()?,
    ])
}

struct Token {
    text: String,
    quoted: bool,
}

fn tokenize(input: &str) -> RuleResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => text.push(escaped),
                        Some(other) => {
                            return Err(RuleError::Template(format!(
                                "unknown escape \\{} in {:?}",
                                other, input
                            )))
                        }
                        None => {
                            return Err(RuleError::Template(format!(
                                "unterminated string in {:?}",
                                input
                            )))
                        }
                    },
                    Some(other) => text.push(other),
                    None => {
                        return Err(RuleError::Template(format!(
                            "unterminated string in {:?}",
                            input
                        )))
                    }
                }
            }
            tokens.push(Token { text, quoted: true });
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            tokens.push(Token {
                text,
                quoted: false,
            });
        }
    }
    Ok(tokens)
}

fn classify(token: Token) -> RuleResult<Atom> {
    if token.quoted {
        return Ok(Atom::from(token.text));
    }
    let text = token.text;
    if text == "*" {
        return Ok(Atom::Wildcard);
    }
    if let Some(name) = text.strip_prefix('?') {
        if name.is_empty() {
            return Err(RuleError::Template("empty variable name".into()));
        }
        return Ok(pattern_var(name));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Atom::Number(Number::Int(int)));
    }
    if looks_numeric(&text) {
        if let Ok(float) = text.parse::<f64>() {
            return Ok(Atom::Number(Number::from_f64(float)));
        }
        return Err(RuleError::Template(format!("bad number literal {:?}", text)));
    }
    Ok(word(&text))
}

// Words may contain digits ("RULE2"); only a leading digit, sign or dot
// makes a token numeric
fn looks_numeric(text: &str) -> bool {
    matches!(
        text.as_bytes().first(),
        Some(b'0'..=b'9') | Some(b'-') | Some(b'+') | Some(b'.')
    )
}
