//! Line-oriented text protocol.
//!
//! One message per line:
//!
//! ```text
//! /synth/cutoff 440.0              set (float)
//! /synth/voices 4                  set (int)
//! /synth/wave "saw tooth"          set (string)
//! /synth/mode fast                 set (symbol)
//! /synth/trigger                   set with no arguments (impulse / re-commit)
//! ?get /synth/cutoff               request the current value
//! ?namespace /synth                request the children of a node
//! :get /synth/cutoff 440.0         reply to ?get
//! :namespace /synth cutoff wave    reply to ?namespace
//! ```
//!
//! Integers become `Int32` (`Int64` if they overflow), tokens with a decimal
//! point or exponent become `Float32`, `true`/`false`/`nil` their own tags,
//! double-quoted text a `String` and any other bare word a `Symbol`. Empty
//! lines and lines starting with `#` are ignored.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::wire::WireArg;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TextMessage {
    Set { path: String, args: Vec<WireArg> },
    Get { path: String },
    Namespace { path: String },
    GetReply { path: String, args: Vec<WireArg> },
    NamespaceReply { path: String, children: Vec<String> },
}

impl TextMessage {
    pub fn path(&self) -> &str {
        match self {
            TextMessage::Set { path, .. }
            | TextMessage::Get { path }
            | TextMessage::Namespace { path }
            | TextMessage::GetReply { path, .. }
            | TextMessage::NamespaceReply { path, .. } => path,
        }
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug)]
struct Token {
    text: String,
    quoted: bool,
    pos: usize,
}

fn parse_error(position: usize, message: impl Into<String>) -> Error {
    Error::Parse { position, message: message.into() }
}

fn quoted(chars: &mut Peekable<CharIndices<'_>>, start: usize) -> Result<String> {
    let mut text = String::new();
    while let Some((pos, c)) = chars.next() {
        match c {
            '"' => return Ok(text),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, other)) => text.push(other),
                None => return Err(parse_error(pos, "dangling escape")),
            },
            other => text.push(other),
        }
    }
    Err(parse_error(start, "unterminated string"))
}

fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let text = quoted(&mut chars, pos)?;
            tokens.push(Token { text, quoted: true, pos });
        } else {
            let mut text = String::new();
            while let Some(&(p, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                if c == '"' {
                    return Err(parse_error(p, "quote inside bare word"));
                }
                text.push(c);
                chars.next();
            }
            tokens.push(Token { text, quoted: false, pos });
        }
    }
    Ok(tokens)
}

fn looks_numeric(word: &str) -> bool {
    let body = word.strip_prefix(['-', '+']).unwrap_or(word);
    body.starts_with(|c: char| c.is_ascii_digit())
        || (body.starts_with('.') && body[1..].starts_with(|c: char| c.is_ascii_digit()))
}

fn bare_arg(word: &str) -> WireArg {
    if let Ok(i) = word.parse::<i32>() {
        return WireArg::Int32(i);
    }
    if looks_numeric(word) {
        if let Ok(i) = word.parse::<i64>() {
            return WireArg::Int64(i);
        }
        if let Ok(f) = word.parse::<f32>() {
            return WireArg::Float32(f);
        }
    }
    match word {
        "true" => WireArg::True,
        "false" => WireArg::False,
        "nil" => WireArg::Nil,
        _ => WireArg::Symbol(word.to_owned()),
    }
}

fn token_arg(token: Token) -> WireArg {
    if token.quoted { WireArg::String(token.text) } else { bare_arg(&token.text) }
}

fn is_path(word: &str) -> bool {
    word.starts_with('/') || word.contains(":/")
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a single line.
pub fn parse(line: &str) -> Result<TextMessage> {
    let mut tokens = tokenize(line)?.into_iter();
    let head = tokens.next().ok_or_else(|| parse_error(0, "empty message"))?;
    if head.quoted {
        return Err(parse_error(head.pos, "expected an address path or request"));
    }

    let mut take_path = |after: &Token| -> Result<String> {
        match tokens.next() {
            Some(t) if !t.quoted && is_path(&t.text) => Ok(t.text),
            Some(t) => Err(parse_error(t.pos, format!("expected an address path, found `{}`", t.text))),
            None => Err(parse_error(after.pos + after.text.len(), "missing address path")),
        }
    };

    let message = match head.text.as_str() {
        "?get" => TextMessage::Get { path: take_path(&head)? },
        "?namespace" => TextMessage::Namespace { path: take_path(&head)? },
        ":get" => {
            let path = take_path(&head)?;
            TextMessage::GetReply { path, args: tokens.map(token_arg).collect() }
        }
        ":namespace" => {
            let path = take_path(&head)?;
            TextMessage::NamespaceReply { path, children: tokens.map(|t| t.text).collect() }
        }
        word if word.starts_with(['?', ':']) => {
            return Err(parse_error(head.pos, format!("unknown request `{word}`")));
        }
        word if is_path(word) => TextMessage::Set { path: word.to_owned(), args: tokens.map(token_arg).collect() },
        word => return Err(parse_error(head.pos, format!("expected an address path, found `{word}`"))),
    };
    Ok(message)
}

/// Parse every non-empty, non-comment line of a packet.
pub fn parse_packet(text: &str) -> Vec<Result<TextMessage>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse)
        .collect()
}

// ============================================================================
// Formatting
// ============================================================================

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    let s = v.to_string();
    if v.is_finite() && !s.contains(['.', 'e', 'E']) {
        write!(f, "{s}.0")
    } else {
        f.write_str(&s)
    }
}

/// A symbol is written bare only if it reads back as the same symbol.
fn symbol_is_bare(s: &str) -> bool {
    !s.is_empty()
        && !s.contains(|c: char| c.is_whitespace() || c == '"')
        && matches!(bare_arg(s), WireArg::Symbol(_))
        && !is_path(s)
}

fn write_arg(f: &mut fmt::Formatter<'_>, arg: &WireArg) -> fmt::Result {
    match arg {
        WireArg::Int32(i) => write!(f, "{i}"),
        WireArg::Int64(i) => write!(f, "{i}"),
        WireArg::Float32(v) => write_float(f, f64::from(*v)),
        WireArg::Float64(v) => write_float(f, *v),
        WireArg::Char(c) => write_string(f, &c.to_string()),
        WireArg::True => f.write_str("true"),
        WireArg::False => f.write_str("false"),
        WireArg::Nil => f.write_str("nil"),
        WireArg::String(s) => write_string(f, s),
        WireArg::Symbol(s) if symbol_is_bare(s) => f.write_str(s),
        WireArg::Symbol(s) => write_string(f, s),
    }
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, path) = match self {
            TextMessage::Set { path, .. } => (None, path),
            TextMessage::Get { path } => (Some("?get"), path),
            TextMessage::Namespace { path } => (Some("?namespace"), path),
            TextMessage::GetReply { path, .. } => (Some(":get"), path),
            TextMessage::NamespaceReply { path, .. } => (Some(":namespace"), path),
        };
        if let Some(head) = head {
            write!(f, "{head} ")?;
        }
        f.write_str(path)?;
        match self {
            TextMessage::Set { args, .. } | TextMessage::GetReply { args, .. } => {
                for arg in args {
                    f.write_str(" ")?;
                    write_arg(f, arg)?;
                }
            }
            TextMessage::NamespaceReply { children, .. } => {
                for child in children {
                    write!(f, " {child}")?;
                }
            }
            TextMessage::Get { .. } | TextMessage::Namespace { .. } => {}
        }
        Ok(())
    }
}
