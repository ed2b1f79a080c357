//! GLSL stitch minifier.
//!
//! Removes comments, indentation and most line breaks. Newlines survive only
//! where the preprocessor needs them: around directives and after `else`
//! when the next token is not a brace. `#define` bodies are never touched by
//! comment stripping.

use once_cell::sync::Lazy;
use regex::Regex;

static AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| compile(r"[ \t]*\n[ \t]*"));
static ELSE_BRACE: Lazy<Regex> = Lazy::new(|| compile(r"else\n+\{"));
static NEWLINES: Lazy<Regex> = Lazy::new(|| compile(r"\n+"));
static AROUND_OPERATOR: Lazy<Regex> = Lazy::new(|| compile(r"[ \t]*([=+\-*/<>{},;])[ \t]*"));
static SPACES: Lazy<Regex> = Lazy::new(|| compile(r" +"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => panic!("invalid built-in pattern {pattern}: {err}"),
    }
}

pub fn minify(source: &str) -> String {
    let text = source.replace("\r\n", "\n").replace('\r', "\n");
    let text = strip_comments(&text);
    let text = strip_whitespace(&text);
    text.trim().to_string()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Open,
    Macro,
    Line,
    Block,
}

/// Drop `//` and `/* */` comments outside of `#define` lines.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = Scan::Open;
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        match state {
            Scan::Open => {
                if rest.starts_with(b"/*") {
                    out.push_str(&text[copied..i]);
                    state = Scan::Block;
                    i += 2;
                    continue;
                }
                if rest.starts_with(b"//") {
                    out.push_str(&text[copied..i]);
                    state = Scan::Line;
                    i += 2;
                    continue;
                }
                if rest.starts_with(b"#define") {
                    state = Scan::Macro;
                }
            }
            Scan::Macro => {
                if bytes[i] == b'\n' && !escaped(bytes, i) {
                    state = Scan::Open;
                }
            }
            Scan::Line => {
                if bytes[i] == b'\n' {
                    // the newline itself is kept
                    copied = i;
                    state = Scan::Open;
                }
            }
            Scan::Block => {
                if rest.starts_with(b"*/") {
                    i += 2;
                    copied = i;
                    state = Scan::Open;
                    continue;
                }
            }
        }
        i += 1;
    }
    match state {
        Scan::Line | Scan::Block => {}
        Scan::Open | Scan::Macro => out.push_str(&text[copied..]),
    }
    out
}

fn escaped(bytes: &[u8], i: usize) -> bool {
    i > 0 && bytes[i - 1] == b'\\'
}

fn strip_whitespace(text: &str) -> String {
    let text = text.trim_matches('\n');
    let text = AROUND_NEWLINE.replace_all(text, "\n");
    let text = ELSE_BRACE.replace_all(&text, "else{");
    let text = join_lines(text.trim_matches('\n'));
    let text = NEWLINES.replace_all(&text, "\n");
    let text = collapse_operators(&text);
    let text = text.replace('\t', " ");
    SPACES.replace_all(&text, " ").into_owned()
}

/// Drop blanks around operators and punctuation. A blank that separates two
/// `+` or two `-` survives as one space, so `a - -b` never becomes `a--b`.
fn collapse_operators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for caps in AROUND_OPERATOR.captures_iter(text) {
        let (Some(whole), Some(op)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[copied..whole.start()]);
        let sign = op.as_str().chars().next().filter(|c| matches!(c, '+' | '-'));
        if let Some(sign) = sign {
            if whole.start() < op.start() && out.ends_with(sign) {
                out.push(' ');
            }
        }
        out.push_str(op.as_str());
        if let Some(sign) = sign {
            if op.end() < whole.end() && text[whole.end()..].starts_with(sign) {
                out.push(' ');
            }
        }
        copied = whole.end();
    }
    out.push_str(&text[copied..]);
    out
}

/// Remove line breaks that the preprocessor does not need. A removed break
/// between two identifier characters becomes a space.
fn join_lines(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = Scan::Open;
    for (i, c) in text.char_indices() {
        match state {
            Scan::Open => {
                if c == '#' {
                    state = Scan::Macro;
                } else if text[i..].starts_with("else") {
                    state = Scan::Block;
                } else if c == '\n' && bytes.get(i + 1) != Some(&b'#') {
                    let joins_words = i > 0
                        && is_word(bytes[i - 1])
                        && bytes.get(i + 1).copied().map_or(false, is_word);
                    if joins_words {
                        out.push(' ');
                    }
                    continue;
                }
            }
            Scan::Macro => {
                if c == '\n' && !escaped(bytes, i) {
                    state = Scan::Open;
                }
            }
            // after `else`: keep the next line break unless a brace comes first
            Scan::Block | Scan::Line => {
                if c == '{' || (c == '\n' && !escaped(bytes, i)) {
                    state = Scan::Open;
                }
            }
        }
        out.push(c);
    }
    out
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
