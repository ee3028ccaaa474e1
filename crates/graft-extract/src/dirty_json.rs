//! Dirty JSON recovery
//!
//! LLM output often carries JSON with single quotes, trailing commas,
//! `//` / `/* */` comments or surrounding prose. Recovery is staged; the
//! first stage that yields a JSON object wins:
//!
//! 1. strict parse of the trimmed text
//! 2. strict parse of the first balanced `{...}` of the raw text
//! 3. repair: comments dropped, single quotes turned into double quotes,
//!    trailing commas removed
//! 4. strict parse of the first balanced `{...}` of the repaired text
//!
//! Unbalanced braces are never repaired.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"));

/// Recover a JSON object from noisy text
#[must_use]
pub fn parse_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(object) = strict_object(text.trim()) {
        return Some(object);
    }
    if let Some(object) = balanced_object(text).and_then(strict_object) {
        tracing::debug!("recovered JSON object from surrounding prose");
        return Some(object);
    }
    let repaired = repair(text);
    let object = balanced_object(&repaired).and_then(strict_object);
    if object.is_some() {
        tracing::debug!("recovered JSON object after repair");
    }
    object
}

fn strict_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Apply the lenient repairs in order: comments, quotes, trailing commas
pub(crate) fn repair(text: &str) -> String {
    let without_comments = strip_comments(text);
    let quoted = without_comments.replace('\'', "\"");
    TRAILING_COMMA
        .replace_all(&quoted, "$1")
        .trim()
        .to_string()
}

/// Remove `//` line comments and `/* */` block comments outside string literals
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    // apostrophes in prose before the object are not string delimiters
    let mut in_object = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"' | '\'', _) if in_object => {
                quote = Some(c);
                out.push(c);
            }
            ('{', _) => {
                in_object = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// First balanced `{...}` span, ignoring braces inside double-quoted strings
pub(crate) fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = None;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
