//! Line recognizers for update blocks
//!
//! Recognizers run in a fixed order over the raw block text and never try
//! to understand code structure:
//!
//! - module path header (`# pkg/mod.py`, `# File: pkg/mod.py`)
//! - import sentinel lines (`#¤# import os`)
//! - `# BEGIN UPDATED METHOD` / `# END UPDATED METHOD` regions
//! - `## ...` placeholders for elided code
//! - first `class NAME` and first column-0 `def NAME`

use crate::error::ExtractionError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static MODULE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*#\s*(?i:(?:file|path)\s*:\s*)?([\w.\-/\\]+\.pyi?)\s*$")
        .expect("valid module path regex")
});
static SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#¤#(.*)$").expect("valid sentinel regex"));
static BEGIN_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*BEGIN UPDATED METHOD\s*$").expect("valid begin regex"));
static END_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*END UPDATED METHOD\s*$").expect("valid end regex"));
static DEF_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("valid def regex")
});
static TOP_LEVEL_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("valid top-level def regex")
});
static CLASS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s+([A-Za-z_]\w*)").expect("valid class regex"));
static TOP_LEVEL_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+[A-Za-z_]\w*").expect("valid top-level class regex"));
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*##\s*\.\.\.").expect("valid placeholder regex"));

/// Everything the recognizers pulled out of one update block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Recognized {
    pub(crate) module_path: Option<String>,
    pub(crate) imports_hint: Vec<String>,
    pub(crate) updated_methods: IndexMap<String, String>,
    pub(crate) class_name: Option<String>,
    pub(crate) function_name: Option<String>,
    pub(crate) code_body: String,
}

/// Run all recognizers over a block body
pub(crate) fn recognize(text: &str) -> Result<Recognized, ExtractionError> {
    // (1-based line in block, text)
    let mut lines: Vec<(usize, &str)> = text.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();
    let mut out = Recognized {
        module_path: take_module_path(&mut lines),
        ..Recognized::default()
    };

    lines.retain(|(_, line)| match SENTINEL.captures(line) {
        Some(caps) => {
            let hint = caps[1].trim();
            if !hint.is_empty() {
                out.imports_hint.push(hint.to_string());
            }
            false
        }
        None => true,
    });

    lines = take_method_regions(lines, &mut out.updated_methods)?;
    lines.retain(|(_, line)| !PLACEHOLDER.is_match(line));

    out.class_name = lines
        .iter()
        .find_map(|(_, line)| CLASS_HEADER.captures(line))
        .map(|caps| caps[1].to_string());
    out.function_name = lines
        .iter()
        .find_map(|(_, line)| TOP_LEVEL_DEF.captures(line))
        .map(|caps| caps[1].to_string());

    if !out.updated_methods.is_empty() {
        drop_empty_class_shells(&mut lines);
    }
    out.code_body = join_trimmed(&lines);
    Ok(out)
}

fn take_module_path(lines: &mut Vec<(usize, &str)>) -> Option<String> {
    let first = lines.iter().position(|(_, l)| !l.trim().is_empty())?;
    let path = MODULE_PATH.captures(lines[first].1)?[1].replace('\\', "/");
    lines.remove(first);
    Some(path)
}

fn take_method_regions<'a>(
    lines: Vec<(usize, &'a str)>,
    methods: &mut IndexMap<String, String>,
) -> Result<Vec<(usize, &'a str)>, ExtractionError> {
    let mut kept = Vec::with_capacity(lines.len());
    let mut region: Option<(usize, Vec<&str>)> = None;

    for (number, line) in lines {
        match region.take() {
            None if BEGIN_METHOD.is_match(line) => region = Some((number, Vec::new())),
            None => kept.push((number, line)),
            Some((start, body)) if END_METHOD.is_match(line) => {
                let name = body
                    .iter()
                    .find_map(|l| DEF_HEADER.captures(l))
                    .map(|caps| caps[1].to_string())
                    .ok_or(ExtractionError::RegionWithoutFunction { line: start })?;
                let mut source = dedent_lines(&body);
                source.push('\n');
                tracing::trace!(method = %name, "updated method region");
                methods.insert(name, source);
            }
            Some((start, mut body)) => {
                body.push(line);
                region = Some((start, body));
            }
        }
    }
    match region {
        Some((start, _)) => Err(ExtractionError::UnterminatedRegion { line: start }),
        None => Ok(kept),
    }
}

/// Drop column-0 class headers whose suite holds nothing but blanks and comments
fn drop_empty_class_shells(lines: &mut Vec<(usize, &str)>) {
    let mut drop = Vec::new();
    for (i, (_, line)) in lines.iter().enumerate() {
        if !TOP_LEVEL_CLASS.is_match(line) {
            continue;
        }
        let empty = lines[i + 1..]
            .iter()
            .map(|(_, l)| *l)
            .take_while(|l| l.trim().is_empty() || l.starts_with([' ', '\t']) || l.starts_with('#'))
            .all(|l| {
                let trimmed = l.trim();
                trimmed.is_empty() || trimmed.starts_with('#')
            });
        if empty {
            drop.push(i);
        }
    }
    for i in drop.into_iter().rev() {
        lines.remove(i);
    }
}

fn dedent_lines(lines: &[&str]) -> String {
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .skip_while(|l| l.trim().is_empty())
        .map(|l| l.get(common..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

fn join_trimmed(lines: &[(usize, &str)]) -> String {
    let start = lines.iter().position(|(_, l)| !l.trim().is_empty());
    let end = lines.iter().rposition(|(_, l)| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => {
            let mut body = lines[start..=end]
                .iter()
                .map(|(_, l)| *l)
                .collect::<Vec<_>>()
                .join("\n");
            body.push('\n');
            body
        }
        _ => String::new(),
    }
}
