//! Fenced block extractor
//!
//! Uses pulldown-cmark to find fenced code blocks in LLM output and turns
//! each one into an [`ExtractedBlock`].

use crate::block::{EditBlock, ExtractedBlock, RemovalBlock, RemovalTarget, TargetKind, UpdateBlock};
use crate::dirty_json;
use crate::error::ExtractionError;
use crate::recognize::recognize;
use pulldown_cmark::{CodeBlockKind, Event, Parser as MdParser, Tag, TagEnd};
use serde_json::{Map, Value};

/// Fenced block with its language tag, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawBlock {
    tag: String,
    line: usize,
    text: String,
}

/// Extracts edit blocks from LLM output
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockExtractor;

impl BlockExtractor {
    /// Create new extractor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract all recognised fenced blocks in source order
    ///
    /// Never fails: blocks that cannot become edits are returned as
    /// [`EditBlock::Malformed`].
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<ExtractedBlock> {
        let blocks: Vec<_> = fenced_blocks(text)
            .into_iter()
            .enumerate()
            .map(|(index, raw)| ExtractedBlock {
                index,
                line: raw.line,
                block: Self::classify(&raw),
            })
            .collect();
        tracing::debug!(blocks = blocks.len(), "extracted fenced blocks");
        blocks
    }

    fn classify(raw: &RawBlock) -> EditBlock {
        let result = if raw.tag.eq_ignore_ascii_case("json") {
            removal_block(&raw.text).map(EditBlock::Removal)
        } else {
            update_block(&raw.tag, &raw.text).map(EditBlock::Update)
        };
        result.unwrap_or_else(|err| {
            tracing::warn!(line = raw.line, tag = %raw.tag, error = %err, "malformed block");
            EditBlock::Malformed(err)
        })
    }
}

/// Collect fenced code blocks with a non-empty language tag
fn fenced_blocks(text: &str) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<RawBlock> = None;

    for (event, range) in MdParser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let line = text[..range.start].matches('\n').count() + 1;
                let tag = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                if tag.is_empty() {
                    tracing::debug!(line, "ignoring code block without language tag");
                } else {
                    current = Some(RawBlock {
                        tag,
                        line,
                        text: String::new(),
                    });
                }
            }
            Event::Text(chunk) => {
                if let Some(block) = current.as_mut() {
                    block.text.push_str(&chunk);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }
    blocks
}

fn update_block(tag: &str, text: &str) -> Result<UpdateBlock, ExtractionError> {
    let recognized = recognize(text)?;
    let module_path = recognized
        .module_path
        .filter(|p| !p.is_empty())
        .ok_or(ExtractionError::MissingModulePath)?;
    Ok(UpdateBlock {
        module_path,
        language: tag.to_string(),
        code_body: recognized.code_body,
        imports_hint: recognized.imports_hint,
        class_name: recognized.class_name,
        function_name: recognized.function_name,
        updated_methods: recognized.updated_methods,
    })
}

fn removal_block(text: &str) -> Result<RemovalBlock, ExtractionError> {
    let object = dirty_json::parse_object(text)
        .filter(|o| !o.is_empty())
        .ok_or(ExtractionError::UnparseableJson)?;

    let module_path = object
        .get("module_path")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ExtractionError::MissingModulePath)?
        .to_string();

    let entries = object
        .get("targets")
        .and_then(Value::as_array)
        .ok_or(ExtractionError::MissingTargets)?;
    if entries.is_empty() {
        return Err(ExtractionError::EmptyTargets);
    }
    let targets = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| removal_target(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RemovalBlock {
        module_path,
        targets,
    })
}

fn removal_target(index: usize, entry: &Value) -> Result<RemovalTarget, ExtractionError> {
    let entry: &Map<String, Value> = entry
        .as_object()
        .ok_or_else(|| ExtractionError::invalid_target(index, "not an object"))?;
    let kind = entry
        .get("type")
        .or_else(|| entry.get("kind"))
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractionError::invalid_target(index, "missing `type`"))?
        .parse::<TargetKind>()?;
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ExtractionError::invalid_target(index, "missing `name`"))?;
    Ok(RemovalTarget::new(kind, name))
}
