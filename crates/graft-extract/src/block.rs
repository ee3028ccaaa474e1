//! Edit block data model

use crate::error::ExtractionError;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One fenced block of LLM output, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedBlock {
    /// Ordinal among recognised fenced blocks (0-based)
    pub index: usize,
    /// 1-based line of the opening fence
    pub line: usize,
    /// What the block asks for
    pub block: EditBlock,
}

impl ExtractedBlock {
    /// Target module path, when the block names one
    #[must_use]
    pub fn module_path(&self) -> Option<&str> {
        self.block.module_path()
    }
}

/// Structured edit derived from one fenced block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditBlock {
    /// Add or replace definitions in a module
    Update(UpdateBlock),
    /// Delete named definitions from a module
    Removal(RemovalBlock),
    /// Recognised block that could not become an edit
    Malformed(#[serde(serialize_with = "display")] ExtractionError),
}

impl EditBlock {
    /// Target module path, when the block names one
    #[must_use]
    pub fn module_path(&self) -> Option<&str> {
        match self {
            Self::Update(update) => Some(&update.module_path),
            Self::Removal(removal) => Some(&removal.module_path),
            Self::Malformed(_) => None,
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Removal(_) => "removal",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Update instruction for one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateBlock {
    /// Module path relative to the project root
    pub module_path: String,
    /// Fence language tag as written
    pub language: String,
    /// Block text left after all recognizers ran
    pub code_body: String,
    /// Lines marked with the import sentinel, advisory only
    pub imports_hint: Vec<String>,
    /// First class declared in the block
    pub class_name: Option<String>,
    /// First top-level function declared in the block (informational)
    pub function_name: Option<String>,
    /// Method name to dedented method source
    pub updated_methods: IndexMap<String, String>,
}

impl UpdateBlock {
    /// Whether the block carries method replacements for a class
    #[must_use]
    pub fn has_method_updates(&self) -> bool {
        self.class_name.is_some() && !self.updated_methods.is_empty()
    }
}

/// Removal instruction for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalBlock {
    /// Module path relative to the project root
    pub module_path: String,
    /// What to remove, never empty
    pub targets: Vec<RemovalTarget>,
}

/// A single definition to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalTarget {
    /// Definition kind
    pub kind: TargetKind,
    /// Definition name
    pub name: String,
}

impl RemovalTarget {
    /// Create a removal target
    pub fn new(kind: TargetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl Display for RemovalTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Closed set of removable definition kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Top-level class
    Class,
    /// Top-level function
    Function,
    /// Top-level assignment target
    Variable,
}

impl TargetKind {
    /// Lowercase name as used in removal JSON
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Variable => "variable",
        }
    }
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" => Ok(Self::Class),
            "function" | "def" => Ok(Self::Function),
            "variable" | "var" => Ok(Self::Variable),
            _ => Err(ExtractionError::UnknownTargetKind { kind: s.to_string() }),
        }
    }
}

fn display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
