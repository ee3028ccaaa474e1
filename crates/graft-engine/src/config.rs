//! Engine configuration
//!
//! An explicit record of every recognised option. Unknown keys are
//! rejected when loading from TOML, YAML or JSON.

use crate::error::EngineError;
use graft_syntax::{
    CanonicalFormatter, CommandFormatter, CommandValidator, Formatter, TreeSitterValidator,
    ValidatorChain,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// LLM output to read
    pub input_file: PathBuf,
    /// Project root that module paths resolve against
    pub root_dir: PathBuf,
    /// Synthesize a template for missing update targets
    pub create_missing_modules: bool,
    /// Copy existing files to `<path>.bak` before overwriting
    pub enable_backup: bool,
    /// Skip the formatter even when enabled
    pub preserve_formatting: bool,
    /// Run the formatter
    pub enable_formatting: bool,
    /// Stop at the first failed block
    pub strict_parsing: bool,
    /// Compute records and diffs without writing
    pub dry_run: bool,
    /// External formatter argv; the built-in canonical formatter when absent
    pub formatter_command: Option<Vec<String>>,
    /// External compile-only check argv, run after the built-in check
    pub validator_command: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("llm_output.md"),
            root_dir: PathBuf::from("."),
            create_missing_modules: true,
            enable_backup: true,
            preserve_formatting: false,
            enable_formatting: true,
            strict_parsing: false,
            dry_run: false,
            formatter_command: None,
            validator_command: None,
        }
    }
}

/// Configuration file syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, choosing the parser by extension
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] for unreadable files, unknown
    /// extensions, unknown keys and type mismatches.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            EngineError::Config(format!(
                "{}: unsupported config extension (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))
        })?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::parse(&text, format)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), ?format, "loaded configuration");
        Ok(config)
    }

    /// Parse configuration text in the given format
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the text is invalid or has unknown keys.
    pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, EngineError> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(EngineError::Config)
    }

    /// With input file
    #[inline]
    #[must_use]
    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = path.into();
        self
    }

    /// With project root
    #[inline]
    #[must_use]
    pub fn with_root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = path.into();
        self
    }

    /// With module auto-creation
    #[inline]
    #[must_use]
    pub fn with_create_missing_modules(mut self, enabled: bool) -> Self {
        self.create_missing_modules = enabled;
        self
    }

    /// With `.bak` backups
    #[inline]
    #[must_use]
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.enable_backup = enabled;
        self
    }

    /// With formatting enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_formatting(mut self, enabled: bool) -> Self {
        self.enable_formatting = enabled;
        self
    }

    /// With original formatting preserved
    #[inline]
    #[must_use]
    pub fn with_preserve_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// With strict parsing
    #[inline]
    #[must_use]
    pub fn with_strict_parsing(mut self, strict: bool) -> Self {
        self.strict_parsing = strict;
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With external formatter argv
    #[must_use]
    pub fn with_formatter_command(mut self, argv: Vec<String>) -> Self {
        self.formatter_command = Some(argv);
        self
    }

    /// With external validator argv
    #[must_use]
    pub fn with_validator_command(mut self, argv: Vec<String>) -> Self {
        self.validator_command = Some(argv);
        self
    }

    /// Whether the formatter runs at all
    #[inline]
    #[must_use]
    pub fn formatting_active(&self) -> bool {
        self.enable_formatting && !self.preserve_formatting
    }

    /// Validators for final text: tree-sitter, then the external command
    #[must_use]
    pub fn validators(&self) -> ValidatorChain {
        let chain = ValidatorChain::new().with(TreeSitterValidator);
        match &self.validator_command {
            Some(argv) if !argv.is_empty() => chain.with(CommandValidator::new(argv.clone())),
            _ => chain,
        }
    }

    /// Formatter for final text, `None` when formatting is inactive
    #[must_use]
    pub fn formatter(&self) -> Option<Box<dyn Formatter>> {
        if !self.formatting_active() {
            return None;
        }
        let formatter: Box<dyn Formatter> = match &self.formatter_command {
            Some(argv) if !argv.is_empty() => Box::new(CommandFormatter::new(argv.clone())),
            _ => Box::new(CanonicalFormatter),
        };
        Some(formatter)
    }
}
