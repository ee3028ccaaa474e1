//! Path resolution and file I/O
//!
//! Writes go through a sibling temp file and a rename; an existing file is
//! copied to `<path>.bak` first when backups are enabled. The `.bak` is a
//! single sibling, overwritten on every write and never deleted.

use crate::error::EngineError;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File access rooted at the project directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    backup: bool,
}

impl FileStore {
    /// Create a store rooted at `root`, backups enabled
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup: true,
        }
    }

    /// With backups enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    /// Project root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a module path from a block against the project root
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidPath`] for empty or absolute paths and
    /// for paths containing `..`.
    pub fn resolve(&self, module_path: &str) -> Result<PathBuf, EngineError> {
        let trimmed = module_path.trim();
        if trimmed.is_empty() {
            return Err(EngineError::invalid_path(module_path, "empty path"));
        }
        let relative = Path::new(trimmed);
        if relative.is_absolute() || trimmed.starts_with('/') || trimmed.starts_with('\\') {
            return Err(EngineError::invalid_path(module_path, "absolute paths are not allowed"));
        }
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(EngineError::invalid_path(module_path, "`..` is not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(EngineError::invalid_path(module_path, "absolute paths are not allowed"));
                }
            }
        }
        Ok(resolved)
    }

    /// Read a file as UTF-8
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the file cannot be read.
    pub fn read(&self, path: &Path) -> Result<String, EngineError> {
        fs::read_to_string(path).map_err(|e| EngineError::io(path, e))
    }

    /// Whether a regular file exists at `path`
    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Create the parent directories of `path`
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if a directory cannot be created.
    pub fn ensure_parent(&self, path: &Path) -> Result<(), EngineError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))
            }
            _ => Ok(()),
        }
    }

    /// Write `text` to `path`
    ///
    /// Existing files are backed up (when enabled) and replaced through a
    /// temp file plus rename, keeping their permissions. New files are
    /// written directly after their parent directories are created.
    /// Returns the backup path when one was written.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if any step fails; the target is left as
    /// it was.
    pub fn write(&self, path: &Path, text: &str) -> Result<Option<PathBuf>, EngineError> {
        if !self.exists(path) {
            self.ensure_parent(path)?;
            fs::write(path, text).map_err(|e| EngineError::io(path, e))?;
            return Ok(None);
        }

        let backup = if self.backup {
            let bak = backup_path(path);
            fs::copy(path, &bak).map_err(|e| EngineError::io(&bak, e))?;
            Some(bak)
        } else {
            None
        };

        let permissions = fs::metadata(path)
            .map_err(|e| EngineError::io(path, e))?
            .permissions();
        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, text) {
            let _ = fs::remove_file(&tmp);
            return Err(EngineError::io(&tmp, e));
        }
        if let Err(e) = fs::set_permissions(&tmp, permissions).and_then(|()| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(EngineError::io(path, e));
        }
        Ok(backup)
    }

    /// Template source for a module that does not exist yet
    ///
    /// A `# <module_path>` header and an empty class named after the file,
    /// e.g. `new/user_store.py` gives `class UserStore`.
    #[must_use]
    pub fn create_module_template(&self, module_path: &str) -> String {
        let stem = Path::new(module_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module");
        format!(
            "# {}\nclass {}:\n    pass\n",
            module_path.replace('\\', "/"),
            camel_case(stem)
        )
    }
}

/// `<path>.bak`
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".graft-{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// `user_store` -> `UserStore`; never empty, never starts with a digit
fn camel_case(stem: &str) -> String {
    let mut out: String = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Module");
    }
    out
}
