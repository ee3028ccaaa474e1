//! Compile-only syntax validation
//!
//! Run on the final text of a module before anything is written.

use crate::error::ValidationError;
use crate::parser::{first_compile_error, parse_checked};
use std::io::{self, Write};
use std::process::{Command, Output, Stdio};
use std::thread;

/// Compile-only check of Python source
pub trait SyntaxValidator: Send + Sync {
    /// Validate source text
    ///
    /// # Errors
    /// Returns [`ValidationError`] describing the first problem found.
    fn validate(&self, source: &str) -> Result<(), ValidationError>;
}

/// Grammar check through tree-sitter
///
/// Rejects error and missing nodes, plus the statements `compile()` refuses
/// even though they parse: Python 2 `print`/`exec`, `return`/`yield` outside
/// a function and `break`/`continue` outside a loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterValidator;

impl SyntaxValidator for TreeSitterValidator {
    fn validate(&self, source: &str) -> Result<(), ValidationError> {
        let tree = parse_checked(source)?;
        match first_compile_error(tree.root_node()) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// External compile-only check; source is piped to the command's stdin
///
/// A typical command is
/// `python3 -c "import sys; compile(sys.stdin.read(), '<graft>', 'exec')"`.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    argv: Vec<String>,
}

impl CommandValidator {
    /// Create a validator running `argv[0]` with the remaining arguments
    #[must_use]
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn program(&self) -> String {
        self.argv.first().cloned().unwrap_or_default()
    }
}

impl SyntaxValidator for CommandValidator {
    fn validate(&self, source: &str) -> Result<(), ValidationError> {
        let (program, args) = self.argv.split_first().ok_or_else(|| ValidationError::Spawn {
            command: String::new(),
            message: "empty validator command".into(),
        })?;
        let output = run_with_stdin(program, args, source).map_err(|e| ValidationError::Spawn {
            command: self.program(),
            message: e.to_string(),
        })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ValidationError::Rejected {
                command: self.program(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Chain of validators; all must accept
#[derive(Default)]
pub struct ValidatorChain {
    validators: Vec<Box<dyn SyntaxValidator>>,
}

impl ValidatorChain {
    /// Empty chain (accepts everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator
    #[must_use]
    pub fn with(mut self, validator: impl SyntaxValidator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Number of validators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the chain is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl std::fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorChain")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl SyntaxValidator for ValidatorChain {
    fn validate(&self, source: &str) -> Result<(), ValidationError> {
        self.validators.iter().try_for_each(|v| v.validate(source))
    }
}

/// Run `program` with `input` on stdin and collect its output
///
/// Stdin is written from a scoped thread while this one drains stdout and
/// stderr, so a command that echoes large input cannot fill both pipes.
pub(crate) fn run_with_stdin(
    program: &str,
    args: &[String],
    input: &str,
) -> io::Result<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdin = child.stdin.take();
    thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => match stdin.write_all(input.as_bytes()) {
                // a command may exit without reading its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            },
            None => Ok(()),
        });
        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| io::Error::other("stdin writer panicked"))??;
        Ok(output)
    })
}
