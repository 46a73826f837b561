//! Executable identity check

use std::fmt;
use std::path::Path;

/// Why a path was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    Empty,
    Missing,
    WrongName { found: String },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::Empty => write!(f, "no path given"),
            ValidationFailure::Missing => write!(f, "file does not exist"),
            ValidationFailure::WrongName { found } => {
                write!(f, "'{}' is not the expected program", found)
            }
        }
    }
}

/// Decides whether a path is a real instance of the target executable
#[derive(Debug, Clone)]
pub struct PathValidator {
    accepted_names: Vec<String>,
}

impl PathValidator {
    pub fn new(accepted_names: Vec<String>) -> Self {
        Self { accepted_names }
    }

    pub fn validate(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }

    pub fn check(&self, path: &Path) -> Result<(), ValidationFailure> {
        if path.as_os_str().is_empty() {
            return Err(ValidationFailure::Empty);
        }

        if !path.exists() {
            return Err(ValidationFailure::Missing);
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self
            .accepted_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&file_name))
        {
            Ok(())
        } else {
            Err(ValidationFailure::WrongName { found: file_name })
        }
    }
}
