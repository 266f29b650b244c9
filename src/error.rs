//! Error types with fix suggestions
//!
//! Error code ranges:
//! - RCX-001-009: Usage errors
//! - RCX-010-019: Include errors
//! - RCX-020-029: Define errors
//! - RCX-030-039: Output errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PreprocError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Render a name chain as `a <- b <- c`
pub fn format_chain<S: AsRef<str>>(chain: &[S]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" <- ")
}

/// All preprocessing failures. Every one is fatal.
#[derive(Error, Debug)]
pub enum PreprocError {
    #[error("RCX-001: {message}")]
    Usage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Include errors (RCX-010 to RCX-013)
    // ─────────────────────────────────────────────────────────────

    #[error("RCX-010: File '{name}' not found{}", included_from(.chain))]
    NotFound { name: String, chain: Vec<String> },

    #[error("RCX-011: Cannot read '{name}'{}: {source}", included_from(.chain))]
    ReadError {
        name: String,
        chain: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("RCX-012: #include cycle: {}", format_chain(.chain))]
    IncludeCycle { chain: Vec<String> },

    #[error("RCX-013: #include nesting deeper than {limit} at '{name}'")]
    IncludeTooDeep { name: String, limit: usize },

    // ─────────────────────────────────────────────────────────────
    // Define errors (RCX-020 to RCX-022)
    // ─────────────────────────────────────────────────────────────

    #[error("RCX-020: %{name}% is not defined{}", referenced_in(.referenced_by))]
    UndefinedReference {
        name: String,
        /// Macro whose value holds the reference; `None` for the body
        referenced_by: Option<String>,
    },

    #[error("RCX-021: #define cycle: {}", format_chain(.chain))]
    DefineCycle { chain: Vec<String> },

    #[error("RCX-022: #define nesting deeper than {limit} at '{name}'")]
    DefineTooDeep { name: String, limit: usize },

    #[error("RCX-030: Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

fn included_from(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (included from {})", format_chain(chain))
    }
}

fn referenced_in(referenced_by: &Option<String>) -> String {
    match referenced_by {
        Some(name) => format!(" (referenced by #define {})", name),
        None => String::new(),
    }
}

impl PreprocError {
    /// Stable error code, e.g. `RCX-021`
    pub fn code(&self) -> &'static str {
        match self {
            PreprocError::Usage { .. } => "RCX-001",
            PreprocError::NotFound { .. } => "RCX-010",
            PreprocError::ReadError { .. } => "RCX-011",
            PreprocError::IncludeCycle { .. } => "RCX-012",
            PreprocError::IncludeTooDeep { .. } => "RCX-013",
            PreprocError::UndefinedReference { .. } => "RCX-020",
            PreprocError::DefineCycle { .. } => "RCX-021",
            PreprocError::DefineTooDeep { .. } => "RCX-022",
            PreprocError::Output(_) => "RCX-030",
        }
    }
}

impl FixSuggestion for PreprocError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            PreprocError::Usage { .. } => Some("Usage: rcexpand FILENAME [--debug]"),
            PreprocError::NotFound { .. } => {
                Some("Check the #include path; names resolve against the working directory")
            }
            PreprocError::ReadError { .. } => Some("Check file permissions and encoding (UTF-8)"),
            PreprocError::IncludeCycle { .. } => {
                Some("Remove one #include from the chain so no file includes itself")
            }
            PreprocError::IncludeTooDeep { .. } => {
                Some("Flatten the include hierarchy; nested includes are limited in depth")
            }
            PreprocError::UndefinedReference { .. } => {
                Some("Add a #define for the name or fix the spelling of the placeholder")
            }
            PreprocError::DefineCycle { .. } => {
                Some("Break the chain: a #define must not reference itself, directly or indirectly")
            }
            PreprocError::DefineTooDeep { .. } => {
                Some("Shorten the chain of #define references to one another")
            }
            PreprocError::Output(_) => None,
        }
    }
}
