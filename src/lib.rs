//! rcexpand - include/define preprocessor for config templates

pub mod defines;
pub mod error;
pub mod include;
pub mod loader;
pub mod pipeline;
pub mod resolver;
pub mod template;

pub use defines::{build_definitions, DefinitionTable};
pub use error::{FixSuggestion, PreprocError, Result};
pub use include::Includer;
pub use loader::{FsLoader, MemoryLoader, SourceLoader};
pub use pipeline::{Expansion, Preprocessor};
pub use resolver::{resolve_all, MacroResolver};
pub use template::substitute;
