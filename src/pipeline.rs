//! Preprocessor - runs include, define collection, resolution and substitution
//!
//! Include → build definitions → resolve all → substitute body.
//! Exits on the first error; nothing partial is returned.

use tracing::{debug, info, instrument};

use crate::defines::{build_definitions, DefinitionTable};
use crate::error::Result;
use crate::include::Includer;
use crate::loader::{FsLoader, SourceLoader};
use crate::resolver::MacroResolver;
use crate::template::substitute;

/// Result of a full run
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Final document text
    pub text: String,
    /// Fully resolved definitions, in first-definition order
    pub table: DefinitionTable,
}

/// Include/define preprocessor over a source loader
pub struct Preprocessor {
    loader: Box<dyn SourceLoader>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(FsLoader::new())
    }
}

impl Preprocessor {
    pub fn new(loader: impl SourceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
        }
    }

    /// Expand the file `name`
    #[instrument(skip(self))]
    pub fn expand_file(&self, name: &str) -> Result<Expansion> {
        let mut includer = Includer::new(self.loader.as_ref());
        let flat = includer.include(name, &mut Vec::new())?;
        debug!(files = includer.files_read(), bytes = flat.len(), "Flattened includes");
        self.finish(flat)
    }

    /// Expand an in-memory root document named `name`
    ///
    /// Its `#include` lines still go through the loader.
    #[instrument(skip(self, text))]
    pub fn expand_str(&self, name: &str, text: &str) -> Result<Expansion> {
        let mut includer = Includer::new(self.loader.as_ref());
        let flat = includer.resolve_includes(text, &mut vec![name.to_string()])?;
        self.finish(flat)
    }

    fn finish(&self, flat: String) -> Result<Expansion> {
        let (body, mut table) = build_definitions(&flat);

        let mut resolver = MacroResolver::new(&mut table);
        resolver.resolve_all()?;
        let expansions = resolver.expansions();

        let text = substitute(&body, &table)?;
        info!(definitions = table.len(), expansions, "Expansion complete");
        Ok(Expansion { text, table })
    }
}
