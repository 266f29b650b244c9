//! Recursive macro expansion with cycle detection and memoization
//!
//! Every entry is expanded at most once. The expanded text is written back
//! into the table, so later references are a plain lookup and diamond-shaped
//! reference graphs stay linear.

use tracing::{debug, instrument};

use crate::defines::DefinitionTable;
use crate::error::{PreprocError, Result};
use crate::template::{has_placeholders, substitute_placeholders};

/// Deepest chain of nested `%NAME%` references followed before giving up
pub const MAX_DEFINE_DEPTH: usize = 256;

/// Expands definitions in place
pub struct MacroResolver<'t> {
    table: &'t mut DefinitionTable,
    expansions: usize,
    max_depth: usize,
}

impl<'t> MacroResolver<'t> {
    pub fn new(table: &'t mut DefinitionTable) -> Self {
        Self {
            table,
            expansions: 0,
            max_depth: MAX_DEFINE_DEPTH,
        }
    }

    /// Override the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of entries this resolver has expanded
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Resolve every entry in insertion order
    ///
    /// The first error wins; which one that is depends on table order.
    #[instrument(skip(self), fields(entries = self.table.len()))]
    pub fn resolve_all(&mut self) -> Result<()> {
        let names: Vec<String> = self.table.names().map(str::to_string).collect();
        let mut chain = Vec::new();
        for name in &names {
            if !self.table.is_resolved(name) {
                self.resolve(name, &mut chain)?;
            }
        }
        debug!(expansions = self.expansions, "Resolved all definitions");
        Ok(())
    }

    /// Fully expand `name` and store the result
    ///
    /// `chain` holds the names being expanded further up the stack; it is
    /// left as it was on return.
    pub fn resolve(&mut self, name: &str, chain: &mut Vec<String>) -> Result<String> {
        let Some(def) = self.table.entry(name) else {
            return Err(PreprocError::UndefinedReference {
                name: name.to_string(),
                referenced_by: chain.last().cloned(),
            });
        };
        if def.resolved {
            return Ok(def.value.clone());
        }

        let raw = def.value.clone();
        let expanded = if has_placeholders(&raw) {
            if chain.len() >= self.max_depth {
                return Err(PreprocError::DefineTooDeep {
                    name: name.to_string(),
                    limit: self.max_depth,
                });
            }

            chain.push(name.to_string());
            let expanded = substitute_placeholders(&raw, |child| {
                if !self.table.contains(child) {
                    return Err(PreprocError::UndefinedReference {
                        name: child.to_string(),
                        referenced_by: Some(name.to_string()),
                    });
                }
                if chain.iter().any(|parent| parent == child) {
                    let mut cycle = chain.clone();
                    cycle.push(child.to_string());
                    return Err(PreprocError::DefineCycle { chain: cycle });
                }
                self.resolve(child, chain)
            });
            chain.pop();
            expanded?
        } else {
            raw
        };

        debug!(name, value = %expanded, "Expanded definition");
        self.expansions += 1;
        self.table.mark_resolved(name, expanded.clone());
        Ok(expanded)
    }
}

/// Resolve every entry of `table` in place
pub fn resolve_all(table: &mut DefinitionTable) -> Result<()> {
    MacroResolver::new(table).resolve_all()
}
