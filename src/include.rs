//! Recursive `#include` resolution with cycle detection
//!
//! Each file is read, stripped of `##` comment lines, then scanned once for
//! line-anchored `#include <name>` directives. Every directive line is
//! replaced by the fully flattened contents of the named file, depth-first.

use std::io;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{PreprocError, Result};
use crate::loader::SourceLoader;

/// `#include <name>` through the end of the line (CR/LF consumed)
static INCLUDE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#include (.*)\r?\n?").expect("include pattern is valid"));

/// `##` comment line, removed with its line ending
static COMMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^##.*\r?\n?").expect("comment pattern is valid"));

/// Remove every `##` comment line
pub fn strip_comments(text: &str) -> String {
    COMMENT_PATTERN.replace_all(text, "").into_owned()
}

/// Deepest chain of nested `#include`s followed before giving up
pub const MAX_INCLUDE_DEPTH: usize = 128;

/// Flattens a document by splicing in included files
pub struct Includer<'l> {
    loader: &'l dyn SourceLoader,
    files_read: usize,
    max_depth: usize,
}

impl<'l> Includer<'l> {
    pub fn new(loader: &'l dyn SourceLoader) -> Self {
        Self {
            loader,
            files_read: 0,
            max_depth: MAX_INCLUDE_DEPTH,
        }
    }

    /// Override the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Number of files read so far (repeat inclusions count each time)
    pub fn files_read(&self) -> usize {
        self.files_read
    }

    /// Read `name` and resolve its includes
    ///
    /// `chain` is the list of files currently being included, outermost
    /// first; it is left as it was on return.
    #[instrument(skip(self, chain), fields(depth = chain.len()), level = "debug")]
    pub fn include(&mut self, name: &str, chain: &mut Vec<String>) -> Result<String> {
        if chain.iter().any(|parent| parent == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(PreprocError::IncludeCycle { chain: cycle });
        }
        if chain.len() >= self.max_depth {
            return Err(PreprocError::IncludeTooDeep {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        let data = self.loader.load(name).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => PreprocError::NotFound {
                name: name.to_string(),
                chain: chain.clone(),
            },
            _ => PreprocError::ReadError {
                name: name.to_string(),
                chain: chain.clone(),
                source,
            },
        })?;
        self.files_read += 1;

        chain.push(name.to_string());
        let flat = self.resolve_includes(&data, chain);
        chain.pop();
        flat
    }

    /// Resolve the includes of an already-loaded document
    ///
    /// `chain` must end with the document's own name.
    pub fn resolve_includes(&mut self, data: &str, chain: &mut Vec<String>) -> Result<String> {
        let data = strip_comments(data);
        let mut result = String::with_capacity(data.len());
        let mut last = 0;

        for caps in INCLUDE_PATTERN.captures_iter(&data) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let target = target.as_str().trim();
            debug!(file = target, depth = chain.len(), "Including file");

            result.push_str(&data[last..whole.start()]);
            result.push_str(&self.include(target, chain)?);
            last = whole.end();
        }

        result.push_str(&data[last..]);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    fn include(loader: &MemoryLoader, name: &str) -> Result<String> {
        Includer::new(loader).include(name, &mut Vec::new())
    }

    #[test]
    fn test_no_directives_is_identity() {
        let loader = MemoryLoader::new().with_file("a", "plain\ntext\n");
        assert_eq!(include(&loader, "a").unwrap(), "plain\ntext\n");
    }

    #[test]
    fn test_simple_include() {
        let loader = MemoryLoader::new()
            .with_file("a", "before\n#include b\nafter\n")
            .with_file("b", "middle\n");
        assert_eq!(include(&loader, "a").unwrap(), "before\nmiddle\nafter\n");
    }

    #[test]
    fn test_include_name_is_trimmed_and_crlf_consumed() {
        let loader = MemoryLoader::new()
            .with_file("a", "#include   b  \r\nend")
            .with_file("b", "B");
        assert_eq!(include(&loader, "a").unwrap(), "Bend");
    }

    #[test]
    fn test_include_at_eof_without_newline() {
        let loader = MemoryLoader::new()
            .with_file("a", "x\n#include b")
            .with_file("b", "y");
        assert_eq!(include(&loader, "a").unwrap(), "x\ny");
    }

    #[test]
    fn test_directive_must_start_line() {
        let loader = MemoryLoader::new().with_file("a", "  #include b\ntext #include b\n");
        assert_eq!(
            include(&loader, "a").unwrap(),
            "  #include b\ntext #include b\n"
        );
    }

    #[test]
    fn test_nested_include_depth_first() {
        let loader = MemoryLoader::new()
            .with_file("a", "#include b\n#include d\n")
            .with_file("b", "b1\n#include c\nb2\n")
            .with_file("c", "c\n")
            .with_file("d", "d\n");
        assert_eq!(include(&loader, "a").unwrap(), "b1\nc\nb2\nd\n");
    }

    #[test]
    fn test_same_file_twice_is_not_a_cycle() {
        let loader = MemoryLoader::new()
            .with_file("a", "#include b\n#include b\n")
            .with_file("b", "b\n");
        let mut includer = Includer::new(&loader);
        assert_eq!(includer.include("a", &mut Vec::new()).unwrap(), "b\nb\n");
        assert_eq!(includer.files_read(), 3);
    }

    #[test]
    fn test_self_include_is_cycle() {
        let loader = MemoryLoader::new().with_file("a", "#include a\n");
        let err = include(&loader, "a").unwrap_err();
        assert!(matches!(err, PreprocError::IncludeCycle { .. }));
        assert!(err.to_string().ends_with("a <- a"));
    }

    #[test]
    fn test_transitive_cycle_reports_full_chain() {
        let loader = MemoryLoader::new()
            .with_file("x", "#include y\n")
            .with_file("y", "#include z\n")
            .with_file("z", "#include x\n");
        let err = include(&loader, "x").unwrap_err();
        match err {
            PreprocError::IncludeCycle { chain } => assert_eq!(chain, vec!["x", "y", "z", "x"]),
            other => panic!("expected IncludeCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_include_reports_chain() {
        let loader = MemoryLoader::new()
            .with_file("a", "#include b\n")
            .with_file("b", "#include c\n");
        let err = include(&loader, "a").unwrap_err();
        match &err {
            PreprocError::NotFound { name, chain } => {
                assert_eq!(name, "c");
                assert_eq!(chain, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(err.to_string().contains("a <- b"));
    }

    #[test]
    fn test_comment_lines_are_stripped() {
        let loader = MemoryLoader::new()
            .with_file("a", "## header\nkeep\n## #include b\n#include b\n")
            .with_file("b", "## inner note\r\nb\n");
        assert_eq!(include(&loader, "a").unwrap(), "keep\nb\n");
    }

    #[test]
    fn test_single_hash_is_not_comment() {
        assert_eq!(strip_comments("# keep\n##drop\n"), "# keep\n");
    }

    #[test]
    fn test_flattened_output_is_fixed_point() {
        let loader = MemoryLoader::new()
            .with_file("a", "top\n#include b\n")
            .with_file("b", "bottom\n");
        let flat = include(&loader, "a").unwrap();

        let again = MemoryLoader::new().with_file("flat", flat.clone());
        assert_eq!(include(&again, "flat").unwrap(), flat);
    }

    /// Fails every read with the given kind
    struct FailingLoader(io::ErrorKind);

    impl SourceLoader for FailingLoader {
        fn load(&self, name: &str) -> io::Result<String> {
            if name == "root" {
                Ok("#include locked\n".to_string())
            } else {
                Err(io::Error::new(self.0, "denied"))
            }
        }
    }

    #[test]
    fn test_other_read_failure_is_read_error() {
        let loader = FailingLoader(io::ErrorKind::PermissionDenied);
        let err = Includer::new(&loader)
            .include("root", &mut Vec::new())
            .unwrap_err();
        match &err {
            PreprocError::ReadError {
                name,
                chain,
                source,
            } => {
                assert_eq!(name, "locked");
                assert_eq!(chain, &vec!["root".to_string()]);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected ReadError, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "RCX-011: Cannot read 'locked' (included from root): denied"
        );
    }

    /// f0 includes f1 includes ... f{len-1}
    fn include_chain(len: usize) -> MemoryLoader {
        let mut loader = MemoryLoader::new();
        for i in 0..len - 1 {
            loader.insert(format!("f{i}"), format!("{i}\n#include f{}\n", i + 1));
        }
        loader.insert(format!("f{}", len - 1), "last\n");
        loader
    }

    #[test]
    fn test_deep_include_chain_fails_with_error() {
        let loader = include_chain(3_000);
        let err = include(&loader, "f0").unwrap_err();
        match err {
            PreprocError::IncludeTooDeep { name, limit } => {
                assert_eq!(limit, MAX_INCLUDE_DEPTH);
                assert_eq!(name, format!("f{MAX_INCLUDE_DEPTH}"));
            }
            other => panic!("expected IncludeTooDeep, got {other:?}"),
        }
    }

    #[test]
    fn test_include_chain_within_limit() {
        let loader = include_chain(MAX_INCLUDE_DEPTH);
        let flat = include(&loader, "f0").unwrap();
        assert!(flat.starts_with("0\n1\n"));
        assert!(flat.ends_with("last\n"));
    }

    #[test]
    fn test_chain_is_restored_after_include() {
        let loader = MemoryLoader::new()
            .with_file("a", "#include b\n")
            .with_file("b", "b\n");
        let mut chain = vec!["outer".to_string()];
        Includer::new(&loader).include("a", &mut chain).unwrap();
        assert_eq!(chain, vec!["outer"]);

        let err = Includer::new(&loader)
            .with_max_depth(1)
            .include("a", &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, PreprocError::IncludeTooDeep { limit: 1, .. }));
    }
}
