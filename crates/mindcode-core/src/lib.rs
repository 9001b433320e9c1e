//! Mindcode Core - compilation of Mindcode source to mlog
//!
//! This crate turns Mindcode source text into Mindustry logic ("mlog")
//! instructions. The pipeline is lex -> parse -> generate; syntax
//! problems come back as an ordered list of diagnostics rather than a
//! hard error, so callers can report all of them at once.
//!
//! # Example
//!
//! ```
//! let result = mindcode_core::compile("x = 1 + 2");
//! assert!(result.is_success());
//! assert!(result.output.unwrap().contains("op add"));
//! ```

pub mod codegen;
pub mod diagnostic;
pub mod error;
pub mod lexer;
pub mod parser;

use std::fs;
use std::path::Path;

pub use diagnostic::Diagnostic;
pub use error::{CompileError, Result};

/// Outcome of compiling one source text.
///
/// Either `output` holds the full mlog text, or `diagnostics` explains
/// why there is none. Both being empty/None cannot happen.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The compiled mlog program, when compilation succeeded.
    pub output: Option<String>,

    /// Problems found in the source, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// True when there is output to use and nothing was reported.
    pub fn is_success(&self) -> bool {
        self.output.is_some() && self.diagnostics.is_empty()
    }
}

/// Compiles Mindcode source text to mlog.
pub fn compile(source: &str) -> Compilation {
    let (tokens, mut diagnostics) = lexer::tokenize(source);
    let (program, parse_diagnostics) = parser::parse(&tokens);
    diagnostics.extend(parse_diagnostics);
    diagnostics.sort_by_key(|d| (d.line, d.column));

    if !diagnostics.is_empty() {
        return Compilation {
            output: None,
            diagnostics,
        };
    }

    Compilation {
        output: Some(codegen::generate(&program)),
        diagnostics,
    }
}

/// Reads a source file and compiles it.
pub fn compile_file(path: &Path) -> Result<Compilation> {
    tracing::debug!("compiling '{}'", path.display());
    let source = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
    Ok(compile(&source))
}
