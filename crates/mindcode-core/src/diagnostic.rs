//! Compiler diagnostics.
//!
//! A diagnostic points at a line/column in the source and says what
//! went wrong there. The compiler collects diagnostics instead of
//! bailing on the first problem, so a single run can report several.

use serde::Serialize;

/// One compiler message, anchored to a source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: usize,

    /// 1-based column within the line.
    pub column: usize,

    /// Human-readable description of the problem.
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "syntax error on line {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let diag = Diagnostic::new(3, 14, "unexpected token ')'");
        assert_eq!(
            diag.to_string(),
            "syntax error on line 3:14: unexpected token ')'"
        );
    }

    #[test]
    fn test_serializes_to_json() {
        let diag = Diagnostic::new(1, 1, "boom");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["line"], 1);
        assert_eq!(json["message"], "boom");
    }
}
