//! Ordered diagnostics produced by an update pass.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One finding, anchored to a 1-based source line of the expectations
/// document (0 for findings with no single line of origin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn note(line: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Note,
            line,
            message: message.into(),
        }
    }

    pub fn warning(line: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    pub fn error(line: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }
}

// Rendered as `severity:line: message`, the shape grep and editors
// understand.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.severity, self.line, self.message)
    }
}

/// Sort into the emission order: ascending source line, severity as the
/// tie-break so errors surface first on a shared line.
pub fn sort(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.line
            .cmp(&b.line)
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.message.cmp(&b.message))
    });
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_severity_line_and_message() {
        let diag = Diagnostic::warning(12, "no tests exist with query 'a:b:*'");
        assert_eq!(diag.to_string(), "warning:12: no tests exist with query 'a:b:*'");
    }

    #[test]
    fn sorts_by_line_then_severity() {
        let mut diags = vec![
            Diagnostic::note(9, "b"),
            Diagnostic::error(3, "c"),
            Diagnostic::warning(3, "a"),
        ];
        sort(&mut diags);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[1].severity, Severity::Warning);
        assert_eq!(diags[2].line, 9);
    }

    #[test]
    fn detects_error_severity() {
        assert!(!has_errors(&[Diagnostic::note(1, "x")]));
        assert!(has_errors(&[
            Diagnostic::note(1, "x"),
            Diagnostic::error(2, "y")
        ]));
    }
}
