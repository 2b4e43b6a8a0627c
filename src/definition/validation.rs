//! Validation diagnostic types.
//!
//! Registration reports every structural problem found, not just the first;
//! the compiler accumulates [`Diagnostic`]s into a [`ValidationReport`].

use serde::{Deserialize, Serialize};

/// Severity level of a validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    pub node_id: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            code: code.to_string(),
            message: message.into(),
            node_id: None,
        }
    }

    pub fn error_at(code: &str, message: impl Into<String>, node_id: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            code: code.to_string(),
            message: message.into(),
            node_id: Some(node_id.into()),
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Warning,
            code: code.to_string(),
            message: message.into(),
            node_id: None,
        }
    }
}

/// Aggregated result of definition validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let is_valid = diagnostics
            .iter()
            .all(|d| d.level != DiagnosticLevel::Error);
        ValidationReport {
            is_valid,
            diagnostics,
        }
    }

    /// Return only the error-level diagnostics.
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .collect()
    }

    /// Return only the warning-level diagnostics.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_diagnostics() {
        let report = ValidationReport::from_diagnostics(vec![]);
        assert!(report.is_valid);

        let report = ValidationReport::from_diagnostics(vec![
            Diagnostic::warning("W001", "suspicious"),
            Diagnostic::error("E002", "broken"),
        ]);
        assert!(!report.is_valid);
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_error_at_carries_node() {
        let d = Diagnostic::error_at("E010", "bad agent", "n1");
        assert_eq!(d.node_id.as_deref(), Some("n1"));
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let report = ValidationReport::from_diagnostics(vec![Diagnostic::error("E001", "x")]);
        let json = serde_json::to_string(&report).unwrap();
        let back: ValidationReport = serde_json::from_str(&json).unwrap();
        assert!(!back.is_valid);
        assert_eq!(back.diagnostics.len(), 1);
    }
}
