use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics of one severity kept in a [`Diagnostics`].
/// Totals keep counting past the cap.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic severity. Only `Error` blocks execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Unit,
    Dimension,
    Runtime,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Unit => write!(f, "unit"),
            Self::Dimension => write!(f, "dimension"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Numeric diagnostic code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNEXPECTED_CHARACTER: Self = Self(101);
    pub const UNTERMINATED_LITERAL: Self = Self(102);
    pub const INVALID_ESCAPE: Self = Self(103);
    pub const NUMBER_OUT_OF_RANGE: Self = Self(104);
    pub const UNCLOSED_BLOCK: Self = Self(105);

    // ── Unit expressions (E200–E299) ──
    pub const UNKNOWN_UNIT: Self = Self(200);
    pub const BARE_NUMBER_IN_UNIT: Self = Self(201);
    pub const NON_INTEGER_EXPONENT: Self = Self(202);
    pub const NON_LITERAL_EXPONENT: Self = Self(203);

    // ── Dimensions (E300–E399) ──
    pub const DIMENSION_MISMATCH: Self = Self(300);
    pub const DIMENSION_DOWNGRADE: Self = Self(301);
    pub const CAST_DIMENSION_MISMATCH: Self = Self(302);

    // ── Runtime (E400–E499) ──
    pub const RUNTIME_FAULT: Self = Self(400);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Unit,
            300..=399 => ErrorCategory::Dimension,
            400..=499 => ErrorCategory::Runtime,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured diagnostic: what went wrong, how bad it is, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The source line the span starts on.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// An error-severity diagnostic.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.file, self.span, self.severity, self.code, self.message
        )
    }
}

/// Accumulated diagnostics from one pass (or a whole run).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn is_empty(&self) -> bool {
        self.total_errors == 0 && self.total_warnings == 0
    }

    /// Record a diagnostic under its severity, respecting [`MAX_ERRORS`].
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                if self.errors.len() < MAX_ERRORS {
                    self.errors.push(diagnostic);
                }
                self.total_errors += 1;
            }
            Severity::Warning => {
                if self.warnings.len() < MAX_ERRORS {
                    self.warnings.push(diagnostic);
                }
                self.total_warnings += 1;
            }
        }
    }

    /// Fold another pass's diagnostics into this one.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped_errors = other.total_errors - other.errors.len();
        let dropped_warnings = other.total_warnings - other.warnings.len();
        for diagnostic in other.errors.into_iter().chain(other.warnings) {
            self.push(diagnostic);
        }
        self.total_errors += dropped_errors;
        self.total_warnings += dropped_warnings;
    }

    /// Stored diagnostics, errors first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.errors.first()
    }
}

/// Diagnostic sink bound to one source file.
///
/// Fills in the file name and source line for each record so the pipeline
/// stages only supply a code, a message and a span.
#[derive(Debug)]
pub struct Reporter<'src> {
    source_file: &'src SourceFile,
    diagnostics: Diagnostics,
}

impl<'src> Reporter<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source_file,
            diagnostics: Diagnostics::empty(),
        }
    }

    pub fn source_file(&self) -> &'src SourceFile {
        self.source_file
    }

    fn build(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> Diagnostic {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        Diagnostic::new(&self.source_file.name, code, message, span, source_line)
    }

    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let diagnostic = self.build(code, message, span);
        self.diagnostics.push(diagnostic);
    }

    pub fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let diagnostic = self.build(code, message, span).with_suggestion(suggestion);
        self.diagnostics.push(diagnostic);
    }

    pub fn warning(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let diagnostic = self
            .build(code, message, span)
            .with_severity(Severity::Warning);
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// `true` once the stored error list is full.
    pub fn at_error_limit(&self) -> bool {
        self.diagnostics.total_errors >= MAX_ERRORS
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn finish(self) -> Diagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(code: ErrorCode) -> Diagnostic {
        Diagnostic::new(
            "t.metra",
            code,
            "unknown unit 'furlong'",
            Span::new(1, 7, 1, 13),
            "x = 5 furlong",
        )
    }

    #[test]
    fn code_categories_follow_ranges() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::UNKNOWN_UNIT.category(), ErrorCategory::Unit);
        assert_eq!(
            ErrorCode::DIMENSION_DOWNGRADE.category(),
            ErrorCategory::Dimension
        );
        assert_eq!(ErrorCode::RUNTIME_FAULT.category(), ErrorCategory::Runtime);
    }

    #[test]
    fn diagnostic_display() {
        assert_eq!(
            sample(ErrorCode::UNKNOWN_UNIT).to_string(),
            "t.metra:1:7: error[E200]: unknown unit 'furlong'"
        );
        let warn = sample(ErrorCode::DIMENSION_DOWNGRADE).with_severity(Severity::Warning);
        assert!(warn.to_string().contains("warning[E301]"));
    }

    #[test]
    fn push_routes_by_severity_and_caps_storage() {
        let mut diags = Diagnostics::empty();
        for _ in 0..25 {
            diags.push(sample(ErrorCode::UNKNOWN_UNIT));
        }
        diags.push(sample(ErrorCode::DIMENSION_MISMATCH).with_severity(Severity::Warning));
        assert_eq!(diags.errors.len(), MAX_ERRORS);
        assert_eq!(diags.total_errors, 25);
        assert_eq!(diags.warnings.len(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn warnings_alone_do_not_block() {
        let mut diags = Diagnostics::empty();
        diags.push(sample(ErrorCode::DIMENSION_MISMATCH).with_severity(Severity::Warning));
        assert!(!diags.has_errors());
        assert!(!diags.is_empty());
    }

    #[test]
    fn extend_keeps_totals() {
        let mut a = Diagnostics::empty();
        a.push(sample(ErrorCode::UNKNOWN_UNIT));
        let mut b = Diagnostics::empty();
        b.push(sample(ErrorCode::NON_INTEGER_EXPONENT));
        b.push(sample(ErrorCode::DIMENSION_MISMATCH).with_severity(Severity::Warning));
        a.extend(b);
        assert_eq!(a.total_errors, 2);
        assert_eq!(a.total_warnings, 1);
        assert_eq!(a.iter().count(), 3);
    }

    #[test]
    fn reporter_fills_source_line() {
        let src = SourceFile::new("t.metra", "a = 1\nx = 5 furlong\n");
        let mut reporter = Reporter::new(&src);
        reporter.error_with_suggestion(
            ErrorCode::UNKNOWN_UNIT,
            "unknown unit 'furlong'",
            Span::new(2, 7, 2, 13),
            "known units: mm, cm, m, km, in, ft, yd, mi",
        );
        let diags = reporter.finish();
        let first = diags.first_error().unwrap();
        assert_eq!(first.source_line, "x = 5 furlong");
        assert_eq!(first.file, "t.metra");
        assert!(first.suggestion.is_some());
    }

    #[test]
    fn diagnostic_json_shape() {
        let json = serde_json::to_string(&sample(ErrorCode::UNKNOWN_UNIT)).unwrap();
        assert!(json.contains(r#""severity":"error""#));
        assert!(json.contains(r#""category":"unit""#));
        assert!(json.contains(r#""line":1"#));
        assert!(json.contains(r#""end_column":13"#));
        assert!(!json.contains("suggestion"));
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample(ErrorCode::UNKNOWN_UNIT));
    }
}
