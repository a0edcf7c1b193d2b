//! Diagnostics
//!
//! Collects structural errors and warnings from validation passes over a
//! compiled graph. Findings are accumulated and returned, never raised, so a
//! single pass surfaces every problem at once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural check code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckCode {
    /// A relationship subgraph contains a cycle with identifiable members
    RelationshipCycle,
    /// A relationship subgraph is not a DAG but no cycle could be isolated
    GraphNotAcyclic,
    /// A node is missing a mandatory attribute
    MissingNodeField,
    /// A node label collides with a reserved identifier
    ReservedNameCollision,
    /// A node label is not a code-safe identifier
    MalformedLabel,
    /// Two display names normalize to the same label
    DuplicateLabel,
    /// A display name contains characters stripped by downstream stores
    BlacklistedCharacters,
}

impl CheckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelationshipCycle => "E001",
            Self::GraphNotAcyclic => "E002",
            Self::MissingNodeField => "E003",
            Self::ReservedNameCollision => "E004",
            Self::MalformedLabel => "E005",
            Self::DuplicateLabel => "E006",
            Self::BlacklistedCharacters => "W001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::RelationshipCycle
            | Self::GraphNotAcyclic
            | Self::MissingNodeField
            | Self::ReservedNameCollision
            | Self::MalformedLabel
            | Self::DuplicateLabel => Severity::Error,

            Self::BlacklistedCharacters => Severity::Warning,
        }
    }
}

impl fmt::Display for CheckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckItem {
    /// Node label or relationship name the finding is about
    pub subject: String,
    pub code: CheckCode,
    pub message: String,
    /// Additional context (cycle members, offending characters)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl CheckItem {
    pub fn new(subject: impl Into<String>, code: CheckCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for CheckItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;
        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }
        Ok(())
    }
}

/// Collection of findings from the structural checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<CheckItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: CheckItem) {
        self.items.push(item);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &CheckItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &CheckItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    pub fn all(&self) -> &[CheckItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all findings for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();
        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }
        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }
        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_code_severity() {
        assert_eq!(CheckCode::RelationshipCycle.severity(), Severity::Error);
        assert_eq!(CheckCode::BlacklistedCharacters.severity(), Severity::Warning);
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.push(CheckItem::new(
            "requiresDependency",
            CheckCode::RelationshipCycle,
            "cycle detected",
        ));
        diags.push(CheckItem::new(
            "Patient (Old)",
            CheckCode::BlacklistedCharacters,
            "display name contains '('",
        ));

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
    }
}
