//! Evaluation configuration.

use crate::access::AccessKind;

/// Default maximum number of raw rows ingested per statement.
pub const DEFAULT_MAX_ROWS: usize = 100_000;

/// Default maximum number of traversal steps in one output expression.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Separator used by `join` when the statement gives an empty one.
pub const DEFAULT_JOIN_SEPARATOR: &str = ", ";

/// Budget limits for a selection to prevent runaway statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionBudget {
    /// Maximum raw rows accepted from the row source.
    pub max_rows: usize,
    /// Maximum link/classification/attribute-set steps in one expression.
    pub max_depth: usize,
}

impl Default for SelectionBudget {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SelectionBudget {
    /// Create a budget with custom limits.
    pub fn new(max_rows: usize, max_depth: usize) -> Self {
        Self {
            max_rows,
            max_depth,
        }
    }

    /// Create an unlimited budget (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_rows: usize::MAX,
            max_depth: usize::MAX,
        }
    }
}

/// Configuration for one evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Permission checked for every identity.
    pub access_kind: AccessKind,
    /// When false every identity is granted without consulting the service.
    pub enforce_access: bool,
    /// Separator substituted for an empty `join` separator.
    pub default_join_separator: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            access_kind: AccessKind::Read,
            enforce_access: true,
            default_join_separator: DEFAULT_JOIN_SEPARATOR.to_string(),
        }
    }
}

impl EvaluatorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for privileged contexts: access is never checked.
    pub fn privileged() -> Self {
        Self::default().without_access_checks()
    }

    /// Set the access kind.
    pub fn with_access_kind(mut self, kind: AccessKind) -> Self {
        self.access_kind = kind;
        self
    }

    /// Disable access checks.
    pub fn without_access_checks(mut self) -> Self {
        self.enforce_access = false;
        self
    }

    /// Set the default join separator.
    pub fn with_default_join_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_join_separator = separator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.access_kind, AccessKind::Read);
        assert!(config.enforce_access);
        assert_eq!(config.default_join_separator, ", ");

        let budget = SelectionBudget::default();
        assert_eq!(budget.max_rows, DEFAULT_MAX_ROWS);
        assert_eq!(budget.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_builder() {
        let config = EvaluatorConfig::new()
            .with_access_kind(AccessKind::Modify)
            .with_default_join_separator("|");
        assert_eq!(config.access_kind, AccessKind::Modify);
        assert_eq!(config.default_join_separator, "|");

        assert!(!EvaluatorConfig::privileged().enforce_access);
        assert_eq!(SelectionBudget::unlimited().max_rows, usize::MAX);
    }
}
