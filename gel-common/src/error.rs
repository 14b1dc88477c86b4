//! Error handling for the Gelleau IR
//!
//! `IrError` covers every construction-time and pre-condition violation.
//! Verification results are not errors: they are reported as `Finding`s so
//! the caller decides what is fatal.

use crate::types::{FuncId, LabelId, NameKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised synchronously by the builder, emitter and reader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("invalid integer width {bits}: must be within 1..=128")]
    InvalidWidth { bits: u32 },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: NameKind, name: String },

    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: NameKind, name: String },

    #[error("block '{block}' in function '{function}' already ends in a terminator")]
    TerminatedBlock { function: String, block: String },

    #[error("type mismatch in {context} operand {index}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("`{opcode}` expects {expected} operand(s), found {found}")]
    OperandCount {
        opcode: String,
        expected: usize,
        found: usize,
    },

    #[error("ret in '{function}' returns {found}, but the function returns {expected}")]
    ReturnTypeMismatch {
        function: String,
        expected: String,
        found: String,
    },

    #[error("`{opcode}` does not produce a value")]
    NoResult { opcode: String },

    #[error("constant {value} does not fit in {ty}")]
    ConstantOutOfRange { value: i128, ty: String },

    #[error("operand {index} does not belong to function '{function}'")]
    ForeignValue { function: String, index: usize },

    #[error("operand {index} is used before its definition in function '{function}'")]
    UseBeforeDefinition { function: String, index: usize },

    #[error("unknown function #{id}")]
    UnknownFunction { id: FuncId },

    #[error("unknown block #{block} in function '{function}'")]
    UnknownBlock { function: String, block: LabelId },

    #[error("function '{function}' has no parameter {index}")]
    ParamIndex { function: String, index: usize },

    #[error("module '{module}' failed verification with {errors} error(s), first: {first}")]
    UnverifiedModule {
        module: String,
        errors: usize,
        first: String,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl IrError {
    /// Create a parse error
    pub fn parse_error(line: usize, message: impl Into<String>) -> Self {
        IrError::Parse { line, message: message.into() }
    }
}

/// Finding severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Where in a module a finding applies.
///
/// Unset fields mean the finding is about the enclosing entity. Ordering is
/// function, then block, then instruction, with module-level findings first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub function: Option<usize>,
    pub block: Option<usize>,
    pub instruction: Option<usize>,
}

impl Location {
    pub fn module() -> Self {
        Self::default()
    }

    pub fn function(function: usize) -> Self {
        Self { function: Some(function), ..Self::default() }
    }

    pub fn block(function: usize, block: usize) -> Self {
        Self { function: Some(function), block: Some(block), instruction: None }
    }

    pub fn instruction(function: usize, block: usize, instruction: usize) -> Self {
        Self {
            function: Some(function),
            block: Some(block),
            instruction: Some(instruction),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.function, self.block, self.instruction) {
            (None, _, _) => write!(f, "module"),
            (Some(func), None, _) => write!(f, "fn#{func}"),
            (Some(func), Some(block), None) => write!(f, "fn#{func}/bb#{block}"),
            (Some(func), Some(block), Some(inst)) => write!(f, "fn#{func}/bb#{block}/inst#{inst}"),
        }
    }
}

/// A single verification finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Finding {
    pub fn error(message: String, location: Location) -> Self {
        Self { severity: Severity::Error, message, location }
    }

    pub fn warning(message: String, location: Location) -> Self {
        Self { severity: Severity::Warning, message, location }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_creation() {
        let finding = Finding::error("missing terminator".to_string(), Location::block(0, 1));
        assert!(finding.is_error());
        assert_eq!(finding.to_string(), "error [fn#0/bb#1]: missing terminator");

        let warning = Finding::warning("unreachable".to_string(), Location::block(2, 0));
        assert!(!warning.is_error());
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn test_location_ordering() {
        let mut locations = vec![
            Location::instruction(1, 0, 2),
            Location::block(0, 3),
            Location::module(),
            Location::instruction(0, 3, 0),
            Location::function(1),
        ];
        locations.sort();
        assert_eq!(locations, vec![
            Location::module(),
            Location::block(0, 3),
            Location::instruction(0, 3, 0),
            Location::function(1),
            Location::instruction(1, 0, 2),
        ]);
    }

    #[test]
    fn test_error_messages() {
        let err = IrError::TypeMismatch {
            context: "add".to_string(),
            index: 1,
            expected: "i64".to_string(),
            found: "i32".to_string(),
        };
        assert_eq!(err.to_string(), "type mismatch in add operand 1: expected i64, found i32");

        let err = IrError::DuplicateName { kind: NameKind::Block, name: "entry".to_string() };
        assert_eq!(err.to_string(), "duplicate block name 'entry'");
    }
}
