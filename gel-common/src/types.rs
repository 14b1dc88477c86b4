//! Identifiers and naming rules shared across the IR
//!
//! Functions, blocks and instruction results are addressed by small
//! integer ids; named entities follow a single identifier grammar so that
//! the textual form can always be read back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Function identifier (position of the function in its module)
pub type FuncId = u32;

/// Basic block identifier (position of the block in its function)
pub type LabelId = u32;

/// Instruction result identifier, numbered per function
pub type TempId = u32;

/// What kind of entity a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    Module,
    Function,
    Block,
    Parameter,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Module => write!(f, "module"),
            NameKind::Function => write!(f, "function"),
            NameKind::Block => write!(f, "block"),
            NameKind::Parameter => write!(f, "parameter"),
        }
    }
}

/// Check a module, function, block or parameter name.
///
/// Names start with an ASCII letter, `_` or `.` and continue with ASCII
/// alphanumerics, `_`, `.` or `-`. A leading digit is rejected so names can
/// never be confused with numbered temporaries.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
