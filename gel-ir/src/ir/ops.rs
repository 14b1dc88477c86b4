//! IR Operations
//!
//! Defines the opcodes available in the IR and their textual mnemonics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Arithmetic
    Add, Sub, Mul,
    SDiv, UDiv,    // Signed/unsigned division
    SRem, URem,    // Signed/unsigned remainder

    // Bitwise
    And, Or, Xor,
    Shl, LShr, AShr, // Logical/arithmetic shift right

    // Comparison (return i1)
    Eq, Ne,
    Slt, Sle, Sgt, Sge, // Signed comparisons
    Ult, Ule, Ugt, Uge, // Unsigned comparisons

    // Memory
    Load, Store,

    // Terminators
    Ret, Br, CondBr,
}

impl Opcode {
    pub const ALL: [Opcode; 28] = [
        Opcode::Add, Opcode::Sub, Opcode::Mul,
        Opcode::SDiv, Opcode::UDiv, Opcode::SRem, Opcode::URem,
        Opcode::And, Opcode::Or, Opcode::Xor,
        Opcode::Shl, Opcode::LShr, Opcode::AShr,
        Opcode::Eq, Opcode::Ne,
        Opcode::Slt, Opcode::Sle, Opcode::Sgt, Opcode::Sge,
        Opcode::Ult, Opcode::Ule, Opcode::Ugt, Opcode::Uge,
        Opcode::Load, Opcode::Store,
        Opcode::Ret, Opcode::Br, Opcode::CondBr,
    ];

    /// Textual mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::SDiv => "sdiv",
            Opcode::UDiv => "udiv",
            Opcode::SRem => "srem",
            Opcode::URem => "urem",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Slt => "slt",
            Opcode::Sle => "sle",
            Opcode::Sgt => "sgt",
            Opcode::Sge => "sge",
            Opcode::Ult => "ult",
            Opcode::Ule => "ule",
            Opcode::Ugt => "ugt",
            Opcode::Uge => "uge",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::CondBr => "condbr",
        }
    }

    /// Look up an opcode by its mnemonic
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == s)
    }

    /// Ret, Br and CondBr end a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Ret | Opcode::Br | Opcode::CondBr)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Opcode::Eq | Opcode::Ne
                | Opcode::Slt | Opcode::Sle | Opcode::Sgt | Opcode::Sge
                | Opcode::Ult | Opcode::Ule | Opcode::Ugt | Opcode::Uge
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
