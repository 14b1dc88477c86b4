//! IR Instructions
//!
//! An instruction is an opcode, an ordered list of operand values and an
//! optional result value. Each opcode has an operand type contract that is
//! checked here, independently of any function or block.

use gel_common::{IrError, LabelId};
use serde::{Deserialize, Serialize};
use crate::ir::{IrType, Opcode, Value};

/// Operand type contract of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandContract {
    /// `T, T -> T` for an integer type T
    IntBinary,
    /// `T, T -> i1` for an integer type T
    IntCompare,
    /// `T* -> T`
    Load,
    /// `T, T* -> ()`
    Store,
    /// `() -> ()` or `T -> ()`; T must match the function return type
    Return,
    /// `label -> ()`
    Branch,
    /// `i1, label, label -> ()`
    CondBranch,
}

impl OperandContract {
    /// Exact operand count, `None` for `ret` which takes zero or one
    pub fn arity(&self) -> Option<usize> {
        match self {
            OperandContract::IntBinary | OperandContract::IntCompare | OperandContract::Store => Some(2),
            OperandContract::Load | OperandContract::Branch => Some(1),
            OperandContract::CondBranch => Some(3),
            OperandContract::Return => None,
        }
    }
}

/// Expected operand types of `opcode`
pub fn operand_contract(opcode: Opcode) -> OperandContract {
    match opcode {
        Opcode::Add | Opcode::Sub | Opcode::Mul
        | Opcode::SDiv | Opcode::UDiv | Opcode::SRem | Opcode::URem
        | Opcode::And | Opcode::Or | Opcode::Xor
        | Opcode::Shl | Opcode::LShr | Opcode::AShr => OperandContract::IntBinary,
        Opcode::Eq | Opcode::Ne
        | Opcode::Slt | Opcode::Sle | Opcode::Sgt | Opcode::Sge
        | Opcode::Ult | Opcode::Ule | Opcode::Ugt | Opcode::Uge => OperandContract::IntCompare,
        Opcode::Load => OperandContract::Load,
        Opcode::Store => OperandContract::Store,
        Opcode::Ret => OperandContract::Return,
        Opcode::Br => OperandContract::Branch,
        Opcode::CondBr => OperandContract::CondBranch,
    }
}

fn mismatch(opcode: Opcode, index: usize, expected: impl ToString, found: &IrType) -> IrError {
    IrError::TypeMismatch {
        context: opcode.to_string(),
        index,
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Check `operands` against the contract of `opcode`.
///
/// Returns the type of the value the instruction produces, or `None` for
/// opcodes without a result.
pub fn validate_operands(opcode: Opcode, operands: &[Value]) -> Result<Option<IrType>, IrError> {
    let contract = operand_contract(opcode);
    match contract.arity() {
        Some(expected) if operands.len() != expected => {
            return Err(IrError::OperandCount {
                opcode: opcode.to_string(),
                expected,
                found: operands.len(),
            });
        }
        None if operands.len() > 1 => {
            return Err(IrError::OperandCount {
                opcode: opcode.to_string(),
                expected: 1,
                found: operands.len(),
            });
        }
        _ => {}
    }

    match contract {
        OperandContract::IntBinary | OperandContract::IntCompare => {
            let lhs = operands[0].ty();
            if !lhs.is_integer() {
                return Err(mismatch(opcode, 0, "integer", lhs));
            }
            let rhs = operands[1].ty();
            if rhs != lhs {
                return Err(mismatch(opcode, 1, lhs, rhs));
            }
            if contract == OperandContract::IntCompare {
                Ok(Some(IrType::i1()))
            } else {
                Ok(Some(lhs.clone()))
            }
        }
        OperandContract::Load => {
            let ptr = operands[0].ty();
            match ptr.pointee() {
                Some(pointee) if pointee.is_integer() || pointee.is_pointer() => Ok(Some(pointee.clone())),
                _ => Err(mismatch(opcode, 0, "pointer to integer or pointer", ptr)),
            }
        }
        OperandContract::Store => {
            let ptr = operands[1].ty();
            let pointee = match ptr.pointee() {
                Some(pointee) if pointee.is_integer() || pointee.is_pointer() => pointee,
                _ => return Err(mismatch(opcode, 1, "pointer to integer or pointer", ptr)),
            };
            let value = operands[0].ty();
            if value != pointee {
                return Err(mismatch(opcode, 0, pointee, value));
            }
            Ok(None)
        }
        OperandContract::Return => {
            if let Some(value) = operands.first() {
                let ty = value.ty();
                if !(ty.is_integer() || ty.is_pointer()) {
                    return Err(mismatch(opcode, 0, "integer or pointer", ty));
                }
            }
            Ok(None)
        }
        OperandContract::Branch => {
            let target = operands[0].ty();
            if *target != IrType::Label {
                return Err(mismatch(opcode, 0, IrType::Label, target));
            }
            Ok(None)
        }
        OperandContract::CondBranch => {
            let cond = operands[0].ty();
            if *cond != IrType::i1() {
                return Err(mismatch(opcode, 0, IrType::i1(), cond));
            }
            for (index, target) in operands.iter().enumerate().skip(1) {
                if *target.ty() != IrType::Label {
                    return Err(mismatch(opcode, index, IrType::Label, target.ty()));
                }
            }
            Ok(None)
        }
    }
}

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Value>,
    /// Result value, always a `Value::Temp`
    pub result: Option<Value>,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    /// Blocks control may transfer to after this instruction
    pub fn successors(&self) -> impl Iterator<Item = LabelId> + '_ {
        let targets: &[Value] = if self.is_terminator() { &self.operands } else { &[] };
        targets.iter().filter_map(Value::as_block)
    }
}
