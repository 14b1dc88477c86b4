//! IR Value Representations
//!
//! Defines values that can be used as operands in IR instructions:
//! integer constants, function parameters, instruction results and
//! block references. Every value carries its type.

use gel_common::{IrError, LabelId, TempId};
use serde::{Deserialize, Serialize};
use crate::ir::IrType;

static LABEL_TYPE: IrType = IrType::Label;

/// IR Value - represents operands in IR instructions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Constant integer
    Constant { ty: IrType, value: i128 },

    /// Parameter of the function the value is used in
    Param { ty: IrType, index: usize },

    /// Result of an instruction in the same function
    Temp { ty: IrType, id: TempId },

    /// Basic block of the same function (branch target)
    Block(LabelId),
}

impl Value {
    /// Integer constant; the literal must fit `ty` as a signed or unsigned number
    pub fn constant(ty: IrType, value: i128) -> Result<Self, IrError> {
        check_constant(&ty, value)?;
        Ok(Value::Constant { ty, value })
    }

    /// 64-bit integer constant
    pub fn i64(value: i64) -> Self {
        Value::Constant { ty: IrType::i64(), value: value.into() }
    }

    /// 32-bit integer constant
    pub fn i32(value: i32) -> Self {
        Value::Constant { ty: IrType::i32(), value: value.into() }
    }

    /// Boolean constant
    pub fn bool(value: bool) -> Self {
        Value::Constant { ty: IrType::i1(), value: value.into() }
    }

    pub fn param(ty: IrType, index: usize) -> Self {
        Value::Param { ty, index }
    }

    pub fn temp(ty: IrType, id: TempId) -> Self {
        Value::Temp { ty, id }
    }

    pub fn block(id: LabelId) -> Self {
        Value::Block(id)
    }

    /// Type of this value
    pub fn ty(&self) -> &IrType {
        match self {
            Value::Constant { ty, .. } | Value::Param { ty, .. } | Value::Temp { ty, .. } => ty,
            Value::Block(_) => &LABEL_TYPE,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant { .. })
    }

    /// Block id when this value is a branch target
    pub fn as_block(&self) -> Option<LabelId> {
        match self {
            Value::Block(id) => Some(*id),
            _ => None,
        }
    }
}

/// Check that `value` is a valid literal of integer type `ty`
pub fn check_constant(ty: &IrType, value: i128) -> Result<(), IrError> {
    let bits = match ty {
        IrType::Int(bits) => *bits,
        other => {
            return Err(IrError::TypeMismatch {
                context: "constant".to_string(),
                index: 0,
                expected: "integer".to_string(),
                found: other.to_string(),
            })
        }
    };
    ty.check_widths()?;
    if bits >= 128 {
        return Ok(());
    }
    // Signed minimum through unsigned maximum
    let min = -(1i128 << (bits - 1));
    let max = if bits == 127 { i128::MAX } else { (1i128 << bits) - 1 };
    if value < min || value > max {
        return Err(IrError::ConstantOutOfRange { value, ty: ty.to_string() });
    }
    Ok(())
}
