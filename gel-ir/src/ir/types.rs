//! IR Type System
//!
//! Defines the type system for the IR: integers of a given bit width,
//! pointers, and function signatures. Types are plain values compared
//! structurally.

use gel_common::IrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest and largest supported integer widths
pub const MIN_INT_BITS: u32 = 1;
pub const MAX_INT_BITS: u32 = 128;

/// IR Type system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    /// Void type (only valid as a function return type)
    Void,

    /// Integer type with bit width in 1..=128
    Int(u32),

    /// Pointer type
    Ptr(Box<IrType>),

    /// Function type
    Function {
        return_type: Box<IrType>,
        param_types: Vec<IrType>,
    },

    /// Label type (for basic block references)
    Label,
}

impl IrType {
    /// Integer type of the given width
    pub fn int(bits: u32) -> Result<Self, IrError> {
        if !(MIN_INT_BITS..=MAX_INT_BITS).contains(&bits) {
            return Err(IrError::InvalidWidth { bits });
        }
        Ok(IrType::Int(bits))
    }

    /// Boolean type used by comparisons and conditional branches
    pub fn i1() -> Self {
        IrType::Int(1)
    }

    pub fn i32() -> Self {
        IrType::Int(32)
    }

    pub fn i64() -> Self {
        IrType::Int(64)
    }

    /// Pointer to `pointee`
    pub fn ptr(pointee: IrType) -> Self {
        IrType::Ptr(Box::new(pointee))
    }

    /// Function signature; parameter order is significant
    pub fn function(return_type: IrType, param_types: Vec<IrType>) -> Self {
        IrType::Function {
            return_type: Box::new(return_type),
            param_types,
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    /// Bit width of integer types
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            IrType::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Get the pointee type for pointers
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// Split a function type into its return and parameter types
    pub fn function_parts(&self) -> Option<(&IrType, &[IrType])> {
        match self {
            IrType::Function { return_type, param_types } => Some((return_type, param_types)),
            _ => None,
        }
    }

    /// Check that every integer nested in this type has a legal width.
    ///
    /// `IrType::Int` can be built directly (or deserialized), bypassing
    /// `IrType::int`, so the verifier re-checks widths through this.
    pub fn check_widths(&self) -> Result<(), IrError> {
        match self {
            IrType::Int(bits) => IrType::int(*bits).map(|_| ()),
            IrType::Ptr(pointee) => pointee.check_widths(),
            IrType::Function { return_type, param_types } => {
                return_type.check_widths()?;
                param_types.iter().try_for_each(IrType::check_widths)
            }
            IrType::Void | IrType::Label => Ok(()),
        }
    }
}

/// Structural type equality
pub fn types_equal(a: &IrType, b: &IrType) -> bool {
    a == b
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{bits}"),
            IrType::Ptr(target) => write!(f, "{target}*"),
            IrType::Function { return_type, param_types } => {
                write!(f, "{return_type} (")?;
                for (i, param) in param_types.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }
            IrType::Label => write!(f, "label"),
        }
    }
}
