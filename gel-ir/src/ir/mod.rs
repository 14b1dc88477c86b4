//! Intermediate Representation
//! 
//! Typed functions built from basic blocks and instructions, grouped
//! into modules. Modules are only mutated through `IrBuilder`.
//! 
//! ## Architecture
//! 
//! The module is structured as follows:
//! - `types` - Type system (IrType)
//! - `values` - Value representations
//! - `ops` - Opcodes
//! - `instructions` - IR instructions and operand type contracts
//! - `blocks` - Basic block management
//! - `function` - Function definitions
//! - `module` - Module definition
//! - `builder` - IR construction

// Public exports - clean API surface
pub use self::types::{types_equal, IrType, MAX_INT_BITS, MIN_INT_BITS};
pub use self::values::{check_constant, Value};
pub use self::ops::Opcode;
pub use self::instructions::{operand_contract, validate_operands, Instruction, OperandContract};
pub use self::blocks::BasicBlock;
pub use self::function::{Function, Parameter};
pub use self::module::Module;
pub use self::builder::{BlockRef, IrBuilder};

// Internal modules
mod types;
mod values;
mod ops;
mod instructions;
mod blocks;
mod function;
mod module;
mod builder;

#[cfg(test)]
mod tests;
