//! Basic Block Management
//! 
//! Defines basic blocks - sequences of instructions with single entry/exit points.

use gel_common::LabelId;
use serde::{Deserialize, Serialize};
use crate::ir::Instruction;

/// Basic Block - a sequence of instructions ending in one terminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: LabelId,
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(id: LabelId, name: String) -> Self {
        Self {
            id,
            name,
            instructions: Vec::new(),
        }
    }
    
    pub(crate) fn add_instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }
    
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
    
    pub fn has_terminator(&self) -> bool {
        self.instructions.last().is_some_and(Instruction::is_terminator)
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|instr| instr.is_terminator())
    }

    /// Successor blocks named by the terminator, in operand order
    pub fn successors(&self) -> Vec<LabelId> {
        self.terminator()
            .map(|term| term.successors().collect())
            .unwrap_or_default()
    }
}
