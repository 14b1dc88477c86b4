//! Function Definitions
//! 
//! Defines IR functions with their signature, parameters and blocks.

use gel_common::{LabelId, TempId};
use serde::{Deserialize, Serialize};
use crate::ir::{BasicBlock, IrType, Value};

static VOID_TYPE: IrType = IrType::Void;

/// Named function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: IrType,
}

/// Function in IR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Always an `IrType::Function`
    pub signature: IrType,
    pub parameters: Vec<Parameter>,
    pub blocks: Vec<BasicBlock>,
    /// Next free result id
    #[serde(default)]
    pub next_temp: TempId,
}

impl Function {
    /// New function with one parameter per entry of the signature.
    ///
    /// Parameters are named `arg0`, `arg1`, ... until renamed.
    pub fn new(name: String, signature: IrType) -> Self {
        let parameters = signature
            .function_parts()
            .map(|(_, params)| {
                params
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| Parameter { name: format!("arg{i}"), ty: ty.clone() })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name,
            signature,
            parameters,
            blocks: Vec::new(),
            next_temp: 0,
        }
    }

    pub fn return_type(&self) -> &IrType {
        self.signature
            .function_parts()
            .map(|(ret, _)| ret)
            .unwrap_or(&VOID_TYPE)
    }

    /// A function without blocks is a declaration
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Value of the parameter at `index`
    pub fn param_value(&self, index: usize) -> Option<Value> {
        self.parameters.get(index).map(|p| Value::param(p.ty.clone(), index))
    }

    pub fn param_values(&self) -> Vec<Value> {
        (0..self.parameters.len()).filter_map(|i| self.param_value(i)).collect()
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
    
    /// Block position and type of the instruction producing result `id`
    pub fn result_definition(&self, id: TempId) -> Option<(usize, &IrType)> {
        self.blocks.iter().enumerate().find_map(|(bi, block)| {
            block.instructions.iter().find_map(|instr| match &instr.result {
                Some(Value::Temp { ty, id: defined }) if *defined == id => Some((bi, ty)),
                _ => None,
            })
        })
    }

    /// One past the highest result id in use
    pub fn result_high_water(&self) -> TempId {
        self.blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .filter_map(|instr| match instr.result {
                Some(Value::Temp { id, .. }) => Some(id.saturating_add(1)),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn get_block(&self, id: LabelId) -> Option<&BasicBlock> {
        self.blocks.get(id as usize)
    }
    
    pub(crate) fn get_block_mut(&mut self, id: LabelId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id as usize)
    }

    pub fn block_by_name(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }
    
    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }
}
