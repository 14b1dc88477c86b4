//! Module Definition
//! 
//! Defines the top-level module: a named, ordered list of functions.

use gel_common::FuncId;
use serde::{Deserialize, Serialize};
use crate::ir::Function;

/// IR Module - represents a complete compilation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: String) -> Self {
        Self {
            name,
            functions: Vec::new(),
        }
    }
    
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.functions.iter().position(|f| f.name == name).map(|i| i as FuncId)
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id as usize)
    }
}
