//! IR Builder
//!
//! Provides the only mutation API for modules. Every call either applies
//! completely or returns an error and leaves the module untouched.

use gel_common::{is_valid_identifier, FuncId, IrError, LabelId, NameKind};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use crate::ir::{
    validate_operands, BasicBlock, Function, Instruction, IrType, Module, Opcode, Value,
};

/// Handle to a block of a function under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub func: FuncId,
    pub block: LabelId,
}

impl BlockRef {
    /// Operand value referring to this block
    pub fn value(&self) -> Value {
        Value::Block(self.block)
    }
}

/// Builder for constructing IR
#[derive(Debug, Clone)]
pub struct IrBuilder {
    module: Module,
}

fn check_name(kind: NameKind, name: &str) -> Result<(), IrError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(IrError::InvalidName { kind, name: name.to_string() })
    }
}

/// Parameters and return values must be first-class
fn is_first_class(ty: &IrType) -> bool {
    ty.is_integer() || ty.is_pointer()
}

impl IrBuilder {
    /// Start a fresh, empty module
    pub fn new(module_name: &str) -> Result<Self, IrError> {
        check_name(NameKind::Module, module_name)?;
        debug!("Creating module '{module_name}'");
        Ok(Self { module: Module::new(module_name.to_string()) })
    }

    /// Continue building an existing module.
    ///
    /// Result counters are raised past every id already in use, so modules
    /// loaded without them never hand out a duplicate id.
    pub fn from_module(mut module: Module) -> Self {
        for function in &mut module.functions {
            function.next_temp = function.next_temp.max(function.result_high_water());
        }
        Self { module }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn function(&self, func: FuncId) -> Result<&Function, IrError> {
        self.module
            .functions
            .get(func as usize)
            .ok_or(IrError::UnknownFunction { id: func })
    }

    fn function_mut(&mut self, func: FuncId) -> Result<&mut Function, IrError> {
        self.module
            .functions
            .get_mut(func as usize)
            .ok_or(IrError::UnknownFunction { id: func })
    }

    /// Add a function; its parameters are created from `signature`
    pub fn create_function(&mut self, name: &str, signature: IrType) -> Result<FuncId, IrError> {
        check_name(NameKind::Function, name)?;
        if self.module.get_function(name).is_some() {
            return Err(IrError::DuplicateName { kind: NameKind::Function, name: name.to_string() });
        }

        let (return_type, param_types) = signature.function_parts().ok_or_else(|| IrError::TypeMismatch {
            context: format!("function '{name}' signature"),
            index: 0,
            expected: "function type".to_string(),
            found: signature.to_string(),
        })?;
        signature.check_widths()?;
        if !(return_type.is_void() || is_first_class(return_type)) {
            return Err(IrError::TypeMismatch {
                context: format!("function '{name}' return type"),
                index: 0,
                expected: "void, integer or pointer".to_string(),
                found: return_type.to_string(),
            });
        }
        if let Some((index, ty)) = param_types.iter().enumerate().find(|(_, ty)| !is_first_class(ty)) {
            return Err(IrError::TypeMismatch {
                context: format!("function '{name}' parameter"),
                index,
                expected: "integer or pointer".to_string(),
                found: ty.to_string(),
            });
        }

        let id = self.module.functions.len() as FuncId;
        debug!("Creating function '{name}' with signature {signature}");
        self.module.functions.push(Function::new(name.to_string(), signature));
        Ok(id)
    }

    /// All parameter values of `func`, in declaration order
    pub fn params(&self, func: FuncId) -> Result<Vec<Value>, IrError> {
        Ok(self.function(func)?.param_values())
    }

    pub fn param(&self, func: FuncId, index: usize) -> Result<Value, IrError> {
        let function = self.function(func)?;
        function.param_value(index).ok_or_else(|| IrError::ParamIndex {
            function: function.name.clone(),
            index,
        })
    }

    /// Rename a parameter; names stay unique within the function
    pub fn set_param_name(&mut self, func: FuncId, index: usize, name: &str) -> Result<(), IrError> {
        check_name(NameKind::Parameter, name)?;
        let function = self.function_mut(func)?;
        if function.param_index(name).is_some_and(|existing| existing != index) {
            return Err(IrError::DuplicateName { kind: NameKind::Parameter, name: name.to_string() });
        }
        let function_name = function.name.clone();
        let param = function
            .parameters
            .get_mut(index)
            .ok_or(IrError::ParamIndex { function: function_name, index })?;
        param.name = name.to_string();
        Ok(())
    }

    /// Rename all parameters at once, in declaration order
    pub fn set_param_names(&mut self, func: FuncId, names: &[&str]) -> Result<(), IrError> {
        let function = self.function_mut(func)?;
        if names.len() != function.parameters.len() {
            return Err(IrError::ParamIndex {
                function: function.name.clone(),
                index: names.len().min(function.parameters.len()),
            });
        }
        for (i, name) in names.iter().enumerate() {
            check_name(NameKind::Parameter, name)?;
            if names[..i].contains(name) {
                return Err(IrError::DuplicateName { kind: NameKind::Parameter, name: name.to_string() });
            }
        }
        for (param, name) in function.parameters.iter_mut().zip(names) {
            param.name = name.to_string();
        }
        Ok(())
    }

    /// Append a new block; the first block of a function is its entry
    pub fn append_block(&mut self, func: FuncId, name: &str) -> Result<BlockRef, IrError> {
        check_name(NameKind::Block, name)?;
        let function = self.function_mut(func)?;
        if function.block_by_name(name).is_some() {
            return Err(IrError::DuplicateName { kind: NameKind::Block, name: name.to_string() });
        }
        let block = function.blocks.len() as LabelId;
        trace!("  Appending block '{name}' (#{block}) to '{}'", function.name);
        function.blocks.push(BasicBlock::new(block, name.to_string()));
        Ok(BlockRef { func, block })
    }

    /// Find a block of `func` by name
    pub fn block_ref(&self, func: FuncId, name: &str) -> Option<BlockRef> {
        let function = self.function(func).ok()?;
        function.block_by_name(name).map(|b| BlockRef { func, block: b.id })
    }

    /// Append an instruction to `block`.
    ///
    /// Returns the result value for opcodes that produce one.
    pub fn append_instruction(
        &mut self,
        block: BlockRef,
        opcode: Opcode,
        operands: Vec<Value>,
    ) -> Result<Option<Value>, IrError> {
        let function = self.function_mut(block.func)?;
        let function_name = function.name.clone();
        let target = function.get_block(block.block).ok_or_else(|| IrError::UnknownBlock {
            function: function_name.clone(),
            block: block.block,
        })?;
        if target.has_terminator() {
            return Err(IrError::TerminatedBlock {
                function: function_name,
                block: target.name.clone(),
            });
        }

        let result_type = validate_operands(opcode, &operands)?;
        check_ownership(function, block.block, &operands)?;
        if opcode == Opcode::Ret {
            check_return(function, &operands)?;
        }

        let result = result_type.map(|ty| {
            let id = function.next_temp;
            function.next_temp += 1;
            Value::Temp { ty, id }
        });
        let instr = Instruction { opcode, operands, result: result.clone() };
        trace!("  Appending {opcode} to block #{} of '{function_name}'", block.block);
        function
            .get_block_mut(block.block)
            .ok_or(IrError::UnknownBlock { function: function_name, block: block.block })?
            .add_instruction(instr);
        Ok(result)
    }

    /// Append a value-producing instruction
    fn append_value(&mut self, block: BlockRef, opcode: Opcode, operands: Vec<Value>) -> Result<Value, IrError> {
        self.append_instruction(block, opcode, operands)?
            .ok_or_else(|| IrError::NoResult { opcode: opcode.to_string() })
    }

    /// Integer arithmetic, bitwise or comparison instruction
    pub fn build_binary(&mut self, block: BlockRef, opcode: Opcode, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        if opcode.is_terminator() || matches!(opcode, Opcode::Load | Opcode::Store) {
            return Err(IrError::NoResult { opcode: opcode.to_string() });
        }
        self.append_value(block, opcode, vec![lhs, rhs])
    }

    pub fn build_add(&mut self, block: BlockRef, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(block, Opcode::Add, lhs, rhs)
    }

    pub fn build_sub(&mut self, block: BlockRef, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(block, Opcode::Sub, lhs, rhs)
    }

    pub fn build_mul(&mut self, block: BlockRef, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        self.build_binary(block, Opcode::Mul, lhs, rhs)
    }

    /// Comparison producing an `i1`
    pub fn build_cmp(&mut self, block: BlockRef, opcode: Opcode, lhs: Value, rhs: Value) -> Result<Value, IrError> {
        if !opcode.is_comparison() {
            return Err(IrError::TypeMismatch {
                context: "comparison".to_string(),
                index: 0,
                expected: "comparison opcode".to_string(),
                found: opcode.to_string(),
            });
        }
        self.build_binary(block, opcode, lhs, rhs)
    }

    pub fn build_load(&mut self, block: BlockRef, ptr: Value) -> Result<Value, IrError> {
        self.append_value(block, Opcode::Load, vec![ptr])
    }

    pub fn build_store(&mut self, block: BlockRef, value: Value, ptr: Value) -> Result<(), IrError> {
        self.append_instruction(block, Opcode::Store, vec![value, ptr])?;
        Ok(())
    }

    pub fn build_ret(&mut self, block: BlockRef, value: Value) -> Result<(), IrError> {
        self.append_instruction(block, Opcode::Ret, vec![value])?;
        Ok(())
    }

    pub fn build_ret_void(&mut self, block: BlockRef) -> Result<(), IrError> {
        self.append_instruction(block, Opcode::Ret, Vec::new())?;
        Ok(())
    }

    pub fn build_br(&mut self, block: BlockRef, target: BlockRef) -> Result<(), IrError> {
        self.check_same_function(block, &[target], 0)?;
        self.append_instruction(block, Opcode::Br, vec![target.value()])?;
        Ok(())
    }

    pub fn build_cond_br(
        &mut self,
        block: BlockRef,
        condition: Value,
        then_block: BlockRef,
        else_block: BlockRef,
    ) -> Result<(), IrError> {
        self.check_same_function(block, &[then_block, else_block], 1)?;
        self.append_instruction(
            block,
            Opcode::CondBr,
            vec![condition, then_block.value(), else_block.value()],
        )?;
        Ok(())
    }

    /// `first_operand` is the operand index of the first target
    fn check_same_function(&self, block: BlockRef, targets: &[BlockRef], first_operand: usize) -> Result<(), IrError> {
        let function = self.function(block.func)?;
        match targets.iter().position(|t| t.func != block.func) {
            Some(i) => Err(IrError::ForeignValue {
                function: function.name.clone(),
                index: first_operand + i,
            }),
            None => Ok(()),
        }
    }

    /// Whether `block` already ends in a terminator
    pub fn block_has_terminator(&self, block: BlockRef) -> bool {
        self.function(block.func)
            .ok()
            .and_then(|f| f.get_block(block.block))
            .is_some_and(BasicBlock::has_terminator)
    }
}

/// Operands must name parameters, results and blocks of `function` itself.
///
/// A result must be defined in `block` or in a block before it, so every
/// use follows its definition in text order.
fn check_ownership(function: &Function, block: LabelId, operands: &[Value]) -> Result<(), IrError> {
    for (index, operand) in operands.iter().enumerate() {
        let owned = match operand {
            Value::Constant { .. } => true,
            Value::Param { ty, index: param } => {
                function.parameters.get(*param).is_some_and(|p| p.ty == *ty)
            }
            Value::Temp { ty, id } => match function.result_definition(*id) {
                Some((defined_in, defined)) if defined == ty => {
                    if defined_in > block as usize {
                        return Err(IrError::UseBeforeDefinition { function: function.name.clone(), index });
                    }
                    true
                }
                _ => false,
            },
            Value::Block(id) => function.get_block(*id).is_some(),
        };
        if !owned {
            return Err(IrError::ForeignValue { function: function.name.clone(), index });
        }
    }
    Ok(())
}

fn check_return(function: &Function, operands: &[Value]) -> Result<(), IrError> {
    let expected = function.return_type();
    let found = match operands.first() {
        Some(value) if value.ty() == expected => return Ok(()),
        Some(value) => value.ty().to_string(),
        None if expected.is_void() => return Ok(()),
        None => IrType::Void.to_string(),
    };
    Err(IrError::ReturnTypeMismatch {
        function: function.name.clone(),
        expected: expected.to_string(),
        found,
    })
}
