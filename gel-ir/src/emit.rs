//! Textual Emitter
//!
//! Renders a verified module in a fixed grammar:
//!
//! ```text
//! module <name> {
//!   function <name>(<type> %<param>, ...) -> <type> {
//!   <block>:
//!     %<n> = <opcode> <operand>, <operand>
//!     ret <operand>
//!   }
//! }
//! ```
//!
//! Operands are `%<param>`, `%<n>` for instruction results, `<type> <literal>`
//! for constants and `label %<block>` for branch targets. Results are numbered
//! from zero per function in the order they appear in the text, so the output
//! depends only on the module's structure. Functions are separated by a blank
//! line and the text ends in a newline.

use std::collections::HashMap;
use std::fmt;

use gel_common::{IrError, TempId};
use log::debug;
use crate::ir::{Function, Instruction, Module, Opcode, Value};
use crate::verifier::verify;

/// Render `module` after checking it has no error-level findings
pub fn emit(module: &Module) -> Result<String, IrError> {
    let result = verify(module);
    if result.has_errors() {
        let first = result.errors().next().map(ToString::to_string).unwrap_or_default();
        return Err(IrError::UnverifiedModule {
            module: module.name.clone(),
            errors: result.error_count(),
            first,
        });
    }
    debug!("Emitting module '{}'", module.name);
    Ok(emit_unchecked(module))
}

/// Render `module` without verifying it first.
///
/// Dangling operands are printed in a form the reader rejects.
pub fn emit_unchecked(module: &Module) -> String {
    module.display().to_string()
}

/// Serialize `module` to JSON for hand-off to other tools
pub fn to_json(module: &Module) -> Result<String, IrError> {
    serde_json::to_string_pretty(module).map_err(|e| IrError::Serialization { message: e.to_string() })
}

/// Load a module previously written by `to_json`
pub fn from_json(text: &str) -> Result<Module, IrError> {
    serde_json::from_str(text).map_err(|e| IrError::Serialization { message: e.to_string() })
}

/// Display adapter for a module
pub struct DisplayModule<'a> {
    module: &'a Module,
}

impl Module {
    pub fn display(&self) -> DisplayModule<'_> {
        DisplayModule { module: self }
    }
}

impl fmt::Display for DisplayModule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {} {{", self.module.name)?;
        for (i, function) in self.module.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write_function(f, function)?;
        }
        writeln!(f, "}}")
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, function: &Function) -> fmt::Result {
    write!(f, "  function {}(", function.name)?;
    for (i, param) in function.parameters.iter().enumerate() {
        if i > 0 { write!(f, ", ")?; }
        write!(f, "{} %{}", param.ty, param.name)?;
    }
    writeln!(f, ") -> {} {{", function.return_type())?;

    let slots = Slots::number(function);
    for block in &function.blocks {
        writeln!(f, "  {}:", block.name)?;
        for instr in &block.instructions {
            write!(f, "    ")?;
            slots.write_instruction(f, instr)?;
            writeln!(f)?;
        }
    }
    writeln!(f, "  }}")
}

/// Display numbers of instruction results, in text order
struct Slots<'a> {
    function: &'a Function,
    numbers: HashMap<TempId, usize>,
}

impl<'a> Slots<'a> {
    fn number(function: &'a Function) -> Self {
        let mut numbers = HashMap::new();
        let results = function
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .filter_map(|instr| match instr.result {
                Some(Value::Temp { id, .. }) => Some(id),
                _ => None,
            });
        for id in results {
            let next = numbers.len();
            numbers.entry(id).or_insert(next);
        }
        Self { function, numbers }
    }

    fn write_instruction(&self, f: &mut fmt::Formatter<'_>, instr: &Instruction) -> fmt::Result {
        if let Some(result) = &instr.result {
            self.write_operand(f, result)?;
            write!(f, " = ")?;
        }
        write!(f, "{}", instr.opcode)?;
        if instr.opcode == Opcode::Ret && instr.operands.is_empty() {
            return write!(f, " void");
        }
        for (i, operand) in instr.operands.iter().enumerate() {
            write!(f, "{}", if i == 0 { " " } else { ", " })?;
            self.write_operand(f, operand)?;
        }
        Ok(())
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
        match value {
            Value::Constant { ty, value } => write!(f, "{ty} {value}"),
            Value::Param { index, .. } => match self.function.parameters.get(*index) {
                Some(param) => write!(f, "%{}", param.name),
                None => write!(f, "%<param {index}>"),
            },
            Value::Temp { id, .. } => match self.numbers.get(id) {
                Some(n) => write!(f, "%{n}"),
                None => write!(f, "%<undefined {id}>"),
            },
            Value::Block(id) => match self.function.get_block(*id) {
                Some(block) => write!(f, "label %{}", block.name),
                None => write!(f, "label %<block {id}>"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, IrType};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_results_numbered_in_text_order() {
        let mut builder = IrBuilder::new("order").unwrap();
        let sig = IrType::function(IrType::i32(), vec![IrType::i32()]);
        let func = builder.create_function("f", sig).unwrap();
        builder.set_param_name(func, 0, "x").unwrap();
        let entry = builder.append_block(func, "entry").unwrap();
        let exit = builder.append_block(func, "exit").unwrap();
        let x = builder.param(func, 0).unwrap();

        // Build the second block first so its result gets the lower id
        let doubled = builder.build_add(exit, x.clone(), x.clone()).unwrap();
        builder.build_ret(exit, doubled).unwrap();
        builder.build_mul(entry, x, Value::i32(3)).unwrap();
        builder.build_br(entry, exit).unwrap();

        let text = emit(&builder.finish()).unwrap();
        assert_eq!(text, "\
module order {
  function f(i32 %x) -> i32 {
  entry:
    %0 = mul %x, i32 3
    br label %exit
  exit:
    %1 = add %x, %x
    ret %1
  }
}
");
    }

    #[test]
    fn test_empty_module_and_declaration() {
        let mut builder = IrBuilder::new("decls").unwrap();
        let sig = IrType::function(IrType::Void, vec![IrType::ptr(IrType::Int(8))]);
        builder.create_function("puts", sig).unwrap();
        let text = emit(&builder.finish()).unwrap();
        assert_eq!(text, "module decls {\n  function puts(i8* %arg0) -> void {\n  }\n}\n");

        let empty = IrBuilder::new("empty").unwrap().finish();
        assert_eq!(emit(&empty).unwrap(), "module empty {\n}\n");
    }

    #[test]
    fn test_json_round_trip() {
        let mut builder = IrBuilder::new("json").unwrap();
        let sig = IrType::function(IrType::i64(), vec![]);
        let func = builder.create_function("zero", sig).unwrap();
        let entry = builder.append_block(func, "entry").unwrap();
        builder.build_ret(entry, Value::i64(0)).unwrap();
        let module = builder.finish();

        let json = to_json(&module).unwrap();
        assert_eq!(from_json(&json).unwrap(), module);
        assert!(matches!(from_json("[]"), Err(IrError::Serialization { .. })));
    }
}
