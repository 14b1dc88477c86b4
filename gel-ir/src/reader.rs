//! Reader for the textual IR
//!
//! Parses the grammar produced by `emit` and rebuilds the module through
//! `IrBuilder`, so text that parses obeys every construction rule. Blocks
//! may be referenced before their label appears; instruction results must
//! be defined above their first use. Text after `;` is a comment.

use std::collections::HashMap;

use gel_common::{FuncId, IrError};
use log::{debug, trace};
use crate::ir::{BlockRef, IrBuilder, IrType, Module, Opcode, Value};

/// Parse a module from its textual form
pub fn parse_module(text: &str) -> Result<Module, IrError> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, strip_comment(line).trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let Some(&(first_no, first)) = lines.first() else {
        return Err(IrError::parse_error(1, "expected `module <name> {`"));
    };
    let mut cursor = Cursor::new(first, first_no);
    cursor.keyword("module")?;
    let name = cursor.identifier()?;
    cursor.expect('{')?;
    cursor.end()?;
    debug!("Reading module '{name}'");

    let mut builder = IrBuilder::new(&name)?;
    let mut rest = &lines[1..];
    loop {
        let Some(&(line_no, line)) = rest.first() else {
            return Err(IrError::parse_error(first_no, "module is missing its closing `}`"));
        };
        if line == "}" {
            if let Some(&(extra_no, _)) = rest.get(1) {
                return Err(IrError::parse_error(extra_no, "unexpected text after module"));
            }
            break;
        }
        let close = rest
            .iter()
            .position(|&(_, l)| l == "}")
            .ok_or_else(|| IrError::parse_error(line_no, "function is missing its closing `}`"))?;
        read_function(&mut builder, line_no, line, &rest[1..close])?;
        rest = &rest[close + 1..];
    }

    Ok(builder.finish())
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn read_function(
    builder: &mut IrBuilder,
    line_no: usize,
    header: &str,
    body: &[(usize, &str)],
) -> Result<(), IrError> {
    let mut cursor = Cursor::new(header, line_no);
    cursor.keyword("function")?;
    let name = cursor.identifier()?;
    cursor.expect('(')?;
    let mut param_types = Vec::new();
    let mut param_names = Vec::new();
    if !cursor.eat(')') {
        loop {
            param_types.push(cursor.ty()?);
            cursor.expect('%')?;
            param_names.push(cursor.identifier()?);
            if cursor.eat(')') {
                break;
            }
            cursor.expect(',')?;
        }
    }
    cursor.expect_str("->")?;
    let return_type = cursor.ty()?;
    cursor.expect('{')?;
    cursor.end()?;

    let func = builder.create_function(&name, IrType::function(return_type, param_types))?;
    let names: Vec<&str> = param_names.iter().map(String::as_str).collect();
    builder.set_param_names(func, &names)?;
    trace!("  Reading function '{name}'");

    // Labels first so branches can refer to later blocks
    for &(_, line) in body {
        if let Some(label) = line.strip_suffix(':') {
            builder.append_block(func, label.trim())?;
        }
    }

    let mut reader = FunctionReader { builder, func, results: HashMap::new() };
    let mut current = None;
    for &(line_no, line) in body {
        if let Some(label) = line.strip_suffix(':') {
            current = reader.builder.block_ref(func, label.trim());
            continue;
        }
        let block = current
            .ok_or_else(|| IrError::parse_error(line_no, "instruction outside of a block"))?;
        reader.instruction(block, line_no, line)?;
    }
    Ok(())
}

struct FunctionReader<'b> {
    builder: &'b mut IrBuilder,
    func: FuncId,
    /// Textual result number to value
    results: HashMap<u32, Value>,
}

impl FunctionReader<'_> {
    fn instruction(&mut self, block: BlockRef, line_no: usize, line: &str) -> Result<(), IrError> {
        let mut cursor = Cursor::new(line, line_no);
        let slot = if cursor.eat('%') {
            let slot = cursor.number()?;
            let slot = u32::try_from(slot).map_err(|_| cursor.error("result number out of range"))?;
            cursor.expect('=')?;
            Some(slot)
        } else {
            None
        };

        let mnemonic = cursor.word();
        let opcode = Opcode::from_mnemonic(&mnemonic)
            .ok_or_else(|| cursor.error(format!("unknown opcode `{mnemonic}`")))?;

        let mut operands = Vec::new();
        if opcode == Opcode::Ret && cursor.try_keyword("void") {
            cursor.end()?;
        } else if !cursor.at_end() {
            loop {
                operands.push(self.operand(&mut cursor)?);
                if cursor.at_end() {
                    break;
                }
                cursor.expect(',')?;
            }
        }

        let result = self.builder.append_instruction(block, opcode, operands)?;
        match (slot, result) {
            (Some(slot), Some(value)) => {
                if self.results.insert(slot, value).is_some() {
                    return Err(cursor.error(format!("%{slot} is defined more than once")));
                }
            }
            (Some(_), None) => return Err(cursor.error(format!("`{opcode}` does not produce a value"))),
            (None, Some(_)) => return Err(cursor.error(format!("result of `{opcode}` must be named"))),
            (None, None) => {}
        }
        Ok(())
    }

    fn operand(&self, cursor: &mut Cursor<'_>) -> Result<Value, IrError> {
        if cursor.try_keyword("label") {
            cursor.expect('%')?;
            let name = cursor.identifier()?;
            return self
                .builder
                .block_ref(self.func, &name)
                .map(|b| b.value())
                .ok_or_else(|| cursor.error(format!("unknown block '{name}'")));
        }
        if cursor.eat('%') {
            if cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
                let slot = cursor.number()?;
                return u32::try_from(slot)
                    .ok()
                    .and_then(|slot| self.results.get(&slot))
                    .cloned()
                    .ok_or_else(|| cursor.error(format!("%{slot} is not defined")));
            }
            let name = cursor.identifier()?;
            let function = self.builder.function(self.func)?;
            return function
                .param_index(&name)
                .and_then(|i| function.param_value(i))
                .ok_or_else(|| cursor.error(format!("unknown parameter %{name}")));
        }
        let ty = cursor.ty()?;
        let value = cursor.number()?;
        Value::constant(ty, value)
    }
}

/// Character cursor over one line
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self { text, pos: 0, line }
    }

    fn error(&self, message: impl Into<String>) -> IrError {
        IrError::parse_error(self.line, message)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn end(&mut self) -> Result<(), IrError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error(format!("unexpected `{}`", self.rest()))),
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), IrError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    fn expect_str(&mut self, s: &str) -> Result<(), IrError> {
        self.skip_ws();
        if self.rest().starts_with(s) {
            self.pos += s.len();
            Ok(())
        } else {
            Err(self.error(format!("expected `{s}`")))
        }
    }

    /// Run of identifier characters, possibly empty
    fn word(&mut self) -> String {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn identifier(&mut self) -> Result<String, IrError> {
        let word = self.word();
        if gel_common::is_valid_identifier(&word) {
            Ok(word)
        } else {
            Err(self.error(format!("expected identifier, found `{word}`")))
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        if self.word() == keyword {
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), IrError> {
        if self.try_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{keyword}`")))
        }
    }

    /// Optionally negative decimal integer
    fn number(&mut self) -> Result<i128, IrError> {
        self.skip_ws();
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let digits = rest[sign..].find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len() - sign);
        if digits == 0 {
            return Err(self.error("expected integer"));
        }
        let literal = &rest[..sign + digits];
        self.pos += literal.len();
        literal
            .parse()
            .map_err(|_| self.error(format!("integer `{literal}` out of range")))
    }

    /// `void`, `label`, `iN`, then any number of `*` and `(params)` suffixes
    fn ty(&mut self) -> Result<IrType, IrError> {
        let word = self.word();
        let mut ty = match word.as_str() {
            "void" => IrType::Void,
            "label" => IrType::Label,
            _ => {
                let bits = word
                    .strip_prefix('i')
                    .and_then(|bits| bits.parse::<u32>().ok())
                    .ok_or_else(|| self.error(format!("expected type, found `{word}`")))?;
                IrType::int(bits).map_err(|e| self.error(e.to_string()))?
            }
        };
        loop {
            if self.eat('*') {
                ty = IrType::ptr(ty);
            } else if self.eat('(') {
                let mut params = Vec::new();
                if !self.eat(')') {
                    loop {
                        params.push(self.ty()?);
                        if self.eat(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                ty = IrType::function(ty, params);
            } else {
                return Ok(ty);
            }
        }
    }
}
