//! Module Verifier
//!
//! A read-only pass over a finished module. Problems are returned as
//! findings rather than errors so the caller chooses the policy; the
//! emitter refuses modules with any error-level finding.
//!
//! Checks run in a fixed order and the findings are then sorted stably by
//! location, so the same module always yields the same result.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use gel_common::{is_valid_identifier, Finding, Location, Severity, TempId};
use log::{debug, info};
use crate::config::VerifierConfig;
use crate::ir::{check_constant, validate_operands, Function, IrType, Module, Opcode, Value};

/// Outcome of verifying a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    /// Never empty
    Findings(Vec<Finding>),
}

impl ValidationResult {
    fn from_findings(findings: Vec<Finding>) -> Self {
        if findings.is_empty() {
            ValidationResult::Ok
        } else {
            ValidationResult::Findings(findings)
        }
    }

    /// No findings at all
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationResult::Ok)
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            ValidationResult::Ok => &[],
            ValidationResult::Findings(findings) => findings.as_slice(),
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings().iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings().iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Create a summary string
    pub fn summary(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.error_count(), self.warning_count()) {
            (0, 0) => "No errors or warnings".to_string(),
            (0, w) => format!("{w} warning{}", plural(w)),
            (e, 0) => format!("{e} error{}", plural(e)),
            (e, w) => format!("{e} error{} and {w} warning{}", plural(e), plural(w)),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in self.findings() {
            writeln!(f, "{finding}")?;
        }
        write!(f, "{}", self.summary())
    }
}

/// Verify `module` with the default configuration
pub fn verify(module: &Module) -> ValidationResult {
    verify_with(module, &VerifierConfig::default())
}

/// Verify `module` under `config`
pub fn verify_with(module: &Module, config: &VerifierConfig) -> ValidationResult {
    debug!("Verifying module '{}' ({} functions)", module.name, module.functions.len());
    let mut findings = Vec::new();

    check_names(module, &mut findings);
    for (fi, function) in module.functions.iter().enumerate() {
        check_signature(fi, function, &mut findings);
        check_structure(fi, function, &mut findings);
        check_operands(fi, function, &mut findings);
        if config.check_reachability {
            check_reachability(fi, function, &mut findings);
        }
        check_returns(fi, function, &mut findings);
    }

    if config.deny_warnings {
        for finding in &mut findings {
            finding.severity = Severity::Error;
        }
    }
    findings.sort_by_key(|f| f.location);
    if config.max_findings != 0 {
        findings.truncate(config.max_findings);
    }

    let result = ValidationResult::from_findings(findings);
    info!("Verified module '{}': {}", module.name, result.summary());
    result
}

/// Unique, well-formed function, block and parameter names
fn check_names(module: &Module, findings: &mut Vec<Finding>) {
    if !is_valid_identifier(&module.name) {
        findings.push(Finding::error(
            format!("invalid module name '{}'", module.name),
            Location::module(),
        ));
    }

    let mut function_names = HashSet::new();
    for (fi, function) in module.functions.iter().enumerate() {
        if !is_valid_identifier(&function.name) {
            findings.push(Finding::error(
                format!("invalid function name '{}'", function.name),
                Location::function(fi),
            ));
        }
        if !function_names.insert(function.name.as_str()) {
            findings.push(Finding::error(
                format!("duplicate function name '{}'", function.name),
                Location::function(fi),
            ));
        }

        let mut param_names = HashSet::new();
        for param in &function.parameters {
            if !is_valid_identifier(&param.name) || !param_names.insert(param.name.as_str()) {
                findings.push(Finding::error(
                    format!("invalid or duplicate parameter name '{}' in '{}'", param.name, function.name),
                    Location::function(fi),
                ));
            }
        }

        let mut block_names = HashSet::new();
        for (bi, block) in function.blocks.iter().enumerate() {
            if !is_valid_identifier(&block.name) {
                findings.push(Finding::error(
                    format!("invalid block name '{}'", block.name),
                    Location::block(fi, bi),
                ));
            }
            if !block_names.insert(block.name.as_str()) {
                findings.push(Finding::error(
                    format!("duplicate block name '{}' in '{}'", block.name, function.name),
                    Location::block(fi, bi),
                ));
            }
        }
    }
}

/// Signature is a function type whose parameters match the parameter list
fn check_signature(fi: usize, function: &Function, findings: &mut Vec<Finding>) {
    let Some((_, param_types)) = function.signature.function_parts() else {
        findings.push(Finding::error(
            format!("'{}' has non-function signature {}", function.name, function.signature),
            Location::function(fi),
        ));
        return;
    };
    if let Err(err) = function.signature.check_widths() {
        findings.push(Finding::error(err.to_string(), Location::function(fi)));
    }
    let declared: Vec<&IrType> = function.parameters.iter().map(|p| &p.ty).collect();
    if declared.len() != param_types.len() || declared.iter().zip(param_types).any(|(a, b)| *a != b) {
        findings.push(Finding::error(
            format!("parameters of '{}' do not match its signature {}", function.name, function.signature),
            Location::function(fi),
        ));
    }
}

/// One terminator per block, always the last instruction
fn check_structure(fi: usize, function: &Function, findings: &mut Vec<Finding>) {
    for (bi, block) in function.blocks.iter().enumerate() {
        if block.id as usize != bi {
            findings.push(Finding::error(
                format!("block '{}' has id {} at position {bi}", block.name, block.id),
                Location::block(fi, bi),
            ));
        }
        let last = block.instructions.len().saturating_sub(1);
        for (ii, instr) in block.instructions.iter().enumerate() {
            if instr.is_terminator() && ii != last {
                findings.push(Finding::error(
                    format!("terminator `{}` is followed by further instructions in block '{}'", instr.opcode, block.name),
                    Location::instruction(fi, bi, ii),
                ));
            }
        }
        if !block.has_terminator() {
            findings.push(Finding::error(
                format!("block '{}' in '{}' does not end in a terminator", block.name, function.name),
                Location::block(fi, bi),
            ));
        }
    }
}

/// Text position of a result's definition: block, then instruction
type Definition<'a> = (&'a IrType, (usize, usize));

/// Operand contracts, result types and that operands refer to this function
fn check_operands(fi: usize, function: &Function, findings: &mut Vec<Finding>) {
    let mut temps: HashMap<TempId, Definition<'_>> = HashMap::new();
    for (bi, block) in function.blocks.iter().enumerate() {
        for (ii, instr) in block.instructions.iter().enumerate() {
            match &instr.result {
                Some(Value::Temp { ty, id }) => {
                    if temps.contains_key(id) {
                        findings.push(Finding::error(
                            format!("result %{id} is defined more than once"),
                            Location::instruction(fi, bi, ii),
                        ));
                    } else {
                        temps.insert(*id, (ty, (bi, ii)));
                    }
                }
                Some(_) => findings.push(Finding::error(
                    format!("result of `{}` is not an instruction result", instr.opcode),
                    Location::instruction(fi, bi, ii),
                )),
                None => {}
            }
        }
    }

    for (bi, block) in function.blocks.iter().enumerate() {
        for (ii, instr) in block.instructions.iter().enumerate() {
            let location = Location::instruction(fi, bi, ii);
            match validate_operands(instr.opcode, &instr.operands) {
                Ok(expected) => {
                    let actual = instr.result.as_ref().map(Value::ty);
                    if actual != expected.as_ref() {
                        findings.push(Finding::error(
                            format!(
                                "`{}` result type {} does not match its operands ({})",
                                instr.opcode,
                                describe(actual),
                                describe(expected.as_ref()),
                            ),
                            location,
                        ));
                    }
                }
                Err(err) => findings.push(Finding::error(err.to_string(), location)),
            }

            for (index, operand) in instr.operands.iter().enumerate() {
                if let Some(problem) = operand_problem(function, &temps, (bi, ii), operand) {
                    findings.push(Finding::error(
                        format!("`{}` operand {index}: {problem}", instr.opcode),
                        location,
                    ));
                }
            }
        }
    }
}

fn describe(ty: Option<&IrType>) -> String {
    ty.map_or_else(|| "none".to_string(), IrType::to_string)
}

fn operand_problem(
    function: &Function,
    temps: &HashMap<TempId, Definition<'_>>,
    position: (usize, usize),
    operand: &Value,
) -> Option<String> {
    match operand {
        Value::Constant { ty, value } => check_constant(ty, *value).err().map(|e| e.to_string()),
        Value::Param { ty, index } => match function.parameters.get(*index) {
            None => Some(format!("no parameter {index}")),
            Some(param) if param.ty != *ty => {
                Some(format!("parameter %{} has type {}, used as {ty}", param.name, param.ty))
            }
            Some(_) => None,
        },
        Value::Temp { ty, id } => match temps.get(id) {
            None => Some(format!("%{id} is not defined in '{}'", function.name)),
            Some((defined, _)) if *defined != ty => Some(format!("%{id} has type {defined}, used as {ty}")),
            Some((_, at)) if *at >= position => Some(format!("%{id} is used before it is defined")),
            Some(_) => None,
        },
        Value::Block(id) => function
            .get_block(*id)
            .is_none()
            .then(|| format!("no block #{id} in '{}'", function.name)),
    }
}

/// Blocks not reachable from the entry block are dead code
fn check_reachability(fi: usize, function: &Function, findings: &mut Vec<Finding>) {
    if function.blocks.is_empty() {
        return;
    }
    let mut reached = vec![false; function.blocks.len()];
    let mut queue = VecDeque::from([0usize]);
    reached[0] = true;
    while let Some(bi) = queue.pop_front() {
        for succ in function.blocks[bi].successors() {
            let succ = succ as usize;
            if succ < reached.len() && !reached[succ] {
                reached[succ] = true;
                queue.push_back(succ);
            }
        }
    }

    for (bi, block) in function.blocks.iter().enumerate() {
        if !reached[bi] {
            findings.push(Finding::warning(
                format!("block '{}' in '{}' is unreachable from the entry block", block.name, function.name),
                Location::block(fi, bi),
            ));
        }
    }
}

/// `ret` operands match the declared return type
fn check_returns(fi: usize, function: &Function, findings: &mut Vec<Finding>) {
    let expected = function.return_type();
    for (bi, block) in function.blocks.iter().enumerate() {
        for (ii, instr) in block.instructions.iter().enumerate() {
            if instr.opcode != Opcode::Ret {
                continue;
            }
            let found = instr.operands.first().map(Value::ty);
            let matches = match found {
                Some(ty) => ty == expected,
                None => expected.is_void(),
            };
            if !matches {
                findings.push(Finding::error(
                    format!(
                        "ret returns {} in '{}', which returns {expected}",
                        found.map_or_else(|| "void".to_string(), IrType::to_string),
                        function.name,
                    ),
                    Location::instruction(fi, bi, ii),
                ));
            }
        }
    }
}
