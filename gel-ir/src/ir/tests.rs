//! Unit tests for the IR module

use super::*;
use gel_common::{IrError, NameKind};
use pretty_assertions::assert_eq;

fn binary_sig(ty: IrType) -> IrType {
    IrType::function(ty.clone(), vec![ty.clone(), ty])
}

#[test]
fn test_ir_types() {
    assert_eq!(IrType::int(64).unwrap(), IrType::i64());
    assert_eq!(IrType::int(0), Err(IrError::InvalidWidth { bits: 0 }));
    assert_eq!(IrType::int(MAX_INT_BITS + 1), Err(IrError::InvalidWidth { bits: 129 }));
    assert!(IrType::int(MIN_INT_BITS).is_ok());

    let ptr = IrType::ptr(IrType::i32());
    assert_eq!(ptr.to_string(), "i32*");
    assert_eq!(ptr.pointee(), Some(&IrType::i32()));
    assert_eq!(binary_sig(IrType::i64()).to_string(), "i64 (i64, i64)");
    assert_eq!(IrType::function(IrType::Void, vec![]).to_string(), "void ()");

    assert!(types_equal(&binary_sig(IrType::i64()), &binary_sig(IrType::i64())));
    assert!(!types_equal(&IrType::i64(), &IrType::i32()));
    assert!(!types_equal(&IrType::ptr(IrType::i64()), &IrType::ptr(IrType::i32())));

    let bad = IrType::ptr(IrType::Int(200));
    assert_eq!(bad.check_widths(), Err(IrError::InvalidWidth { bits: 200 }));
}

#[test]
fn test_ir_values() {
    assert_eq!(Value::i64(-1).ty(), &IrType::i64());
    assert_eq!(Value::bool(true), Value::Constant { ty: IrType::i1(), value: 1 });
    assert_eq!(Value::block(3).ty(), &IrType::Label);
    assert_eq!(Value::block(3).as_block(), Some(3));

    assert!(Value::constant(IrType::Int(8), 255).is_ok());
    assert!(Value::constant(IrType::Int(8), -128).is_ok());
    assert!(matches!(
        Value::constant(IrType::Int(8), 256),
        Err(IrError::ConstantOutOfRange { value: 256, .. })
    ));
    assert!(matches!(
        Value::constant(IrType::Int(8), -129),
        Err(IrError::ConstantOutOfRange { .. })
    ));
    assert!(Value::constant(IrType::Int(128), i128::MIN).is_ok());
    assert!(matches!(
        Value::constant(IrType::Label, 0),
        Err(IrError::TypeMismatch { .. })
    ));
}

#[test]
fn test_opcodes() {
    for opcode in Opcode::ALL {
        assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
    }
    assert_eq!(Opcode::from_mnemonic("frob"), None);
    assert!(Opcode::Ret.is_terminator());
    assert!(Opcode::CondBr.is_terminator());
    assert!(!Opcode::Add.is_terminator());
    assert!(Opcode::Ult.is_comparison());
    assert!(!Opcode::Store.is_comparison());
}

#[test]
fn test_validate_operands() {
    let a = Value::param(IrType::i64(), 0);
    let b = Value::param(IrType::i64(), 1);
    assert_eq!(validate_operands(Opcode::Add, &[a.clone(), b.clone()]), Ok(Some(IrType::i64())));
    assert_eq!(validate_operands(Opcode::Slt, &[a.clone(), b.clone()]), Ok(Some(IrType::i1())));

    let err = validate_operands(Opcode::Add, &[a.clone(), Value::i32(1)]).unwrap_err();
    assert_eq!(err, IrError::TypeMismatch {
        context: "add".to_string(),
        index: 1,
        expected: "i64".to_string(),
        found: "i32".to_string(),
    });
    assert_eq!(
        validate_operands(Opcode::Mul, &[a.clone()]),
        Err(IrError::OperandCount { opcode: "mul".to_string(), expected: 2, found: 1 })
    );

    let ptr = Value::param(IrType::ptr(IrType::i64()), 2);
    assert_eq!(validate_operands(Opcode::Load, &[ptr.clone()]), Ok(Some(IrType::i64())));
    assert_eq!(validate_operands(Opcode::Store, &[a.clone(), ptr.clone()]), Ok(None));
    assert!(matches!(
        validate_operands(Opcode::Store, &[Value::i32(0), ptr]),
        Err(IrError::TypeMismatch { index: 0, .. })
    ));
    assert!(matches!(
        validate_operands(Opcode::Load, &[a.clone()]),
        Err(IrError::TypeMismatch { index: 0, .. })
    ));

    assert_eq!(validate_operands(Opcode::Ret, &[]), Ok(None));
    assert_eq!(validate_operands(Opcode::Ret, &[a.clone()]), Ok(None));
    assert!(matches!(
        validate_operands(Opcode::Ret, &[a.clone(), b]),
        Err(IrError::OperandCount { .. })
    ));
    assert!(matches!(
        validate_operands(Opcode::Ret, &[Value::block(0)]),
        Err(IrError::TypeMismatch { .. })
    ));

    assert_eq!(validate_operands(Opcode::Br, &[Value::block(1)]), Ok(None));
    assert!(matches!(
        validate_operands(Opcode::Br, &[a.clone()]),
        Err(IrError::TypeMismatch { .. })
    ));
    assert!(matches!(
        validate_operands(Opcode::CondBr, &[a, Value::block(0), Value::block(1)]),
        Err(IrError::TypeMismatch { index: 0, .. })
    ));
    assert_eq!(
        validate_operands(Opcode::CondBr, &[Value::bool(true), Value::block(0), Value::block(1)]),
        Ok(None)
    );
}

#[test]
fn test_basic_block() {
    let mut block = BasicBlock::new(0, "entry".to_string());
    assert!(block.is_empty());
    assert!(!block.has_terminator());

    block.add_instruction(Instruction {
        opcode: Opcode::Add,
        operands: vec![Value::i32(1), Value::i32(2)],
        result: Some(Value::temp(IrType::i32(), 0)),
    });
    assert!(!block.is_empty());
    assert!(!block.has_terminator());

    block.add_instruction(Instruction {
        opcode: Opcode::CondBr,
        operands: vec![Value::bool(false), Value::block(1), Value::block(2)],
        result: None,
    });
    assert!(block.has_terminator());
    assert_eq!(block.terminator().map(|t| t.opcode), Some(Opcode::CondBr));
    assert_eq!(block.successors(), vec![1, 2]);
}

#[test]
fn test_function() {
    let function = Function::new("sum".to_string(), binary_sig(IrType::i64()));
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[1].name, "arg1");
    assert_eq!(function.return_type(), &IrType::i64());
    assert!(function.is_declaration());
    assert_eq!(function.param_index("arg0"), Some(0));
    assert_eq!(function.param_value(1), Some(Value::param(IrType::i64(), 1)));
    assert_eq!(function.param_value(2), None);
}

#[test]
fn test_ir_builder() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("sum", binary_sig(IrType::i64())).unwrap();
    builder.set_param_name(func, 0, "a").unwrap();
    builder.set_param_name(func, 1, "b").unwrap();
    let entry = builder.append_block(func, "entry").unwrap();

    let params = builder.params(func).unwrap();
    let result = builder.build_add(entry, params[0].clone(), params[1].clone()).unwrap();
    assert_eq!(result.ty(), &IrType::i64());
    builder.build_ret(entry, result).unwrap();
    assert!(builder.block_has_terminator(entry));

    let module = builder.finish();
    let function = module.get_function("sum").unwrap();
    assert_eq!(module.function_id("sum"), Some(0));
    assert_eq!(function.entry_block().map(|b| b.name.as_str()), Some("entry"));
    assert_eq!(function.instruction_count(), 2);
    assert_eq!(function.parameters[0].name, "a");
}

#[test]
fn test_builder_name_errors() {
    assert!(matches!(IrBuilder::new("9lives"), Err(IrError::InvalidName { kind: NameKind::Module, .. })));

    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", binary_sig(IrType::i32())).unwrap();
    assert_eq!(
        builder.create_function("f", binary_sig(IrType::i32())),
        Err(IrError::DuplicateName { kind: NameKind::Function, name: "f".to_string() })
    );
    assert!(matches!(
        builder.create_function("bad name", binary_sig(IrType::i32())),
        Err(IrError::InvalidName { .. })
    ));

    builder.append_block(func, "entry").unwrap();
    assert_eq!(
        builder.append_block(func, "entry"),
        Err(IrError::DuplicateName { kind: NameKind::Block, name: "entry".to_string() })
    );

    builder.set_param_name(func, 0, "x").unwrap();
    assert!(matches!(
        builder.set_param_name(func, 1, "x"),
        Err(IrError::DuplicateName { kind: NameKind::Parameter, .. })
    ));
    assert!(matches!(builder.set_param_name(func, 5, "y"), Err(IrError::ParamIndex { index: 5, .. })));

    // Swapping names works when assigned together
    builder.set_param_names(func, &["arg1", "x"]).unwrap();
    assert!(matches!(
        builder.set_param_names(func, &["p", "p"]),
        Err(IrError::DuplicateName { .. })
    ));
    assert_eq!(builder.module().functions[0].parameters[0].name, "arg1");

    assert_eq!(builder.append_block(7, "entry"), Err(IrError::UnknownFunction { id: 7 }));
}

#[test]
fn test_builder_signature_errors() {
    let mut builder = IrBuilder::new("m").unwrap();
    assert!(matches!(
        builder.create_function("f", IrType::i64()),
        Err(IrError::TypeMismatch { .. })
    ));
    assert!(matches!(
        builder.create_function("f", IrType::function(IrType::Label, vec![])),
        Err(IrError::TypeMismatch { .. })
    ));
    assert!(matches!(
        builder.create_function("f", IrType::function(IrType::Void, vec![IrType::Void])),
        Err(IrError::TypeMismatch { index: 0, .. })
    ));
    assert_eq!(
        builder.create_function("f", IrType::function(IrType::Int(0), vec![])),
        Err(IrError::InvalidWidth { bits: 0 })
    );
    // Failed calls leave nothing behind
    assert!(builder.module().functions.is_empty());
}

#[test]
fn test_append_after_terminator() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", binary_sig(IrType::i64())).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    builder.build_ret(entry, Value::i64(0)).unwrap();

    let a = builder.param(func, 0).unwrap();
    let err = builder.build_add(entry, a.clone(), a).unwrap_err();
    assert_eq!(err, IrError::TerminatedBlock { function: "f".to_string(), block: "entry".to_string() });
    assert_eq!(builder.module().functions[0].blocks[0].instructions.len(), 1);
}

#[test]
fn test_builder_type_errors() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", binary_sig(IrType::i64())).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    let a = builder.param(func, 0).unwrap();

    let err = builder.build_add(entry, a.clone(), Value::i32(1)).unwrap_err();
    assert!(matches!(err, IrError::TypeMismatch { index: 1, .. }));

    let err = builder.build_ret(entry, Value::i32(1)).unwrap_err();
    assert_eq!(err, IrError::ReturnTypeMismatch {
        function: "f".to_string(),
        expected: "i64".to_string(),
        found: "i32".to_string(),
    });
    assert!(matches!(builder.build_ret_void(entry), Err(IrError::ReturnTypeMismatch { .. })));

    // Values from another function are rejected
    let other = builder.create_function("g", IrType::function(IrType::i64(), vec![])).unwrap();
    let other_entry = builder.append_block(other, "entry").unwrap();
    let err = builder.build_ret(other_entry, a).unwrap_err();
    assert!(matches!(err, IrError::ForeignValue { index: 0, .. }));
    let err = builder.build_br(other_entry, entry).unwrap_err();
    assert!(matches!(err, IrError::ForeignValue { .. }));

    assert!(matches!(
        builder.build_binary(entry, Opcode::Ret, Value::i64(0), Value::i64(0)),
        Err(IrError::NoResult { .. })
    ));

    // Nothing was appended by the failed calls
    let module = builder.module();
    assert!(module.functions.iter().all(|f| f.blocks.iter().all(|b| b.is_empty())));
}

#[test]
fn test_terminator_stays_last() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", IrType::function(IrType::i32(), vec![IrType::i32()])).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    let then_block = builder.append_block(func, "then").unwrap();
    let else_block = builder.append_block(func, "else").unwrap();
    let x = builder.param(func, 0).unwrap();

    let steps: Vec<Box<dyn Fn(&mut IrBuilder) -> Result<(), IrError>>> = vec![
        Box::new(|b: &mut IrBuilder| b.build_cmp(entry, Opcode::Sgt, x.clone(), Value::i32(0)).map(drop)),
        Box::new(|b: &mut IrBuilder| b.build_cond_br(entry, Value::bool(true), then_block, else_block)),
        Box::new(|b: &mut IrBuilder| b.build_ret(entry, Value::i32(1))),
        Box::new(|b: &mut IrBuilder| b.build_ret(then_block, x.clone())),
        Box::new(|b: &mut IrBuilder| b.build_sub(else_block, x.clone(), Value::i32(1)).map(drop)),
        Box::new(|b: &mut IrBuilder| b.build_br(else_block, then_block)),
        Box::new(|b: &mut IrBuilder| b.build_br(else_block, entry)),
    ];

    for step in &steps {
        let _ = step(&mut builder);
        for block in &builder.module().functions[0].blocks {
            let terminators = block.instructions.iter().filter(|i| i.is_terminator()).count();
            assert!(terminators <= 1);
            if terminators == 1 {
                assert!(block.instructions.last().is_some_and(Instruction::is_terminator));
            }
        }
    }
    assert_eq!(builder.module().functions[0].instruction_count(), 5);
}

#[test]
fn test_constant_width_limits() {
    let i127 = IrType::int(127).unwrap();
    assert!(Value::constant(i127.clone(), 5).is_ok());
    assert!(Value::constant(i127.clone(), i128::MAX).is_ok());
    assert!(Value::constant(i127.clone(), -(1i128 << 126)).is_ok());
    assert!(matches!(
        Value::constant(i127, -(1i128 << 126) - 1),
        Err(IrError::ConstantOutOfRange { .. })
    ));

    let i128_ty = IrType::int(128).unwrap();
    assert!(Value::constant(i128_ty.clone(), i128::MAX).is_ok());
    assert!(Value::constant(i128_ty, i128::MIN).is_ok());

    assert!(check_constant(&IrType::Int(1), 1).is_ok());
    assert!(check_constant(&IrType::Int(1), -1).is_ok());
    assert!(check_constant(&IrType::Int(1), 2).is_err());
}

#[test]
fn test_builder_rejects_mistyped_results() {
    let mut builder = IrBuilder::new("m").unwrap();
    let sig = IrType::function(IrType::i32(), vec![IrType::i64(), IrType::i64()]);
    let func = builder.create_function("narrow", sig).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    let params = builder.params(func).unwrap();
    let wide = builder.build_add(entry, params[0].clone(), params[1].clone()).unwrap();
    assert_eq!(wide, Value::temp(IrType::i64(), 0));

    // Same id as the i64 result, relabelled as i32
    let err = builder.build_ret(entry, Value::temp(IrType::i32(), 0)).unwrap_err();
    assert_eq!(err, IrError::ForeignValue { function: "narrow".to_string(), index: 0 });
    let err = builder.build_ret(entry, Value::temp(IrType::i32(), 9)).unwrap_err();
    assert!(matches!(err, IrError::ForeignValue { .. }));
    assert_eq!(builder.module().functions[0].instruction_count(), 1);
}

#[test]
fn test_builder_rejects_use_before_definition() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", IrType::function(IrType::i64(), vec![IrType::i64()])).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    let exit = builder.append_block(func, "exit").unwrap();
    let x = builder.param(func, 0).unwrap();

    let late = builder.build_add(exit, x.clone(), x.clone()).unwrap();
    let err = builder.build_add(entry, late.clone(), x.clone()).unwrap_err();
    assert_eq!(err, IrError::UseBeforeDefinition { function: "f".to_string(), index: 0 });
    assert!(builder.module().functions[0].blocks[0].is_empty());

    // Uses in the defining block or a later one are fine
    let early = builder.build_sub(entry, x.clone(), Value::i64(1)).unwrap();
    builder.build_br(entry, exit).unwrap();
    let total = builder.build_add(exit, late, early).unwrap();
    builder.build_ret(exit, total).unwrap();
}

#[test]
fn test_from_module_raises_result_counter() {
    let mut builder = IrBuilder::new("m").unwrap();
    let func = builder.create_function("f", binary_sig(IrType::i64())).unwrap();
    let entry = builder.append_block(func, "entry").unwrap();
    let params = builder.params(func).unwrap();
    builder.build_add(entry, params[0].clone(), params[1].clone()).unwrap();
    let mut module = builder.finish();
    assert_eq!(module.functions[0].result_high_water(), 1);

    // As if loaded from JSON without the counter
    module.functions[0].next_temp = 0;
    let mut builder = IrBuilder::from_module(module);
    let next = builder.build_mul(entry, params[0].clone(), params[1].clone()).unwrap();
    assert_eq!(next, Value::temp(IrType::i64(), 1));
}
