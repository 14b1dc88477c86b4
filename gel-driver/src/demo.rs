//! The `gelleau` module: one function adding two 64-bit integers

use gel_common::IrError;
use gel_ir::{IrBuilder, IrType, Module};
use log::debug;

pub const MODULE_NAME: &str = "gelleau";

/// Build `gelleau` with `sum(i64 %a, i64 %b) -> i64`
pub fn build_gelleau() -> Result<Module, IrError> {
    let mut builder = IrBuilder::new(MODULE_NAME)?;
    let signature = IrType::function(IrType::i64(), vec![IrType::i64(), IrType::i64()]);
    let sum = builder.create_function("sum", signature)?;
    builder.set_param_names(sum, &["a", "b"])?;

    let entry = builder.append_block(sum, "entry")?;
    let a = builder.param(sum, 0)?;
    let b = builder.param(sum, 1)?;
    let result = builder.build_add(entry, a, b)?;
    builder.build_ret(entry, result)?;

    debug!("Built demo module '{MODULE_NAME}'");
    Ok(builder.finish())
}
