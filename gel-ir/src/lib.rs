//! Gelleau IR
//!
//! This crate provides the in-memory IR and the passes over it:
//! - IR: types, values, instructions, blocks, functions and modules
//! - Builder: the only way to mutate a module
//! - Verifier: structural and type checks, reported as findings
//! - Emitter: deterministic textual form of a verified module
//! - Reader: parses the textual form back into a module

pub mod ir;
pub mod config;
pub mod verifier;
pub mod emit;
pub mod reader;

pub use ir::{BlockRef, Function, IrBuilder, IrType, Module, Opcode, Value};
pub use config::VerifierConfig;
pub use verifier::{verify, verify_with, ValidationResult};
pub use emit::{emit, emit_unchecked, from_json, to_json, DisplayModule};
pub use reader::parse_module;
pub use gel_common::{Finding, IrError, Location, Severity};
