//! Gelleau IR - Common Types and Errors
//! 
//! This crate contains the identifiers, error taxonomy and verification
//! finding types shared by the IR core and the driver.

pub mod error;
pub mod types;

pub use error::{IrError, Severity, Location, Finding};
pub use types::*;
