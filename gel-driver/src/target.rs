//! Process-wide target initialisation
//!
//! Tools built on the IR bring up the target layer before they create any
//! module: the core, then the native target, then its assembly printer.
//! Each step is idempotent and may be called from any thread; `shutdown`
//! resets everything.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("{step} requires {requires} to be initialised first")]
    OutOfOrder {
        step: &'static str,
        requires: &'static str,
    },

    #[error("unsupported host architecture '{arch}'")]
    UnsupportedHost { arch: String },

    #[error("target registry lock was poisoned")]
    Poisoned,
}

/// Description of the machine the process runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTarget {
    pub arch: String,
    pub os: String,
    pub triple: String,
}

const SUPPORTED_ARCHES: &[&str] = &["x86", "x86_64", "arm", "aarch64", "riscv64", "powerpc64", "s390x"];

impl NativeTarget {
    pub fn detect() -> Result<Self, TargetError> {
        Self::for_host(std::env::consts::ARCH, std::env::consts::OS)
    }

    pub fn for_host(arch: &str, os: &str) -> Result<Self, TargetError> {
        if !SUPPORTED_ARCHES.contains(&arch) {
            return Err(TargetError::UnsupportedHost { arch: arch.to_string() });
        }
        let triple = match os {
            "linux" => format!("{arch}-unknown-linux-gnu"),
            "macos" => format!("{arch}-apple-darwin"),
            "windows" => format!("{arch}-pc-windows-msvc"),
            other => format!("{arch}-unknown-{other}"),
        };
        Ok(Self { arch: arch.to_string(), os: os.to_string(), triple })
    }
}

impl fmt::Display for NativeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.triple)
    }
}

/// Initialisation state; steps must be taken in order
#[derive(Debug, Default)]
pub struct TargetRegistry {
    core: bool,
    native: Option<NativeTarget>,
    asm_printer: bool,
}

impl TargetRegistry {
    pub fn initialize(&mut self) {
        if !self.core {
            debug!("Initialising target core");
            self.core = true;
        }
    }

    pub fn initialize_native_target(&mut self) -> Result<&NativeTarget, TargetError> {
        if !self.core {
            return Err(TargetError::OutOfOrder { step: "native target", requires: "core" });
        }
        let native = match self.native.take() {
            Some(native) => native,
            None => {
                let native = NativeTarget::detect()?;
                info!("Native target: {native}");
                native
            }
        };
        let native: &NativeTarget = self.native.insert(native);
        Ok(native)
    }

    pub fn initialize_native_asmprinter(&mut self) -> Result<(), TargetError> {
        if self.native.is_none() {
            return Err(TargetError::OutOfOrder { step: "asm printer", requires: "native target" });
        }
        if !self.asm_printer {
            debug!("Initialising native asm printer");
            self.asm_printer = true;
        }
        Ok(())
    }

    /// Core, native target and asm printer are all up
    pub fn is_ready(&self) -> bool {
        self.core && self.native.is_some() && self.asm_printer
    }

    pub fn shutdown(&mut self) {
        *self = Self::default();
    }
}

static REGISTRY: Lazy<Mutex<TargetRegistry>> = Lazy::new(|| Mutex::new(TargetRegistry::default()));

fn registry() -> Result<MutexGuard<'static, TargetRegistry>, TargetError> {
    REGISTRY.lock().map_err(|_| TargetError::Poisoned)
}

pub fn initialize() -> Result<(), TargetError> {
    registry()?.initialize();
    Ok(())
}

pub fn initialize_native_target() -> Result<NativeTarget, TargetError> {
    registry()?.initialize_native_target().cloned()
}

pub fn initialize_native_asmprinter() -> Result<(), TargetError> {
    registry()?.initialize_native_asmprinter()
}

pub fn is_ready() -> bool {
    registry().is_ok_and(|r| r.is_ready())
}

pub fn shutdown() -> Result<(), TargetError> {
    registry()?.shutdown();
    Ok(())
}
