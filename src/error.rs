//! Unified error types for hookstack

use thiserror::Error;

use crate::addr::FuncAddr;

/// all errors that can occur in hookstack
#[derive(Debug, Error)]
pub enum HookError {
    /// the external hooking engine refused an install/uninstall
    #[error("hook engine failed to {op}: {reason}")]
    Engine { op: &'static str, reason: String },

    /// removal requested for an address with no registered chain
    #[error("no hooks registered for target {target}")]
    TargetNotFound { target: FuncAddr },

    /// removal requested for a detour not present in the target's chain
    #[error("detour {detour} not registered on target {target}")]
    EntryNotFound { target: FuncAddr, detour: FuncAddr },

    /// named module does not appear in the process memory map
    #[error("module not mapped: {name}")]
    ModuleNotMapped { name: String },

    /// no supplied identifier matched inside the module
    #[error("unresolved signature [{identifier}] in module {module}")]
    SignatureUnresolved { module: String, identifier: String },

    /// the memory map source could not be read
    #[error("failed to read process memory map")]
    MapSource(#[from] std::io::Error),
}

impl HookError {
    /// engine failure for the given operation
    pub fn engine(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Engine {
            op,
            reason: reason.into(),
        }
    }
}

/// result type alias using HookError
pub type Result<T> = std::result::Result<T, HookError>;
