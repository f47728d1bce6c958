//! External hooking engine contract
//!
//! The engine is the pre-existing native component that physically rewrites
//! control flow at a target address. This crate treats it as a black box:
//! install a redirection, get back an opaque handle plus the entry point
//! that was live before, and uninstall by handle later.

use crate::addr::FuncAddr;
use crate::error::Result;

/// opaque token returned by the engine, required to uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// wrap a raw engine token
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// raw token value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// result of a successful engine install
#[derive(Debug, Clone, Copy)]
pub struct EngineInstall {
    /// token needed to uninstall this redirection
    pub handle: EngineHandle,
    /// entry point that was live at the target before this install; on the
    /// first install of a target this is the true pre-hook machine code
    pub previous_entry: FuncAddr,
}

/// whether other threads should be quiesced while the engine patches code
///
/// forwarded opaquely to the engine; the chain bookkeeping itself places no
/// additional barrier either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPolicy {
    /// let other threads keep running during the patch
    #[default]
    Run,
    /// ask the engine to suspend every other thread for the duration
    Suspend,
}

/// native hooking engine
///
/// every method runs with the registry lock held, so implementations must
/// never call back into the registry. re-installing over an existing
/// redirection on the same target must be supported and must overwrite the
/// previous redirection in place.
pub trait HookEngine: Send {
    /// redirect `target` to `entry`
    fn install(
        &mut self,
        target: FuncAddr,
        entry: FuncAddr,
        threads: ThreadPolicy,
    ) -> Result<EngineInstall>;

    /// remove the redirection identified by `handle`
    fn uninstall(&mut self, handle: EngineHandle, threads: ThreadPolicy) -> Result<()>;
}
