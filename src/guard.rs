//! RAII hook guard for automatic removal
//!
//! Removes a registered hook from its chain when the guard is dropped,
//! unless `leak()` was called.

use std::sync::Arc;

use tracing::warn;

use crate::addr::{FuncAddr, OriginalSlot};
use crate::chain::HookPriority;
use crate::engine::{HookEngine, ThreadPolicy};
use crate::error::Result;
use crate::registry::HookRegistry;

/// RAII guard for one installed hook
///
/// holds the registry alive and removes the hook on drop. dropping removes
/// one occurrence of the detour, mirroring [`HookRegistry::remove`].
pub struct HookGuard<E: HookEngine> {
    registry: Arc<HookRegistry<E>>,
    target: FuncAddr,
    detour: FuncAddr,
    threads: ThreadPolicy,
    armed: bool,
}

impl<E: HookEngine> HookGuard<E> {
    /// install a hook and wrap it in a guard
    pub fn install(
        registry: Arc<HookRegistry<E>>,
        target: FuncAddr,
        detour: FuncAddr,
        slot: OriginalSlot,
        priority: HookPriority,
        threads: ThreadPolicy,
    ) -> Result<Self> {
        registry.install(target, detour, slot, priority, threads)?;
        Ok(Self {
            registry,
            target,
            detour,
            threads,
            armed: true,
        })
    }

    /// target function address
    pub fn target(&self) -> FuncAddr {
        self.target
    }

    /// detour function address
    pub fn detour(&self) -> FuncAddr {
        self.detour
    }

    /// keep the hook installed permanently
    pub fn leak(mut self) {
        self.armed = false;
    }

    /// remove the hook now, reporting any engine failure
    ///
    /// dropping the guard also removes the hook but can only log a failure.
    pub fn remove(mut self) -> Result<()> {
        self.armed = false;
        self.registry.remove(self.target, self.detour, self.threads)
    }
}

impl<E: HookEngine> Drop for HookGuard<E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.registry.remove(self.target, self.detour, self.threads) {
            warn!(target = %self.target, detour = %self.detour, error = %err,
                "failed to remove hook on guard drop");
        }
    }
}
