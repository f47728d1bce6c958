//! Process-wide hook registry
//!
//! Owns every hook chain and serializes all bookkeeping mutation, including
//! the nested engine calls, behind a single lock. Construct one registry per
//! process, pass it (or an `Arc` of it) to callers, and tear it down at
//! shutdown; the engine install/uninstall primitives are assumed
//! non-reentrant, so they must never race against a concurrent chain
//! mutation on any target.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::addr::{FuncAddr, OriginalSlot};
use crate::chain::{HookChain, HookPriority};
use crate::engine::{HookEngine, ThreadPolicy};
use crate::error::{HookError, Result};

/// registry of every hook chain in the process
pub struct HookRegistry<E: HookEngine> {
    inner: Mutex<Inner<E>>,
}

struct Inner<E> {
    engine: E,
    chains: HashMap<FuncAddr, HookChain>,
}

impl<E: HookEngine> HookRegistry<E> {
    /// create a registry owning the given engine
    pub fn new(engine: E) -> Self {
        Self {
            inner: Mutex::new(Inner {
                engine,
                chains: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<E>> {
        // uncontended-by-design mutex; poisoning would mean a prior
        // panic mid-mutation, which nothing can recover from
        self.inner.lock().unwrap()
    }

    /// install a hook on `target`
    ///
    /// creates the chain on the first hook of a target (asking the engine
    /// for the redirection and the pre-hook entry point), otherwise inserts
    /// into the existing chain and re-issues the engine install only when
    /// the head of the chain changed. a failed engine call leaves no
    /// partial state behind.
    pub fn install(
        &self,
        target: FuncAddr,
        detour: FuncAddr,
        slot: OriginalSlot,
        priority: HookPriority,
        threads: ThreadPolicy,
    ) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if let Some(chain) = inner.chains.get_mut(&target) {
            let previous_active = chain.active_entry();
            let sequence = chain.insert(detour, slot, priority);
            chain.recompute_wiring();

            // only a new head changes the physical redirection; the slot
            // writes above are already visible before the engine patches
            if chain.active_entry() != previous_active {
                match inner.engine.install(target, chain.active_entry(), threads) {
                    Ok(installed) => chain.set_handle(installed.handle),
                    Err(err) => {
                        chain.remove_sequence(sequence);
                        chain.recompute_wiring();
                        return Err(err);
                    }
                }
            }
            debug!(%target, %detour, ?priority, chain_len = chain.len(), "hook added to chain");
            return Ok(());
        }

        // first hook on this target: the engine reports the pre-hook entry
        // point, which the chain keeps as its origin for as long as it lives
        let installed = inner.engine.install(target, detour, threads)?;
        let mut chain = HookChain::new(target, installed.previous_entry, installed.handle);
        chain.insert(detour, slot, priority);
        chain.recompute_wiring();
        debug!(%target, %detour, ?priority, origin = %chain.native_origin(), "hook chain created");
        inner.chains.insert(target, chain);
        Ok(())
    }

    /// remove the hook with the given detour from `target`'s chain
    ///
    /// removes one occurrence (the lowest-ordered match). the last entry's
    /// removal uninstalls the engine redirection and erases the chain; a
    /// removed head re-issues the engine install with the new head. a
    /// failed engine call leaves the chain untouched.
    pub fn remove(&self, target: FuncAddr, detour: FuncAddr, threads: ThreadPolicy) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let chain = inner
            .chains
            .get_mut(&target)
            .ok_or(HookError::TargetNotFound { target })?;
        let previous_active = chain.active_entry();
        let removed = chain
            .remove(detour)
            .ok_or(HookError::EntryNotFound { target, detour })?;
        chain.recompute_wiring();

        if chain.is_empty() {
            if let Err(err) = inner.engine.uninstall(chain.handle(), threads) {
                chain.restore_entry(removed);
                chain.recompute_wiring();
                return Err(err);
            }
            inner.chains.remove(&target);
            debug!(%target, %detour, "last hook removed, chain destroyed");
            return Ok(());
        }

        if chain.active_entry() != previous_active {
            match inner.engine.install(target, chain.active_entry(), threads) {
                Ok(installed) => chain.set_handle(installed.handle),
                Err(err) => {
                    chain.restore_entry(removed);
                    chain.recompute_wiring();
                    return Err(err);
                }
            }
        }
        debug!(%target, %detour, chain_len = chain.len(), "hook removed from chain");
        Ok(())
    }

    /// uninstall every chain and clear the registry
    ///
    /// shutdown-only. every chain is attempted even if an uninstall fails;
    /// the first engine failure is reported after the sweep.
    pub fn teardown_all(&self, threads: ThreadPolicy) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let mut first_err = None;
        for (target, chain) in inner.chains.drain() {
            if let Err(err) = inner.engine.uninstall(chain.handle(), threads) {
                warn!(%target, error = %err, "engine uninstall failed during teardown");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// run a closure against the chain for `target`, if one exists
    ///
    /// read-only view of the chain (entries in call order, native origin,
    /// active entry point) under the registry lock. the closure must not
    /// call back into the registry.
    pub fn with_chain<R>(&self, target: FuncAddr, f: impl FnOnce(&HookChain) -> R) -> Option<R> {
        self.lock().chains.get(&target).map(f)
    }

    /// check whether any hooks are registered on `target`
    pub fn is_hooked(&self, target: FuncAddr) -> bool {
        self.lock().chains.contains_key(&target)
    }

    /// detour currently installed as the physical redirection for `target`
    pub fn active_entry(&self, target: FuncAddr) -> Option<FuncAddr> {
        self.lock().chains.get(&target).map(|c| c.active_entry())
    }

    /// number of hooks registered on `target`
    pub fn chain_len(&self, target: FuncAddr) -> usize {
        self.lock().chains.get(&target).map_or(0, |c| c.len())
    }

    /// number of hooked targets
    pub fn target_count(&self) -> usize {
        self.lock().chains.len()
    }
}
