//! Hook chaining
//!
//! Allows multiple logical hooks on the same target function, organized by
//! priority. Entries are totally ordered by `(priority, sequence)`; the
//! first entry's detour is the physical redirection target, and every
//! entry's caller-owned slot is wired to the next detour in order, with the
//! last slot wired to the target's true pre-hook entry point.

use crate::addr::{FuncAddr, OriginalSlot};
use crate::engine::EngineHandle;

/// priority class for a hook
///
/// higher-priority hooks run first and get the chance to short-circuit by
/// not calling their original slot. equal priorities run in registration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HookPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

/// one registered interceptor on a target
#[derive(Debug, Clone, Copy)]
pub struct HookEntry {
    detour: FuncAddr,
    slot: OriginalSlot,
    priority: HookPriority,
    sequence: u64,
}

impl HookEntry {
    /// detour function address
    pub fn detour(&self) -> FuncAddr {
        self.detour
    }

    /// priority class this entry was registered with
    pub fn priority(&self) -> HookPriority {
        self.priority
    }

    /// per-chain registration sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn order_key(&self) -> (HookPriority, u64) {
        (self.priority, self.sequence)
    }
}

/// hook chain for one target address
///
/// `recompute_wiring` is the sole place chain consistency is established;
/// the registry calls it after every mutation, before touching the physical
/// redirection.
pub struct HookChain {
    target: FuncAddr,
    /// true pre-hook entry point, captured on first install and never changed
    native_origin: FuncAddr,
    /// detour currently installed as the physical redirection target
    active_entry: FuncAddr,
    handle: EngineHandle,
    next_sequence: u64,
    /// sorted ascending by `(priority, sequence)`
    entries: Vec<HookEntry>,
}

impl HookChain {
    pub(crate) fn new(target: FuncAddr, native_origin: FuncAddr, handle: EngineHandle) -> Self {
        Self {
            target,
            native_origin,
            active_entry: native_origin,
            handle,
            next_sequence: 0,
            entries: Vec::new(),
        }
    }

    /// insert a new entry, returning its sequence number
    ///
    /// sequences are allocated from a per-chain monotonic counter, so two
    /// entries can never share an `(priority, sequence)` key.
    pub(crate) fn insert(
        &mut self,
        detour: FuncAddr,
        slot: OriginalSlot,
        priority: HookPriority,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.restore_entry(HookEntry {
            detour,
            slot,
            priority,
            sequence,
        });
        sequence
    }

    /// remove the lowest-ordered entry whose detour matches
    ///
    /// if the same detour is registered twice with different priorities,
    /// only one occurrence is removed per call.
    pub(crate) fn remove(&mut self, detour: FuncAddr) -> Option<HookEntry> {
        let pos = self.entries.iter().position(|e| e.detour == detour)?;
        Some(self.entries.remove(pos))
    }

    /// remove the entry with the given sequence number
    pub(crate) fn remove_sequence(&mut self, sequence: u64) -> Option<HookEntry> {
        let pos = self.entries.iter().position(|e| e.sequence == sequence)?;
        Some(self.entries.remove(pos))
    }

    /// re-insert an entry at its sorted position, keeping its sequence
    pub(crate) fn restore_entry(&mut self, entry: HookEntry) {
        let pos = self
            .entries
            .iter()
            .position(|e| e.order_key() > entry.order_key())
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
    }

    /// rewire every entry's slot and recompute the active entry point
    ///
    /// walks entries in ascending order: each slot is wired to the next
    /// entry's detour, the last slot to the native origin. slot writes are
    /// release-ordered publications, issued before the registry touches the
    /// physical redirection, so an in-flight call never observes a
    /// half-updated chain.
    pub(crate) fn recompute_wiring(&mut self) {
        for i in 0..self.entries.len() {
            let next = self
                .entries
                .get(i + 1)
                .map(|e| e.detour)
                .unwrap_or(self.native_origin);
            self.entries[i].slot.publish(next);
        }
        self.active_entry = self
            .entries
            .first()
            .map(|e| e.detour)
            .unwrap_or(self.native_origin);
    }

    /// target function address
    pub fn target(&self) -> FuncAddr {
        self.target
    }

    /// true pre-hook entry point
    pub fn native_origin(&self) -> FuncAddr {
        self.native_origin
    }

    /// detour currently installed as the physical redirection target
    pub fn active_entry(&self) -> FuncAddr {
        self.active_entry
    }

    pub(crate) fn handle(&self) -> EngineHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: EngineHandle) {
        self.handle = handle;
    }

    /// number of entries in the chain
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// check if the chain has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// entries in call order
    pub fn entries(&self) -> impl Iterator<Item = &HookEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn slot(cell: &AtomicUsize) -> OriginalSlot {
        // SAFETY: every cell in these tests outlives the chain using it
        unsafe { OriginalSlot::from_raw(cell.as_ptr()) }
    }

    fn chain() -> HookChain {
        HookChain::new(
            FuncAddr::new(0x1000),
            FuncAddr::new(0x9000),
            EngineHandle::new(1),
        )
    }

    #[test]
    fn test_empty_chain_routes_to_origin() {
        let mut c = chain();
        c.recompute_wiring();
        assert_eq!(c.active_entry(), c.native_origin());
        assert!(c.is_empty());
    }

    #[test]
    fn test_wiring_priority_order() {
        let mut c = chain();
        let (s1, s2, s3) = (
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
        );
        c.insert(FuncAddr::new(0x10), slot(&s1), HookPriority::Low);
        c.insert(FuncAddr::new(0x20), slot(&s2), HookPriority::High);
        c.insert(FuncAddr::new(0x30), slot(&s3), HookPriority::Normal);
        c.recompute_wiring();

        // call order: High (0x20) -> Normal (0x30) -> Low (0x10) -> origin
        assert_eq!(c.active_entry(), FuncAddr::new(0x20));
        assert_eq!(s2.load(Ordering::Acquire), 0x30);
        assert_eq!(s3.load(Ordering::Acquire), 0x10);
        assert_eq!(s1.load(Ordering::Acquire), 0x9000);
    }

    #[test]
    fn test_equal_priority_registration_order() {
        let mut c = chain();
        let (s1, s2) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let first = c.insert(FuncAddr::new(0x10), slot(&s1), HookPriority::Normal);
        let second = c.insert(FuncAddr::new(0x20), slot(&s2), HookPriority::Normal);
        assert!(first < second);
        c.recompute_wiring();

        // first-registered runs first
        assert_eq!(c.active_entry(), FuncAddr::new(0x10));
        assert_eq!(s1.load(Ordering::Acquire), 0x20);
        assert_eq!(s2.load(Ordering::Acquire), 0x9000);
    }

    #[test]
    fn test_remove_is_idempotent_undo() {
        let mut c = chain();
        let (s1, s2, s3) = (
            AtomicUsize::new(0),
            AtomicUsize::new(0),
            AtomicUsize::new(0),
        );
        c.insert(FuncAddr::new(0x10), slot(&s1), HookPriority::Normal);
        c.insert(FuncAddr::new(0x20), slot(&s2), HookPriority::Normal);
        c.recompute_wiring();
        let wired_before = (c.active_entry(), s1.load(Ordering::Acquire));

        c.insert(FuncAddr::new(0x30), slot(&s3), HookPriority::Highest);
        c.recompute_wiring();
        assert_eq!(c.active_entry(), FuncAddr::new(0x30));

        assert!(c.remove(FuncAddr::new(0x30)).is_some());
        c.recompute_wiring();
        assert_eq!((c.active_entry(), s1.load(Ordering::Acquire)), wired_before);
        assert_eq!(s2.load(Ordering::Acquire), 0x9000);
    }

    #[test]
    fn test_remove_duplicate_detour_takes_lowest_ordered() {
        let mut c = chain();
        let (s1, s2) = (AtomicUsize::new(0), AtomicUsize::new(0));
        c.insert(FuncAddr::new(0x10), slot(&s1), HookPriority::Low);
        c.insert(FuncAddr::new(0x10), slot(&s2), HookPriority::High);
        c.recompute_wiring();

        let removed = c.remove(FuncAddr::new(0x10)).unwrap();
        assert_eq!(removed.priority(), HookPriority::High);
        assert_eq!(c.len(), 1);
        c.recompute_wiring();
        assert_eq!(s1.load(Ordering::Acquire), 0x9000);
    }

    #[test]
    fn test_remove_missing_detour() {
        let mut c = chain();
        assert!(c.remove(FuncAddr::new(0x77)).is_none());
    }

    #[test]
    fn test_sequence_survives_removal() {
        let mut c = chain();
        let (s1, s2) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let first = c.insert(FuncAddr::new(0x10), slot(&s1), HookPriority::Normal);
        c.remove_sequence(first).unwrap();
        let second = c.insert(FuncAddr::new(0x20), slot(&s2), HookPriority::Normal);
        // the counter never reuses a sequence
        assert!(second > first);
    }
}
