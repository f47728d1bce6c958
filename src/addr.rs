//! Address and slot value types

use core::fmt;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

/// opaque function address
///
/// addresses are compared and stored as plain integers; the crate never
/// dereferences one itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncAddr(usize);

impl FuncAddr {
    /// wrap a raw address value
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// raw address value
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// check for the null address
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for FuncAddr {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl fmt::Debug for FuncAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncAddr({:#x})", self.0)
    }
}

impl fmt::Display for FuncAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// caller-owned output slot for the "call original" pointer
///
/// each registered detour supplies one slot; the chain writes into it the
/// address the detour must call to continue (the next detour in order, or
/// the target's true pre-hook entry point). writes are single-word atomic
/// stores with release ordering so a thread already inside the chain never
/// observes a torn value.
#[derive(Clone, Copy)]
pub struct OriginalSlot(NonNull<AtomicUsize>);

impl OriginalSlot {
    /// wrap a static slot
    pub fn from_static(slot: &'static AtomicUsize) -> Self {
        Self(NonNull::from(slot))
    }

    /// wrap a raw slot location
    ///
    /// # Safety
    ///
    /// `slot` must be non-null, naturally aligned, and valid for writes for
    /// as long as the hook entry owning this slot stays registered.
    pub unsafe fn from_raw(slot: *mut usize) -> Self {
        // SAFETY: caller guarantees `slot` is non-null
        Self(unsafe { NonNull::new_unchecked(slot.cast::<AtomicUsize>()) })
    }

    /// publish a new continuation address into the slot
    pub(crate) fn publish(&self, addr: FuncAddr) {
        // SAFETY: validity is guaranteed by the constructor contracts
        let slot = unsafe { self.0.as_ref() };
        slot.store(addr.as_usize(), Ordering::Release);
    }
}

// the slot is only ever written through an atomic, and the pointee is
// caller-owned memory that must outlive the registration
unsafe impl Send for OriginalSlot {}
unsafe impl Sync for OriginalSlot {}

impl fmt::Debug for OriginalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OriginalSlot({:p})", self.0)
    }
}
