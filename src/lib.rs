#![deny(unsafe_op_in_unsafe_fn)]

//! hookstack: priority-ordered hook chaining on top of a native hooking engine
//!
//! Multiple independent callers can hook the same target function; hooks run
//! in deterministic priority order and can be added or removed at runtime
//! without disturbing anyone else's hooks. The physical redirection itself is
//! delegated to an external engine (shadowhook, Dobby, a detours library)
//! behind the [`HookEngine`] trait; this crate only does the bookkeeping:
//!
//! - [`HookChain`]: per-target ordered entry set and the slot rewiring that
//!   produces the call order
//! - [`HookRegistry`]: process-wide target→chain map, one lock serializing
//!   all mutation and every engine call
//! - [`AddressResolver`]: module name + signature pattern → function address,
//!   with per-module cached bounds from the process memory map
//!
//! # Example
//!
//! ```ignore
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use hookstack::{
//!     AddressResolver, FuncAddr, HookPriority, HookRegistry, OriginalSlot,
//!     PatternScanner, ProcMaps, ThreadPolicy,
//! };
//!
//! static ORIGINAL: AtomicUsize = AtomicUsize::new(0);
//!
//! extern "C" fn my_detour(x: i32) -> i32 {
//!     let original: extern "C" fn(i32) -> i32 =
//!         unsafe { std::mem::transmute(ORIGINAL.load(Ordering::Acquire)) };
//!     original(x) + 1
//! }
//!
//! let registry = HookRegistry::new(MyEngine::new());
//! let resolver = AddressResolver::new(ProcMaps, PatternScanner::new());
//!
//! let target = resolver.resolve_first_of(
//!     "libgame.so",
//!     &["FF 43 28 ? ? 91", "FF 43 28 ? ? 94"],
//! )?;
//! registry.install(
//!     target,
//!     FuncAddr::new(my_detour as usize),
//!     OriginalSlot::from_static(&ORIGINAL),
//!     HookPriority::Normal,
//!     ThreadPolicy::Run,
//! )?;
//! ```

pub mod addr;
pub mod chain;
pub mod engine;
pub mod error;
pub mod guard;
pub mod registry;
pub mod resolve;

// re-exports for convenience
pub use addr::{FuncAddr, OriginalSlot};
pub use chain::{HookChain, HookEntry, HookPriority};
pub use engine::{EngineHandle, EngineInstall, HookEngine, ThreadPolicy};
pub use error::{HookError, Result};
pub use guard::HookGuard;
pub use registry::HookRegistry;
#[cfg(target_os = "linux")]
pub use resolve::ProcMaps;
pub use resolve::{AddressResolver, MapRegion, MemoryMapSource, ModuleBounds, PatternScanner, SignatureMatcher};
