//! Address resolution
//!
//! Translates a human-meaningful identifier (byte-pattern signature) into a
//! runtime function address inside one named module. Module bounds come from
//! a [`MemoryMapSource`] and are cached per module name for the resolver's
//! lifetime; a module's base address is assumed stable once mapped.

pub mod maps;
pub mod pattern;

pub use maps::{MapRegion, MemoryMapSource, ModuleBounds};
#[cfg(target_os = "linux")]
pub use maps::ProcMaps;
pub use pattern::PatternScanner;

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::addr::FuncAddr;
use crate::error::{HookError, Result};

/// signature/symbol matcher over a module's mapped range
///
/// implementations search `[base, base + size)` for the identifier and
/// return the absolute match address. ranges handed to the matcher always
/// come from the process memory map, so they are mapped and readable.
pub trait SignatureMatcher {
    fn find(&self, base: usize, size: usize, pattern: &str) -> Option<usize>;
}

/// resolver from module-relative identifiers to function addresses
pub struct AddressResolver<M, S> {
    maps: M,
    matcher: S,
    bounds: Mutex<HashMap<String, ModuleBounds>>,
}

impl<M: MemoryMapSource, S: SignatureMatcher> AddressResolver<M, S> {
    pub fn new(maps: M, matcher: S) -> Self {
        Self {
            maps,
            matcher,
            bounds: Mutex::new(HashMap::new()),
        }
    }

    /// base and total mapped size of a module, scanned once and cached
    ///
    /// base is the lowest mapped address of the module; size is the sum of
    /// all its mapped range sizes.
    pub fn module_bounds(&self, module: &str) -> Result<ModuleBounds> {
        if let Some(bounds) = self.bounds.lock().unwrap().get(module) {
            return Ok(*bounds);
        }

        let regions = self.maps.regions()?;
        let mut base = None;
        let mut size = 0;
        for region in regions.iter().filter(|r| r.belongs_to(module)) {
            base.get_or_insert(region.start);
            size += region.size();
        }
        let bounds = ModuleBounds {
            base: base.ok_or_else(|| HookError::ModuleNotMapped {
                name: module.to_owned(),
            })?,
            size,
        };

        debug!(module, base = format_args!("{:#x}", bounds.base), size = bounds.size,
            "module bounds resolved");
        self.bounds
            .lock()
            .unwrap()
            .insert(module.to_owned(), bounds);
        Ok(bounds)
    }

    /// resolve one identifier inside a module
    pub fn resolve(&self, module: &str, identifier: &str) -> Result<FuncAddr> {
        let bounds = self.module_bounds(module)?;
        match self.matcher.find(bounds.base, bounds.size, identifier) {
            Some(addr) => {
                debug!(module, identifier, addr = format_args!("{addr:#x}"), "identifier resolved");
                Ok(FuncAddr::new(addr))
            }
            None => Err(HookError::SignatureUnresolved {
                module: module.to_owned(),
                identifier: identifier.to_owned(),
            }),
        }
    }

    /// resolve the first identifier that matches, in order
    ///
    /// supports version-skew fallback: later identifiers are not evaluated
    /// once one succeeds. errors other than an unmatched signature (missing
    /// module, unreadable map source) abort immediately.
    pub fn resolve_first_of(&self, module: &str, identifiers: &[&str]) -> Result<FuncAddr> {
        for identifier in identifiers {
            match self.resolve(module, identifier) {
                Ok(addr) => return Ok(addr),
                Err(HookError::SignatureUnresolved { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(HookError::SignatureUnresolved {
            module: module.to_owned(),
            identifier: identifiers.join(" | "),
        })
    }
}
