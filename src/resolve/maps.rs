//! Process memory map introspection
//!
//! Provides the rows the resolver needs to find a module's base address and
//! total mapped size. The source re-reads the mapping table on demand;
//! caching is the resolver's job.

use crate::error::Result;

/// one mapped range in the process image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRegion {
    pub start: usize,
    pub end: usize,
    /// backing path, if the range is file-backed
    pub path: Option<String>,
}

impl MapRegion {
    /// size of the mapped range
    pub fn size(&self) -> usize {
        self.end - self.start
    }

    /// whether this range belongs to the named module
    ///
    /// matched by substring of the backing path, so both bare names
    /// ("libfoo.so") and full paths work.
    pub fn belongs_to(&self, module: &str) -> bool {
        self.path.as_deref().is_some_and(|p| p.contains(module))
    }
}

/// resolved bounds of one mapped module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleBounds {
    /// lowest mapped address of the module
    pub base: usize,
    /// sum of all the module's mapped range sizes
    pub size: usize,
}

/// source of memory map rows for the calling process
pub trait MemoryMapSource {
    /// current mapping table, re-read on every call
    fn regions(&self) -> Result<Vec<MapRegion>>;
}

/// `/proc/self/maps` reader
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcMaps;

#[cfg(target_os = "linux")]
impl MemoryMapSource for ProcMaps {
    fn regions(&self) -> Result<Vec<MapRegion>> {
        let text = std::fs::read_to_string("/proc/self/maps")?;
        Ok(text.lines().filter_map(parse_line).collect())
    }
}

/// parse one maps row: `start-end perms offset dev inode [path]`
fn parse_line(line: &str) -> Option<MapRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let (start, end) = range.split_once('-')?;
    let start = usize::from_str_radix(start, 16).ok()?;
    let end = usize::from_str_radix(end, 16).ok()?;
    if end < start {
        return None;
    }
    // skip perms, offset, dev, inode; what remains is the path
    let path = fields.nth(4).map(str::to_owned);
    Some(MapRegion { start, end, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_backed_line() {
        let region =
            parse_line("7f1c2000-7f1c5000 r-xp 00000000 08:01 39422 /usr/lib/libfoo.so").unwrap();
        assert_eq!(region.start, 0x7f1c2000);
        assert_eq!(region.end, 0x7f1c5000);
        assert_eq!(region.size(), 0x3000);
        assert!(region.belongs_to("libfoo.so"));
        assert!(!region.belongs_to("libbar.so"));
    }

    #[test]
    fn test_parse_anonymous_line() {
        let region = parse_line("7f1c2000-7f1c5000 rw-p 00000000 00:00 0").unwrap();
        assert_eq!(region.path, None);
        assert!(!region.belongs_to("libfoo.so"));
    }

    #[test]
    fn test_parse_garbage_line() {
        assert!(parse_line("not a maps row").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_parse_rejects_inverted_range() {
        // end < start would make size() underflow
        assert!(parse_line("7f1c5000-7f1c2000 r-xp 00000000 08:01 39422 /usr/lib/libfoo.so").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_maps_lists_own_process() {
        let regions = ProcMaps.regions().expect("should read /proc/self/maps");
        assert!(!regions.is_empty());
    }
}
