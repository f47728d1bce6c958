//! Signature pattern scanning
//!
//! Byte-pattern matcher used as the default [`SignatureMatcher`]. Patterns
//! are space-separated hex bytes with `?` (or `??`) wildcards, e.g.
//! `"FF 43 28 ? ? 91 F3 03"`.

use super::SignatureMatcher;

/// wildcard byte-pattern scanner
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScanner;

impl PatternScanner {
    pub fn new() -> Self {
        Self
    }

    /// scan a byte slice for the pattern, returning the match offset
    pub fn find_in(&self, data: &[u8], pattern: &str) -> Option<usize> {
        let (bytes, mask) = parse_pattern(pattern)?;
        if bytes.is_empty() || bytes.len() > data.len() {
            return None;
        }

        data.windows(bytes.len()).position(|window| {
            window
                .iter()
                .zip(bytes.iter().zip(mask.iter()))
                .all(|(&data_byte, (&pattern_byte, &is_wildcard))| {
                    is_wildcard || data_byte == pattern_byte
                })
        })
    }
}

impl SignatureMatcher for PatternScanner {
    fn find(&self, base: usize, size: usize, pattern: &str) -> Option<usize> {
        // SAFETY: the resolver only hands out ranges taken from the process
        // memory map, so [base, base + size) is mapped and readable
        let data = unsafe { core::slice::from_raw_parts(base as *const u8, size) };
        self.find_in(data, pattern).map(|offset| base + offset)
    }
}

fn parse_pattern(pattern: &str) -> Option<(Vec<u8>, Vec<bool>)> {
    let parts: Vec<&str> = pattern.split_whitespace().collect();
    let mut bytes = Vec::with_capacity(parts.len());
    let mut mask = Vec::with_capacity(parts.len());

    for part in parts {
        if part == "?" || part == "??" {
            bytes.push(0);
            mask.push(true); // wildcard
        } else {
            let byte = u8::from_str_radix(part, 16).ok()?;
            bytes.push(byte);
            mask.push(false); // exact match
        }
    }

    Some((bytes, mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_scan() {
        let data = [0x48, 0x8B, 0x05, 0x12, 0x34, 0x56, 0x78, 0x90];
        let scanner = PatternScanner::new();

        assert_eq!(scanner.find_in(&data, "48 8B 05"), Some(0));
        assert_eq!(scanner.find_in(&data, "48 8B ? ? 34"), Some(0));
        assert_eq!(scanner.find_in(&data, "12 34 56"), Some(3));
        assert_eq!(scanner.find_in(&data, "FF FF"), None);
    }

    #[test]
    fn test_pattern_longer_than_data() {
        let data = [0x48, 0x8B];
        let scanner = PatternScanner::new();
        assert_eq!(scanner.find_in(&data, "48 8B 05 12"), None);
    }

    #[test]
    fn test_malformed_pattern() {
        let data = [0x48, 0x8B];
        let scanner = PatternScanner::new();
        assert_eq!(scanner.find_in(&data, "ZZ 8B"), None);
        assert_eq!(scanner.find_in(&data, ""), None);
    }

    #[test]
    fn test_matcher_returns_absolute_address() {
        let data = [0x00u8, 0x11, 0x22, 0x33];
        let base = data.as_ptr() as usize;
        let scanner = PatternScanner::new();
        assert_eq!(scanner.find(base, data.len(), "22 33"), Some(base + 2));
    }
}
