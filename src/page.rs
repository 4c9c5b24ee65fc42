//! Page and byte arithmetic.

use crate::error::{Error, Result};
use nix::unistd;

/// Queries the machine page size.
pub fn page_size() -> Result<usize> {
    match unistd::sysconf(unistd::SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => Ok(size as usize),
        Ok(_) => Err(Error::Validation("Unable to get pagesize".to_string())),
        Err(err) => Err(Error::nix("Unable to get pagesize", err)),
    }
}

/// Number of pages needed to cover `len` bytes.
pub fn pages_for(len: u64, page_size: usize) -> usize {
    let page_size = page_size as u64;
    ((len + page_size - 1) / page_size) as usize
}

/// First byte of page `index`.
pub fn page_start(index: usize, page_size: usize) -> u64 {
    index as u64 * page_size as u64
}

/// Page holding byte `offset`.
pub fn page_of(offset: u64, page_size: usize) -> usize {
    (offset / page_size as u64) as usize
}

/// Rounds `offset` down to a multiple of `alignment`.
pub fn align_down(offset: u64, alignment: u64) -> u64 {
    offset - offset % alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size().unwrap();
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0, 4096), 0);
        assert_eq!(pages_for(1, 4096), 1);
        assert_eq!(pages_for(4096, 4096), 1);
        assert_eq!(pages_for(4097, 4096), 2);
        assert_eq!(pages_for(1_048_576, 4096), 256);
    }

    #[test]
    fn test_page_addressing() {
        assert_eq!(page_start(0, 4096), 0);
        assert_eq!(page_start(9, 4096), 36864);
        assert_eq!(page_of(36864, 4096), 9);
        assert_eq!(page_of(36863, 4096), 8);
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(1000, 512), 512);
        assert_eq!(align_down(1024, 512), 1024);
        assert_eq!(align_down(77, 1), 77);
        assert_eq!(align_down(4095, 4096), 0);
    }
}
