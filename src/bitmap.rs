use crate::error::{Error, Result};
use std::iter::FromIterator;

#[cfg(target_os = "linux")]
pub(crate) type MincoreChar = u8;

#[cfg(not(target_os = "linux"))]
pub(crate) type MincoreChar = i8;

/// Per-page residency flags as filled in by `mincore`.
///
/// Only the least significant bit of each element is meaningful; the rest is
/// reserved by the kernel and ignored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    raw: Vec<MincoreChar>,
}

impl BitVector {
    /// Allocates a zeroed vector of `pages` entries.
    pub fn zeroed(pages: usize) -> Result<BitVector> {
        let mut raw = Vec::new();
        raw.try_reserve_exact(pages)
            .map_err(|_| Error::AllocFailed {
                context: format!("Unable to allocate pages[{}]", pages),
            })?;
        raw.resize(pages, 0);
        Ok(BitVector { raw })
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_resident(&self, page: usize) -> bool {
        self.raw[page] & 0x1 != 0
    }

    pub fn resident_count(&self) -> usize {
        self.raw.iter().filter(|&&v| v & 0x1 != 0).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.raw.iter().map(|&v| v & 0x1 != 0)
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut MincoreChar {
        self.raw.as_mut_ptr()
    }
}

impl FromIterator<bool> for BitVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        BitVector {
            raw: iter.into_iter().map(|b| b as MincoreChar).collect(),
        }
    }
}
