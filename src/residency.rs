use crate::bitmap::BitVector;
use crate::error::{Error, Result};
use crate::page;
use crate::report::Reporter;
use crate::slices::Slices;
use crate::target::FileTarget;
use nix::libc;
use nix::sys::mman;
use std::ffi::c_void;
use std::os::unix::io::AsRawFd;
use std::ptr::null_mut;

/// A shared, read-only mapping of a whole file.
pub struct MappedFile {
    len: usize,
    mmap: *mut c_void,
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        // Only reached without an explicit unmap(), which reports failures.
        if !self.mmap.is_null() {
            let _ = Self::_unmap(self.mmap, self.len);
        }
    }
}

impl MappedFile {
    pub fn map(target: &FileTarget) -> Result<MappedFile> {
        let len = target.size() as usize;
        let mmap = unsafe {
            mman::mmap(
                null_mut(),
                len,
                mman::ProtFlags::PROT_READ,
                mman::MapFlags::MAP_SHARED,
                target.as_raw_fd(),
                0,
            )
        }
        .map_err(|e| Error::nix(format!("Unable to map '{}'", target.path().display()), e))?;

        Ok(MappedFile { len, mmap })
    }

    fn _unmap(mmap: *mut c_void, len: usize) -> nix::Result<()> {
        unsafe { mman::munmap(mmap, len) }
    }

    /// Fills `bitmap` with the residency of every mapped page.
    pub fn mincore(&self, bitmap: &mut BitVector) -> nix::Result<()> {
        nix::Error::result(unsafe { libc::mincore(self.mmap, self.len, bitmap.as_mut_ptr()) })
            .map(drop)
    }

    pub fn unmap(mut self) -> nix::Result<()> {
        let mmap = std::mem::replace(&mut self.mmap, null_mut());
        Self::_unmap(mmap, self.len)
    }
}

/// Result of probing one file.
#[derive(Debug)]
pub struct Residency {
    page_size: usize,
    bitmap: BitVector,
}

impl Residency {
    pub fn new(page_size: usize, bitmap: BitVector) -> Self {
        Residency { page_size, bitmap }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.bitmap.len()
    }

    pub fn resident_pages(&self) -> usize {
        self.bitmap.resident_count()
    }

    pub fn bitmap(&self) -> &BitVector {
        &self.bitmap
    }

    pub fn slices(&self) -> Slices<'_> {
        Slices::new(&self.bitmap, self.page_size)
    }
}

/// `Ok(None)` for an empty file. A failed unmap is only reported.
pub fn probe(target: &FileTarget, page_size: usize, reporter: &Reporter) -> Result<Option<Residency>> {
    if target.size() == 0 {
        return Ok(None);
    }

    let mut bitmap = BitVector::zeroed(page::pages_for(target.size(), page_size))?;
    let mapped = MappedFile::map(target)?;

    let queried = mapped.mincore(&mut bitmap).map_err(|e| {
        Error::nix(
            format!("Unable to get core info for '{}'", target.path().display()),
            e,
        )
    });

    if let Err(err) = mapped.unmap() {
        reporter.warning(Error::nix(
            format!("Unable to unmap '{}'", target.path().display()),
            err,
        ));
    }

    queried.map(|()| Some(Residency::new(page_size, bitmap)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{self, Advice};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn scratch(len: usize) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vec![0xabu8; len]).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    #[test]
    fn test_empty_file_not_probed() {
        let tmp = NamedTempFile::new().unwrap();
        let target = FileTarget::open(tmp.path()).unwrap();
        let reporter = Reporter::new("test");
        let ps = page::page_size().unwrap();
        assert!(probe(&target, ps, &reporter).unwrap().is_none());
    }

    #[test]
    fn test_explicit_unmap_releases_mapping() {
        let ps = page::page_size().unwrap();
        let tmp = scratch(ps * 2);
        let target = FileTarget::open(tmp.path()).unwrap();

        let mapped = MappedFile::map(&target).unwrap();
        let mut bitmap = BitVector::zeroed(2).unwrap();
        mapped.mincore(&mut bitmap).unwrap();
        mapped.unmap().unwrap();

        let reporter = Reporter::capturing("is-in-pagecache");
        probe(&target, ps, &reporter).unwrap().unwrap();
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn test_page_count_rounds_up() {
        let ps = page::page_size().unwrap();
        let tmp = scratch(ps * 3 + 1);
        let target = FileTarget::open(tmp.path()).unwrap();
        let reporter = Reporter::new("test");

        let residency = probe(&target, ps, &reporter).unwrap().unwrap();
        assert_eq!(residency.total_pages(), 4);
        assert!(residency.resident_pages() <= 4);
        assert_eq!(residency.page_size(), ps);
    }

    #[test]
    fn test_written_file_is_resident() {
        let ps = page::page_size().unwrap();
        let tmp = scratch(ps * 8);

        let target = FileTarget::open(tmp.path()).unwrap();
        let reporter = Reporter::new("test");
        let residency = probe(&target, ps, &reporter).unwrap().unwrap();

        // Just-written pages are still in the cache.
        assert_eq!(residency.resident_pages(), 8);
        let slices: Vec<_> = residency.slices().collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].page_count(), 8);
    }

    #[test]
    fn test_slices_match_bitmap_after_hint() {
        let ps = page::page_size().unwrap();
        let tmp = scratch(ps * 16);
        let target = FileTarget::open(tmp.path()).unwrap();
        let _ = advice::hint(target.as_raw_fd(), 0, (ps * 4) as u64, Advice::DontNeed);

        let reporter = Reporter::new("test");
        let residency = probe(&target, ps, &reporter).unwrap().unwrap();
        let slices: Vec<_> = residency.slices().collect();
        let expanded = crate::slices::expand(&slices, residency.total_pages());
        assert!(expanded.iter().eq(residency.bitmap().iter()));
    }
}
