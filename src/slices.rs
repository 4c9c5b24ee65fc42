//! Merging a residency bitmap into contiguous resident byte ranges.

use crate::bitmap::BitVector;
use crate::page;
use std::ops::Range;

/// A maximal run of resident pages, as an inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidencySlice {
    pub start_byte: u64,
    pub end_byte: u64,
    page_size: usize,
}

impl ResidencySlice {
    pub fn page_count(&self) -> u64 {
        (self.end_byte + 1 - self.start_byte) / self.page_size as u64
    }

    /// Page indices covered by the slice.
    pub fn pages(&self) -> Range<usize> {
        let first = page::page_of(self.start_byte, self.page_size);
        first..page::page_of(self.end_byte, self.page_size) + 1
    }
}

enum ScanState {
    NotInSlice,
    InSlice { start_byte: u64, end_byte: u64 },
}

/// Iterator over the slices of a bitmap, in ascending page order.
pub struct Slices<'a> {
    bitmap: &'a BitVector,
    page_size: usize,
    next_page: usize,
    state: ScanState,
}

impl<'a> Slices<'a> {
    pub fn new(bitmap: &'a BitVector, page_size: usize) -> Self {
        Slices {
            bitmap,
            page_size,
            next_page: 0,
            state: ScanState::NotInSlice,
        }
    }

    fn close(&mut self) -> Option<ResidencySlice> {
        match std::mem::replace(&mut self.state, ScanState::NotInSlice) {
            ScanState::InSlice {
                start_byte,
                end_byte,
            } => Some(ResidencySlice {
                start_byte,
                end_byte,
                page_size: self.page_size,
            }),
            ScanState::NotInSlice => None,
        }
    }
}

impl<'a> Iterator for Slices<'a> {
    type Item = ResidencySlice;

    fn next(&mut self) -> Option<ResidencySlice> {
        while self.next_page < self.bitmap.len() {
            let k = self.next_page;
            self.next_page += 1;

            if self.bitmap.is_resident(k) {
                match &mut self.state {
                    ScanState::InSlice { end_byte, .. } => *end_byte += self.page_size as u64,
                    ScanState::NotInSlice => {
                        let start_byte = page::page_start(k, self.page_size);
                        self.state = ScanState::InSlice {
                            start_byte,
                            end_byte: start_byte + self.page_size as u64 - 1,
                        };
                    }
                }
            } else if let ScanState::InSlice { .. } = self.state {
                return self.close();
            }
        }
        // The last page of the file may still be open.
        self.close()
    }
}

/// Marks every page inside `slices` resident, and all others not.
pub fn expand(slices: &[ResidencySlice], total_pages: usize) -> BitVector {
    let mut flags = vec![false; total_pages];
    for slice in slices {
        for k in slice.pages() {
            flags[k] = true;
        }
    }
    flags.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const PAGE: usize = 4096;

    fn bitmap(total: usize, resident: &[usize]) -> BitVector {
        (0..total).map(|k| resident.contains(&k)).collect()
    }

    #[test]
    fn test_two_slices() {
        let bits = bitmap(16, &[2, 3, 4, 9]);
        let slices: Vec<_> = Slices::new(&bits, PAGE).collect();

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].start_byte, 2 * 4096);
        assert_eq!(slices[0].end_byte, 5 * 4096 - 1);
        assert_eq!(slices[0].page_count(), 3);
        assert_eq!(slices[0].pages(), 2..5);
        assert_eq!(slices[1].start_byte, 9 * 4096);
        assert_eq!(slices[1].end_byte, 10 * 4096 - 1);
        assert_eq!(slices[1].page_count(), 1);
        assert_eq!(bits.resident_count(), 4);
    }

    #[test]
    fn test_trailing_slice_is_emitted() {
        let bits = bitmap(4, &[1, 2, 3]);
        let slices: Vec<_> = Slices::new(&bits, PAGE).collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].pages(), 1..4);
        assert_eq!(slices[0].end_byte, 4 * 4096 - 1);
    }

    #[test]
    fn test_no_resident_pages() {
        let bits = bitmap(8, &[]);
        assert_eq!(Slices::new(&bits, PAGE).count(), 0);

        let empty = bitmap(0, &[]);
        assert_eq!(Slices::new(&empty, PAGE).count(), 0);
    }

    #[test]
    fn test_fully_resident() {
        let bits = bitmap(5, &[0, 1, 2, 3, 4]);
        let slices: Vec<_> = Slices::new(&bits, PAGE).collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].start_byte, 0);
        assert_eq!(slices[0].page_count(), 5);
    }

    #[test]
    fn test_expand_reproduces_bitmap() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let total = rng.gen_range(0..96);
            let bits: BitVector = (0..total).map(|_| rng.gen_bool(0.4)).collect();
            let slices: Vec<_> = Slices::new(&bits, PAGE).collect();

            assert_eq!(expand(&slices, total), bits);
            let counted: u64 = slices.iter().map(|s| s.page_count()).sum();
            assert_eq!(counted as usize, bits.resident_count());
        }
    }

    #[test]
    fn test_slices_are_maximal() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let bits: BitVector = (0..64).map(|_| rng.gen_bool(0.5)).collect();
            let slices: Vec<_> = Slices::new(&bits, 512).collect();
            for pair in slices.windows(2) {
                // A gap of at least one page separates neighbours.
                assert!(pair[0].end_byte + 1 < pair[1].start_byte);
            }
        }
    }
}
