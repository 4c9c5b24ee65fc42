use crate::advice::{self, Advice};
use crate::error::{Error, Result};
use crate::page;
use crate::report::Reporter;
use crate::target::FileTarget;
use log::debug;
use nix::libc;
use nix::sys::uio;
use nix::unistd::{self, Whence};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::convert::TryFrom;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_ALIGNMENT: u64 = 512;
pub const DEFAULT_MIN_BLOCK_SIZE: u64 = 512;
pub const DEFAULT_MAX_BLOCK_SIZE: u64 = 32768;

/// Raw option values. `None` and `Some(0)` both select the default.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub min_block_size: Option<i64>,
    pub max_block_size: Option<i64>,
    pub hint: bool,
    pub window_length: Option<i64>,
    pub window_start: Option<i64>,
    pub positional: bool,
    pub prefetch: bool,
    pub read_size: Option<i64>,
    pub alignment: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    pub start: u64,
    pub length: u64,
}

impl ReadWindow {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizeRange {
    pub min: u64,
    pub max: u64,
}

impl BlockSizeRange {
    /// Swaps an inverted range. Returns whether a swap happened.
    pub fn normalize(&mut self) -> bool {
        if self.max < self.min {
            std::mem::swap(&mut self.min, &mut self.max);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    None,
    Hint,
    Prefetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConfig {
    pub window: ReadWindow,
    pub blocks: BlockSizeRange,
    pub alignment: u64,
    pub to_read: u64,
    pub cache_op: CacheOp,
    /// Both a hint and a prefetch were asked for; only the hint is issued.
    pub hint_conflict: bool,
    pub positional: bool,
}

fn given(value: Option<i64>) -> Option<i64> {
    value.filter(|&v| v != 0)
}

fn positive(value: Option<i64>, what: &str) -> Result<Option<u64>> {
    match given(value) {
        Some(v) if v < 0 => Err(Error::Validation(format!("Invalid {}: {}", what, v))),
        v => Ok(v.map(|v| v as u64)),
    }
}

impl ReadConfig {
    pub fn resolve(opts: &ReadOptions, path: &Path, file_size: u64) -> Result<ReadConfig> {
        let to_read = positive(opts.read_size, "read size")?.unwrap_or(file_size / 8);
        let max = positive(opts.max_block_size, "max block size")?
            .unwrap_or(DEFAULT_MAX_BLOCK_SIZE);
        let min = positive(opts.min_block_size, "min block size")?
            .unwrap_or(DEFAULT_MIN_BLOCK_SIZE);

        let start = positive(opts.window_start, "start offset")?.unwrap_or(0);
        if start > file_size {
            return Err(Error::Validation(format!(
                "Start offset beyond '{}' size: {}",
                path.display(),
                start
            )));
        }

        let length = match positive(opts.window_length, "initial length")? {
            Some(length) if start + length > file_size => {
                return Err(Error::Validation(format!(
                    "Target zone beyond '{}' size: {}",
                    path.display(),
                    start + length
                )))
            }
            Some(length) => length,
            None => file_size - start,
        };

        let alignment = positive(opts.alignment, "alignment")?.unwrap_or(DEFAULT_ALIGNMENT);

        let cache_op = if opts.hint {
            CacheOp::Hint
        } else if opts.prefetch {
            CacheOp::Prefetch
        } else {
            CacheOp::None
        };

        Ok(ReadConfig {
            window: ReadWindow { start, length },
            blocks: BlockSizeRange { min, max },
            alignment,
            to_read,
            cache_op,
            hint_conflict: opts.hint && opts.prefetch,
            positional: opts.positional,
        })
    }
}

#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new(len: u64) -> Result<ScratchBuffer> {
        let mut buffer = ScratchBuffer { buf: Vec::new() };
        buffer
            .reserve(len)
            .map_err(|_| Error::AllocFailed {
                context: format!("Unable to allocate memory for buffer ({} bytes)", len),
            })?;
        Ok(buffer)
    }

    pub fn grow(&mut self, len: u64) -> Result<()> {
        self.reserve(len).map_err(|_| Error::AllocFailed {
            context: format!("Failed to expand buffer to {} bytes", len),
        })
    }

    fn reserve(&mut self, len: u64) -> core::result::Result<(), ()> {
        let len = usize::try_from(len).map_err(drop)?;
        if len > self.buf.len() {
            self.buf
                .try_reserve_exact(len - self.buf.len())
                .map_err(drop)?;
            self.buf.resize(len, 0);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn block(&mut self, len: usize) -> &mut [u8] {
        &mut self.buf[..len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub offset: u64,
    pub len: u64,
}

/// The block range shrinks as the bytes still owed drop below its maximum,
/// and never recovers.
#[derive(Debug, Clone)]
pub struct BlockPicker {
    window: ReadWindow,
    blocks: BlockSizeRange,
    alignment: u64,
    file_size: u64,
}

impl BlockPicker {
    pub fn new(window: ReadWindow, blocks: BlockSizeRange, alignment: u64, file_size: u64) -> Self {
        BlockPicker {
            window,
            blocks,
            alignment,
            file_size,
        }
    }

    pub fn blocks(&self) -> BlockSizeRange {
        self.blocks
    }

    /// Both fractions must lie in `[0, 1]`.
    pub fn pick(&mut self, remaining: u64, size_fraction: f64, offset_fraction: f64) -> ReadRequest {
        debug_assert!((0.0..=1.0).contains(&size_fraction));
        debug_assert!((0.0..=1.0).contains(&offset_fraction));

        if remaining < self.blocks.max {
            self.blocks.max = remaining;
        }
        if self.blocks.max < self.blocks.min {
            self.blocks.min = self.blocks.max;
        }

        let spread = (self.blocks.max - self.blocks.min) as f64;
        let len = self.blocks.min + (spread * size_fraction) as u64;
        let mut offset = self.window.start + (self.window.length as f64 * offset_fraction) as u64;

        if offset > self.file_size {
            offset = self.file_size;
        }
        offset = page::align_down(offset, self.alignment);
        if offset >= self.window.start + len {
            offset -= len;
        }

        ReadRequest { offset, len }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub reads: u64,
    pub bytes_read: u64,
}

pub fn clock_seeded_rng() -> StdRng {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_micros())
        .unwrap_or(0);
    StdRng::seed_from_u64(micros as u64)
}

/// Returns the operation actually issued.
fn issue_cache_op(target: &FileTarget, config: &ReadConfig, reporter: &Reporter) -> CacheOp {
    let ReadWindow { start, length } = config.window;
    match config.cache_op {
        CacheOp::Hint => {
            if let Err(err) = advice::hint(target.as_raw_fd(), start, length, Advice::WillNeed) {
                reporter.warning(Error::nix(
                    format!("Unable to give cache hints for '{}'", target.path().display()),
                    err,
                ));
            }
            if config.hint_conflict {
                reporter.warning("Prefetch & FS hints are mutually exclusive");
            }
        }
        CacheOp::Prefetch => {
            if let Err(err) = advice::prefetch(target.as_raw_fd(), start, length) {
                debug!("prefetch of '{}' failed: {}", target.path().display(), err.desc());
            }
        }
        CacheOp::None => {}
    }
    config.cache_op
}

fn read_block(
    target: &FileTarget,
    buf: &mut [u8],
    offset: u64,
    positional: bool,
    reporter: &Reporter,
) -> Result<usize> {
    let fd = target.as_raw_fd();
    let result = if positional {
        uio::pread(fd, buf, offset as libc::off_t)
    } else {
        match unistd::lseek(fd, offset as libc::off_t, Whence::SeekSet) {
            Ok(pos) if pos as u64 == offset => {}
            Ok(_) => reporter.warning(format!(
                "Unable to seek to {} in '{}'",
                offset,
                target.path().display()
            )),
            Err(err) => reporter.warning(Error::nix(
                format!("Unable to seek to {} in '{}'", offset, target.path().display()),
                err,
            )),
        }
        unistd::read(fd, buf)
    };

    result.map_err(|e| {
        Error::nix(
            format!(
                "Error while reading '{}', offset: {}",
                target.path().display(),
                offset
            ),
            e,
        )
    })
}

/// Reads `config.to_read` bytes from random positions of `target`'s window,
/// then closes it.
pub fn run<R: Rng, W: Write>(
    target: FileTarget,
    config: &ReadConfig,
    rng: &mut R,
    reporter: &Reporter,
    out: &mut W,
) -> Result<ReadStats> {
    let output_error = |e: std::io::Error| Error::io("Unable to write report", e);
    let path = target.path().display().to_string();
    let start = config.window.start;
    let end = config.window.end();

    let issued = issue_cache_op(&target, config, reporter);

    let mut blocks = config.blocks;
    let mut buffer = ScratchBuffer::new(blocks.max)?;

    writeln!(
        out,
        "Will read {} bytes from '{}', window: [{}:{}], minb: {}, maxb: {}, alignment: {}",
        config.to_read, path, start, end, blocks.min, blocks.max, config.alignment
    )
    .map_err(output_error)?;
    let announced = match issued {
        CacheOp::Hint => writeln!(
            out,
            "Hints given to the FS, read from window [{}:{}] from '{}'",
            start, end, path
        ),
        CacheOp::Prefetch => writeln!(
            out,
            "Instructed the pagecache to prefetch window [{}:{}] from '{}'",
            start, end, path
        ),
        CacheOp::None => Ok(()),
    };
    announced.map_err(output_error)?;

    if blocks.max < blocks.min {
        writeln!(
            out,
            "minbsize ({}) > maxbsize ({}), min <=> max",
            blocks.min, blocks.max
        )
        .map_err(output_error)?;
        blocks.normalize();
        buffer.grow(blocks.max)?;
    }

    let mut picker = BlockPicker::new(config.window, blocks, config.alignment, target.size());
    let mut stats = ReadStats::default();
    let mut remaining = config.to_read;

    while remaining > 0 {
        let request = picker.pick(remaining, rng.gen_range(0.0..=1.0), rng.gen_range(0.0..=1.0));
        let nr = read_block(
            &target,
            buffer.block(request.len as usize),
            request.offset,
            config.positional,
            reporter,
        )?;
        if nr == 0 && request.len > 0 {
            return Err(Error::io(
                format!("Error while reading '{}', offset: {}", path, request.offset),
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "unexpected end of file"),
            ));
        }

        remaining = remaining.saturating_sub(nr as u64);
        stats.reads += 1;
        stats.bytes_read += nr as u64;
    }

    if let Err(err) = target.close() {
        reporter.warning(err);
    }
    Ok(stats)
}
