//! Driver shared by the residency probe binaries.

use crate::error::{Error, Result};
use crate::page;
use crate::report::Reporter;
use crate::residency::{self, Residency};
use crate::target::FileTarget;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// Resident page count only.
    Summary,
    /// Resident page count preceded by every resident slice.
    Slices,
}

fn output_error(e: io::Error) -> Error {
    Error::io("Unable to write report", e)
}

/// Probes each file in turn, writing results to `out`.
///
/// Per-file failures are reported as warnings and the next file is
/// processed. Only resource exhaustion and failures to write `out` are
/// returned.
pub fn probe_files<W: Write>(
    out: &mut W,
    files: &[PathBuf],
    style: ReportStyle,
    page_size: usize,
    reporter: &Reporter,
) -> Result<()> {
    writeln!(out, "Pagesize is: {} bytes.", page_size).map_err(output_error)?;

    for path in files {
        let target = match FileTarget::open(path) {
            Ok(target) => target,
            Err(err) => {
                reporter.warning(err);
                continue;
            }
        };

        match residency::probe(&target, page_size, reporter) {
            Ok(Some(residency)) => {
                write_residency(out, path, &residency, style).map_err(output_error)?
            }
            Ok(None) => writeln!(out, "'{}': empty file, not probed", path.display())
                .map_err(output_error)?,
            Err(err) if err.is_alloc_failure() => return Err(err),
            Err(err) => reporter.warning(err),
        }

        if let Err(err) = target.close() {
            reporter.warning(err);
        }
    }
    Ok(())
}

/// Runs [`probe_files`] against stdout with the machine page size.
pub fn run(files: &[PathBuf], style: ReportStyle, reporter: &Reporter) -> Result<()> {
    let page_size = page::page_size()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    probe_files(&mut out, files, style, page_size, reporter)
}

pub fn write_residency<W: Write>(
    out: &mut W,
    path: &Path,
    residency: &Residency,
    style: ReportStyle,
) -> io::Result<()> {
    match style {
        ReportStyle::Summary => write!(out, "'{}': ", path.display())?,
        ReportStyle::Slices => {
            writeln!(out, "'{}':", path.display())?;
            for (sindex, slice) in residency.slices().enumerate() {
                writeln!(
                    out,
                    "\tSlice[{}]: {}:{} ({} pages)",
                    sindex,
                    slice.start_byte,
                    slice.end_byte,
                    slice.page_count()
                )?;
            }
            write!(out, "\t")?;
        }
    }
    writeln!(
        out,
        "{} pages out of {} appear to be in pagecache",
        residency.resident_pages(),
        residency.total_pages()
    )
}
