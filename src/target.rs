use crate::error::{Error, Result};
use nix::unistd;
use std::fs::{self, File, Metadata};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

/// A regular file opened read-only, with its size captured at open time.
#[derive(Debug)]
pub struct FileTarget {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileTarget {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileTarget> {
        let path = path.as_ref().to_path_buf();
        let stat_error = |e| Error::io(format!("Unable to stat '{}'", path.display()), e);

        // Opening a FIFO blocks until a writer shows up, so check before open.
        let meta = fs::metadata(&path).map_err(stat_error)?;
        Self::check_regular(&path, &meta)?;

        let file = File::open(&path)
            .map_err(|e| Error::io(format!("Unable to open '{}'", path.display()), e))?;
        let meta = file.metadata().map_err(stat_error)?;
        Self::check_regular(&path, &meta)?;

        Ok(FileTarget {
            path,
            file,
            size: meta.len(),
        })
    }

    fn check_regular(path: &Path, meta: &Metadata) -> Result<()> {
        if meta.file_type().is_file() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "'{}' is not a regular file",
                path.display()
            )))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Closes the descriptor, surfacing the error `File`'s drop would swallow.
    pub fn close(self) -> Result<()> {
        let context = format!("Problem closing '{}'", self.path.display());
        unistd::close(self.file.into_raw_fd()).map_err(|e| Error::nix(context, e))
    }
}

impl AsRawFd for FileTarget {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
