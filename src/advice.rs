// posix_fadvise reads a zero length as "to the end of the file", so an
// empty range is skipped instead.

use nix::libc;
use std::os::unix::io::RawFd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    WillNeed,
    DontNeed,
}

#[cfg(target_os = "linux")]
pub fn hint(fd: RawFd, start: u64, len: u64, advice: Advice) -> nix::Result<()> {
    use nix::fcntl::{posix_fadvise, PosixFadviseAdvice};

    if len == 0 {
        return Ok(());
    }
    let advice = match advice {
        Advice::WillNeed => PosixFadviseAdvice::POSIX_FADV_WILLNEED,
        Advice::DontNeed => PosixFadviseAdvice::POSIX_FADV_DONTNEED,
    };
    match posix_fadvise(fd, start as libc::off_t, len as libc::off_t, advice) {
        Ok(ret) if ret == 0 => Ok(()),
        Ok(ret) => Err(nix::Error::from_i32(ret)),
        Err(err) => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn hint(_fd: RawFd, _start: u64, len: u64, _advice: Advice) -> nix::Result<()> {
    if len == 0 {
        return Ok(());
    }
    Err(nix::Error::ENOTSUP)
}

#[cfg(target_os = "linux")]
pub fn prefetch(fd: RawFd, start: u64, len: u64) -> nix::Result<()> {
    if len == 0 {
        return Ok(());
    }
    let ret = unsafe { libc::readahead(fd, start as libc::off64_t, len as libc::size_t) };
    nix::Error::result(ret).map(drop)
}

#[cfg(not(target_os = "linux"))]
pub fn prefetch(_fd: RawFd, _start: u64, len: u64) -> nix::Result<()> {
    if len == 0 {
        return Ok(());
    }
    Err(nix::Error::ENOTSUP)
}
