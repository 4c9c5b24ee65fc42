use nix::errno::Errno;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Validation(String),
    IO { context: String, source: io::Error },
    Nix { context: String, source: nix::Error },
    AllocFailed { context: String },
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::IO {
            context: context.into(),
            source,
        }
    }

    pub fn nix(context: impl Into<String>, source: nix::Error) -> Self {
        Error::Nix {
            context: context.into(),
            source,
        }
    }

    /// Process exit code used when this error is fatal.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::AllocFailed { .. } => 2,
            _ => 1,
        }
    }

    pub fn is_alloc_failure(&self) -> bool {
        matches!(self, Error::AllocFailed { .. })
    }
}

fn write_errno(f: &mut fmt::Formatter<'_>, context: &str, errno: Errno) -> fmt::Result {
    write!(f, "{}: {:.100} ({})", context, errno.desc(), errno as i32)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => f.write_str(msg),
            Error::IO { context, source } => match source.raw_os_error() {
                Some(code) => write_errno(f, context, Errno::from_i32(code)),
                None => write!(f, "{}: {}", context, source),
            },
            Error::Nix { context, source } => write_errno(f, context, *source),
            Error::AllocFailed { context } => f.write_str(context),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO { source, .. } => Some(source),
            Error::Nix { source, .. } => Some(source),
            _ => None,
        }
    }
}
