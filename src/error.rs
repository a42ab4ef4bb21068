//! Unified error type.

use std::fmt;

/// The error type returned by wiretap's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, accepting a connection, writing
/// to a writer whose connection is gone, or completing a protocol upgrade.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Hyper(hyper::Error),
    /// The connection was hijacked; the HTTP layer no longer owns it.
    Hijacked,
    /// [`Hijacker::hijack`](crate::Hijacker::hijack) was called twice.
    AlreadyHijacked,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Hyper(e) => write!(f, "hyper: {e}"),
            Self::Hijacked => f.write_str("connection has been hijacked"),
            Self::AlreadyHijacked => f.write_str("connection was already hijacked"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Hyper(e) => Some(e),
            Self::Hijacked | Self::AlreadyHijacked => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Self::Hyper(e)
    }
}
