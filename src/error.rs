//! Reactor error types.

use crate::reactor::Interest;

use std::fmt;
use std::io;
use std::os::fd::RawFd;

#[derive(Debug)]
pub enum Error {
    /// The descriptor handed to a registration call was negative.
    InvalidDescriptor(RawFd),
    /// The descriptor already has a pending registration for the
    /// requested direction. The pending registration is untouched.
    AlreadyRegistered { fd: RawFd, interest: Interest },
    /// The underlying readiness primitive failed. Fatal to `dispatch`;
    /// pending registrations are left in place for a retry.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDescriptor(fd) => write!(f, "invalid descriptor: {fd}"),
            Self::AlreadyRegistered { fd, interest } => {
                write!(f, "descriptor {fd} already registered for {interest:?}")
            }
            Self::Io(e) => write!(f, "readiness primitive: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
