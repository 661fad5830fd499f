use std::os::fd::RawFd;

/// Identity of a pending registration.
///
/// Returned by the registration calls and passed back into the callback
/// when the registration fires. A `Handle` stays valid for exactly one
/// firing: it pairs the registration's table slot with a sequence number,
/// so a handle whose registration has already fired (or whose slot has
/// been reused) is recognized as stale by [`Reactor::cancel`] instead of
/// touching an unrelated registration.
///
/// [`Reactor::cancel`]: super::Reactor::cancel
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Handle {
    pub(crate) token: usize,
    pub(crate) seq: u64,
}

/// The direction(s) of readiness a registration cares about.
///
/// `ReadWrite` is a single registration that occupies both direction
/// slots of its descriptor and fires on whichever direction becomes
/// ready first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Interest {
    Read,
    Write,
    ReadWrite,
}

impl Interest {
    pub(crate) fn wants_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub(crate) fn wants_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// The condition that caused a callback invocation.
///
/// `ReadWrite` is the combined tag: a [`Interest::ReadWrite`]
/// registration whose descriptor was reported ready in both directions
/// by the same wakeup fires once, with this tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fired {
    Read,
    Write,
    ReadWrite,
    Timeout,
}

/// Union of the interests registered on one descriptor.
///
/// The poller holds a single OS-level registration per descriptor; this
/// is what it carries.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Directions {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

/// A readiness event reported by the poller.
pub(crate) struct PollEvent {
    pub(crate) fd: RawFd,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}
