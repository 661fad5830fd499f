//! Linux `epoll`-based poller implementation.
//!
//! One epoll entry per registered descriptor, carrying the union of the
//! directions the table holds for it; the descriptor itself is the epoll
//! token, since the reactor resolves readiness by descriptor.
//!
//! Registration is level-triggered. The reactor removes or shrinks an
//! entry the moment a registration fires, so a descriptor that stays
//! ready cannot re-fire a one-shot registration.

use crate::reactor::event::{Directions, PollEvent};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(64),
        })
    }

    /// Registers a descriptor for the given direction union.
    pub(crate) fn register(&self, fd: RawFd, directions: Directions) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, directions)
    }

    /// Updates the direction union of an already registered descriptor.
    pub(crate) fn reregister(&self, fd: RawFd, directions: Directions) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, directions)
    }

    /// Removes a descriptor. Best-effort: the descriptor may already be
    /// closed, which removed it from the epoll set on its own.
    pub(crate) fn deregister(&self, fd: RawFd) {
        let mut event = epoll_event {
            events: 0,
            u64: fd as u64,
        };
        unsafe {
            epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, &mut event);
        }
    }

    /// Blocks until at least one descriptor becomes ready or the timeout
    /// expires, filling `events` with one entry per ready descriptor.
    ///
    /// `None` blocks indefinitely. An interrupted wait reports zero
    /// events rather than an error; the dispatch loop recomputes its
    /// deadline and retries.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<PollEvent>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        // round up: truncating a sub-millisecond deadline to 0 would spin
        let timeout_ms = match timeout {
            Some(t) => t.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128) as i32,
            None => -1,
        };

        unsafe {
            self.events.set_len(self.events.capacity());
        }

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            unsafe {
                self.events.set_len(0);
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            // error and hang-up conditions surface as readiness so the
            // matching registration can observe them through its own I/O
            let readable = ev.events & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0;
            let writable = ev.events & ((EPOLLOUT | EPOLLERR) as u32) != 0;

            events.push(PollEvent {
                fd: ev.u64 as RawFd,
                readable,
                writable,
            });
        }

        Ok(())
    }

    fn ctl(&self, op: i32, fd: RawFd, directions: Directions) -> io::Result<()> {
        let mut flags = 0;

        if directions.read {
            flags |= EPOLLIN;
        }
        if directions.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
