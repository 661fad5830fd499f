//! macOS `kqueue`-based poller implementation.
//!
//! Functionally equivalent to the Linux `epoll` backend and exposes the
//! same interface to the reactor. kqueue keeps one filter per direction
//! (`EVFILT_READ` / `EVFILT_WRITE`), so a direction union maps to one or
//! two filter registrations, and readiness reported per filter is merged
//! back into one event per descriptor.

use crate::reactor::event::{Directions, PollEvent};

use libc::{EV_ADD, EV_DELETE, EV_EOF, EV_ERROR, EVFILT_READ, EVFILT_WRITE, kevent, kqueue};
use std::io;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

pub(crate) struct KqueuePoller {
    /// Kqueue file descriptor.
    kq: RawFd,

    /// Reusable buffer for kevent results.
    events: Vec<kevent>,
}

impl KqueuePoller {
    pub(crate) fn new() -> io::Result<Self> {
        let kq = unsafe { kqueue() };
        if kq < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            kq,
            events: Vec::with_capacity(64),
        })
    }

    /// Registers a descriptor for the given direction union.
    pub(crate) fn register(&self, fd: RawFd, directions: Directions) -> io::Result<()> {
        if directions.read {
            self.change(fd, EVFILT_READ, EV_ADD)?;
        }
        if directions.write {
            self.change(fd, EVFILT_WRITE, EV_ADD)?;
        }
        Ok(())
    }

    /// Updates the direction union of an already registered descriptor.
    pub(crate) fn reregister(&self, fd: RawFd, directions: Directions) -> io::Result<()> {
        if directions.read {
            self.change(fd, EVFILT_READ, EV_ADD)?;
        } else {
            // dropping a filter that was never added is not an error here
            let _ = self.change(fd, EVFILT_READ, EV_DELETE);
        }
        if directions.write {
            self.change(fd, EVFILT_WRITE, EV_ADD)?;
        } else {
            let _ = self.change(fd, EVFILT_WRITE, EV_DELETE);
        }
        Ok(())
    }

    /// Removes a descriptor. Best-effort, as in the epoll backend.
    pub(crate) fn deregister(&self, fd: RawFd) {
        let _ = self.change(fd, EVFILT_READ, EV_DELETE);
        let _ = self.change(fd, EVFILT_WRITE, EV_DELETE);
    }

    /// Blocks until readiness or timeout; merges per-filter results into
    /// one event per descriptor.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<PollEvent>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timespec = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs() as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(ptr::null(), |ts| ts as *const libc::timespec);

        unsafe {
            self.events.set_len(self.events.capacity());
        }

        let n = unsafe {
            kevent(
                self.kq,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timespec_ptr,
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
            let fd = ev.ident as RawFd;
            let failed = ev.flags & (EV_ERROR | EV_EOF) != 0;
            let readable = ev.filter == EVFILT_READ || failed;
            let writable = ev.filter == EVFILT_WRITE || ev.flags & EV_ERROR != 0;

            if let Some(merged) = events.iter_mut().find(|e| e.fd == fd) {
                merged.readable |= readable;
                merged.writable |= writable;
            } else {
                events.push(PollEvent {
                    fd,
                    readable,
                    writable,
                });
            }
        }

        Ok(())
    }

    fn change(&self, fd: RawFd, filter: i16, flags: u16) -> io::Result<()> {
        let change = kevent {
            ident: fd as libc::uintptr_t,
            filter,
            flags,
            fflags: 0,
            data: 0,
            udata: ptr::null_mut(),
        };

        let rc = unsafe { kevent(self.kq, &change, 1, ptr::null_mut(), 0, ptr::null()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kq);
        }
    }
}
