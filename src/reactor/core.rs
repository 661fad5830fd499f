use super::event::{Directions, Fired, Handle, Interest, PollEvent};
use super::poller::Poller;
use super::table::{Callback, EventTable};
use crate::error::{Error, Result};

use std::os::fd::RawFd;
use std::time::{Duration, Instant};

/// A single-threaded one-shot readiness reactor.
///
/// A `Reactor` owns an event table and a platform poller context.
/// Callers register interest in a descriptor with [`read`](Self::read),
/// [`write`](Self::write) or [`read_write`](Self::read_write), then run
/// [`dispatch`](Self::dispatch), which blocks until descriptors become
/// ready or timeouts elapse and invokes the matching callbacks, one at a
/// time, on the calling thread.
///
/// Every registration fires at most once and is removed from the table
/// before its callback runs. Callbacks receive `&mut Reactor` and may
/// re-register or cancel freely; such mutations take effect on the next
/// iteration of the dispatch loop.
pub struct Reactor {
    table: EventTable,
    poller: Poller,
}

impl Reactor {
    /// Creates a reactor with its own poller context.
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: EventTable::new(),
            poller: Poller::new()?,
        })
    }

    /// Registers interest in `fd` becoming readable.
    ///
    /// `callback` is invoked as `callback(reactor, handle, fired, arg)`
    /// exactly once — when the descriptor turns readable, or with
    /// [`Fired::Timeout`] if `timeout` elapses first. `arg` is threaded
    /// back unmodified; the reactor never inspects it. `timeout: None`
    /// waits indefinitely.
    pub fn read<T, F>(
        &mut self,
        fd: RawFd,
        callback: F,
        timeout: Option<Duration>,
        arg: T,
    ) -> Result<Handle>
    where
        F: FnOnce(&mut Reactor, Handle, Fired, T) -> Result<()> + 'static,
        T: 'static,
    {
        self.register(fd, Interest::Read, callback, timeout, arg)
    }

    /// Registers interest in `fd` becoming writable.
    ///
    /// Same contract as [`read`](Self::read).
    pub fn write<T, F>(
        &mut self,
        fd: RawFd,
        callback: F,
        timeout: Option<Duration>,
        arg: T,
    ) -> Result<Handle>
    where
        F: FnOnce(&mut Reactor, Handle, Fired, T) -> Result<()> + 'static,
        T: 'static,
    {
        self.register(fd, Interest::Write, callback, timeout, arg)
    }

    /// Registers interest in `fd` becoming readable *or* writable.
    ///
    /// A single registration occupying both direction slots; it fires on
    /// whichever direction becomes ready first. If one wakeup reports
    /// both directions at once, the callback runs once, tagged
    /// [`Fired::ReadWrite`].
    pub fn read_write<T, F>(
        &mut self,
        fd: RawFd,
        callback: F,
        timeout: Option<Duration>,
        arg: T,
    ) -> Result<Handle>
    where
        F: FnOnce(&mut Reactor, Handle, Fired, T) -> Result<()> + 'static,
        T: 'static,
    {
        self.register(fd, Interest::ReadWrite, callback, timeout, arg)
    }

    /// Cancels a pending registration.
    ///
    /// Returns `true` if the registration was still pending — its
    /// callback will never run. Stale handles (already fired, already
    /// cancelled) return `false`; cancellation races are benign.
    pub fn cancel(&mut self, handle: Handle) -> bool {
        match self.table.remove(handle) {
            Some(reg) => {
                self.sync_poller(reg.fd);
                true
            }
            None => false,
        }
    }

    /// Number of pending registrations.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Runs the dispatch loop until no registration remains.
    ///
    /// Each iteration computes the earliest deadline, blocks on the
    /// readiness primitive for at most that long, fires the callback of
    /// every registration whose descriptor was reported ready, then
    /// fires expired registrations with [`Fired::Timeout`] in ascending
    /// deadline order (ties in insertion order).
    ///
    /// Returns `Ok(())` once the table drains. A poller failure or an
    /// `Err` from a callback propagates immediately; every registration
    /// that has not fired stays pending, so `dispatch` can be called
    /// again.
    pub fn dispatch(&mut self) -> Result<()> {
        let mut ready: Vec<PollEvent> = Vec::with_capacity(64);

        while !self.table.is_empty() {
            let timeout = self.table.next_deadline(Instant::now());
            self.poller.poll(&mut ready, timeout)?;

            // registrations created from here on belong to the next iteration
            let watermark = self.table.watermark();

            for event in ready.drain(..) {
                let mut readable = event.readable;
                let mut writable = event.writable;

                while readable || writable {
                    let Some((handle, reg, fired)) =
                        self.table.resolve(event.fd, readable, writable, watermark)
                    else {
                        break;
                    };

                    match fired {
                        Fired::Read => readable = false,
                        Fired::Write => writable = false,
                        Fired::ReadWrite | Fired::Timeout => {
                            readable = false;
                            writable = false;
                        }
                    }

                    self.sync_poller(reg.fd);
                    (reg.callback)(self, handle, fired)?;
                }
            }

            let now = Instant::now();
            while let Some((handle, reg)) = self.table.expire_next(now, watermark) {
                self.sync_poller(reg.fd);
                (reg.callback)(self, handle, Fired::Timeout)?;
            }
        }

        Ok(())
    }

    fn register<T, F>(
        &mut self,
        fd: RawFd,
        interest: Interest,
        callback: F,
        timeout: Option<Duration>,
        arg: T,
    ) -> Result<Handle>
    where
        F: FnOnce(&mut Reactor, Handle, Fired, T) -> Result<()> + 'static,
        T: 'static,
    {
        if fd < 0 {
            return Err(Error::InvalidDescriptor(fd));
        }

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let was = self.table.union(fd);

        let boxed: Callback =
            Box::new(move |reactor, handle, fired| callback(reactor, handle, fired, arg));
        let handle = self.table.insert(fd, interest, deadline, boxed)?;

        let directions = Directions {
            read: was.is_some_and(|d| d.read) || interest.wants_read(),
            write: was.is_some_and(|d| d.write) || interest.wants_write(),
        };
        let synced = match was {
            None => self.poller.register(fd, directions),
            Some(_) => self.poller.reregister(fd, directions),
        };
        if let Err(e) = synced {
            self.table.remove(handle);
            return Err(Error::Io(e));
        }

        Ok(handle)
    }

    /// Re-syncs the OS-level registration of `fd` with the table after a
    /// removal: shrink to the remaining interest union, or drop the
    /// descriptor entirely. Failures are ignored — the descriptor may
    /// already have been closed by the caller, which removes it from the
    /// poller on its own.
    fn sync_poller(&mut self, fd: RawFd) {
        match self.table.union(fd) {
            Some(directions) => {
                let _ = self.poller.reregister(fd, directions);
            }
            None => self.poller.deregister(fd),
        }
    }
}
