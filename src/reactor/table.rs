use super::core::Reactor;
use super::event::{Directions, Fired, Handle, Interest};
use super::timer::DeadlineEntry;
use crate::error::{Error, Result};
use crate::utils::Slab;

use std::collections::{BinaryHeap, HashMap};
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

/// Type-erased registration callback.
///
/// The caller-supplied callback and its opaque argument are folded into
/// one boxed `FnOnce` at registration time; `FnOnce` is what makes the
/// one-shot contract structural. No `Send` bound: the reactor is
/// single-threaded by construction.
pub(crate) type Callback = Box<dyn FnOnce(&mut Reactor, Handle, Fired) -> Result<()>>;

/// A pending registration. Its deadline, if any, lives in the table's
/// heap, keyed back to this entry by `(token, seq)`.
pub(crate) struct Registration {
    pub(crate) seq: u64,
    pub(crate) fd: RawFd,
    pub(crate) interest: Interest,
    pub(crate) callback: Callback,
}

/// Direction slots of one descriptor.
///
/// At most one registration may occupy each direction. A `ReadWrite`
/// registration stores the same token in both slots.
#[derive(Default)]
struct FdSlots {
    read: Option<usize>,
    write: Option<usize>,
}

/// Authoritative mapping from (descriptor, direction) to the single
/// pending registration, plus the deadline index the dispatch loop uses
/// to bound its wait.
///
/// Pure bookkeeping: the table never talks to the poller. The reactor
/// reads [`union`](Self::union) after every mutation to keep the
/// OS-level registration of a descriptor in sync.
pub(crate) struct EventTable {
    slots: Slab<Registration>,
    fds: HashMap<RawFd, FdSlots>,
    deadlines: BinaryHeap<DeadlineEntry>,
    next_seq: u64,
}

impl EventTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Slab::new(64),
            fds: HashMap::new(),
            deadlines: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Inserts a registration, rejecting occupied directions.
    ///
    /// The duplicate policy is **reject**: a second registration for a
    /// direction that already has a pending one fails with
    /// [`Error::AlreadyRegistered`] and leaves the pending registration
    /// untouched. A `ReadWrite` insert requires both directions free.
    pub(crate) fn insert(
        &mut self,
        fd: RawFd,
        interest: Interest,
        deadline: Option<Instant>,
        callback: Callback,
    ) -> Result<Handle> {
        if let Some(slots) = self.fds.get(&fd) {
            let read_taken = interest.wants_read() && slots.read.is_some();
            let write_taken = interest.wants_write() && slots.write.is_some();
            if read_taken || write_taken {
                return Err(Error::AlreadyRegistered { fd, interest });
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let token = self.slots.insert(Registration {
            seq,
            fd,
            interest,
            callback,
        });

        let slots = self.fds.entry(fd).or_default();
        if interest.wants_read() {
            slots.read = Some(token);
        }
        if interest.wants_write() {
            slots.write = Some(token);
        }

        if let Some(deadline) = deadline {
            self.deadlines.push(DeadlineEntry {
                deadline,
                seq,
                token,
            });
        }

        Ok(Handle { token, seq })
    }

    /// Removes the registration identified by `handle`, if still pending.
    ///
    /// Idempotent: stale handles (already fired, already cancelled, or
    /// slot reused by a newer registration) return `None`.
    pub(crate) fn remove(&mut self, handle: Handle) -> Option<Registration> {
        if !self.live(handle.token, handle.seq) {
            return None;
        }
        self.take(handle.token).map(|(_, reg)| reg)
    }

    /// Remaining time until the earliest live deadline.
    ///
    /// `None` when every pending registration waits indefinitely.
    /// Stale heap entries surfacing at the top are discarded here.
    pub(crate) fn next_deadline(&mut self, now: Instant) -> Option<Duration> {
        while let Some(top) = self.deadlines.peek() {
            if self.live(top.token, top.seq) {
                return Some(top.deadline.saturating_duration_since(now));
            }
            self.deadlines.pop();
        }
        None
    }

    /// Removes and returns one registration matching the reported
    /// readiness of `fd`, tagged with the direction that fired.
    ///
    /// Resolution order: the combined case first (a `ReadWrite`
    /// registration with both directions ready fires once, tagged
    /// [`Fired::ReadWrite`]), then read, then write. An unknown
    /// descriptor or an already-removed slot yields `None` — spurious
    /// wakeups after cancellation are expected and benign.
    ///
    /// Registrations with `seq >= watermark` were created during the
    /// current dispatch iteration and are invisible, so a re-arm from
    /// inside a callback never fires in the iteration that created it.
    pub(crate) fn resolve(
        &mut self,
        fd: RawFd,
        readable: bool,
        writable: bool,
        watermark: u64,
    ) -> Option<(Handle, Registration, Fired)> {
        let slots = self.fds.get(&fd)?;
        let read_token = slots.read;
        let write_token = slots.write;

        if readable && writable && read_token.is_some() && read_token == write_token {
            let token = read_token?;
            if self.visible(token, watermark) {
                return self.take(token).map(|(h, r)| (h, r, Fired::ReadWrite));
            }
            return None;
        }

        if readable {
            if let Some(token) = read_token {
                if self.visible(token, watermark) {
                    return self.take(token).map(|(h, r)| (h, r, Fired::Read));
                }
            }
        }

        if writable {
            if let Some(token) = write_token {
                if self.visible(token, watermark) {
                    return self.take(token).map(|(h, r)| (h, r, Fired::Write));
                }
            }
        }

        None
    }

    /// Removes and returns the earliest registration whose deadline is
    /// at or before `now`, in ascending `(deadline, insertion)` order.
    ///
    /// The iterator form of timeout expiry: the dispatch loop drains one
    /// registration at a time, so a callback that cancels an expired but
    /// not-yet-delivered sibling genuinely prevents it from firing.
    /// Registrations created during the current iteration
    /// (`seq >= watermark`) wait for the next turn of the loop.
    pub(crate) fn expire_next(&mut self, now: Instant, watermark: u64) -> Option<(Handle, Registration)> {
        while let Some(top) = self.deadlines.peek() {
            let Some(reg) = self.slots.get(top.token) else {
                self.deadlines.pop();
                continue;
            };
            if reg.seq != top.seq {
                self.deadlines.pop();
                continue;
            }
            if top.deadline > now || reg.seq >= watermark {
                return None;
            }
            let token = top.token;
            self.deadlines.pop();
            return self.take(token);
        }
        None
    }

    /// Current interest union of `fd`, `None` when nothing is registered
    /// on it.
    pub(crate) fn union(&self, fd: RawFd) -> Option<Directions> {
        let slots = self.fds.get(&fd)?;
        Some(Directions {
            read: slots.read.is_some(),
            write: slots.write.is_some(),
        })
    }

    /// Sequence watermark: registrations allocated from here on are
    /// newer than the current dispatch iteration.
    pub(crate) fn watermark(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn live(&self, token: usize, seq: u64) -> bool {
        self.slots.get(token).is_some_and(|reg| reg.seq == seq)
    }

    fn visible(&self, token: usize, watermark: u64) -> bool {
        self.slots.get(token).is_some_and(|reg| reg.seq < watermark)
    }

    fn take(&mut self, token: usize) -> Option<(Handle, Registration)> {
        let reg = self.slots.remove(token)?;
        self.unlink(reg.fd, reg.interest, token);
        // the deadline heap entry, if any, is left for lazy cleanup
        Some((
            Handle {
                token,
                seq: reg.seq,
            },
            reg,
        ))
    }

    fn unlink(&mut self, fd: RawFd, interest: Interest, token: usize) {
        if let Some(slots) = self.fds.get_mut(&fd) {
            if interest.wants_read() {
                debug_assert_eq!(slots.read, Some(token));
                slots.read = None;
            }
            if interest.wants_write() {
                debug_assert_eq!(slots.write, Some(token));
                slots.write = None;
            }
            if slots.read.is_none() && slots.write.is_none() {
                self.fds.remove(&fd);
            }
        }
    }
}
