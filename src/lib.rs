//! # Vigil
//!
//! **Vigil** is a minimal, single-threaded I/O readiness reactor: register
//! interest in a file descriptor becoming readable and/or writable, attach a
//! callback and an optional timeout, and let [`Reactor::dispatch`] block until
//! something happens.
//!
//! Unlike an async runtime, Vigil has no executor, no futures, and no buffering.
//! A registration is **one-shot**: its callback runs at most once — on
//! readiness, on timeout, or never if it is cancelled first — and is removed
//! from the reactor before the callback is invoked. Continued monitoring is
//! expressed by re-registering from inside the callback, which is safe and is
//! the expected usage pattern.
//!
//! The blocking wait is backed by the platform readiness primitive (`epoll` on
//! Linux, `kqueue` on macOS), selected at compile time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::io::Read;
//! use std::net::TcpStream;
//! use std::os::fd::AsRawFd;
//! use vigil::{Fired, Handle, Reactor, Result};
//!
//! fn on_readable(base: &mut Reactor, _event: Handle, kind: Fired, mut conn: TcpStream) -> Result<()> {
//!     let mut buf = [0u8; 512];
//!     let n = conn.read(&mut buf).unwrap_or(0);
//!     if n > 0 && kind != Fired::Timeout {
//!         // keep listening
//!         base.read(conn.as_raw_fd(), on_readable, None, conn)?;
//!     }
//!     Ok(())
//! }
//!
//! fn main() -> Result<()> {
//!     let conn = TcpStream::connect("127.0.0.1:7000").unwrap();
//!     conn.set_nonblocking(true).unwrap();
//!
//!     let mut base = Reactor::new()?;
//!     base.read(conn.as_raw_fd(), on_readable, None, conn)?;
//!     base.dispatch() // returns once no registration remains
//! }
//! ```
//!
//! ## Threading
//!
//! A [`Reactor`] is single-threaded by construction: callbacks are plain boxed
//! closures without `Send` bounds, so the reactor itself is not `Send` and all
//! registration, cancellation, and dispatch happen on one thread. Independent
//! `Reactor` instances may run on separate threads; they share nothing.

mod error;
mod reactor;
mod utils;

pub use error::{Error, Result};
pub use reactor::{Fired, Handle, Interest, Reactor};
