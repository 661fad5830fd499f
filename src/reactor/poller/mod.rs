//! Platform-specific I/O poller abstraction.
//!
//! The poller is the reactor's single suspension point: it holds one
//! OS-level registration per descriptor (the union of the directions
//! registered on it) and blocks until readiness is reported or the
//! deadline passed in by the dispatch loop expires.
//!
//! The concrete implementation is selected at compile time depending on
//! the target operating system.

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "macos")]
mod kqueue;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(target_os = "macos")]
pub(crate) type Poller = kqueue::KqueuePoller;
