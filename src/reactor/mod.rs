//! Reactor core and event handling.
//!
//! This module implements the reactor: the registration table that maps
//! a (descriptor, direction) pair to its pending callback, and the
//! dispatch loop that blocks on the platform readiness primitive and
//! fires callbacks as descriptors become ready or timeouts elapse.
//!
//! Registrations are one-shot. The table entry is removed before the
//! callback runs, so callbacks are free to re-register the same
//! descriptor or cancel their siblings without colliding with the entry
//! that just fired.

mod core;
mod event;
mod poller;
mod table;
mod timer;

pub use self::core::Reactor;
pub use self::event::{Fired, Handle, Interest};
