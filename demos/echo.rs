//! Callback-style TCP echo server.
//!
//! Every connection is driven by one-shot registrations that re-arm
//! themselves: accept re-arms the listener, a completed read arms a
//! write of the same bytes, a completed write arms the next read.
//!
//! Run with `cargo run --example echo [addr]`, then `nc 127.0.0.1 7000`.

use std::env;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;

use vigil::{Fired, Handle, Reactor, Result};

fn accept_cb(base: &mut Reactor, _event: Handle, _kind: Fired, listener: TcpListener) -> Result<()> {
    match listener.accept() {
        Ok((conn, addr)) => {
            println!("accepted {addr}");
            conn.set_nonblocking(true)?;
            base.read(conn.as_raw_fd(), recv_cb, None, conn)?;
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
        Err(e) => return Err(e.into()),
    }

    // keep listening
    base.read(listener.as_raw_fd(), accept_cb, None, listener)?;
    Ok(())
}

fn recv_cb(base: &mut Reactor, _event: Handle, _kind: Fired, mut conn: TcpStream) -> Result<()> {
    let mut buf = [0u8; 1024];
    match conn.read(&mut buf) {
        Ok(0) => println!("peer closed"),
        Ok(n) => {
            let pending = buf[..n].to_vec();
            base.write(conn.as_raw_fd(), send_cb, None, (conn, pending))?;
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {
            base.read(conn.as_raw_fd(), recv_cb, None, conn)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn send_cb(
    base: &mut Reactor,
    _event: Handle,
    _kind: Fired,
    arg: (TcpStream, Vec<u8>),
) -> Result<()> {
    let (mut conn, mut pending) = arg;

    match conn.write(&pending) {
        Ok(n) => {
            pending.drain(..n);
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
        Err(e) => return Err(e.into()),
    }

    if pending.is_empty() {
        base.read(conn.as_raw_fd(), recv_cb, None, conn)?;
    } else {
        base.write(conn.as_raw_fd(), send_cb, None, (conn, pending))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:7000".into());

    let listener = TcpListener::bind(&addr)?;
    listener.set_nonblocking(true)?;
    println!("listening on {addr}");

    let mut base = Reactor::new()?;
    base.read(listener.as_raw_fd(), accept_cb, None, listener)?;
    base.dispatch()
}
