//! `read_write` registrations: the accept/recv and send chains again,
//! but registered for both directions, plus the pinned
//! combined-readiness tagging policy.

use std::cell::RefCell;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::rc::Rc;
use std::thread;

use vigil::{Fired, Handle, Reactor, Result};

type Collected = Rc<RefCell<Vec<u8>>>;

fn accept_cb(
    base: &mut Reactor,
    _event: Handle,
    kind: Fired,
    arg: (TcpListener, Collected),
) -> Result<()> {
    let (listener, data) = arg;
    // a listening socket is never writable
    assert_eq!(kind, Fired::Read);

    let (conn, _addr) = listener.accept().expect("accept");
    conn.set_nonblocking(true).expect("set_nonblocking");
    base.read_write(conn.as_raw_fd(), recv_cb, None, (conn, data))?;
    Ok(())
}

fn recv_cb(
    base: &mut Reactor,
    _event: Handle,
    _kind: Fired,
    arg: (TcpStream, Collected),
) -> Result<()> {
    let (mut conn, data) = arg;

    // the registration also fires on writability; only consume data when
    // there is some, and keep listening otherwise
    let mut buf = [0u8; 4];
    match conn.read(&mut buf) {
        Ok(0) => {}
        Ok(n) => {
            data.borrow_mut().extend_from_slice(&buf[..n]);
            base.read_write(conn.as_raw_fd(), recv_cb, None, (conn, data))?;
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {
            base.read_write(conn.as_raw_fd(), recv_cb, None, (conn, data))?;
        }
        Err(e) => panic!("recv: {e}"),
    }

    Ok(())
}

fn send_cb(
    base: &mut Reactor,
    _event: Handle,
    _kind: Fired,
    arg: (TcpStream, Vec<u8>),
) -> Result<()> {
    let (mut conn, mut remaining) = arg;

    if !remaining.is_empty() {
        let chunk = remaining.len().min(3);
        let n = conn.write(&remaining[..chunk]).expect("send");
        remaining.drain(..n);
        base.read_write(conn.as_raw_fd(), send_cb, None, (conn, remaining))?;
    }

    Ok(())
}

#[test]
fn read_write_chain_receives_payload() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("set_nonblocking");
    let addr = listener.local_addr().expect("local_addr");
    let listener_fd = listener.as_raw_fd();

    let mut base = Reactor::new().expect("reactor");
    let data: Collected = Rc::new(RefCell::new(Vec::new()));
    base.read_write(listener_fd, accept_cb, None, (listener, Rc::clone(&data)))
        .expect("register accept");

    let client = thread::spawn(move || {
        let mut s = TcpStream::connect(addr).expect("connect");
        s.write_all(b"Hello, world").expect("send");
    });

    base.dispatch().expect("dispatch");
    client.join().expect("client thread");

    assert_eq!(data.borrow().as_slice(), b"Hello, world");
}

#[test]
fn read_write_chain_sends_payload() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("set_nonblocking");
    let addr = listener.local_addr().expect("local_addr");
    let listener_fd = listener.as_raw_fd();

    let mut base = Reactor::new().expect("reactor");
    base.read_write(
        listener_fd,
        |base: &mut Reactor, _event, _kind, listener: TcpListener| {
            let (conn, _addr) = listener.accept().expect("accept");
            conn.set_nonblocking(true).expect("set_nonblocking");
            base.read_write(conn.as_raw_fd(), send_cb, None, (conn, b"Hello, world".to_vec()))?;
            Ok(())
        },
        None,
        listener,
    )
    .expect("register accept");

    let client = thread::spawn(move || {
        let mut s = TcpStream::connect(addr).expect("connect");
        let mut received = Vec::new();
        s.read_to_end(&mut received).expect("collect");
        received
    });

    base.dispatch().expect("dispatch");
    let received = client.join().expect("client thread");

    assert_eq!(received.as_slice(), b"Hello, world");
}

/// Pins the combined-readiness policy: one wakeup reporting both
/// directions fires the callback exactly once, tagged `Fired::ReadWrite`.
#[test]
fn simultaneous_readiness_fires_once_with_combined_tag() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let mut peer = TcpStream::connect(addr).expect("connect");
    let (conn, _addr) = listener.accept().expect("accept");

    peer.write_all(b"ping").expect("send");
    // block until the data is visible on this side, so the descriptor is
    // readable and writable before it is registered
    let mut buf = [0u8; 4];
    conn.peek(&mut buf).expect("peek");
    conn.set_nonblocking(true).expect("set_nonblocking");

    let mut base = Reactor::new().expect("reactor");
    let fires: Rc<RefCell<Vec<Fired>>> = Rc::new(RefCell::new(Vec::new()));
    base.read_write(
        conn.as_raw_fd(),
        |_base: &mut Reactor, _event, kind, arg: (TcpStream, Rc<RefCell<Vec<Fired>>>)| {
            let (mut conn, fires) = arg;
            fires.borrow_mut().push(kind);
            let mut buf = [0u8; 4];
            conn.read(&mut buf).expect("recv");
            Ok(())
        },
        None,
        (conn, Rc::clone(&fires)),
    )
    .expect("register");

    base.dispatch().expect("dispatch");

    assert_eq!(fires.borrow().as_slice(), &[Fired::ReadWrite]);
}

/// A `read_write` registration on a descriptor that is only writable
/// fires with the plain `Write` tag.
#[test]
fn writable_only_readiness_fires_with_write_tag() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let _peer = TcpStream::connect(addr).expect("connect");
    let (conn, _addr) = listener.accept().expect("accept");
    conn.set_nonblocking(true).expect("set_nonblocking");

    let mut base = Reactor::new().expect("reactor");
    let fires: Rc<RefCell<Vec<Fired>>> = Rc::new(RefCell::new(Vec::new()));
    base.read_write(
        conn.as_raw_fd(),
        |_base: &mut Reactor, _event, kind, arg: (TcpStream, Rc<RefCell<Vec<Fired>>>)| {
            let (_conn, fires) = arg;
            fires.borrow_mut().push(kind);
            Ok(())
        },
        None,
        (conn, Rc::clone(&fires)),
    )
    .expect("register");

    base.dispatch().expect("dispatch");

    assert_eq!(fires.borrow().as_slice(), &[Fired::Write]);
}
