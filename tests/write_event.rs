//! End-to-end write dispatch: a write callback re-arms itself while data
//! remains and deregisters after the last chunk, closing the connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::thread;

use vigil::{Fired, Handle, Reactor, Result};

fn accept_cb(base: &mut Reactor, _event: Handle, _kind: Fired, listener: TcpListener) -> Result<()> {
    let (conn, _addr) = listener.accept().expect("accept");
    conn.set_nonblocking(true).expect("set_nonblocking");
    base.write(conn.as_raw_fd(), send_cb, None, (conn, b"Hello, world".to_vec()))?;
    Ok(())
}

fn send_cb(
    base: &mut Reactor,
    _event: Handle,
    kind: Fired,
    arg: (TcpStream, Vec<u8>),
) -> Result<()> {
    let (mut conn, mut remaining) = arg;
    assert_eq!(kind, Fired::Write);

    if !remaining.is_empty() {
        let chunk = remaining.len().min(3);
        let n = conn.write(&remaining[..chunk]).expect("send");
        remaining.drain(..n);
        base.write(conn.as_raw_fd(), send_cb, None, (conn, remaining))?;
    }

    // nothing left: the connection drops here and the peer sees EOF
    Ok(())
}

#[test]
fn rearming_write_delivers_payload_in_chunks() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("set_nonblocking");
    let addr = listener.local_addr().expect("local_addr");
    let listener_fd = listener.as_raw_fd();

    let mut base = Reactor::new().expect("reactor");
    base.read(listener_fd, accept_cb, None, listener)
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
    assert!(base.is_empty());
}
