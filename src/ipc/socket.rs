//! TCP/UDP sockets: one reader thread per connection polling at
//! [`crate::ipc::READER_POLL_INTERVAL`], firing a `receive` rule per framed
//! message, with one-shot cancellation on [`Socket::close`].

use std::io::{Read, Write as _};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::instance::Instance;
use crate::ipc::framing::FrameAssembler;
use crate::ipc::{FileDescriptor, Framing, Transport, READER_POLL_INTERVAL};
use crate::Error;

/// The write half of a socket descriptor: a single outbound peer (`socket()`)
/// or every currently-accepted peer of a listening socket (`server_socket()`,
/// where a write broadcasts to all connections).
enum WriteTarget {
    TcpPeer(Mutex<TcpStream>),
    TcpBroadcast(Arc<Mutex<Vec<TcpStream>>>),
    UdpPeer(UdpSocket),
    UdpBroadcast { socket: UdpSocket, peers: Arc<Mutex<Vec<SocketAddr>>> },
}

pub struct Socket {
    target: WriteTarget,
    canceled: Arc<AtomicBool>,
}

impl Socket {
    /// Opens an outbound connection and starts its reader thread.
    pub fn connect(
        transport: Transport,
        host: &str,
        port: u16,
        framing: Framing,
        instance: Arc<Instance>,
    ) -> Result<Self, Error> {
        let canceled = Arc::new(AtomicBool::new(false));
        let target = match transport {
            Transport::Tcp => {
                let stream = TcpStream::connect((host, port))?;
                stream.set_read_timeout(Some(READER_POLL_INTERVAL))?;
                let reader_stream = stream.try_clone()?;
                spawn_tcp_reader(reader_stream, canceled.clone(), framing, instance);
                WriteTarget::TcpPeer(Mutex::new(stream))
            }
            Transport::Udp => {
                let socket = UdpSocket::bind("0.0.0.0:0")?;
                socket.connect((host, port))?;
                socket.set_read_timeout(Some(READER_POLL_INTERVAL))?;
                let reader_socket = socket.try_clone()?;
                spawn_udp_reader(reader_socket, canceled.clone(), framing, instance);
                WriteTarget::UdpPeer(socket)
            }
        };
        Ok(Socket { target, canceled })
    }

    /// Opens a listening socket. Accepted TCP connections each get their own
    /// framed reader thread and are added to the broadcast set; for UDP,
    /// distinct sender addresses are tracked the same way.
    pub fn listen(transport: Transport, port: u16, framing: Framing, instance: Arc<Instance>) -> Result<Self, Error> {
        let canceled = Arc::new(AtomicBool::new(false));
        match transport {
            Transport::Tcp => {
                let listener = TcpListener::bind(("0.0.0.0", port))?;
                listener.set_nonblocking(true)?;
                let peers: Arc<Mutex<Vec<TcpStream>>> = Arc::new(Mutex::new(Vec::new()));
                let accept_canceled = canceled.clone();
                let accept_peers = peers.clone();
                std::thread::spawn(move || {
                    for stream in listener.incoming() {
                        if accept_canceled.load(Ordering::Relaxed) {
                            break;
                        }
                        match stream {
                            Ok(stream) => {
                                stream.set_read_timeout(Some(READER_POLL_INTERVAL)).ok();
                                if let Ok(reader_stream) = stream.try_clone() {
                                    spawn_tcp_reader(reader_stream, accept_canceled.clone(), framing, instance.clone());
                                }
                                if let Ok(mut peers) = accept_peers.lock() {
                                    peers.push(stream);
                                }
                            }
                            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                                std::thread::sleep(READER_POLL_INTERVAL);
                            }
                            Err(_) => std::thread::sleep(READER_POLL_INTERVAL),
                        }
                    }
                });
                Ok(Socket { target: WriteTarget::TcpBroadcast(peers), canceled })
            }
            Transport::Udp => {
                let socket = UdpSocket::bind(("0.0.0.0", port))?;
                socket.set_read_timeout(Some(READER_POLL_INTERVAL))?;
                let reader_socket = socket.try_clone()?;
                let peers: Arc<Mutex<Vec<SocketAddr>>> = Arc::new(Mutex::new(Vec::new()));
                spawn_udp_server_reader(reader_socket, canceled.clone(), framing, instance, peers.clone());
                Ok(Socket { target: WriteTarget::UdpBroadcast { socket, peers }, canceled })
            }
        }
    }
}

fn spawn_tcp_reader(mut stream: TcpStream, canceled: Arc<AtomicBool>, framing: Framing, instance: Arc<Instance>) {
    std::thread::spawn(move || {
        let mut assembler = FrameAssembler::new(framing);
        let mut buf = [0u8; 4096];
        while !canceled.load(Ordering::Relaxed) {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    assembler.push(&buf[..n]);
                    for frame in assembler.drain_frames() {
                        instance.fire_receive(frame);
                    }
                }
                Err(e) if is_timeout(&e) => continue,
                Err(_) => break,
            }
        }
    });
}

fn spawn_udp_reader(socket: UdpSocket, canceled: Arc<AtomicBool>, framing: Framing, instance: Arc<Instance>) {
    std::thread::spawn(move || {
        let mut assembler = FrameAssembler::new(framing);
        let mut buf = [0u8; 4096];
        while !canceled.load(Ordering::Relaxed) {
            match socket.recv(&mut buf) {
                Ok(n) => {
                    assembler.push(&buf[..n]);
                    for frame in assembler.drain_frames() {
                        instance.fire_receive(frame);
                    }
                }
                Err(e) if is_timeout(&e) => continue,
                Err(_) => break,
            }
        }
    });
}

fn spawn_udp_server_reader(
    socket: UdpSocket,
    canceled: Arc<AtomicBool>,
    framing: Framing,
    instance: Arc<Instance>,
    peers: Arc<Mutex<Vec<SocketAddr>>>,
) {
    std::thread::spawn(move || {
        let mut assembler = FrameAssembler::new(framing);
        let mut buf = [0u8; 4096];
        while !canceled.load(Ordering::Relaxed) {
            match socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    if let Ok(mut peers) = peers.lock() {
                        if !peers.contains(&from) {
                            peers.push(from);
                        }
                    }
                    assembler.push(&buf[..n]);
                    for frame in assembler.drain_frames() {
                        instance.fire_receive(frame);
                    }
                }
                Err(e) if is_timeout(&e) => continue,
                Err(_) => break,
            }
        }
    });
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

impl FileDescriptor for Socket {
    fn write(&self, data: &[u8]) -> Result<(), Error> {
        match &self.target {
            WriteTarget::TcpPeer(stream) => {
                stream.lock()?.write_all(data)?;
                Ok(())
            }
            WriteTarget::TcpBroadcast(peers) => {
                let mut peers = peers.lock()?;
                peers.retain_mut(|stream| stream.write_all(data).is_ok());
                Ok(())
            }
            WriteTarget::UdpPeer(socket) => {
                socket.send(data)?;
                Ok(())
            }
            WriteTarget::UdpBroadcast { socket, peers } => {
                for peer in peers.lock()?.iter() {
                    let _ = socket.send_to(data, peer);
                }
                Ok(())
            }
        }
    }

    fn close(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }
}
