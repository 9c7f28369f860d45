//! # Network Module
//!
//! This module provides the line-oriented request/response server used to export telemetry.
//!
//! A peer connects over TCP and sends a request token terminated by a newline. For every line
//! matching the token the server writes exactly one newline-terminated response. Lines which do
//! not match are ignored and the connection is kept open. Each peer is served by its own thread
//! so a slow or disconnecting peer never affects another, or the control loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    io::{self, BufRead, BufReader, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period between polls of the listener while no peer is connecting.
const ACCEPT_POLL_PERIOD: Duration = Duration::from_millis(10);

/// Requests longer than this without a newline are discarded.
const MAX_REQUEST_LEN: usize = 1024;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Produces the response line for a valid request.
///
/// Implementations are called from the peer threads, so must only take a consistent copy of
/// whatever state they expose.
pub trait Responder: Send + Sync + 'static {
    /// Build the response, without the trailing newline.
    fn respond(&self) -> String;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Address the telemetry server binds to, or that clients connect to, e.g. `"0.0.0.0:9101"`.
    pub tm_endpoint: String,

    /// Request token a peer must send to receive a snapshot.
    pub tm_request: String,

    /// Receive timeout on peer sockets. Bounds how long a peer thread takes to notice shutdown.
    ///
    /// Units: milliseconds
    pub peer_recv_timeout_ms: u64,
}

/// A TCP server answering newline-terminated requests.
///
/// The listener is polled from a background accept thread, which spawns one thread per peer.
/// Dropping the server stops accepting and signals all peer threads to exit.
pub struct LineServer {
    local_addr: SocketAddr,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    num_peers: Arc<AtomicUsize>,
}

/// Everything a peer thread needs, cloned per peer.
struct PeerContext<R: Responder> {
    request: Arc<String>,
    responder: Arc<R>,
    shutdown: Arc<AtomicBool>,
    num_peers: Arc<AtomicUsize>,
    recv_timeout: Duration,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not bind to {0}: {1}")]
    BindError(String, io::Error),

    #[error("Could not configure the listener: {0}")]
    ListenerError(io::Error),

    #[error("Could not connect to {0}: {1}")]
    ConnectError(String, io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            tm_endpoint: String::from("0.0.0.0:9101"),
            tm_request: String::from("get"),
            peer_recv_timeout_ms: 200,
        }
    }
}

impl<R: Responder> Clone for PeerContext<R> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            responder: self.responder.clone(),
            shutdown: self.shutdown.clone(),
            num_peers: self.num_peers.clone(),
            recv_timeout: self.recv_timeout,
        }
    }
}

impl LineServer {
    /// Bind a new server to the telemetry endpoint in `params`.
    ///
    /// This function does not wait for any peer to connect.
    pub fn new<R: Responder>(params: &NetParams, responder: Arc<R>) -> Result<Self, NetError> {
        let listener = TcpListener::bind(&params.tm_endpoint)
            .map_err(|e| NetError::BindError(params.tm_endpoint.clone(), e))?;
        listener
            .set_nonblocking(true)
            .map_err(NetError::ListenerError)?;
        let local_addr = listener.local_addr().map_err(NetError::ListenerError)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let num_peers = Arc::new(AtomicUsize::new(0));

        let ctx = PeerContext {
            request: Arc::new(params.tm_request.clone()),
            responder,
            shutdown: shutdown.clone(),
            num_peers: num_peers.clone(),
            recv_timeout: Duration::from_millis(params.peer_recv_timeout_ms.max(1)),
        };

        let join_handle = thread::spawn(move || accept_loop(listener, ctx));

        info!("LineServer listening on {}", local_addr);

        Ok(Self {
            local_addr,
            join_handle: Some(join_handle),
            shutdown,
            num_peers,
        })
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected peers.
    pub fn num_peers(&self) -> usize {
        self.num_peers.load(Ordering::Relaxed)
    }
}

impl Drop for LineServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Connect to a line server, with Nagle's algorithm disabled.
pub fn connect(endpoint: &str) -> Result<TcpStream, NetError> {
    let stream =
        TcpStream::connect(endpoint).map_err(|e| NetError::ConnectError(endpoint.into(), e))?;
    stream
        .set_nodelay(true)
        .map_err(|e| NetError::ConnectError(endpoint.into(), e))?;
    Ok(stream)
}

/// Accept peers until shutdown, spawning a thread for each.
fn accept_loop<R: Responder>(listener: TcpListener, ctx: PeerContext<R>) {
    while !ctx.shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("Peer {} connected", addr);
                ctx.num_peers.fetch_add(1, Ordering::Relaxed);

                let peer_ctx = ctx.clone();
                thread::spawn(move || {
                    if let Err(e) = serve_peer(stream, &peer_ctx) {
                        warn!("Peer {} session ended with error: {}", addr, e);
                    }
                    peer_ctx.num_peers.fetch_sub(1, Ordering::Relaxed);
                    info!("Peer {} disconnected", addr);
                });
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_PERIOD)
            }
            Err(e) => {
                warn!("Could not accept peer: {}", e);
                thread::sleep(ACCEPT_POLL_PERIOD)
            }
        }
    }

    debug!("Accept loop exited");
}

/// Serve one peer until it disconnects or the server shuts down.
fn serve_peer<R: Responder>(stream: TcpStream, ctx: &PeerContext<R>) -> io::Result<()> {
    // Accepted sockets may inherit non-blocking mode from the listener
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(ctx.recv_timeout))?;

    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::new();

    // Set while the rest of an over-long line is being thrown away
    let mut discarding = false;

    while !ctx.shutdown.load(Ordering::Relaxed) {
        // A timed out read keeps whatever partial line it got in `buf`, so the buffer is only
        // cleared once a full line has been handled. Each read is bounded so `buf` never holds
        // more than one byte past the request limit.
        let limit = (MAX_REQUEST_LEN + 1).saturating_sub(buf.len()) as u64;

        match (&mut reader).take(limit).read_until(b'\n', &mut buf) {
            Ok(0) => return Ok(()),
            Ok(_) => {
                if buf.last() != Some(&b'\n') {
                    if buf.len() <= MAX_REQUEST_LEN {
                        // EOF in the middle of a line
                        return Ok(());
                    }

                    if !discarding {
                        debug!("Discarding request longer than {} bytes", MAX_REQUEST_LEN);
                    }
                    discarding = true;
                    buf.clear();
                    continue;
                }

                if discarding {
                    // Tail of an over-long line
                    discarding = false;
                } else if is_request(&buf, &ctx.request) {
                    let mut response = ctx.responder.respond();
                    response.push('\n');
                    writer.write_all(response.as_bytes())?;
                    writer.flush()?;
                } else {
                    debug!(
                        "Ignoring unrecognised request {:?}",
                        String::from_utf8_lossy(&buf).trim_end()
                    );
                }

                buf.clear();
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Check whether a received line (including its newline) is the request token.
fn is_request(line: &[u8], request: &str) -> bool {
    let line = match std::str::from_utf8(line) {
        Ok(l) => l,
        Err(_) => return false,
    };

    line.trim_end_matches(|c| c == '\n' || c == '\r') == request
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{BufRead, BufReader, Write};

    /// Responds with an increasing counter so each response can be told apart.
    struct Counter(AtomicUsize);

    impl Responder for Counter {
        fn respond(&self) -> String {
            format!("response {}", self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    fn loopback_params() -> NetParams {
        NetParams {
            tm_endpoint: String::from("127.0.0.1:0"),
            peer_recv_timeout_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_is_request() {
        assert!(is_request(b"get\n", "get"));
        assert!(is_request(b"get\r\n", "get"));
        assert!(!is_request(b"get \n", "get"));
        assert!(!is_request(b"GET\n", "get"));
        assert!(!is_request(&[0xff, 0xfe, b'\n'], "get"));
    }

    #[test]
    fn test_unrecognised_requests_get_no_response() {
        let server =
            LineServer::new(&loopback_params(), Arc::new(Counter(AtomicUsize::new(0)))).unwrap();

        let mut stream = connect(&server.local_addr().to_string()).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        // Only the two valid requests should be answered, in order
        stream.write_all(b"hello\nget\nget please\nget\n").unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "response 0\n");

        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "response 1\n");
    }

    #[test]
    fn test_peer_disconnect_is_isolated() {
        let server =
            LineServer::new(&loopback_params(), Arc::new(Counter(AtomicUsize::new(0)))).unwrap();
        let endpoint = server.local_addr().to_string();

        // First peer connects, asks for nothing and leaves
        let first = connect(&endpoint).unwrap();
        drop(first);

        // Second peer is served normally, with a request split over two writes
        let mut second = connect(&endpoint).unwrap();
        let mut reader = BufReader::new(second.try_clone().unwrap());
        second.write_all(b"ge").unwrap();
        thread::sleep(Duration::from_millis(50));
        second.write_all(b"t\n").unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "response 0\n");
    }

    #[test]
    fn test_over_long_request_is_discarded() {
        let server =
            LineServer::new(&loopback_params(), Arc::new(Counter(AtomicUsize::new(0)))).unwrap();

        let mut stream = connect(&server.local_addr().to_string()).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        // Several KiB without a newline, ending in the token, is one over-long line and must not
        // be answered
        let mut junk = vec![b'x'; 8 * MAX_REQUEST_LEN];
        junk.extend_from_slice(b"get\n");
        stream.write_all(&junk).unwrap();

        // The peer is still served afterwards
        stream.write_all(b"get\n").unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "response 0\n");
        assert_eq!(server.num_peers(), 1);
    }
}
