//! C9 — the metrics TCP server.
//!
//! Grounded on `metric_connect` in `metrics.c`, redesigned per SPEC_FULL.md §4.5/§9: the
//! original stack-allocates a connection struct inside the accept callback and hands its
//! address to an asynchronous write completion, which is unsound once the callback
//! returns and the stack frame is reused. This implementation performs a bounded
//! synchronous write-then-close per accepted connection instead — no per-connection
//! state outlives the call that accepted it.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use tracing::{trace, warn};

/// A TCP listener bound once at startup (only if `stats` was configured), polled
/// non-blockingly from the main reactor loop alongside the 5s tick and signal checks.
pub struct MetricsServer {
    listener: TcpListener,
    snapshot: Arc<Mutex<Vec<String>>>,
}

impl MetricsServer {
    /// Binds `(host, port)` with the standard listen backlog. Binding happens once, at
    /// startup, only when the `stats` directive enabled the endpoint (§4.5).
    pub fn bind(addr: &str, snapshot: Arc<Mutex<Vec<String>>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(MetricsServer { listener, snapshot })
    }

    /// The address actually bound, useful when `addr` was port `0`.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Polls for one pending connection without blocking the reactor. Returns `true` if a
    /// connection was accepted and served (whether or not the write succeeded).
    pub fn poll_once(&self) -> bool {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                trace!(%peer, "metric_connect: accepted");
                self.serve(stream);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!(error = %e, "metric_connect: accept failed");
                false
            }
        }
    }

    /// Writes every line of the current snapshot to `stream`, in order, then lets it drop
    /// (closing the connection). No read from the client; no keep-alive (§4.5).
    fn serve(&self, mut stream: TcpStream) {
        let lines = self.snapshot.lock().expect("snapshot mutex poisoned");
        for line in lines.iter() {
            if let Err(e) = stream.write_all(line.as_bytes()) {
                warn!(error = %e, "metric_connect: write failed, closing");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn serves_the_current_snapshot_to_one_connection_then_closes() {
        let snapshot = Arc::new(Mutex::new(vec![
            "global.count 10\n".to_string(),
            "in.k.count 10\n".to_string(),
        ]));
        let server = MetricsServer::bind("127.0.0.1:0", snapshot).expect("bind");
        let addr = server.local_addr().expect("local addr");

        let client = thread::spawn(move || {
            // Give the server a moment to be ready to accept, then connect and read to EOF.
            thread::sleep(Duration::from_millis(20));
            let mut stream = TcpStream::connect(addr).expect("connect");
            let mut buf = String::new();
            stream.read_to_string(&mut buf).expect("read");
            buf
        });

        // Poll until the connection is accepted and served.
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if server.poll_once() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let received = client.join().expect("client thread panicked");
        assert_eq!(received, "global.count 10\nin.k.count 10\n");
    }

    #[test]
    fn poll_once_returns_false_with_nothing_pending() {
        let snapshot = Arc::new(Mutex::new(Vec::new()));
        let server = MetricsServer::bind("127.0.0.1:0", snapshot).expect("bind");
        assert!(!server.poll_once());
    }
}
