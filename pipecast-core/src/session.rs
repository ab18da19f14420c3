//! TCP session with a capture peer.
//!
//! A [`StreamClient`] connects, sends the start command, feeds every
//! decoded [`StreamItem`](crate::codec::StreamItem) into the shared
//! [`PipeMonitor`], and on the way out (cancellation, remote close or
//! error) marks the monitor disconnected and resets it before anything
//! else can touch it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, lookup_host};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::StreamCodec;
use crate::control::ControlCommand;
use crate::error::PipecastError;
use crate::monitor::PipeMonitor;

/// Monitor handle shared between the session task and readers.
pub type SharedMonitor = Arc<Mutex<PipeMonitor>>;

/// Create a fresh shared monitor.
pub fn shared_monitor(monitor: PipeMonitor) -> SharedMonitor {
    Arc::new(Mutex::new(monitor))
}

/// Lock the monitor, recovering the guard if a reader panicked.
pub fn lock(monitor: &SharedMonitor) -> MutexGuard<'_, PipeMonitor> {
    monitor.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_token(token: &Mutex<CancellationToken>) -> MutexGuard<'_, CancellationToken> {
    token.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── SessionConfig ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `host:port` of the capture peer.
    pub address: String,
    pub connect_timeout: Duration,
    /// Optional cap on declared body size; `None` accepts anything.
    pub max_body: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".into(),
            connect_timeout: Duration::from_secs(5),
            max_body: None,
        }
    }
}

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// [`StreamClient::stop`] was called; the stop command was sent.
    Stopped,
    /// The peer closed the connection.
    RemoteClosed,
    /// The monitor already had a live connection; nothing was done.
    AlreadyConnected,
}

// ── StreamClient ─────────────────────────────────────────────────

/// Reusable client: each [`run`](Self::run) is one session, and
/// [`stop`](Self::stop) ends only the session in progress.
pub struct StreamClient {
    config: SessionConfig,
    monitor: SharedMonitor,
    /// Token of the current session; replaced when a session starts.
    cancel: Mutex<CancellationToken>,
}

impl StreamClient {
    pub fn new(config: SessionConfig, monitor: SharedMonitor) -> Self {
        Self {
            config,
            monitor,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn monitor(&self) -> SharedMonitor {
        Arc::clone(&self.monitor)
    }

    /// Ask the running session to send the stop command and disconnect.
    pub fn stop(&self) {
        lock_token(&self.cancel).cancel();
    }

    fn begin_session(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock_token(&self.cancel) = token.clone();
        token
    }

    /// Connect to the configured address and run until the session ends.
    pub async fn run(&self) -> Result<SessionEnd, PipecastError> {
        self.run_with(self.connect()).await
    }

    async fn run_with<T, F>(&self, connect: F) -> Result<SessionEnd, PipecastError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        F: Future<Output = Result<T, PipecastError>>,
    {
        {
            let mut mon = lock(&self.monitor);
            if mon.connected() {
                mon.set_status("Already connected");
                return Ok(SessionEnd::AlreadyConnected);
            }
        }
        let cancel = self.begin_session();
        lock(&self.monitor).set_status(format!("Connecting to {}...", self.config.address));

        let attempt = tokio::select! {
            _ = cancel.cancelled() => None,
            res = connect => Some(res),
        };
        let io = match attempt {
            Some(Ok(io)) => io,
            Some(Err(e)) => {
                warn!(address = %self.config.address, "connect failed: {e}");
                let mut mon = lock(&self.monitor);
                mon.set_status(format!("Error: {}", e.status_reason()));
                mon.set_connected(false);
                return Err(e);
            }
            None => {
                info!(address = %self.config.address, "connect cancelled");
                let mut mon = lock(&self.monitor);
                mon.set_status("Disconnected");
                mon.set_connected(false);
                return Ok(SessionEnd::Stopped);
            }
        };
        info!(address = %self.config.address, "connected");
        self.serve(io, &cancel).await
    }

    async fn connect(&self) -> Result<TcpStream, PipecastError> {
        let timeout = self.config.connect_timeout;
        let address = self.config.address.as_str();
        let attempt = async {
            let addr = lookup_host(address)
                .await
                .ok()
                .and_then(|mut addrs| addrs.next())
                .ok_or_else(|| PipecastError::HostNotFound(address.to_string()))?;
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok::<_, PipecastError>(stream)
        };
        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| PipecastError::Timeout(timeout))?
    }

    /// Run the protocol over an already-connected transport.
    pub async fn run_on<T>(&self, io: T) -> Result<SessionEnd, PipecastError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let cancel = self.begin_session();
        self.serve(io, &cancel).await
    }

    async fn serve<T>(&self, io: T, cancel: &CancellationToken) -> Result<SessionEnd, PipecastError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let codec = StreamCodec::new().with_max_body(self.config.max_body);
        let mut framed = Framed::new(io, codec);

        {
            let mut mon = lock(&self.monitor);
            mon.set_connected(true);
            mon.set_status("Connected");
        }

        let result = self.pump(&mut framed, cancel).await;

        let mut mon = lock(&self.monitor);
        match &result {
            Ok(end) => {
                info!(?end, "session ended");
                mon.set_status("Disconnected");
            }
            Err(e) => {
                warn!("session failed: {e}");
                mon.set_status(format!("Error: {}", e.status_reason()));
            }
        }
        mon.set_connected(false);
        mon.reset();
        result
    }

    async fn pump<T>(
        &self,
        framed: &mut Framed<T, StreamCodec>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, PipecastError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        framed.send(ControlCommand::Start).await?;
        lock(&self.monitor).set_status("start cmd sent");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    framed.send(ControlCommand::Stop).await?;
                    lock(&self.monitor).set_status("stop cmd sent");
                    framed.close().await?;
                    return Ok(SessionEnd::Stopped);
                }
                next = framed.next() => match next {
                    Some(Ok(item)) => {
                        lock(&self.monitor).apply(item, Instant::now());
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        debug!("peer closed the stream");
                        return Ok(SessionEnd::RemoteClosed);
                    }
                },
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
