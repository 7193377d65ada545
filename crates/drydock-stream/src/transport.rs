//! Transport-facing vocabulary shared with the connection-opening collaborator.
//!
//! Opening the connection (TLS, auth headers, SSE vs. chunked HTTP) is the
//! collaborator's job; the engine only ever sees a lazy, non-restartable
//! sequence of [`TransportEvent`]s plus an abort handle for teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

// ─────────────────────────────────────────────────────────
// Transport Kinds & Events
// ─────────────────────────────────────────────────────────

/// The two wire shapes a deployment log stream arrives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Long-lived event-stream connection. Each delivered payload is a whole
    /// unit: the completion token, an error-token-prefixed string, or raw log
    /// text with literal two-character escapes for CR/LF.
    EventStream,

    /// Streamed response body. Newline-delimited units of plain log text, a
    /// JSON status object, or the completion token; real control characters.
    Chunked,
}

impl TransportKind {
    /// Whether CR/LF arrive as literal two-character escapes
    pub fn decodes_escapes(self) -> bool {
        matches!(self, Self::EventStream)
    }

    /// Whether newline-delimited units may be JSON status reports
    pub fn allows_status(self) -> bool {
        matches!(self, Self::Chunked)
    }

    /// Whether each delivered fragment is a complete payload unit that can be
    /// checked against the sentinels without waiting for a line boundary
    pub fn whole_unit_payloads(self) -> bool {
        matches!(self, Self::EventStream)
    }
}

/// One delivery from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A fragment of UTF-8 text; boundaries are arbitrary and carry no
    /// semantic meaning
    Fragment(String),

    /// The transport closed cleanly (end of body / server closed the stream)
    Closed,

    /// The transport failed mid-stream
    Error(String),
}

// ─────────────────────────────────────────────────────────
// Fragment Sources
// ─────────────────────────────────────────────────────────

/// An asynchronous source of transport events.
///
/// The collaborator implements (or bridges into) this; the session runner
/// only ever awaits `next_event`, which is the ingest side's sole suspension
/// point and is cancelled along with the runner.
#[trait_variant::make(FragmentSource: Send)]
pub trait LocalFragmentSource {
    /// Await the next transport event. Must return [`TransportEvent::Closed`]
    /// forever once the underlying connection is done.
    async fn next_event(&mut self) -> TransportEvent;
}

/// Fragment source backed by an mpsc channel.
///
/// A dropped sender counts as a clean close: the collaborator signals errors
/// explicitly via [`TransportEvent::Error`] before dropping.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<TransportEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<TransportEvent>) -> Self {
        Self { rx }
    }

    /// Create a connected (sender, source) pair with the given buffer depth
    pub fn pair(capacity: usize) -> (mpsc::Sender<TransportEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl FragmentSource for ChannelSource {
    async fn next_event(&mut self) -> TransportEvent {
        self.rx.recv().await.unwrap_or(TransportEvent::Closed)
    }
}

/// Fragment source bridging a `futures` stream of text fragments.
///
/// Useful for collaborators whose HTTP client exposes the response body as a
/// `Stream<Item = Result<String, E>>`.
#[derive(Debug)]
pub struct StreamSource<S> {
    inner: S,
    done: bool,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, done: false }
    }
}

impl<S, E> FragmentSource for StreamSource<S>
where
    S: Stream<Item = Result<String, E>> + Unpin + Send,
    E: std::fmt::Display + Send,
{
    async fn next_event(&mut self) -> TransportEvent {
        if self.done {
            return TransportEvent::Closed;
        }
        match self.inner.next().await {
            Some(Ok(fragment)) => TransportEvent::Fragment(fragment),
            Some(Err(e)) => {
                self.done = true;
                TransportEvent::Error(e.to_string())
            }
            None => {
                self.done = true;
                TransportEvent::Closed
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Abort Handle
// ─────────────────────────────────────────────────────────

/// Handle for tearing down the underlying connection.
///
/// Abort is idempotent: the signal channel is consumed on first use, and an
/// atomic flag answers later `is_aborted()` checks. Both the timeout path and
/// a user-initiated cancel may call [`abort`] without coordination.
///
/// [`abort`]: TransportHandle::abort
#[derive(Debug)]
pub struct TransportHandle {
    /// One-shot sender that tells the collaborator to drop the connection.
    /// Consumed on first use (or on drop).
    abort_tx: Option<oneshot::Sender<()>>,

    /// Set once the abort signal has been sent
    aborted: Arc<AtomicBool>,
}

impl TransportHandle {
    /// Create a handle plus the receiver the collaborator listens on
    pub fn pair() -> (Self, oneshot::Receiver<()>) {
        let (abort_tx, abort_rx) = oneshot::channel();
        (
            Self {
                abort_tx: Some(abort_tx),
                aborted: Arc::new(AtomicBool::new(false)),
            },
            abort_rx,
        )
    }

    /// Create a handle with no underlying connection to tear down (the
    /// collaborator manages lifetime elsewhere, e.g. in tests)
    pub fn detached() -> Self {
        Self {
            abort_tx: None,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal the collaborator to drop the connection. Safe to call any
    /// number of times; only the first call sends.
    pub fn abort(&mut self) {
        if let Some(tx) = self.abort_tx.take() {
            debug!("aborting transport connection");
            // The collaborator may already be gone; that's fine
            let _ = tx.send(());
        }
        self.aborted.store(true, Ordering::Release);
    }

    /// Whether abort has been requested
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        // A torn-down session must never leave the connection open
        self.abort();
    }
}
