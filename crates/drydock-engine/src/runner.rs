//! The async session runner.
//!
//! One call drives a whole session: it wires the fragment source into the
//! ingestor, spawns the playback task, enforces the timeout ceiling, reacts
//! to cancellation, and tears the transport down exactly once no matter how
//! the session ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use drydock_core::prelude::*;
use drydock_core::LineBuffer;
use drydock_stream::{
    FragmentSource, StreamIngestor, StreamOutcome, TransportEvent, TransportHandle,
};

use crate::descriptor::{LaunchSpec, SessionDescriptor};
use crate::event::EngineEvent;
use crate::playback::run_playback;
use crate::session::DeploymentSession;
use crate::settings::EngineSettings;

/// Failure message when the stream could not be opened at all
pub const CONNECT_FAILED_MESSAGE: &str = "failed to connect to the deployment service";

/// Failure message when the stream dropped before any terminal signal
pub const CONNECTION_LOST_MESSAGE: &str = "connection lost";

/// Failure message for the session timeout ceiling
pub fn timeout_message(ceiling: Duration) -> String {
    format!(
        "deployment timed out after {} minutes",
        ceiling.as_secs() / 60
    )
}

// ─────────────────────────────────────────────────────────
// Session Handle
// ─────────────────────────────────────────────────────────

/// Handle to a running session.
///
/// Cancellation is idempotent and also fires when the handle is dropped
/// without joining — a torn-down view must never leave a session streaming.
#[derive(Debug)]
pub struct SessionHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<DeploymentSession>,
}

impl SessionHandle {
    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Whether the session task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end and return its final state
    pub async fn join(self) -> Result<DeploymentSession> {
        // Keep the cancel sender alive while waiting: dropping it is itself
        // a cancellation signal
        let Self { cancel_tx, task } = self;
        let result = task.await;
        drop(cancel_tx);
        result.map_err(|e| Error::transport(format!("session task failed: {e}")))
    }
}

/// Spawn a session onto the runtime and return its handle
pub fn start_session<S>(
    descriptor: SessionDescriptor,
    launch: LaunchSpec,
    source: S,
    transport: TransportHandle,
    events_tx: mpsc::Sender<EngineEvent>,
    settings: EngineSettings,
) -> SessionHandle
where
    S: FragmentSource + Send + 'static,
{
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let task = tokio::spawn(run_session(
        descriptor, launch, source, transport, events_tx, settings, cancel_rx,
    ));
    SessionHandle { cancel_tx, task }
}

// ─────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────

/// Drive one session to its terminal phase.
///
/// The ingest side suspends only on `source.next_event()`; the playback task
/// runs independently against the shared buffer and is always stopped (after
/// draining, except on cancel) before this function returns.
pub async fn run_session<S>(
    descriptor: SessionDescriptor,
    launch: LaunchSpec,
    mut source: S,
    mut transport: TransportHandle,
    events_tx: mpsc::Sender<EngineEvent>,
    settings: EngineSettings,
    mut cancel_rx: watch::Receiver<bool>,
) -> DeploymentSession
where
    S: FragmentSource,
{
    let mut session = DeploymentSession::new();

    // A trigger always starts from a clean slate
    let buffer = Arc::new(LineBuffer::new());
    let (phase_tx, phase_rx) = watch::channel(session.phase());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let playback = tokio::spawn(run_playback(
        Arc::clone(&buffer),
        descriptor.classifier(),
        settings.playback.clone(),
        events_tx.clone(),
        shutdown_rx,
        phase_rx,
    ));

    let mut ingestor = StreamIngestor::new(
        Arc::clone(&buffer),
        descriptor.vocabulary.clone(),
        descriptor.transport,
    );

    let old_phase = session.phase();
    if session.begin_streaming().is_ok() {
        let _ = phase_tx.send(session.phase());
        let _ = events_tx
            .send(EngineEvent::PhaseChanged {
                old_phase,
                new_phase: session.phase(),
            })
            .await;
        let _ = events_tx
            .send(EngineEvent::SessionStarted {
                kind: descriptor.kind,
                started_at: session.started_at.unwrap_or_else(chrono::Local::now),
            })
            .await;
    }

    let outcome = if let Err(e) = launch.validate() {
        warn!("rejected launch parameters: {e}");
        transport.abort();
        ingestor.fail(e.to_string()).clone()
    } else {
        let ceiling = settings.session.timeout();
        let deadline = tokio::time::sleep(ceiling);
        tokio::pin!(deadline);
        let mut received_any = false;

        loop {
            tokio::select! {
                event = source.next_event() => match event {
                    TransportEvent::Fragment(text) => {
                        received_any = true;
                        if let Some(outcome) = ingestor.feed(&text) {
                            break outcome.clone();
                        }
                    }
                    TransportEvent::Closed => {
                        let closed = ingestor.close().cloned();
                        break match closed {
                            Some(outcome) => outcome,
                            // Closed without any terminal signal
                            None => ingestor.fail(CONNECTION_LOST_MESSAGE).clone(),
                        };
                    }
                    TransportEvent::Error(reason) => {
                        warn!("transport error: {reason}");
                        let message = if received_any {
                            CONNECTION_LOST_MESSAGE
                        } else {
                            CONNECT_FAILED_MESSAGE
                        };
                        break ingestor.fail(message).clone();
                    }
                },
                () = &mut deadline => {
                    warn!("session exceeded the {}s ceiling", ceiling.as_secs());
                    transport.abort();
                    break ingestor.fail(timeout_message(ceiling)).clone();
                }
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        info!("session cancelled");
                        transport.abort();
                        let old_phase = session.phase();
                        if session.cancel().is_ok() {
                            let _ = phase_tx.send(session.phase());
                            let _ = events_tx
                                .send(EngineEvent::PhaseChanged {
                                    old_phase,
                                    new_phase: session.phase(),
                                })
                                .await;
                        }
                        // Stop rendering immediately: a torn-down session
                        // must not be rendered into
                        let _ = shutdown_tx.send(true);
                        let _ = playback.await;
                        let _ = events_tx.send(EngineEvent::SessionCancelled).await;
                        return session;
                    }
                }
            }
        }
    };

    // A sentinel means "close now"; abort is idempotent, so paths that
    // already aborted (timeout, validation) are unaffected
    transport.abort();

    match outcome {
        StreamOutcome::Completed { line, subdomains } => {
            let subdomains = subdomains
                .or_else(|| descriptor.parse_subdomains(&line))
                .unwrap_or_else(|| launch.subdomains.clone());
            let old_phase = session.phase();
            if session.complete(subdomains.clone()).is_ok() {
                let _ = phase_tx.send(session.phase());
                let _ = events_tx
                    .send(EngineEvent::PhaseChanged {
                        old_phase,
                        new_phase: session.phase(),
                    })
                    .await;
            }
            // Let playback reveal everything before announcing the outcome
            let _ = playback.await;
            let _ = events_tx
                .send(EngineEvent::SessionCompleted { subdomains })
                .await;
        }
        StreamOutcome::Failed { message } => {
            let old_phase = session.phase();
            if session.fail(message.clone()).is_ok() {
                let _ = phase_tx.send(session.phase());
                let _ = events_tx
                    .send(EngineEvent::PhaseChanged {
                        old_phase,
                        new_phase: session.phase(),
                    })
                    .await;
            }
            let _ = playback.await;
            let _ = events_tx.send(EngineEvent::SessionFailed { message }).await;
        }
    }

    session
}
