//! Paced playback of the line buffer.
//!
//! Ingestion may arrive in bursts; playback reveals the buffered text to the
//! view one character per tick so the log stays readable. The pacing is a UX
//! throttle only — it never slows the ingestor, which keeps writing the
//! shared buffer at full speed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use drydock_core::classify::LineClassifier;
use drydock_core::prelude::*;
use drydock_core::{DeployPhase, LineBuffer};

use crate::event::EngineEvent;
use crate::settings::PlaybackSettings;

// ─────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────

/// Monotonic character cursor into the buffer's concatenated text.
///
/// Pure pacing state, kept separate from the async driver so the reveal laws
/// are testable without timers.
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    cursor: usize,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Characters revealed so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// One tick against the committed total length.
    ///
    /// Advances by exactly one character while behind; clamps back when a
    /// shrinking overwrite moved the total below the cursor. Returns whether
    /// the rendered prefix changed (i.e. a new frame is due).
    pub fn advance(&mut self, total: usize) -> bool {
        if self.cursor > total {
            self.cursor = total;
            return true;
        }
        if self.cursor < total {
            self.cursor += 1;
            return true;
        }
        false
    }

    /// Whether the cursor has revealed everything committed so far
    pub fn caught_up(&self, total: usize) -> bool {
        self.cursor >= total
    }

    /// The revealed `[0, cursor)` prefix of the given text
    pub fn render(&self, text: &str) -> String {
        text.chars().take(self.cursor).collect()
    }

    /// Back to the start (new session)
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

// ─────────────────────────────────────────────────────────
// Playback Task
// ─────────────────────────────────────────────────────────

/// Playback task: the single reader of a session's [`LineBuffer`].
///
/// Ticks at the configured cadence while behind; parks on the buffer's length
/// watch while caught up (resuming without an external nudge when the buffer
/// grows); exits once the session reaches a terminal phase and everything is
/// revealed, or immediately on shutdown.
pub(crate) async fn run_playback(
    buffer: Arc<LineBuffer>,
    classifier: LineClassifier,
    settings: PlaybackSettings,
    events_tx: mpsc::Sender<EngineEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut phase_rx: watch::Receiver<DeployPhase>,
) {
    let mut len_rx = buffer.watch_len();
    let mut cursor = PlaybackCursor::new();
    let mut ticker = tokio::time::interval(settings.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            debug!("playback shut down at cursor {}", cursor.position());
            return;
        }

        let total = *len_rx.borrow_and_update();
        if !cursor.caught_up(total) || cursor.position() > total {
            tokio::select! {
                _ = ticker.tick() => {
                    // Re-read: the buffer may have changed while waiting
                    let total = *len_rx.borrow();
                    if cursor.advance(total) {
                        let text = cursor.render(&buffer.concatenated());
                        let padding_lines = if *phase_rx.borrow() == DeployPhase::Completed {
                            settings.success_padding_lines
                        } else {
                            0
                        };
                        let frame = EngineEvent::PlaybackFrame {
                            lines: classifier.classify_rendered(&text),
                            padding_lines,
                        };
                        if events_tx.send(frame).await.is_err() {
                            debug!("event channel closed, stopping playback");
                            return;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {}
            }
        } else {
            if phase_rx.borrow().is_terminal() {
                debug!("playback drained after terminal phase");
                return;
            }
            // Caught up mid-stream: park until the buffer grows, the phase
            // turns terminal, or shutdown
            tokio::select! {
                changed = len_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = phase_rx.changed() => {}
                _ = shutdown_rx.changed() => {}
            }
        }
    }
}
