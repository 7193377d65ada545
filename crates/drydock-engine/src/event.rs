//! Domain events emitted by the session runner for the dashboard view.
//!
//! The view renders frames verbatim, auto-scrolling to the bottom after each
//! one; everything it needs (classified lines, bottom padding for the
//! follow-up call-to-action, phase, terminal outcome) arrives through this
//! enum — there is no separate error channel.

use chrono::{DateTime, Local};

use drydock_core::{DeployPhase, DisplayLine};

use crate::descriptor::SessionKind;

/// Events emitted by one deployment session, in order
#[derive(Debug, Clone)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Session Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Streaming has begun
    SessionStarted {
        kind: SessionKind,
        started_at: DateTime<Local>,
    },

    /// The session phase changed
    PhaseChanged {
        old_phase: DeployPhase,
        new_phase: DeployPhase,
    },

    // ─────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────
    /// A new rendered prefix of the log is ready. The view replaces its pane
    /// content with `lines`, scrolls to the bottom, and reserves
    /// `padding_lines` blank rows beneath (non-zero once the session
    /// completed, so the call-to-action never obscures the last line).
    PlaybackFrame {
        lines: Vec<DisplayLine>,
        padding_lines: u16,
    },

    // ─────────────────────────────────────────────────────────
    // Terminal Outcomes
    // ─────────────────────────────────────────────────────────
    /// The deployment completed; `subdomains` is the affected list
    SessionCompleted { subdomains: Vec<String> },

    /// The deployment failed; `message` is also visible as the final
    /// classified error line of the log pane
    SessionFailed { message: String },

    /// The user cancelled (or the view was torn down)
    SessionCancelled,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::PlaybackFrame { .. } => "playback_frame",
            Self::SessionCompleted { .. } => "session_completed",
            Self::SessionFailed { .. } => "session_failed",
            Self::SessionCancelled => "session_cancelled",
        }
    }
}
