//! Domain types shared across the Drydock crates

use serde::Serialize;

// ─────────────────────────────────────────────────────────
// Deployment Phase
// ─────────────────────────────────────────────────────────

/// Lifecycle phase of a deployment session.
///
/// Valid transitions form a small DAG:
///
/// ```text
/// Idle → Streaming → { Completed | Failed | Cancelled }
/// ```
///
/// Terminal phases never transition anywhere; a fresh trigger resets the
/// session through `Idle` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeployPhase {
    /// No session active (initial state, and the state after a reset)
    Idle,

    /// Connected and consuming the log stream
    Streaming,

    /// Terminal: the completion sentinel (or a successful status report) arrived
    Completed,

    /// Terminal: error sentinel, connection loss, connect failure, or timeout
    Failed,

    /// Terminal: the user cancelled or the view was torn down mid-stream
    Cancelled,
}

impl DeployPhase {
    /// Check whether this phase may legally transition to `next`
    pub fn can_transition_to(self, next: DeployPhase) -> bool {
        use DeployPhase::*;
        matches!(
            (self, next),
            (Idle, Streaming)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Streaming, Cancelled)
                // Any phase may be reset back to Idle by a fresh trigger
                | (_, Idle)
        )
    }

    /// Check if this is a terminal phase (requires a fresh trigger to leave)
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if a stream is currently being consumed
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Get status indicator character for the dashboard status area
    pub fn status_icon(self) -> &'static str {
        match self {
            Self::Idle => "○",
            Self::Streaming => "●",
            Self::Completed => "✓",
            Self::Failed => "✗",
            Self::Cancelled => "×",
        }
    }
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────
// Log Lines
// ─────────────────────────────────────────────────────────

/// A single buffered log line.
///
/// `sequence` increases monotonically for appended lines. The line at the
/// highest sequence may be replaced in place (carriage-return overwrite or
/// incremental reveal of an unterminated line) any number of times before a
/// new line is appended after it; its sequence does not change on overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub sequence: u64,
    pub text: String,
}

impl LogLine {
    pub fn new(sequence: u64, text: impl Into<String>) -> Self {
        Self {
            sequence,
            text: text.into(),
        }
    }
}

/// Display severity of one rendered log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LineClass {
    Error,
    Warning,
    Info,
    Debug,
    /// The session's success line
    Success,
    /// Plain log content with no recognized severity prefix
    None,
}

/// A rendered line paired with its classification, as consumed by the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayLine {
    pub text: String,
    pub class: LineClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions_from_idle() {
        assert!(DeployPhase::Idle.can_transition_to(DeployPhase::Streaming));
        assert!(!DeployPhase::Idle.can_transition_to(DeployPhase::Completed));
        assert!(!DeployPhase::Idle.can_transition_to(DeployPhase::Failed));
        assert!(!DeployPhase::Idle.can_transition_to(DeployPhase::Cancelled));
    }

    #[test]
    fn test_phase_transitions_from_streaming() {
        assert!(DeployPhase::Streaming.can_transition_to(DeployPhase::Completed));
        assert!(DeployPhase::Streaming.can_transition_to(DeployPhase::Failed));
        assert!(DeployPhase::Streaming.can_transition_to(DeployPhase::Cancelled));
    }

    #[test]
    fn test_terminal_phases_only_reset() {
        for phase in [
            DeployPhase::Completed,
            DeployPhase::Failed,
            DeployPhase::Cancelled,
        ] {
            assert!(phase.is_terminal());
            assert!(phase.can_transition_to(DeployPhase::Idle));
            assert!(!phase.can_transition_to(DeployPhase::Streaming));
            assert!(!phase.can_transition_to(DeployPhase::Completed));
        }
    }

    #[test]
    fn test_cancelled_only_reachable_from_streaming() {
        assert!(!DeployPhase::Idle.can_transition_to(DeployPhase::Cancelled));
        assert!(!DeployPhase::Completed.can_transition_to(DeployPhase::Cancelled));
        assert!(!DeployPhase::Failed.can_transition_to(DeployPhase::Cancelled));
        assert!(DeployPhase::Streaming.can_transition_to(DeployPhase::Cancelled));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(DeployPhase::Streaming.to_string(), "streaming");
        assert_eq!(DeployPhase::Failed.to_string(), "failed");
    }

    #[test]
    fn test_status_icons_are_distinct() {
        let icons = [
            DeployPhase::Idle.status_icon(),
            DeployPhase::Streaming.status_icon(),
            DeployPhase::Completed.status_icon(),
            DeployPhase::Failed.status_icon(),
        ];
        for (i, a) in icons.iter().enumerate() {
            for b in icons.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
