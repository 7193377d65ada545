//! Deployment session state — phase machine, timestamps, and outcome.

use chrono::{DateTime, Local};

use drydock_core::prelude::*;
use drydock_core::DeployPhase;

/// One deployment or update session.
///
/// Owns the phase state machine; every transition is guarded by
/// [`DeployPhase::can_transition_to`], so an invalid request (a duplicate
/// sentinel, a cancel after completion) is rejected without corrupting state.
#[derive(Debug, Clone)]
pub struct DeploymentSession {
    phase: DeployPhase,

    /// When streaming began
    pub started_at: Option<DateTime<Local>>,

    /// When a terminal phase was reached
    pub completed_at: Option<DateTime<Local>>,

    /// Affected subdomains, populated on successful completion
    pub subdomains: Vec<String>,

    /// Failure message, populated when the session fails
    pub error_message: Option<String>,
}

impl Default for DeploymentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploymentSession {
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Idle,
            started_at: None,
            completed_at: None,
            subdomains: Vec::new(),
            error_message: None,
        }
    }

    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    fn transition(&mut self, to: DeployPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            warn!("rejected session transition {} → {}", self.phase, to);
            return Err(Error::invalid_transition(self.phase, to));
        }
        debug!("session transition {} → {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Begin streaming (deploy trigger). Valid from `Idle` only.
    pub fn begin_streaming(&mut self) -> Result<()> {
        self.transition(DeployPhase::Streaming)?;
        self.started_at = Some(Local::now());
        Ok(())
    }

    /// Record successful completion with the affected subdomains
    pub fn complete(&mut self, subdomains: Vec<String>) -> Result<()> {
        self.transition(DeployPhase::Completed)?;
        self.completed_at = Some(Local::now());
        self.subdomains = subdomains;
        Ok(())
    }

    /// Record failure with the surfaced message
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(DeployPhase::Failed)?;
        self.completed_at = Some(Local::now());
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record a user cancel / view teardown
    pub fn cancel(&mut self) -> Result<()> {
        self.transition(DeployPhase::Cancelled)?;
        self.completed_at = Some(Local::now());
        Ok(())
    }

    /// Reset for a fresh trigger. Clears outcome and timestamps.
    pub fn reset(&mut self) {
        self.phase = DeployPhase::Idle;
        self.started_at = None;
        self.completed_at = None;
        self.subdomains.clear();
        self.error_message = None;
    }

    /// Duration from streaming start to the terminal phase (or to now while
    /// still streaming)
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Local::now);
        Some(end - start)
    }

    /// Format the session duration as HH:MM:SS for the status area
    pub fn duration_display(&self) -> Option<String> {
        self.duration().map(|d| {
            let total_secs = d.num_seconds().max(0);
            let hours = total_secs / 3600;
            let minutes = (total_secs % 3600) / 60;
            let seconds = total_secs % 60;
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_to_completed() {
        let mut session = DeploymentSession::new();
        assert_eq!(session.phase(), DeployPhase::Idle);

        session.begin_streaming().unwrap();
        assert_eq!(session.phase(), DeployPhase::Streaming);
        assert!(session.started_at.is_some());

        session.complete(vec!["www".to_string()]).unwrap();
        assert_eq!(session.phase(), DeployPhase::Completed);
        assert!(session.completed_at.is_some());
        assert_eq!(session.subdomains, vec!["www"]);
    }

    #[test]
    fn test_failure_records_message() {
        let mut session = DeploymentSession::new();
        session.begin_streaming().unwrap();
        session.fail("disk full").unwrap();

        assert_eq!(session.phase(), DeployPhase::Failed);
        assert_eq!(session.error_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_cannot_complete_from_idle() {
        let mut session = DeploymentSession::new();
        let err = session.complete(vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(session.phase(), DeployPhase::Idle);
    }

    #[test]
    fn test_duplicate_completion_rejected() {
        let mut session = DeploymentSession::new();
        session.begin_streaming().unwrap();
        session.complete(vec!["a".to_string()]).unwrap();

        // A second terminal signal must not re-open or mutate the session
        assert!(session.complete(vec!["b".to_string()]).is_err());
        assert!(session.fail("late error").is_err());
        assert_eq!(session.subdomains, vec!["a"]);
        assert!(session.error_message.is_none());
    }

    #[test]
    fn test_cancel_only_while_streaming() {
        let mut session = DeploymentSession::new();
        assert!(session.cancel().is_err());

        session.begin_streaming().unwrap();
        session.cancel().unwrap();
        assert_eq!(session.phase(), DeployPhase::Cancelled);

        // Terminal; streaming requires a reset first
        assert!(session.begin_streaming().is_err());
        session.reset();
        assert!(session.begin_streaming().is_ok());
    }

    #[test]
    fn test_reset_clears_outcome() {
        let mut session = DeploymentSession::new();
        session.begin_streaming().unwrap();
        session.fail("boom").unwrap();

        session.reset();
        assert_eq!(session.phase(), DeployPhase::Idle);
        assert!(session.started_at.is_none());
        assert!(session.completed_at.is_none());
        assert!(session.error_message.is_none());
    }

    #[test]
    fn test_duration_display_format() {
        let mut session = DeploymentSession::new();
        assert!(session.duration_display().is_none());

        session.begin_streaming().unwrap();
        session.complete(vec![]).unwrap();
        let display = session.duration_display().unwrap();
        assert_eq!(display.len(), 8);
        assert_eq!(display.matches(':').count(), 2);
    }
}
