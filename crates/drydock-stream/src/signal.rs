//! Control-token vocabulary and the single signal parse step.
//!
//! Every completed unit of stream text goes through [`classify_segment`]
//! exactly once, producing one of a closed set of tagged variants. Nothing
//! else in the engine compares strings against sentinels.

use serde::{Deserialize, Serialize};

use drydock_core::classify::{DEPLOY_SUCCESS_LINE, UPDATE_SUCCESS_PREFIX};

/// Completion sentinel sent at the end of a successful initial deployment
pub const DEPLOY_COMPLETE_TOKEN: &str = "DEPLOYMENT_COMPLETE";

/// Error sentinel prefix for the deploy flow; the remainder is the message
pub const DEPLOY_ERROR_PREFIX: &str = "DEPLOYMENT_ERROR:";

/// Error sentinel prefix for the update flow
pub const UPDATE_ERROR_PREFIX: &str = "UPDATE_ERROR:";

// ─────────────────────────────────────────────────────────
// Token Vocabulary
// ─────────────────────────────────────────────────────────

/// How the completion sentinel is recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionToken {
    /// The unit must equal the token exactly
    Exact(String),

    /// The unit must start with the token; the full line is meaningful
    /// (the update flow embeds the affected subdomains in it)
    Prefix(String),
}

impl CompletionToken {
    /// Check a completed unit against this token
    pub fn matches(&self, unit: &str) -> bool {
        match self {
            Self::Exact(token) => unit == token,
            Self::Prefix(prefix) => unit.starts_with(prefix),
        }
    }

    /// Check whether a partial unit could still grow into a match.
    ///
    /// Used by the ingestor's hold-back rule: a candidate is withheld from the
    /// buffer until more input completes or rules out the match.
    pub fn is_candidate(&self, partial: &str) -> bool {
        match self {
            Self::Exact(token) => token.starts_with(partial),
            Self::Prefix(prefix) => prefix.starts_with(partial) || partial.starts_with(prefix),
        }
    }
}

/// What to append to the buffer when the completion sentinel arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessLine {
    /// A fixed line (the deploy flow's "Deployment successful!")
    Fixed(String),

    /// Echo the received completion line verbatim (the update flow's line
    /// carries the subdomain list)
    Echo,
}

impl SuccessLine {
    /// Build the success line for a matched completion unit
    pub fn build(&self, matched: &str) -> String {
        match self {
            Self::Fixed(line) => line.clone(),
            Self::Echo => matched.to_string(),
        }
    }

    /// Build the success line for a successful structured status report
    pub fn for_status(&self, report: &StatusReport) -> String {
        if let Some(message) = &report.message {
            return message.clone();
        }
        match self {
            Self::Fixed(line) => line.clone(),
            Self::Echo => DEPLOY_SUCCESS_LINE.to_string(),
        }
    }
}

/// The sentinel vocabulary of one session flavor.
///
/// The deploy and update call sites differ only in this vocabulary, the
/// trigger payload, and the completion-line grammar; everything downstream is
/// shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVocabulary {
    pub completion: CompletionToken,
    pub error_prefix: String,
    pub success_line: SuccessLine,
}

impl TokenVocabulary {
    /// Vocabulary of the initial-deploy flow
    pub fn deploy() -> Self {
        Self {
            completion: CompletionToken::Exact(DEPLOY_COMPLETE_TOKEN.to_string()),
            error_prefix: DEPLOY_ERROR_PREFIX.to_string(),
            success_line: SuccessLine::Fixed(DEPLOY_SUCCESS_LINE.to_string()),
        }
    }

    /// Vocabulary of the project-update flow
    pub fn update() -> Self {
        Self {
            completion: CompletionToken::Prefix(UPDATE_SUCCESS_PREFIX.to_string()),
            error_prefix: UPDATE_ERROR_PREFIX.to_string(),
            success_line: SuccessLine::Echo,
        }
    }

    /// Check whether a partial unit could still become a sentinel.
    ///
    /// Covers both the completion token and the error prefix (an error unit
    /// is `prefix + payload`, so anything extending the prefix stays a
    /// candidate until a line boundary delivers the full payload).
    pub fn is_candidate(&self, partial: &str) -> bool {
        self.completion.is_candidate(partial)
            || self.error_prefix.starts_with(partial)
            || partial.starts_with(&self.error_prefix)
    }
}

// ─────────────────────────────────────────────────────────
// Structured Status Reports
// ─────────────────────────────────────────────────────────

/// Terminal status object the chunked transport may deliver instead of a
/// literal token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub subdomains: Option<Vec<String>>,
}

impl StatusReport {
    /// Parse a completed line as a status report.
    ///
    /// Permissive by design: anything that is not a JSON object with a
    /// `success` field is ordinary log text, never an error.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

// ─────────────────────────────────────────────────────────
// The Parse Step
// ─────────────────────────────────────────────────────────

/// Tagged classification of one completed unit of stream text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// Ordinary log content (possibly containing carriage returns)
    Content(String),

    /// The completion sentinel; `line` is the success line to append
    Completion { line: String },

    /// The error sentinel; `payload` is the server-supplied message
    Error { payload: String },

    /// A structured terminal status (chunked transport only)
    Status(StatusReport),
}

/// Classify one completed unit against a vocabulary.
///
/// `allow_status` is set for the chunked transport, whose newline-delimited
/// units may be JSON status objects; the event-stream transport only ever
/// delivers tokens or raw text.
pub fn classify_segment(
    vocabulary: &TokenVocabulary,
    allow_status: bool,
    unit: &str,
) -> StreamSignal {
    if vocabulary.completion.matches(unit) {
        return StreamSignal::Completion {
            line: vocabulary.success_line.build(unit),
        };
    }

    if let Some(payload) = unit.strip_prefix(&vocabulary.error_prefix) {
        return StreamSignal::Error {
            payload: payload.trim().to_string(),
        };
    }

    if allow_status {
        if let Some(report) = StatusReport::parse(unit) {
            return StreamSignal::Status(report);
        }
    }

    StreamSignal::Content(unit.to_string())
}
