//! Stream ingestion: fragments in, line-buffer mutations out.
//!
//! The ingestor is the single writer of a session's [`LineBuffer`]. It
//! reconstructs terminal-style output from arbitrarily fragmented text
//! (LF splits lines, the last carriage-return segment wins within a line),
//! withholds anything that could still be a partial sentinel, and latches on
//! the first terminal signal.

use std::sync::Arc;

use tracing::{debug, info, trace};

use drydock_core::LineBuffer;

use crate::escape::decode_control_escapes;
use crate::signal::{classify_segment, StatusReport, StreamSignal, TokenVocabulary};
use crate::transport::TransportKind;

/// Terminal result of one ingested stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The completion sentinel (or a successful status report) arrived.
    /// `line` is the success line appended to the buffer; `subdomains` is
    /// only populated when a status report carried the list directly —
    /// otherwise the session descriptor parses it out of `line`.
    Completed {
        line: String,
        subdomains: Option<Vec<String>>,
    },

    /// The error sentinel (or a failed status report, or a session-level
    /// failure reported via [`StreamIngestor::fail`]) ended the stream
    Failed { message: String },
}

/// Single-writer stream ingestor for one session.
///
/// Feed fragments with [`feed`]; report a clean transport close with
/// [`close`] and session-level failures with [`fail`]. After the first
/// terminal outcome every further input is silently discarded — a sentinel
/// means "close now", and the chunked transport may deliver trailing content
/// after a status line.
///
/// [`feed`]: StreamIngestor::feed
/// [`close`]: StreamIngestor::close
/// [`fail`]: StreamIngestor::fail
#[derive(Debug)]
pub struct StreamIngestor {
    buffer: Arc<LineBuffer>,
    vocabulary: TokenVocabulary,
    transport: TransportKind,

    /// Raw text of the logical line in progress (since the last LF, after
    /// escape decoding, before carriage-return resolution)
    current: String,

    /// Whether `current` has been partially revealed as the buffer's last line
    line_open: bool,

    /// A trailing backslash held back from escape decoding (the two-character
    /// escape may be split across fragments)
    pending_escape: bool,

    /// Set on the first terminal signal; never cleared
    outcome: Option<StreamOutcome>,
}

impl StreamIngestor {
    pub fn new(
        buffer: Arc<LineBuffer>,
        vocabulary: TokenVocabulary,
        transport: TransportKind,
    ) -> Self {
        Self {
            buffer,
            vocabulary,
            transport,
            current: String::new(),
            line_open: false,
            pending_escape: false,
            outcome: None,
        }
    }

    /// Consume one transport fragment.
    ///
    /// Returns the terminal outcome once one has been reached (on this call
    /// or any earlier one).
    pub fn feed(&mut self, fragment: &str) -> Option<&StreamOutcome> {
        if self.outcome.is_some() {
            trace!("ignoring fragment after terminal signal");
            return self.outcome.as_ref();
        }

        let decoded = self.decode(fragment);

        let mut rest = decoded.as_str();
        while let Some(pos) = rest.find('\n') {
            self.current.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            self.complete_line();
            if self.outcome.is_some() {
                if !rest.is_empty() {
                    trace!("discarding trailing content after terminal signal");
                }
                return self.outcome.as_ref();
            }
        }
        self.current.push_str(rest);

        self.fragment_end();
        self.outcome.as_ref()
    }

    /// Report a clean transport close.
    ///
    /// End-of-stream acts as a final line boundary, so a sentinel without a
    /// trailing newline is still honored. Whether a close without any
    /// terminal signal fails the session is the caller's decision.
    pub fn close(&mut self) -> Option<&StreamOutcome> {
        if self.outcome.is_none() && !self.current.is_empty() {
            self.complete_line();
        }
        self.outcome.as_ref()
    }

    /// Fail the stream from outside (connect failure, connection lost,
    /// timeout). Appends the classified error line and latches; a no-op if a
    /// terminal signal already arrived.
    pub fn fail(&mut self, message: impl Into<String>) -> &StreamOutcome {
        if self.outcome.is_none() {
            self.finalize_error(message.into());
        }
        self.outcome.as_ref().expect("outcome set by finalize_error")
    }

    /// Terminal outcome, if the stream has ended
    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    // ─────────────────────────────────────────────────────────
    // Fragment Processing
    // ─────────────────────────────────────────────────────────

    fn decode(&mut self, fragment: &str) -> String {
        if !self.transport.decodes_escapes() {
            return fragment.to_string();
        }
        let input = if self.pending_escape {
            self.pending_escape = false;
            let mut joined = String::with_capacity(fragment.len() + 1);
            joined.push('\\');
            joined.push_str(fragment);
            joined
        } else {
            fragment.to_string()
        };
        let (decoded, dangling) = decode_control_escapes(&input);
        self.pending_escape = dangling;
        decoded
    }

    /// An LF arrived (or end-of-stream stands in for one): resolve and commit
    /// the completed line.
    fn complete_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        let was_open = self.line_open;
        self.line_open = false;

        // Blank separator lines are discarded silently
        if line.is_empty() && !was_open {
            return;
        }

        match classify_segment(&self.vocabulary, self.transport.allows_status(), &line) {
            StreamSignal::Completion { line: success } => self.finalize_success(success, None),
            StreamSignal::Error { payload } => self.finalize_error(payload),
            StreamSignal::Status(report) => self.finalize_status(report),
            StreamSignal::Content(text) => {
                let resolved = resolve_carriage_returns(&text);
                if was_open {
                    self.buffer.overwrite_last(resolved);
                } else if !resolved.is_empty() {
                    self.buffer.append(resolved);
                }
                // Empty resolution with nothing revealed: the carriage
                // returns consumed the whole segment
            }
        }
    }

    /// End of one fragment: sentinel checks for whole-unit payloads, then the
    /// hold-back rule, then incremental reveal of the unterminated line.
    fn fragment_end(&mut self) {
        if self.current.is_empty() {
            return;
        }

        // The event-stream transport delivers sentinels as whole payload
        // units, so they are decidable at the message boundary. The chunked
        // transport delimits units by newline; an unterminated unit there may
        // still grow (DEPLOYMENT_COMPLETE could become DEPLOYMENT_COMPLETED),
        // so it stays held until a line boundary or close.
        if self.transport.whole_unit_payloads() && !self.line_open {
            match classify_segment(&self.vocabulary, false, &self.current) {
                StreamSignal::Completion { line } => {
                    self.current.clear();
                    self.finalize_success(line, None);
                    return;
                }
                StreamSignal::Error { payload } => {
                    self.current.clear();
                    self.finalize_error(payload);
                    return;
                }
                _ => {}
            }
        }

        // Hold-back rule: never render text that could still be a sentinel
        if !self.line_open && self.vocabulary.is_candidate(&self.current) {
            trace!("holding back potential sentinel prefix");
            return;
        }

        let resolved = resolve_carriage_returns(&self.current);
        if self.line_open {
            self.buffer.overwrite_last(resolved);
        } else if !resolved.is_empty() {
            self.buffer.append(resolved);
            self.line_open = true;
        }
    }

    // ─────────────────────────────────────────────────────────
    // Terminal Signals
    // ─────────────────────────────────────────────────────────

    fn finalize_success(&mut self, line: String, subdomains: Option<Vec<String>>) {
        info!("completion sentinel received, closing stream");
        self.buffer.append(line.clone());
        self.outcome = Some(StreamOutcome::Completed { line, subdomains });
    }

    fn finalize_error(&mut self, message: String) {
        debug!("stream failed: {}", message);
        self.buffer.append(format!("ERROR: {message}"));
        self.outcome = Some(StreamOutcome::Failed { message });
    }

    fn finalize_status(&mut self, report: StatusReport) {
        if report.success {
            let line = self.vocabulary.success_line.for_status(&report);
            let subdomains = report.subdomains;
            self.finalize_success(line, subdomains);
        } else {
            let message = report
                .message
                .unwrap_or_else(|| "deployment failed".to_string());
            self.finalize_error(message);
        }
    }
}

/// Terminal progress-bar semantics: only the text after the last carriage
/// return in a segment is shown.
fn resolve_carriage_returns(segment: &str) -> &str {
    match segment.rfind('\r') {
        Some(pos) => &segment[pos + 1..],
        None => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_core::classify::DEPLOY_SUCCESS_LINE;

    fn chunked(buffer: &Arc<LineBuffer>) -> StreamIngestor {
        StreamIngestor::new(
            Arc::clone(buffer),
            TokenVocabulary::deploy(),
            TransportKind::Chunked,
        )
    }

    fn event_stream(buffer: &Arc<LineBuffer>) -> StreamIngestor {
        StreamIngestor::new(
            Arc::clone(buffer),
            TokenVocabulary::deploy(),
            TransportKind::EventStream,
        )
    }

    fn texts(buffer: &LineBuffer) -> Vec<String> {
        buffer.snapshot().into_iter().map(|l| l.text).collect()
    }

    // ─────────────────────────────────────────────────────────
    // Line Reconstruction
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_progress_overwrite_scenario() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("Building...\n");
        ingestor.feed("Step 1\rStep 1 done\n");
        let outcome = ingestor.feed("DEPLOYMENT_COMPLETE\n").cloned();

        assert_eq!(
            texts(&buffer),
            vec!["Building...", "Step 1 done", DEPLOY_SUCCESS_LINE]
        );
        assert_eq!(
            outcome,
            Some(StreamOutcome::Completed {
                line: DEPLOY_SUCCESS_LINE.to_string(),
                subdomains: None,
            })
        );
    }

    #[test]
    fn test_error_sentinel_scenario() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("Installing deps\n");
        let outcome = ingestor.feed("DEPLOYMENT_ERROR:disk full\n").cloned();

        assert_eq!(texts(&buffer), vec!["Installing deps", "ERROR: disk full"]);
        assert_eq!(
            outcome,
            Some(StreamOutcome::Failed {
                message: "disk full".to_string()
            })
        );
    }

    #[test]
    fn test_no_cr_idempotence_across_fragmentations() {
        let full = "alpha\nbeta\ngamma\n";
        let fragmentations: &[&[&str]] = &[
            &["alpha\nbeta\ngamma\n"],
            &["alpha\n", "beta\n", "gamma\n"],
            &["al", "pha\nbe", "ta\ngam", "ma\n"],
            &["alpha", "\n", "beta", "\n", "gamma", "\n"],
            &["a", "l", "p", "h", "a", "\nbeta\ngamma\n"],
        ];

        let expected: Vec<&str> = full.split('\n').filter(|s| !s.is_empty()).collect();

        for fragments in fragmentations {
            let buffer = Arc::new(LineBuffer::new());
            let mut ingestor = chunked(&buffer);
            for fragment in *fragments {
                ingestor.feed(fragment);
            }
            ingestor.close();
            assert_eq!(texts(&buffer), expected, "fragments: {:?}", fragments);
        }
    }

    #[test]
    fn test_cr_overwrite_last_segment_wins() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        // Multiple CRs in one segment: everything before the last is discarded
        ingestor.feed("10%\r20%\r30%\r100%\n");
        assert_eq!(texts(&buffer), vec!["100%"]);
    }

    #[test]
    fn test_cr_overwrites_open_line_across_fragments() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("downloading 10%");
        assert_eq!(texts(&buffer), vec!["downloading 10%"]);

        ingestor.feed("\rdownloading 55%");
        assert_eq!(texts(&buffer), vec!["downloading 55%"]);

        ingestor.feed("\rdone\n");
        ingestor.feed("next\n");
        assert_eq!(texts(&buffer), vec!["done", "next"]);
        // The overwritten line kept its sequence; the new line got the next one
        let lines = buffer.snapshot();
        assert_eq!(lines[0].sequence, 0);
        assert_eq!(lines[1].sequence, 1);
    }

    #[test]
    fn test_cr_only_tail_blanks_open_line() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("spinner");
        ingestor.feed("\r\n");
        assert_eq!(texts(&buffer), vec![""]);
    }

    #[test]
    fn test_unterminated_line_revealed_incrementally() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("Instal");
        assert_eq!(texts(&buffer), vec!["Instal"]);
        ingestor.feed("ling deps");
        assert_eq!(texts(&buffer), vec!["Installing deps"]);
        ingestor.feed("\n");
        assert_eq!(texts(&buffer), vec!["Installing deps"]);
        assert_eq!(buffer.snapshot()[0].sequence, 0);
    }

    #[test]
    fn test_empty_segments_discarded() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("one\n\n\ntwo\n");
        assert_eq!(texts(&buffer), vec!["one", "two"]);
    }

    // ─────────────────────────────────────────────────────────
    // Sentinels
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_sentinel_idempotence() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COMPLETE\n");
        ingestor.feed("DEPLOYMENT_COMPLETE\n");
        ingestor.feed("anything else\n");

        assert_eq!(texts(&buffer), vec![DEPLOY_SUCCESS_LINE]);
        assert!(ingestor.is_finished());
    }

    #[test]
    fn test_sentinel_split_across_fragments_is_held_back() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COM");
        // Nothing rendered: could still be the sentinel
        assert!(buffer.is_empty());

        ingestor.feed("PLETE\n");
        assert_eq!(texts(&buffer), vec![DEPLOY_SUCCESS_LINE]);
    }

    #[test]
    fn test_held_text_that_rules_out_sentinel_is_rendered() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COM");
        assert!(buffer.is_empty());

        ingestor.feed("MANDER says hi");
        assert_eq!(texts(&buffer), vec!["DEPLOYMENT_COMMANDER says hi"]);

        ingestor.feed("\n");
        assert!(!ingestor.is_finished());
    }

    #[test]
    fn test_chunked_token_without_newline_completes_on_close() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COMPLETE");
        // Still held: the unit could grow into DEPLOYMENT_COMPLETED
        assert!(buffer.is_empty());
        assert!(!ingestor.is_finished());

        let outcome = ingestor.close().cloned();
        assert_eq!(
            outcome,
            Some(StreamOutcome::Completed {
                line: DEPLOY_SUCCESS_LINE.to_string(),
                subdomains: None,
            })
        );
    }

    #[test]
    fn test_chunked_token_lookalike_grows_into_content() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COMPLETE");
        ingestor.feed("D extra\n");
        assert_eq!(texts(&buffer), vec!["DEPLOYMENT_COMPLETED extra"]);
        assert!(!ingestor.is_finished());
    }

    #[test]
    fn test_trailing_content_after_terminal_signal_discarded() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COMPLETE\ntrailing noise\nmore\n");
        assert_eq!(texts(&buffer), vec![DEPLOY_SUCCESS_LINE]);
    }

    #[test]
    fn test_status_report_success_with_subdomains() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        let outcome = ingestor
            .feed("{\"success\":true,\"message\":\"All done\",\"subdomains\":[\"a\",\"b\"]}\n")
            .cloned();

        assert_eq!(texts(&buffer), vec!["All done"]);
        assert_eq!(
            outcome,
            Some(StreamOutcome::Completed {
                line: "All done".to_string(),
                subdomains: Some(vec!["a".to_string(), "b".to_string()]),
            })
        );
    }

    #[test]
    fn test_status_report_failure() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        let outcome = ingestor
            .feed("{\"success\":false,\"message\":\"build broke\"}\n")
            .cloned();

        assert_eq!(texts(&buffer), vec!["ERROR: build broke"]);
        assert_eq!(
            outcome,
            Some(StreamOutcome::Failed {
                message: "build broke".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_json_is_ordinary_log_text() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("{\"success\":tru\n");
        ingestor.feed("{\"other\":1}\n");
        assert_eq!(texts(&buffer), vec!["{\"success\":tru", "{\"other\":1}"]);
        assert!(!ingestor.is_finished());
    }

    // ─────────────────────────────────────────────────────────
    // Event-Stream Transport
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_event_stream_decodes_literal_escapes() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = event_stream(&buffer);

        ingestor.feed(r"Building...\nStep 1\rStep 1 done\n");
        assert_eq!(texts(&buffer), vec!["Building...", "Step 1 done"]);
    }

    #[test]
    fn test_event_stream_whole_payload_completion() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = event_stream(&buffer);

        ingestor.feed(r"cloning repo\n");
        let outcome = ingestor.feed("DEPLOYMENT_COMPLETE").cloned();

        assert_eq!(texts(&buffer), vec!["cloning repo", DEPLOY_SUCCESS_LINE]);
        assert!(matches!(outcome, Some(StreamOutcome::Completed { .. })));
    }

    #[test]
    fn test_event_stream_whole_payload_error() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = event_stream(&buffer);

        let outcome = ingestor.feed("DEPLOYMENT_ERROR:out of memory").cloned();

        assert_eq!(texts(&buffer), vec!["ERROR: out of memory"]);
        assert_eq!(
            outcome,
            Some(StreamOutcome::Failed {
                message: "out of memory".to_string()
            })
        );
    }

    #[test]
    fn test_event_stream_escape_split_across_fragments() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = event_stream(&buffer);

        ingestor.feed("first line\\");
        ingestor.feed("nsecond line");
        assert_eq!(texts(&buffer), vec!["first line", "second line"]);
    }

    #[test]
    fn test_event_stream_payloads_concatenate_without_escapes() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = event_stream(&buffer);

        ingestor.feed("progress: ");
        ingestor.feed("42%");
        assert_eq!(texts(&buffer), vec!["progress: 42%"]);
    }

    #[test]
    fn test_update_vocabulary_echoes_completion_line() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = StreamIngestor::new(
            Arc::clone(&buffer),
            TokenVocabulary::update(),
            TransportKind::EventStream,
        );

        let line = "Update completed successfully for subdomains: a, b";
        let outcome = ingestor.feed(line).cloned();

        assert_eq!(texts(&buffer), vec![line]);
        assert_eq!(
            outcome,
            Some(StreamOutcome::Completed {
                line: line.to_string(),
                subdomains: None,
            })
        );
    }

    // ─────────────────────────────────────────────────────────
    // External Failure Reporting
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_fail_appends_classified_error_line() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("cloning\n");
        ingestor.fail("connection lost");

        assert_eq!(texts(&buffer), vec!["cloning", "ERROR: connection lost"]);
        assert_eq!(
            ingestor.outcome(),
            Some(&StreamOutcome::Failed {
                message: "connection lost".to_string()
            })
        );
    }

    #[test]
    fn test_fail_after_completion_is_a_no_op() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("DEPLOYMENT_COMPLETE\n");
        ingestor.fail("too late");

        assert_eq!(texts(&buffer), vec![DEPLOY_SUCCESS_LINE]);
        assert!(matches!(
            ingestor.outcome(),
            Some(StreamOutcome::Completed { .. })
        ));
    }

    #[test]
    fn test_close_without_sentinel_reports_no_outcome() {
        let buffer = Arc::new(LineBuffer::new());
        let mut ingestor = chunked(&buffer);

        ingestor.feed("some output\n");
        assert!(ingestor.close().is_none());
        assert_eq!(texts(&buffer), vec!["some output"]);
    }
}
