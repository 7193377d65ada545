//! Severity classification for rendered log lines.
//!
//! Classification is a pure function over one line's content: literal
//! prefixes checked in fixed priority order, with the session success lines
//! recognized unconditionally. The only state a [`LineClassifier`] carries is
//! its success-line markers, which differ between the deploy and update flows.

use crate::types::{DisplayLine, LineClass};

/// Success line appended when an initial deployment completes
pub const DEPLOY_SUCCESS_LINE: &str = "Deployment successful!";

/// Prefix of the completion line echoed when a project update completes
pub const UPDATE_SUCCESS_PREFIX: &str = "Update completed successfully";

/// Severity prefixes in fixed priority order
const SEVERITY_PREFIXES: &[(&str, LineClass)] = &[
    ("ERROR:", LineClass::Error),
    ("WARNING:", LineClass::Warning),
    ("INFO:", LineClass::Info),
    ("DEBUG:", LineClass::Debug),
];

/// How a line is recognized as the session's success line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessMatcher {
    Exact(String),
    Prefix(String),
}

impl SuccessMatcher {
    fn matches(&self, content: &str) -> bool {
        match self {
            Self::Exact(line) => content == line,
            Self::Prefix(prefix) => content.starts_with(prefix),
        }
    }
}

/// Literal-prefix line classifier.
///
/// The default recognizes both built-in success lines; a session that only
/// ever produces one flavor may construct a narrower classifier via
/// [`LineClassifier::new`].
#[derive(Debug, Clone)]
pub struct LineClassifier {
    success: Vec<SuccessMatcher>,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(vec![
            SuccessMatcher::Exact(DEPLOY_SUCCESS_LINE.to_string()),
            SuccessMatcher::Prefix(UPDATE_SUCCESS_PREFIX.to_string()),
        ])
    }
}

impl LineClassifier {
    pub fn new(success: Vec<SuccessMatcher>) -> Self {
        Self { success }
    }

    /// Classify one rendered line.
    ///
    /// Backticks are stripped before matching (inline-code markers leak in
    /// from upstream log formatting). Leading whitespace is preserved in the
    /// rendered text but ignored for prefix matching.
    pub fn classify(&self, line: &str) -> LineClass {
        let content: String = line.chars().filter(|&c| c != '`').collect();
        let trimmed = content.trim_start();

        if self.success.iter().any(|m| m.matches(trimmed)) {
            return LineClass::Success;
        }

        for (prefix, class) in SEVERITY_PREFIXES {
            if trimmed.starts_with(prefix) {
                return *class;
            }
        }

        LineClass::None
    }

    /// Classify a rendered multi-line text into the display-line sequence the
    /// dashboard consumes. Backticks are stripped from the rendered text as
    /// well as for matching.
    pub fn classify_rendered(&self, text: &str) -> Vec<DisplayLine> {
        text.split('\n')
            .map(|line| DisplayLine {
                class: self.classify(line),
                text: line.chars().filter(|&c| c != '`').collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_prefixes() {
        let classifier = LineClassifier::default();
        assert_eq!(classifier.classify("ERROR: disk full"), LineClass::Error);
        assert_eq!(
            classifier.classify("WARNING: low memory"),
            LineClass::Warning
        );
        assert_eq!(classifier.classify("INFO: cloning repo"), LineClass::Info);
        assert_eq!(classifier.classify("DEBUG: env loaded"), LineClass::Debug);
    }

    #[test]
    fn test_unmatched_line_is_none() {
        let classifier = LineClassifier::default();
        assert_eq!(classifier.classify("Building..."), LineClass::None);
        assert_eq!(classifier.classify(""), LineClass::None);
        // Severity word without the colon prefix is plain content
        assert_eq!(classifier.classify("error in module"), LineClass::None);
    }

    #[test]
    fn test_success_lines() {
        let classifier = LineClassifier::default();
        assert_eq!(
            classifier.classify("Deployment successful!"),
            LineClass::Success
        );
        assert_eq!(
            classifier.classify("Update completed successfully for subdomains: a, b"),
            LineClass::Success
        );
    }

    #[test]
    fn test_backticks_stripped_before_matching() {
        let classifier = LineClassifier::default();
        assert_eq!(
            classifier.classify("`ERROR:` build failed"),
            LineClass::Error
        );
        assert_eq!(
            classifier.classify("Deployment `successful!`"),
            LineClass::Success
        );
    }

    #[test]
    fn test_leading_whitespace_ignored_for_matching() {
        let classifier = LineClassifier::default();
        assert_eq!(classifier.classify("   ERROR: nested"), LineClass::Error);
        assert_eq!(
            classifier.classify("\tDeployment successful!"),
            LineClass::Success
        );
    }

    #[test]
    fn test_priority_order_first_prefix_wins() {
        let classifier = LineClassifier::default();
        // ERROR: is checked before the later prefixes it could contain
        assert_eq!(
            classifier.classify("ERROR: WARNING: both"),
            LineClass::Error
        );
    }

    #[test]
    fn test_classify_rendered_splits_and_strips() {
        let classifier = LineClassifier::default();
        let lines = classifier.classify_rendered("Building...\nERROR: `bad`");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].class, LineClass::None);
        assert_eq!(lines[0].text, "Building...");
        assert_eq!(lines[1].class, LineClass::Error);
        assert_eq!(lines[1].text, "ERROR: bad");
    }

    #[test]
    fn test_narrow_classifier_ignores_other_flavor() {
        let classifier = LineClassifier::new(vec![SuccessMatcher::Exact(
            DEPLOY_SUCCESS_LINE.to_string(),
        )]);
        assert_eq!(
            classifier.classify("Update completed successfully for subdomains: a"),
            LineClass::None
        );
    }
}
