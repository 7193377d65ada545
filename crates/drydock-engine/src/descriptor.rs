//! Session descriptors — the one place the deploy and update flows differ.
//!
//! Both dashboard call sites (initial deploy of a project, update of an
//! already-deployed one) drive the same engine; a descriptor bundles what
//! varies: transport kind, sentinel vocabulary, the trigger payload the
//! collaborator posts, and the grammar that extracts subdomains from the
//! completion line.

use serde_json::{json, Value};
use url::Url;

use drydock_core::classify::{LineClassifier, SuccessMatcher};
use drydock_core::classify::{DEPLOY_SUCCESS_LINE, UPDATE_SUCCESS_PREFIX};
use drydock_core::prelude::*;
use drydock_stream::{TokenVocabulary, TransportKind};

// ─────────────────────────────────────────────────────────
// Launch Parameters
// ─────────────────────────────────────────────────────────

/// Trigger parameters for one deployment or update.
///
/// The collaborator turns these into the HTTP request that opens the log
/// stream; the engine only validates them and embeds them in the trigger
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Target repository: an absolute URL or an `owner/repo` shorthand
    pub repository: String,

    /// Branch to build (defaults to `main`)
    pub branch: String,

    /// Subdomains this deployment serves. Also the fallback result when the
    /// completion line carries no subdomain list of its own.
    pub subdomains: Vec<String>,

    /// Build command override
    pub build_command: Option<String>,

    /// Install command override
    pub install_command: Option<String>,

    /// Output directory override
    pub output_directory: Option<String>,

    /// Root directory override
    pub root_directory: Option<String>,

    /// Environment variable pairs passed to the build
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: "main".to_string(),
            subdomains: Vec::new(),
            build_command: None,
            install_command: None,
            output_directory: None,
            root_directory: None,
            env: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Validate the parameters before triggering.
    ///
    /// A repository given as an absolute URL must parse as one; the
    /// `owner/repo` shorthand is accepted as-is.
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(Error::launch("repository must not be empty"));
        }
        if self.repository.contains("://") {
            Url::parse(&self.repository)
                .map_err(|e| Error::launch(format!("invalid repository URL: {e}")))?;
        }
        if self.branch.trim().is_empty() {
            return Err(Error::launch("branch must not be empty"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Session Descriptors
// ─────────────────────────────────────────────────────────

/// Which dashboard flow triggered this session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// First deployment of a project
    Deploy,

    /// Update of an already-deployed project
    Update,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Update => "update",
        }
    }
}

/// Everything that distinguishes one session flavor from the other
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    pub kind: SessionKind,
    pub transport: TransportKind,
    pub vocabulary: TokenVocabulary,
}

impl SessionDescriptor {
    /// Descriptor for the initial-deploy flow (event-stream transport)
    pub fn deploy() -> Self {
        Self {
            kind: SessionKind::Deploy,
            transport: TransportKind::EventStream,
            vocabulary: TokenVocabulary::deploy(),
        }
    }

    /// Descriptor for the project-update flow (chunked-response transport)
    pub fn update() -> Self {
        Self {
            kind: SessionKind::Update,
            transport: TransportKind::Chunked,
            vocabulary: TokenVocabulary::update(),
        }
    }

    /// Override the transport kind (the backend may serve either flow over
    /// either wire shape)
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Line classifier for this flavor's success line
    pub fn classifier(&self) -> LineClassifier {
        let matcher = match self.kind {
            SessionKind::Deploy => SuccessMatcher::Exact(DEPLOY_SUCCESS_LINE.to_string()),
            SessionKind::Update => SuccessMatcher::Prefix(UPDATE_SUCCESS_PREFIX.to_string()),
        };
        LineClassifier::new(vec![matcher])
    }

    /// Build the JSON trigger payload the collaborator posts to start this
    /// session
    pub fn trigger_payload(&self, launch: &LaunchSpec) -> Value {
        let env: serde_json::Map<String, Value> = launch
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let mut payload = json!({
            "action": self.kind.as_str(),
            "repository": launch.repository,
            "branch": launch.branch,
            "subdomains": launch.subdomains,
            "env": env,
        });

        let overrides = [
            ("buildCommand", &launch.build_command),
            ("installCommand", &launch.install_command),
            ("outputDirectory", &launch.output_directory),
            ("rootDirectory", &launch.root_directory),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                payload[key] = Value::String(value.clone());
            }
        }

        payload
    }

    /// Extract the subdomain list embedded in a completion line.
    ///
    /// Grammar: the text after the last `:`, split on `,`, trimmed. Returns
    /// `None` when the line carries no list (the deploy flow's fixed success
    /// line), in which case the caller falls back to the requested
    /// subdomains.
    pub fn parse_subdomains(&self, line: &str) -> Option<Vec<String>> {
        let (_, tail) = line.rsplit_once(':')?;
        let subdomains: Vec<String> = tail
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if subdomains.is_empty() {
            None
        } else {
            Some(subdomains)
        }
    }
}
