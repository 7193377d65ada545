//! # drydock-engine - Session Orchestration
//!
//! Orchestration crate for Drydock. Ties the stream ingestor and the playback
//! scheduler together into one parametrized deployment session:
//!
//! - [`SessionDescriptor`] - the strategy object distinguishing the initial
//!   deploy flow from the project-update flow (transport kind, token
//!   vocabulary, trigger payload, completion-line grammar)
//! - [`LaunchSpec`] - trigger parameters (repository, branch, subdomains,
//!   directory overrides, environment pairs)
//! - [`DeploymentSession`] - the phase state machine with timestamps and the
//!   terminal outcome
//! - [`PlaybackCursor`] / the playback task - fixed-cadence character reveal
//! - [`EngineEvent`] - the outward event surface consumed by the dashboard
//! - [`start_session`] / [`run_session`] - the async session runner (timeout
//!   ceiling, idempotent cancellation, transport teardown)
//! - [`EngineSettings`] - TOML configuration with defaults
//!
//! One session owns one [`LineBuffer`]; the ingestor is its only writer and
//! the playback task its only reader. Starting a new session tears down the
//! prior one (cancel its [`SessionHandle`]) before triggering again.
//!
//! [`LineBuffer`]: drydock_core::LineBuffer

pub mod descriptor;
pub mod event;
pub mod playback;
pub mod runner;
pub mod session;
pub mod settings;

pub use descriptor::{LaunchSpec, SessionDescriptor, SessionKind};
pub use event::EngineEvent;
pub use playback::PlaybackCursor;
pub use runner::{run_session, start_session, SessionHandle};
pub use session::DeploymentSession;
pub use settings::{EngineSettings, PlaybackSettings, SessionSettings};
