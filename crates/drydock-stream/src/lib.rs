//! # drydock-stream - Stream Ingestion
//!
//! Transport-facing crate for Drydock. Consumes the lazy fragment sequence an
//! external collaborator extracts from an event-stream or chunked-response
//! connection, and turns it into [`LineBuffer`] mutations plus a terminal
//! [`StreamOutcome`].
//!
//! The pipeline per fragment:
//!
//! 1. [`escape`] decodes literal two-character `\r`/`\n` escapes (event-stream
//!    transport only).
//! 2. [`signal`] runs the single dedicated parse step that maps a completed
//!    unit to a tagged [`StreamSignal`]: plain content, a completion token, an
//!    error token with payload, or a structured [`StatusReport`].
//! 3. [`ingest`] reconstructs terminal-style lines (LF splits, last-carriage-
//!    return-wins overwrites, incremental reveal of unterminated lines) and
//!    latches on the first terminal signal.
//!
//! [`transport`] holds the shared vocabulary between the engine and the
//! collaborator: fragment events, the two transport kinds, the idempotent
//! abort handle, and the [`FragmentSource`] trait with channel/stream bridges.
//!
//! [`LineBuffer`]: drydock_core::LineBuffer
//! [`StreamOutcome`]: ingest::StreamOutcome
//! [`StreamSignal`]: signal::StreamSignal
//! [`StatusReport`]: signal::StatusReport
//! [`FragmentSource`]: transport::FragmentSource

pub mod escape;
pub mod ingest;
pub mod signal;
pub mod transport;

pub use escape::decode_control_escapes;
pub use ingest::{StreamIngestor, StreamOutcome};
pub use signal::{
    classify_segment, CompletionToken, StatusReport, StreamSignal, SuccessLine, TokenVocabulary,
    DEPLOY_COMPLETE_TOKEN, DEPLOY_ERROR_PREFIX, UPDATE_ERROR_PREFIX,
};
pub use transport::{
    ChannelSource, FragmentSource, StreamSource, TransportEvent, TransportHandle, TransportKind,
};
