//! # drydock-core - Core Domain Types
//!
//! Foundation crate for Drydock, the log streaming and playback engine behind
//! the deployment dashboard. Provides domain types, the shared line buffer,
//! line classification, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tokio, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`DeployPhase`] - Deployment session lifecycle phase (Idle, Streaming, etc.)
//! - [`LogLine`] - A single buffered log line with its append sequence
//! - [`LineClass`] - Display severity of a rendered line
//! - [`DisplayLine`] - A rendered line paired with its classification
//!
//! ### Line Buffer (`line_buffer`)
//! - [`LineBuffer`] - Append/overwrite-last line store shared between the
//!   stream ingestor (writer) and the playback scheduler (reader)
//!
//! ### Classification (`classify`)
//! - [`LineClassifier`] - Literal-prefix severity classifier for rendered lines
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use drydock_core::prelude::*;
//! ```

pub mod classify;
pub mod error;
pub mod line_buffer;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all Drydock crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use classify::{
    LineClassifier, SuccessMatcher, DEPLOY_SUCCESS_LINE, UPDATE_SUCCESS_PREFIX,
};
pub use error::{Error, Result, ResultExt};
pub use line_buffer::LineBuffer;
pub use types::{DeployPhase, DisplayLine, LineClass, LogLine};
