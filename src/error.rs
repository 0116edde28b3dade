//! Structural failures of the harness.
//!
//! A byte that differs from a golden vector is *not* an error: it is recorded
//! as a [`Mismatch`](crate::report::Mismatch) and the run continues. The
//! variants here cover everything that stops a component from producing a
//! comparison at all.

use thiserror::Error;

use crate::conformance::Stage;

/// Errors raised by harness components.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No golden vector is registered under this name.
    #[error("unknown golden vector: {0}")]
    UnknownVector(String),

    /// Hex text (golden vector or command-line argument) failed to decode.
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A golden vector decoded to a different number of bytes than declared.
    #[error("golden vector {name} decodes to {found} bytes, declared {declared}")]
    VectorLength {
        /// Vector name
        name: &'static str,
        /// Declared length
        declared: usize,
        /// Decoded length
        found: usize,
    },

    /// A conformance stage was entered before its predecessor completed.
    #[error("stage {stage:?} requires {expected:?} to have completed, last completed was {found:?}")]
    StageOrder {
        /// Stage being entered
        stage: Stage,
        /// Stage that must precede it
        expected: Option<Stage>,
        /// Stage that actually completed last
        found: Option<Stage>,
    },

    /// A comparison window falls outside the produced output.
    #[error("window {offset}+{len} exceeds {available} output bytes")]
    Window {
        /// Window start
        offset: usize,
        /// Window length
        len: usize,
        /// Bytes available
        available: usize,
    },

    /// Writing harness output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
