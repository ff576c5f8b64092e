//! Common types and utilities shared across wallprobe crates.
//!
//! This crate defines the outcome vocabulary every probe method reports in,
//! the classifier that produces it, observability helpers and the shared
//! app-level error type. It stays dependency-light so that every crate in
//! the workspace can depend on it.
//!
//! # Overview
//!
//! - [`Outcome`]: semantic classification of a single fetch attempt
//! - [`Classifier`] and [`classify`]: status/length/marker heuristics
//! - [`MarkerSet`] and [`Thresholds`]: site-specific classifier data
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`WallprobeError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use wallprobe_common::{classify, Outcome};
//!
//! assert_eq!(classify(200, 5001, ""), Outcome::Success);
//! assert_eq!(classify(403, 0, ""), Outcome::Blocked);
//! ```

pub mod observability;
pub mod outcome;

pub use outcome::{classify, Classifier, MarkerSet, Outcome, Thresholds};

/// Error types used by wallprobe setup code (config, logging, wiring).
///
/// Per-URL failures never surface as this type: they are folded into
/// `Failed`/`TimedOut` results where they happen.
#[derive(thiserror::Error, Debug)]
pub enum WallprobeError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or process level I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`WallprobeError`].
pub type Result<T> = std::result::Result<T, WallprobeError>;
