#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Gamefeed-Core
//! Stateful sanitization pipeline for the real-time game event stream: typed data model,
//! phase detection, trade annotation, and god-candle change-detection.
//!
//! ## Core abstractions
//! - [`model`] holds the tolerant `from_raw` constructors and the [`model::SanitizedEvent`]
//!   output envelope.
//! - [`phase_detector`], [`trade_annotator`] and [`god_candle`] are the single-owner, stateful
//!   detectors the pipeline drives on every upstream tick.
//! - [`pipeline::SanitizationPipeline`] wires the three detectors together and dispatches by
//!   upstream `event_type`, fanning [`model::SanitizedEvent`]s out to per-channel callbacks.

/// Typed data model and tolerant `from_raw` constructors.
pub mod model;

/// Stateful game-phase classification, including the two-broadcast rug mechanism.
pub mod phase_detector;

/// Trade enrichment: token classification and forced-sell inference.
pub mod trade_annotator;

/// Edge-triggered god-candle change-detection.
pub mod god_candle;

/// Orchestrates the detectors above into one raw-event-in, typed-events-out pipeline.
pub mod pipeline;
