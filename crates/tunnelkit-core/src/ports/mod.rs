//! Port definitions (trait abstractions) for the presentation side.
//!
//! Ports define the interfaces the lifecycle manager expects from its
//! surroundings. They contain no transport or UI details.

pub mod event_emitter;
pub mod output_sink;

pub use event_emitter::{NoopEmitter, TunnelEventEmitter};
pub use output_sink::{NoopSink, TunnelOutputSink, normalize_newlines};
