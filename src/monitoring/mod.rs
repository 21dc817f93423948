//! Run Monitoring Module
//!
//! Utilities for observing a run from the caller's side.
//!
//! # Components
//!
//! - [`Timeline`]: action start/end timing for Gantt charts

pub mod timeline;

pub use timeline::{Event, Outcome, SharedTimeline, Timeline};
