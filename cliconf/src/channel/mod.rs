//! Channel layer: output buffering, prompt detection and error classification.
//!
//! Everything here is pure pattern matching over byte buffers. Nothing sends
//! or reads; the driver layer feeds these components as bytes arrive.

mod buffer;
mod classifier;
mod patterns;

pub use buffer::PatternBuffer;
pub use classifier::{ErrorClassifier, ErrorKind, ErrorMatch};
pub use patterns::{Prompt, PromptMatcher, Terminator};
