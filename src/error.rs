//! Error types for the mirroring core

use thiserror::Error;

/// Errors raised by the mirroring core.
///
/// None of these are fatal to the process: callers either fall back to a
/// previous state or report the condition and carry on.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Raw rotation value outside 0..=4
    #[error("unknown rotation mode: {0}")]
    UnknownRotation(u32),

    /// Raw scaling value outside 0..=2
    #[error("unknown scaling mode: {0}")]
    UnknownScaling(u32),

    /// Negative overscan in a raw settings block
    #[error("invalid overscan on {axis} axis: {value}")]
    InvalidOverscan { axis: char, value: i32 },

    /// Geometry that would divide by zero during scaling
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// The display-info collaborator reported no usable mode
    #[error("no supported resolution reported by the display")]
    NoResolution,

    /// The framebuffer refused the requested mode
    #[error("mode set failed: {0}")]
    ModeSet(String),

    /// The display control block could not be parsed
    #[error("control block: {0}")]
    ControlBlock(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;
