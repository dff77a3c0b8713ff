//! Error types for the Gleitzsch effect.

use std::process::ExitStatus;
use thiserror::Error;

/// Everything that can stop a Gleitzsch run.
#[derive(Debug, Error)]
pub enum GleitzschError {
    #[error("channel index must be 0, 1 or 2, got {0}")]
    InvalidChannel(usize),

    #[error("`{0}` was not found on PATH; install it to run the effect")]
    CodecNotFound(String),

    #[error("could not run `{lookup}` to look for `{executable}`: {source}")]
    LookupUnavailable {
        lookup: String,
        executable: String,
        source: std::io::Error,
    },

    #[error("codec {stage} step failed with {status}")]
    CodecFailed {
        stage: &'static str,
        status: ExitStatus,
    },

    #[error("codec returned {actual} bytes, expected at least {expected}")]
    CodecOutputTooShort { expected: usize, actual: usize },

    #[error("array extents do not match: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("image has no pixels")]
    EmptyImage,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("channel task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, GleitzschError>;
