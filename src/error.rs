//! Error types for the analysis pipeline.
//!
//! Structural errors (an unrecognized task tag, a raw result missing its
//! required fields) abort the current call and surface to the caller.
//! Per-element geometric defects are deliberately *not* represented here:
//! an individual malformed box or polygon is logged and skipped so that the
//! rest of the result keeps processing.

use thiserror::Error;

/// Errors surfaced by the normalization, rendering, and persistence pipeline.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// The task tag is not one of the recognized prompt tags.
    #[error("unknown task: {tag}")]
    UnknownTask {
        /// The tag that failed to classify.
        tag: String,
    },

    /// The raw result is missing a field its output category requires.
    #[error("malformed result: {context}")]
    MalformedResult {
        /// What was expected and where.
        context: String,
    },

    /// The image source does not exist or is not a readable local path.
    #[error("image source unavailable: {path}")]
    SourceUnavailable {
        /// The path that could not be resolved.
        path: String,
    },

    /// Error occurred while decoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred while encoding or saving an image artifact.
    #[error("image encode")]
    ImageEncode(#[source] image::ImageError),

    /// Error occurred while loading or parsing a font.
    #[error("font: {message}")]
    Font {
        /// A message describing the font problem.
        message: String,
    },

    /// Filesystem error during artifact allocation or writing.
    #[error("i/o")]
    Io(#[from] std::io::Error),

    /// Error propagated from the external inference provider.
    #[error("inference")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AnalyzeError {
    /// Creates an UnknownTask error for the given tag.
    pub fn unknown_task(tag: impl Into<String>) -> Self {
        Self::UnknownTask { tag: tag.into() }
    }

    /// Creates a MalformedResult error with the given context.
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedResult {
            context: context.into(),
        }
    }

    /// Creates a Font error with the given message.
    pub fn font(message: impl Into<String>) -> Self {
        Self::Font {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary provider error as an Inference error.
    pub fn inference(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Inference(Box::new(err))
    }
}

/// Convenient result alias for pipeline operations.
pub type VizResult<T> = Result<T, AnalyzeError>;
