// src/error.rs

//! Error taxonomy shared by every layer of the video core.
//!
//! Every public operation returns `Result<T>`; the `Display` text of the
//! error is what a caller would show as the "last error".

use thiserror::Error;

/// Errors reported by the device-independent video layer and its drivers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoError {
    /// The operation needs an active device, display or renderer that does not exist.
    #[error("{0} has not been initialized")]
    NotInitialized(&'static str),

    /// Bad id, out-of-range index or missing required argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver does not implement the hook, or does not advertise the capability.
    #[error("{0} is not supported by the driver")]
    Unsupported(&'static str),

    #[error("out of memory")]
    OutOfMemory,

    /// A backend hook reported failure; its message is carried through.
    #[error("driver failure: {0}")]
    DriverFailure(String),

    #[error("no video mode large enough for {w}x{h}")]
    NoMatchingMode { w: i32, h: i32 },

    #[error("couldn't find matching render driver")]
    NoMatchingDriver,

    #[error("{0} not available")]
    DriverNotFound(String),

    #[error("no available video device")]
    NoDriverAvailable,

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("texture was not created with this renderer")]
    WrongRenderer,

    #[error("texture must be streaming")]
    TextureNotStreaming,
}

pub type Result<T> = std::result::Result<T, VideoError>;

impl VideoError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        VideoError::InvalidArgument(msg.into())
    }

    pub fn driver(msg: impl Into<String>) -> Self {
        VideoError::DriverFailure(msg.into())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, VideoError::Unsupported(_))
    }
}

/// Treats a missing hook as success.
///
/// Used for hooks whose absence the core tolerates (show/hide/raise and
/// friends): the device-independent state still changes, the backend simply
/// has nothing to do.
pub fn tolerate_unsupported(result: Result<()>) -> Result<()> {
    match result {
        Err(VideoError::Unsupported(_)) => Ok(()),
        other => other,
    }
}
