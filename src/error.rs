//! Error types for module decoding and playback

/// Errors raised while decoding an M.K. module.
///
/// Decoding is all-or-nothing: any of these aborts the decode and no
/// partial [`Module`](crate::mod_parser::Module) is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The format tag at offset 1080 is not `M.K.`
    #[error("Unsupported module variant: tag {}", describe_tag(.tag))]
    UnsupportedVariant {
        /// Raw tag bytes found in the file
        tag: [u8; 4],
    },

    /// The buffer ended before a mandatory field could be read
    #[error("Module truncated: needed {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        /// Offset of the read that failed
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes remaining in the buffer at that offset
        available: usize,
    },
}

fn describe_tag(tag: &[u8; 4]) -> String {
    if tag.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        format!("\"{}\"", String::from_utf8_lossy(tag))
    } else {
        format!("{:02X?}", tag)
    }
}

/// Error type for replayer operations
#[derive(thiserror::Error, Debug)]
pub enum ReplayerError {
    /// Error while decoding the module format
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio device or sink error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ReplayerError {
    /// Converts a String into `ReplayerError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `AudioDeviceError`) where the
    /// failure category is known.
    fn from(msg: String) -> Self {
        ReplayerError::Other(msg)
    }
}

impl From<&str> for ReplayerError {
    fn from(msg: &str) -> Self {
        ReplayerError::Other(msg.to_string())
    }
}

/// Result type for replayer operations
pub type Result<T> = std::result::Result<T, ReplayerError>;
