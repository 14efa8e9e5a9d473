//! Error types for the host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors on the native-messaging channel.
#[derive(Debug, Error)]
pub enum NmError {
    /// The browser closed stdin before a new frame started. This is the normal
    /// way a native host is told to go away.
    #[error("native messaging channel closed")]
    Disconnected,

    /// End of stream in the middle of a frame.
    #[error("stream ended mid-frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// A complete frame that is not a valid message (oversized, not UTF-8, not JSON).
    #[error("malformed frame: {0}")]
    Framing(String),

    /// Payload was UTF-8 but not JSON.
    #[error("invalid JSON payload: {0}")]
    DeserializeJson(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NmError {
    /// True for errors raised by a broken frame rather than by the transport.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. } | Self::Framing(_) | Self::DeserializeJson(_)
        )
    }
}

/// Errors installing or removing the global pointer hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// No pointer hook backend for this build.
    #[error("global pointer hook is not supported on this platform (build with the `rdev` feature)")]
    Unsupported,

    /// The OS refused the hook.
    #[error("failed to install pointer hook: {0}")]
    Install(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors loading the host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
