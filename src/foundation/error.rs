/// Result alias used across the asset pipeline.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors surfaced by decoders, devices and configuration.
///
/// Decode and I/O failures never reach callers of the acquire API: they are logged by the worker
/// and the affected record simply never becomes ready.
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// Source bytes are malformed, truncated or of an unsupported layout.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading an asset file failed.
    #[error("io error: {0}")]
    Io(String),

    /// The graphics device refused an operation.
    #[error("device error: {0}")]
    Device(String),

    /// Invalid [`crate::AssetSystemOpts`].
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
