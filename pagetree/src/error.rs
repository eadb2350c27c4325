use alloc::string::String;

/// Failures reported by a [`crate::Provider`] and propagated by node operations.
///
/// "Not found" is not an error: position lookups answer `Ok(None)`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The backend could not answer (worker gone, request rejected, ...).
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider was disposed before the answer arrived.
    #[error("provider was disposed")]
    Disposed,
    #[error("`{0}` is not supported by this provider")]
    Unsupported(&'static str),
}

impl ProviderError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
