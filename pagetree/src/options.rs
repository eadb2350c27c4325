/// How often a window fetch is repeated after a retryable failure.
///
/// Retries are immediate: the engine has no clock. Callers that need backoff or timeouts wrap
/// their provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Total attempts per window, including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const NONE: Self = Self { max_attempts: 1 };

    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Configuration shared by every node of a grid.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridOptions {
    /// Number of items requested per window, and the size of the first page of a freshly expanded
    /// node.
    pub populate_count: usize,
    pub retry: RetryPolicy,
    /// Upper bound on windows fetched by a single populate request.
    ///
    /// Requests that hit the bound stop early and leave a placeholder for the remainder.
    pub max_windows_per_request: Option<usize>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            populate_count: 100,
            retry: RetryPolicy::default(),
            max_windows_per_request: None,
        }
    }
}

impl GridOptions {
    pub fn new(populate_count: usize) -> Self {
        Self::default().with_populate_count(populate_count)
    }

    pub fn with_populate_count(mut self, populate_count: usize) -> Self {
        self.populate_count = populate_count.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_windows_per_request(mut self, max_windows: Option<usize>) -> Self {
        self.max_windows_per_request = max_windows;
        self
    }
}
