//! Error status: how a caller may react to an error

use std::fmt;

/// Whether an operation that failed could succeed if attempted again.
///
/// The pipeline never retries on its own; the status is carried so that
/// callers and log readers can tell a throttled request from a bad brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Trying again will fail the same way
    Permanent,
    /// Trying again later may succeed (rate limits, network hiccups)
    Temporary,
}

impl ErrorStatus {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
