/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request did not complete within its time bound.
    Timeout,
    /// The transport failed before a response was received.
    Connection,
    /// The credential was rejected by the provider.
    Authentication,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The provider reported an internal failure.
    Server,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns a short, human-readable label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::Server => "server",
            ErrorKind::Other => "other",
        }
    }
}
