use thiserror::Error;

/// Everything that can go wrong between an inbound request and the upstream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("invalid input: {0}")] InvalidInput(String),
    #[error("unknown provider: {0}")] UnknownProvider(String),
    #[error("auth error: {0}")] Auth(String),
    #[error("rate limit: {0}")] RateLimit(String),
    #[error("timeout: {0}")] Timeout(String),
    #[error("network: {0}")] Network(String),
    #[error("decode: {0}")] Decode(String),
    #[error("protocol: {0}")] Protocol(String),
    #[error("overloaded: {0}")] Overloaded(String),
    #[error("canceled")] Canceled,
    #[error("other: {0}")] Other(String),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnknownProvider,
    UpstreamUnavailable,
    Timeout,
    Overloaded,
    ClientDisconnected,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::InvalidInput(_) => ErrorKind::InvalidInput,
            ChatError::UnknownProvider(_) => ErrorKind::UnknownProvider,
            ChatError::Timeout(_) => ErrorKind::Timeout,
            ChatError::Overloaded(_) => ErrorKind::Overloaded,
            ChatError::Canceled => ErrorKind::ClientDisconnected,
            ChatError::Auth(_)
            | ChatError::RateLimit(_)
            | ChatError::Network(_)
            | ChatError::Decode(_)
            | ChatError::Protocol(_)
            | ChatError::Other(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// True for failures caused by the caller rather than the upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidInput | ErrorKind::UnknownProvider
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_fold_together() {
        for e in [
            ChatError::Auth("401".into()),
            ChatError::RateLimit("429".into()),
            ChatError::Network("reset".into()),
            ChatError::Decode("bad json".into()),
            ChatError::Protocol("boom".into()),
        ] {
            assert_eq!(e.kind(), ErrorKind::UpstreamUnavailable);
            assert!(!e.is_client_error());
        }
        assert_eq!(ChatError::Canceled.kind(), ErrorKind::ClientDisconnected);
        assert!(ChatError::UnknownProvider("x".into()).is_client_error());
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            ChatError::RateLimit("429 slow down".into()).to_string(),
            "rate limit: 429 slow down"
        );
    }
}
