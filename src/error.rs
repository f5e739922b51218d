use thiserror::Error;

use crate::TranscriptSource;

/// Why a single acquisition strategy gave up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchReason {
    #[error("upstream returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("no caption tracks available")]
    NoTracks,

    #[error("transcript available but empty")]
    Empty,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("malformed upstream data: {0}")]
    Malformed(String),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("request cancelled")]
    Cancelled,
}

impl FetchReason {
    /// Stable machine-readable code for the reason
    pub fn code(&self) -> &'static str {
        match self {
            FetchReason::HttpStatus { .. } => "http_status",
            FetchReason::Network(_) => "network",
            FetchReason::NoTracks => "no_tracks",
            FetchReason::Empty => "empty",
            FetchReason::NotFound(_) => "not_found",
            FetchReason::Malformed(_) => "malformed",
            FetchReason::Timeout { .. } => "timeout",
            FetchReason::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for FetchReason {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchReason::HttpStatus {
                status: status.as_u16(),
            },
            None if err.is_decode() => FetchReason::Malformed(err.to_string()),
            None => FetchReason::Network(err.to_string()),
        }
    }
}

/// A strategy failure, tagged with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{strategy} strategy failed: {reason}")]
pub struct FetchFailure {
    pub strategy: TranscriptSource,
    pub reason: FetchReason,
}

impl FetchFailure {
    pub fn new(strategy: TranscriptSource, reason: FetchReason) -> Self {
        Self { strategy, reason }
    }
}

/// Failure talking to the generative model
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{env_var} environment variable not set (required for model {model})")]
    MissingApiKey { env_var: &'static str, model: String },

    #[error("request to {provider} failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected {provider} API response format")]
    UnexpectedResponse { provider: &'static str },

    #[error("generation cancelled")]
    Cancelled,
}

/// Fatal outcome of the acquisition pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("all transcript strategies failed: {}", summarize_failures(.0))]
    Exhausted(Vec<FetchFailure>),

    #[error("no-transcript summary failed: {0}")]
    Generation(#[from] GenerateError),

    #[error("request cancelled")]
    Cancelled,
}

/// Join failures into one diagnostic line
pub fn summarize_failures(failures: &[FetchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.strategy, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        assert_eq!(FetchReason::HttpStatus { status: 429 }.code(), "http_status");
        assert_eq!(FetchReason::NoTracks.code(), "no_tracks");
        assert_eq!(FetchReason::Timeout { secs: 10 }.code(), "timeout");
    }

    #[test]
    fn test_failure_display() {
        let failure = FetchFailure::new(TranscriptSource::Timedtext, FetchReason::Empty);
        assert_eq!(failure.to_string(), "timedtext strategy failed: transcript available but empty");
    }

    #[test]
    fn test_exhausted_display() {
        let err = PipelineError::Exhausted(vec![
            FetchFailure::new(TranscriptSource::Primary, FetchReason::HttpStatus { status: 403 }),
            FetchFailure::new(TranscriptSource::PageScrape, FetchReason::NotFound("caption track")),
        ]);
        assert_eq!(
            err.to_string(),
            "all transcript strategies failed: primary: upstream returned HTTP 403; page-scrape: caption track not found"
        );
    }
}
