use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    #[error("Invalid Spotify API url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(#[source] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(#[source] reqwest::Error),
    #[error("Spotify responded with {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        /// From the `Retry-After` header on 429 responses.
        retry_after: Option<Duration>,
    },
}
