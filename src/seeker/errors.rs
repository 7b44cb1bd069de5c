use thiserror::Error;

/// Upstream fetch failures. Every variant names the operation and the URL
/// it was hitting, since one sync touches many endpoints.
#[derive(Error, Debug)]
pub enum SeekError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced a response. The only retried class.
    #[error("{operation}: transport failed for {url}: {message}")]
    Transport {
        operation: &'static str,
        url: String,
        message: String,
    },

    /// The upstream answered with something other than 200.
    #[error("{operation}: {url} returned {status}, expected 200 OK")]
    Status {
        operation: &'static str,
        url: String,
        status: reqwest::StatusCode,
    },

    /// The body was not the JSON shape the endpoint promises.
    #[error("{operation}: undecodable body from {url}: {message}")]
    Decode {
        operation: &'static str,
        url: String,
        message: String,
    },
}
