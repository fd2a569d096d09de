use thiserror::Error;

/// Anything that can go wrong talking to the ticket service.
///
/// The chat session collapses every variant into the same bot reply; the
/// distinction only shows up in logs and in the non-interactive commands.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("ticket service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ticket service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response body: {0}")]
    Decode(String),
}
