use thiserror::Error;

/// Errors from the chat completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The client could not be constructed from its configuration.
    #[error("invalid LLM configuration: {0}")]
    Config(String),

    /// The request never produced an HTTP response.
    #[error("LLM request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode LLM response: {0}")]
    Decode(String),

    /// The provider returned a response with no choices.
    #[error("LLM response contained no choices")]
    EmptyChoices,
}
