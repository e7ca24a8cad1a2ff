use crosstalk_types::ToolError;
use thiserror::Error;

/// Errors from the stdio tool-server transport and protocol layer.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process could not be started.
    #[error("failed to spawn tool server: {0}")]
    Spawn(String),

    /// Reading from or writing to the server process failed.
    #[error("tool server transport error: {0}")]
    Transport(String),

    /// The server sent something that is not valid for the protocol.
    #[error("tool server protocol error: {0}")]
    Protocol(String),

    /// The server answered with a JSON-RPC error object.
    #[error("tool server returned error {code}: {message}")]
    Server {
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },

    /// No response arrived within the configured deadline.
    #[error("tool server request timed out after {0}s")]
    Timeout(u64),

    /// The server process exited or closed its side of the pipe.
    #[error("tool server closed the connection")]
    Closed,
}

impl From<McpError> for ToolError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Spawn(msg) | McpError::Transport(msg) => ToolError::Transport(msg),
            McpError::Closed => ToolError::Transport("tool server closed the connection".into()),
            McpError::Protocol(msg) => ToolError::Protocol(msg),
            McpError::Server { code, message } => ToolError::Rejected { code, message },
            McpError::Timeout(secs) => ToolError::Timeout(secs),
        }
    }
}
