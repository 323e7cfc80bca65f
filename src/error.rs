/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ClickHouseError {
    /// Execution was attempted without a connection.
    #[error("connection is nil")]
    NilConnection,
    /// Placeholder count in the statement differs from the argument count.
    #[error("argument count mismatch: statement has {placeholders} placeholder(s), got {args} argument(s)")]
    ArgumentCountMismatch { placeholders: usize, args: usize },
    /// Configured host is not a valid URL.
    #[error("invalid host '{0}'")]
    InvalidHost(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status with the message decoded from the body.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    /// I/O failure while reading a response body.
    #[error("stream read error: {0}")]
    Io(#[from] std::io::Error),
    /// A field could not be converted to the requested type.
    #[error("decode error: {0}")]
    Decode(String),
    /// Ping response did not carry the success token.
    #[error("clickhouse host response was '{response}', expected 'Ok.'")]
    Ping { response: String },
}
