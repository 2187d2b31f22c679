use thiserror::Error;

/// Error type covering every stage of an operation: request validation,
/// BER tree construction, message ID allocation, transmission and the wait
/// for the correlated reply.
#[derive(Debug, Error)]
pub enum LdapError {
    /// An attribute in the request maps to an empty value list. The whole
    /// encode is aborted; no partial structure is produced.
    #[error("encoding failed: attribute {attribute:?} has no values")]
    Encoding { attribute: String },

    /// The message ID allocator has been shut down (connection closing or
    /// closed). Not retryable on the same connection.
    #[error("connection is closing, message ID allocator is shut down")]
    Closing,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("timed out waiting for reply to message ID {id}")]
    Timeout { id: i32 },

    #[error("request cancelled before a reply arrived")]
    Cancelled,

    /// The server replied with a non-success result code.
    #[error("LDAP result code {code}: {message}")]
    Protocol { code: i32, message: String },
}
