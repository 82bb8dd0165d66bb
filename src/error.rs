//! Crate error types.
//!
//! Codec-level components never fail hard on malformed input; they clamp or
//! degrade (see the compressor and serializer). Errors here describe the one
//! terminal outcome a handshake can surface besides success.

/// Handshake step names, used in timeout reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    VersionQuery,
    Challenge,
    Authorize,
    Connect,
}

impl HandshakeStep {
    pub const fn name(self) -> &'static str {
        match self {
            HandshakeStep::VersionQuery => "version query",
            HandshakeStep::Challenge => "challenge",
            HandshakeStep::Authorize => "authorize",
            HandshakeStep::Connect => "connect",
        }
    }
}

/// Terminal connection failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The server speaks a protocol version this client does not support.
    /// Permanent, never retried.
    UnsupportedProtocol(u32),
    /// A step exhausted its retry budget without a matching response.
    Timeout { step: HandshakeStep },
    /// The server dropped us; the message is surfaced verbatim.
    Rejected(String),
    /// Repeated unexpected responses to the connect request.
    BadResponse,
    /// The authorize exchange was refused.
    AuthorizationFailed,
}

impl core::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConnectError::UnsupportedProtocol(v) => {
                write!(f, "unsupported protocol version: {v}")
            }
            ConnectError::Timeout { step } => {
                write!(f, "{} timed out", step.name())
            }
            ConnectError::Rejected(msg) => write!(f, "dropped by server: {msg}"),
            ConnectError::BadResponse => write!(f, "unexpected connect response"),
            ConnectError::AuthorizationFailed => write!(f, "authorization refused"),
        }
    }
}

impl std::error::Error for ConnectError {}
