//! Reverse-engineered client wire protocol for Medal of Honor: Allied Assault
//! (Quake 3 protocol family).
//!
//! The crate covers the two pieces that matter for talking to a real server:
//!
//! - A bit-level message codec: LSB-first bit packing ([`codec`]), an adaptive
//!   Huffman compressor ([`huffman`], [`compress`]), a typed message
//!   serializer with delta encoding and optional XOR keying ([`msg`]), and the
//!   legacy string-substitution cipher ([`scramble`]).
//! - Connection establishment: a linear handshake (version query → challenge
//!   → optional authorize → connect) expressed as a closed set of request
//!   steps ([`handshake`]) driven by a single-in-flight request dispatcher
//!   ([`request`]) over a caller-supplied non-blocking UDP socket
//!   ([`transport`]).
//!
//! Everything here reproduces the legacy wire format bit-for-bit; the XOR and
//! substitution schemes are obfuscation, not security. Socket I/O, reliable
//! delivery and asset parsing are collaborator concerns and out of scope.
//!
//! The stack is single-threaded and cooperative: the caller drives
//! [`server::EngineServer::tick`] with elapsed/absolute time and nothing in
//! the crate blocks.

#![forbid(unsafe_code)]

pub mod codec;
pub mod compress;
pub mod encoding;
pub mod error;
pub mod handshake;
pub mod huffman;
pub mod info;
pub mod msg;
pub mod parser;
pub mod request;
pub mod scramble;
pub mod server;
pub mod stream;
pub mod transport;
pub mod version;

pub use error::ConnectError;
pub use handshake::{ClientSettings, ConnectionParams, NegotiatedSession};
pub use msg::{Msg, MsgMode};
pub use server::EngineServer;
pub use stream::{DynamicStream, FixedStream, MessageStream};
pub use transport::{Instant, Rng, UdpSocket};
pub use version::{ProtocolType, ProtocolVersion, ServerType};
