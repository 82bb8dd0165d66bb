//! Connection-establishment request chain.
//!
//! Four steps, each a [`Request`] consumed on transition: version query,
//! challenge, optional authorize, connect. The connection parameters
//! (settings, user info, completion callback) travel with the active step,
//! so exactly one terminal outcome is ever reported. The stand-alone status
//! and info queries reuse the same machinery.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::error::{ConnectError, HandshakeStep};
use crate::info::{Info, ReadOnlyInfo};
use crate::parser::TokenParser;
use crate::request::Request;
use crate::transport::Rng;
use crate::version::{ProtocolType, ProtocolVersion, ServerType, CLIENT_VERSION};

/// Client-side knobs for the handshake.
pub struct ClientSettings {
    /// Product key sent to the authorization step.
    pub cd_key: String,
    /// Client version advertised in the connect payload; defaults to
    /// [`CLIENT_VERSION`].
    pub version: Option<String>,
    /// Fixed client port; 0 draws a random one in [20000, 65535].
    pub qport: u16,
    /// Delay before the challenge request goes out, in milliseconds.
    pub deferred_challenge_time: u64,
    /// Delay before the connect request goes out, in milliseconds.
    pub deferred_connect_time: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cd_key: String::new(),
            version: None,
            qport: 0,
            deferred_challenge_time: 100,
            deferred_connect_time: 100,
        }
    }
}

/// Parameters negotiated by a successful handshake.
#[derive(Debug, Clone)]
pub struct NegotiatedSession {
    pub qport: u16,
    pub challenge: i32,
    pub protocol: ProtocolType,
    pub user_info: Info,
}

pub type ConnectCallback = Box<dyn FnOnce(Result<NegotiatedSession, ConnectError>)>;

/// Callback for the stand-alone status/info queries. `None` means the
/// server sent an empty body.
pub type QueryCallback = Box<dyn FnOnce(Option<ReadOnlyInfo>)>;

/// Everything that travels from step to step.
pub struct ConnectionParams {
    pub settings: ClientSettings,
    pub user_info: Info,
    pub callback: ConnectCallback,
}

impl ConnectionParams {
    fn complete(self, result: Result<NegotiatedSession, ConnectError>) {
        (self.callback)(result);
    }
}

/// Closed set of out-of-band requests the client can have in flight.
pub enum ServerRequest {
    VersionQuery(VersionQuery),
    Challenge(Challenge),
    Authorize(Authorize),
    Connect(Connect),
    Status(StatusQuery),
    Info(InfoQuery),
}

impl ServerRequest {
    /// Entry point of the handshake chain, with the client port resolved up
    /// front.
    pub fn connect(mut params: ConnectionParams, rng: &mut dyn Rng) -> Self {
        if params.settings.qport == 0 {
            let mut bytes = [0u8; 2];
            rng.fill(&mut bytes);
            params.settings.qport = u16::from_le_bytes(bytes) % 45536 + 20000;
        }
        Self::VersionQuery(VersionQuery { params })
    }

    pub fn status(callback: QueryCallback) -> Self {
        Self::Status(StatusQuery { callback })
    }

    pub fn info(callback: QueryCallback) -> Self {
        Self::Info(InfoQuery { callback })
    }
}

impl Request for ServerRequest {
    fn generate_request(&self) -> String {
        match self {
            Self::VersionQuery(_) | Self::Info(_) => "getinfo".to_string(),
            Self::Challenge(_) => "getchallenge".to_string(),
            Self::Authorize(r) => r.generate_request(),
            Self::Connect(r) => r.generate_request(),
            Self::Status(_) => "getstatus".to_string(),
        }
    }

    fn supports_event(&self, name: &str) -> bool {
        match self {
            Self::VersionQuery(_) | Self::Info(_) => name.eq_ignore_ascii_case("infoResponse"),
            Self::Challenge(_) | Self::Authorize(_) => {
                name.eq_ignore_ascii_case("getKey") || name.eq_ignore_ascii_case("challengeResponse")
            }
            Self::Connect(_) => {
                name.eq_ignore_ascii_case("connectResponse")
                    || name.eq_ignore_ascii_case("droperror")
                    || name.eq_ignore_ascii_case("print")
            }
            Self::Status(_) => name.eq_ignore_ascii_case("statusResponse"),
        }
    }

    fn handle_response(self, name: &str, parser: &mut TokenParser) -> Option<Self> {
        match self {
            Self::VersionQuery(r) => r.handle_response(parser),
            Self::Challenge(r) => r.handle_response(name, parser),
            Self::Authorize(r) => r.handle_response(name, parser),
            Self::Connect(r) => r.handle_response(name, parser),
            Self::Status(r) => {
                let line = parser.get_line(true);
                if line.is_empty() {
                    (r.callback)(None);
                } else {
                    (r.callback)(Some(ReadOnlyInfo::new(line)));
                }
                None
            }
            Self::Info(r) => {
                let line = parser.get_line(true);
                (r.callback)(Some(ReadOnlyInfo::new(line)));
                None
            }
        }
    }

    fn timed_out(self) -> Option<Self> {
        match self {
            Self::VersionQuery(r) => {
                r.params.complete(Err(ConnectError::Timeout {
                    step: HandshakeStep::VersionQuery,
                }));
                None
            }
            Self::Challenge(r) => r.timed_out(),
            Self::Authorize(r) => r.timed_out(),
            Self::Connect(r) => r.timed_out(),
            Self::Status(r) => {
                (r.callback)(None);
                None
            }
            Self::Info(r) => {
                (r.callback)(None);
                None
            }
        }
    }

    fn deferred_time(&self) -> u64 {
        match self {
            Self::Challenge(r) => r.params.settings.deferred_challenge_time,
            Self::Connect(r) => r.params.settings.deferred_connect_time,
            _ => 0,
        }
    }

    fn override_timeout_time(&self) -> Option<u64> {
        match self {
            Self::Challenge(_) | Self::Connect(_) => Some(3000),
            // the server has 5000 ms for the authorization round-trip, plus
            // slack for it to receive our response
            Self::Authorize(_) => Some(5500),
            _ => None,
        }
    }

    fn should_compress_request(&self) -> Option<usize> {
        match self {
            // everything past "connect " goes through the compressor
            Self::Connect(_) => Some(8),
            _ => None,
        }
    }
}

/// Step 1: query the server's protocol version before anything else.
pub struct VersionQuery {
    params: ConnectionParams,
}

impl VersionQuery {
    fn handle_response(self, parser: &mut TokenParser) -> Option<ServerRequest> {
        let line = parser.get_line(true);
        let server_info = ReadOnlyInfo::new(line);

        let server_type = ServerType::from_number(server_info.int_value_for_key("serverType"));
        let number = server_info.int_value_for_key("protocol") as u32;
        let version = ProtocolVersion::from_number(number);
        if version == ProtocolVersion::Bad {
            error!(protocol = number, "unsupported protocol version");
            self.params
                .complete(Err(ConnectError::UnsupportedProtocol(number)));
            return None;
        }

        let game_version = server_info.value_for_key("gamever").unwrap_or("");
        info!(
            ?server_type,
            protocol = number,
            game_version,
            "server version accepted"
        );
        Some(ServerRequest::Challenge(Challenge {
            params: self.params,
            protocol: ProtocolType::new(server_type, version),
            retries: 0,
        }))
    }
}

/// Step 2: obtain a challenge number, or a key request to authorize first.
pub struct Challenge {
    params: ConnectionParams,
    protocol: ProtocolType,
    retries: u32,
}

impl Challenge {
    fn handle_response(self, name: &str, parser: &mut TokenParser) -> Option<ServerRequest> {
        if name.eq_ignore_ascii_case("getKey") {
            let challenge = parser.get_line(false).trim().to_string();
            debug!(challenge = %challenge, "server requests authorization");
            return Some(ServerRequest::Authorize(Authorize {
                params: self.params,
                protocol: self.protocol,
                challenge,
                retries: 0,
            }));
        }

        let challenge = parser.get_integer(false);
        debug!(challenge, "challenge received");
        Some(ServerRequest::Connect(Connect::new(
            self.params,
            self.protocol,
            challenge,
        )))
    }

    fn timed_out(mut self) -> Option<ServerRequest> {
        if self.retries >= 5 {
            self.params.complete(Err(ConnectError::Timeout {
                step: HandshakeStep::Challenge,
            }));
            return None;
        }
        self.retries += 1;
        Some(ServerRequest::Challenge(self))
    }
}

/// Step 3 (optional): answer the server's key request.
pub struct Authorize {
    params: ConnectionParams,
    protocol: ProtocolType,
    challenge: String,
    retries: u32,
}

impl Authorize {
    fn generate_request(&self) -> String {
        let response = compute_auth_response(&self.params.settings.cd_key, &self.challenge);
        debug!(response = %response, "sending authorization");
        format!("authorizeThis {response}")
    }

    fn handle_response(self, name: &str, parser: &mut TokenParser) -> Option<ServerRequest> {
        if name.eq_ignore_ascii_case("challengeResponse") {
            let challenge = parser.get_integer(false);
            debug!(challenge, "authorized, challenge received");
            return Some(ServerRequest::Connect(Connect::new(
                self.params,
                self.protocol,
                challenge,
            )));
        }

        // a second key request means the first response was refused
        error!("server refused the authorization response");
        self.params.complete(Err(ConnectError::AuthorizationFailed));
        None
    }

    fn timed_out(mut self) -> Option<ServerRequest> {
        if self.retries >= 2 {
            self.params.complete(Err(ConnectError::Timeout {
                step: HandshakeStep::Authorize,
            }));
            return None;
        }
        self.retries += 1;
        Some(ServerRequest::Authorize(self))
    }
}

/// Step 4: send the connect payload and wait for the verdict.
pub struct Connect {
    params: ConnectionParams,
    protocol: ProtocolType,
    challenge: i32,
    qport: u16,
    retries: u32,
}

impl Connect {
    fn new(params: ConnectionParams, protocol: ProtocolType, challenge: i32) -> Self {
        let qport = params.settings.qport;
        Self {
            params,
            protocol,
            challenge,
            qport,
            retries: 0,
        }
    }

    fn generate_request(&self) -> String {
        let mut info = Info::new();
        info.set_value_for_key("challenge", &self.challenge.to_string());
        let version = self
            .params
            .settings
            .version
            .as_deref()
            .unwrap_or(CLIENT_VERSION);
        info.set_value_for_key("version", version);
        info.set_value_for_key(
            "protocol",
            &self.protocol.protocol_version_number().to_string(),
        );
        if self.protocol.server_type == ServerType::Breakthrough {
            info.set_value_for_key("clientType", "Breakthrough");
        }
        info.set_value_for_key("qport", &self.qport.to_string());

        let mut payload = info.get_string().to_string();
        payload.push_str(self.params.user_info.get_string());

        format!("connect  \"{payload}\"")
    }

    fn handle_response(mut self, name: &str, parser: &mut TokenParser) -> Option<ServerRequest> {
        if name.eq_ignore_ascii_case("droperror") {
            let reason = parser.get_line(true).to_string();
            error!(reason = %reason, "server dropped the connection");
            self.params.complete(Err(ConnectError::Rejected(reason)));
            return None;
        }

        if !name.eq_ignore_ascii_case("connectResponse") {
            let args = parser.get_line(true);
            if self.retries < 5 {
                error!(event = name, args, "not a connect response, retrying");
                self.retries += 1;
                return Some(ServerRequest::Connect(self));
            }
            error!(event = name, args, "assuming the connection failed");
            self.params.complete(Err(ConnectError::BadResponse));
            return None;
        }

        info!("connection succeeded");
        let session = NegotiatedSession {
            qport: self.qport,
            challenge: self.challenge,
            protocol: self.protocol,
            user_info: self.params.user_info.clone(),
        };
        self.params.complete(Ok(session));
        None
    }

    fn timed_out(mut self) -> Option<ServerRequest> {
        if self.retries >= 5 {
            self.params.complete(Err(ConnectError::Timeout {
                step: HandshakeStep::Connect,
            }));
            return None;
        }
        self.retries += 1;
        Some(ServerRequest::Connect(self))
    }
}

/// `getstatus` query: server info plus player list.
pub struct StatusQuery {
    callback: QueryCallback,
}

/// `getinfo` query: lightweight server info.
pub struct InfoQuery {
    callback: QueryCallback,
}

/// Authorization response: SHA-256 over the product key and the challenge
/// text, as lowercase hex.
fn compute_auth_response(cd_key: &str, challenge: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cd_key.as_bytes());
    hasher.update(challenge.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
