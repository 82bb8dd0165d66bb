//! Client-facing handle for one remote server.

use tracing::info;

use crate::handshake::{
    ConnectCallback, ConnectionParams, QueryCallback, ServerRequest,
};
use crate::info::Info;
use crate::request::RequestDispatcher;
use crate::transport::{Instant, Rng, UdpSocket};
use crate::ClientSettings;

/// Out-of-band client for a single game server.
///
/// Owns the socket through the request dispatcher. Everything is
/// cooperative: call [`EngineServer::tick`] regularly with the elapsed and
/// current time, and the active exchange makes progress without blocking.
pub struct EngineServer<S: UdpSocket> {
    dispatcher: RequestDispatcher<ServerRequest, S>,
}

impl<S: UdpSocket> EngineServer<S> {
    pub fn new(socket: S) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(socket),
        }
    }

    /// Begin the connection handshake. `callback` fires exactly once, with
    /// the negotiated session or the failure reason.
    pub fn connect(
        &mut self,
        settings: ClientSettings,
        user_info: Info,
        rng: &mut dyn Rng,
        now: Instant,
        callback: ConnectCallback,
    ) {
        info!("connecting to server");
        let request = ServerRequest::connect(
            ConnectionParams {
                settings,
                user_info,
                callback,
            },
            rng,
        );
        self.dispatcher.start(request, now);
    }

    /// Query the server status (info plus player list).
    pub fn get_status(&mut self, now: Instant, callback: QueryCallback) {
        self.dispatcher.start(ServerRequest::status(callback), now);
    }

    /// Query the lightweight server info.
    pub fn get_info(&mut self, now: Instant, callback: QueryCallback) {
        self.dispatcher.start(ServerRequest::info(callback), now);
    }

    /// Drive the active exchange.
    pub fn tick(&mut self, delta: u64, now: Instant) {
        self.dispatcher.tick(delta, now);
    }

    /// An exchange is still in flight.
    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub fn socket(&self) -> &S {
        self.dispatcher.socket()
    }

    pub fn socket_mut(&mut self) -> &mut S {
        self.dispatcher.socket_mut()
    }
}
