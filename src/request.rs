//! Out-of-band request dispatcher.
//!
//! At most one request is in flight. Each tick the dispatcher sends a
//! pending request once its deferred delay elapses, matches incoming
//! datagrams against the active request by event name, and escalates
//! timeouts. Handling a response consumes the request and either yields the
//! next one in the chain or ends the exchange, so every transition is an
//! ownership transfer and a stale request can never act twice.

use tracing::{debug, warn};

use crate::compress::CompressedMessage;
use crate::parser::TokenParser;
use crate::stream::{DynamicStream, MessageStream};
use crate::transport::{Instant, UdpSocket};

/// Largest out-of-band datagram we accept.
const MAX_DATAGRAM: usize = 2048;

/// Default wall-clock timeout when a request does not override it.
const DEFAULT_TIMEOUT: u64 = 10_000;

/// One step of a request chain.
pub trait Request: Sized {
    /// Command text to put on the wire.
    fn generate_request(&self) -> String;

    /// Whether `name` is an event this request consumes. Matching is
    /// case-insensitive.
    fn supports_event(&self, name: &str) -> bool;

    /// Consume a matched event. Returns the next request in the chain, or
    /// `None` when the exchange is over.
    fn handle_response(self, name: &str, parser: &mut TokenParser) -> Option<Self>;

    /// The timeout fired. Return `self` to retry, `None` to give up.
    fn timed_out(self) -> Option<Self>;

    /// Delay between becoming active and the actual send, in milliseconds.
    fn deferred_time(&self) -> u64 {
        0
    }

    /// Per-request timeout override, in milliseconds.
    fn override_timeout_time(&self) -> Option<u64> {
        None
    }

    /// When set, everything past the returned byte offset of the request
    /// text is compressed before sending.
    fn should_compress_request(&self) -> Option<usize> {
        None
    }
}

struct ActiveRequest<R> {
    request: R,
    sent: bool,
    /// Earliest time the request may go on the wire.
    ready_at: Instant,
    /// Re-armed on every send, including retries.
    deadline: Instant,
}

/// Drives a [`Request`] chain over a datagram socket.
pub struct RequestDispatcher<R: Request, S: UdpSocket> {
    socket: S,
    active: Option<ActiveRequest<R>>,
}

impl<R: Request, S: UdpSocket> RequestDispatcher<R, S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            active: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Make `request` the active one, replacing (and thereby cancelling) any
    /// previous request.
    pub fn start(&mut self, request: R, now: Instant) {
        let ready_at = now + request.deferred_time();
        self.active = Some(ActiveRequest {
            request,
            sent: false,
            ready_at,
            deadline: 0,
        });
    }

    /// Drive the active request: send when due, consume matching incoming
    /// events, escalate timeouts.
    pub fn tick(&mut self, _delta: u64, now: Instant) {
        self.send_pending(now);
        self.process_incoming(now);
        self.check_timeout(now);
    }

    fn send_pending(&mut self, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.sent || now < active.ready_at {
            return;
        }

        let text = active.request.generate_request();
        let payload = match active.request.should_compress_request() {
            Some(offset) if text.len() > offset => compress_tail(text.as_bytes(), offset),
            _ => text.clone().into_bytes(),
        };
        debug!(request = %text.escape_default(), bytes = payload.len(), "sending request");
        self.socket.send(&payload);

        active.sent = true;
        active.deadline = now
            + active
                .request
                .override_timeout_time()
                .unwrap_or(DEFAULT_TIMEOUT);
    }

    fn process_incoming(&mut self, now: Instant) {
        let mut buf = [0u8; MAX_DATAGRAM];
        while self.socket.data_available() {
            let n = self.socket.receive(&mut buf);
            if n == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf[..n]).into_owned();
            let mut parser = TokenParser::new(&text);
            let event = parser.get_token(false);
            if event.is_empty() {
                continue;
            }

            match self.active.take() {
                Some(active) if active.sent && active.request.supports_event(event) => {
                    debug!(event, "handling response");
                    if let Some(next) = active.request.handle_response(event, &mut parser) {
                        self.start(next, now);
                        // the replacement may want to go out this same tick
                        self.send_pending(now);
                    }
                }
                other => {
                    debug!(event, "dropping unexpected datagram");
                    self.active = other;
                }
            }
        }
    }

    fn check_timeout(&mut self, now: Instant) {
        if !matches!(&self.active, Some(a) if a.sent && now >= a.deadline) {
            return;
        }
        let Some(active) = self.active.take() else {
            return;
        };
        warn!("request timed out");
        if let Some(retry) = active.request.timed_out() {
            self.start(retry, now);
            self.send_pending(now);
        }
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }
}

/// Build the wire payload for a partially compressed request: the first
/// `offset` bytes verbatim, then the 16-bit size header and Huffman stream
/// covering the remainder.
fn compress_tail(text: &[u8], offset: usize) -> Vec<u8> {
    let mut input = DynamicStream::from_vec(text.to_vec());
    let mut output = DynamicStream::new();
    output.write(&text[..offset]);
    CompressedMessage::new(&mut input, &mut output).compress(offset, text.len() - offset);
    output.into_vec()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    pub(crate) struct TestSocket {
        pub sent: Vec<Vec<u8>>,
        pub incoming: VecDeque<Vec<u8>>,
    }

    impl TestSocket {
        pub fn new() -> Self {
            Self {
                sent: Vec::new(),
                incoming: VecDeque::new(),
            }
        }
    }

    impl UdpSocket for TestSocket {
        fn wait(&mut self, _timeout_ms: u64) -> bool {
            !self.incoming.is_empty()
        }

        fn data_available(&mut self) -> bool {
            !self.incoming.is_empty()
        }

        fn send(&mut self, data: &[u8]) -> usize {
            self.sent.push(data.to_vec());
            data.len()
        }

        fn receive(&mut self, buf: &mut [u8]) -> usize {
            match self.incoming.pop_front() {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    n
                }
                None => 0,
            }
        }
    }

    /// Sends "ping", accepts "pong", retries up to twice.
    struct Ping {
        retries: u32,
        deferred: u64,
        got_pong: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl Request for Ping {
        fn generate_request(&self) -> String {
            "ping".to_string()
        }

        fn supports_event(&self, name: &str) -> bool {
            name.eq_ignore_ascii_case("pong")
        }

        fn handle_response(self, _name: &str, _parser: &mut TokenParser) -> Option<Self> {
            self.got_pong.set(true);
            None
        }

        fn timed_out(mut self) -> Option<Self> {
            if self.retries >= 2 {
                return None;
            }
            self.retries += 1;
            Some(self)
        }

        fn deferred_time(&self) -> u64 {
            self.deferred
        }

        fn override_timeout_time(&self) -> Option<u64> {
            Some(1000)
        }
    }

    fn ping_dispatcher(deferred: u64) -> (RequestDispatcher<Ping, TestSocket>, std::rc::Rc<std::cell::Cell<bool>>) {
        let flag = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut dispatcher = RequestDispatcher::new(TestSocket::new());
        dispatcher.start(
            Ping {
                retries: 0,
                deferred,
                got_pong: flag.clone(),
            },
            0,
        );
        (dispatcher, flag)
    }

    #[test]
    fn deferred_delay_holds_the_send() {
        let (mut dispatcher, _) = ping_dispatcher(100);
        dispatcher.tick(50, 50);
        assert!(dispatcher.socket.sent.is_empty());
        dispatcher.tick(50, 100);
        assert_eq!(dispatcher.socket.sent, vec![b"ping".to_vec()]);
        // no resend before timeout
        dispatcher.tick(100, 200);
        assert_eq!(dispatcher.socket.sent.len(), 1);
    }

    #[test]
    fn matching_event_completes() {
        let (mut dispatcher, flag) = ping_dispatcher(0);
        dispatcher.tick(0, 0);
        dispatcher.socket.incoming.push_back(b"pong".to_vec());
        dispatcher.tick(10, 10);
        assert!(flag.get());
        assert!(!dispatcher.is_busy());
    }

    #[test]
    fn unmatched_event_is_dropped() {
        let (mut dispatcher, flag) = ping_dispatcher(0);
        dispatcher.tick(0, 0);
        dispatcher.socket.incoming.push_back(b"gibberish stuff".to_vec());
        dispatcher.tick(10, 10);
        assert!(!flag.get());
        assert!(dispatcher.is_busy());
    }

    #[test]
    fn retries_are_bounded() {
        let (mut dispatcher, _) = ping_dispatcher(0);
        dispatcher.tick(0, 0); // send 1
        dispatcher.tick(1000, 1000); // timeout, retry armed and sent
        dispatcher.tick(1000, 2000); // timeout, retry 2
        dispatcher.tick(1000, 3000); // timeout, out of retries
        assert_eq!(dispatcher.socket.sent.len(), 3);
        assert!(!dispatcher.is_busy());
    }

    /// Sends a partially compressed request, never expects a reply.
    struct Shout;

    impl Request for Shout {
        fn generate_request(&self) -> String {
            "shout \"\\rate\\25000\\snaps\\20\"".to_string()
        }

        fn supports_event(&self, _name: &str) -> bool {
            false
        }

        fn handle_response(self, _name: &str, _parser: &mut TokenParser) -> Option<Self> {
            None
        }

        fn timed_out(self) -> Option<Self> {
            None
        }

        fn should_compress_request(&self) -> Option<usize> {
            Some(6)
        }
    }

    #[test]
    fn compressed_request_keeps_prefix_and_decodes() {
        let mut dispatcher = RequestDispatcher::new(TestSocket::new());
        dispatcher.start(Shout, 0);
        dispatcher.tick(0, 0);

        let text = Shout.generate_request().into_bytes();
        let wire = dispatcher.socket.sent[0].clone();
        assert_eq!(&wire[..6], &text[..6], "prefix stays verbatim");
        assert_ne!(&wire[6..], &text[6..], "tail goes out compressed");

        let mut input = DynamicStream::from_vec(wire);
        let mut output = DynamicStream::new();
        CompressedMessage::new(&mut input, &mut output).decompress(6, 2048);
        assert_eq!(output.into_vec(), &text[6..]);
    }

    #[test]
    fn event_matching_ignores_case() {
        let (mut dispatcher, flag) = ping_dispatcher(0);
        dispatcher.tick(0, 0);
        dispatcher.socket.incoming.push_back(b"PONG".to_vec());
        dispatcher.tick(10, 10);
        assert!(flag.get());
    }
}
