//! Host environment abstractions.
//!
//! The protocol code never touches the OS directly. Time, randomness and the
//! datagram socket come in through these traits, so the whole stack runs
//! under deterministic in-memory implementations in tests.

/// Milliseconds since an arbitrary epoch. Only differences matter.
pub type Instant = u64;

/// Random source for ephemeral values such as the client port.
pub trait Rng {
    /// Fill `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Connected, non-blocking datagram socket. One datagram in, one datagram
/// out; the implementor handles addressing and framing.
pub trait UdpSocket {
    /// Block up to `timeout_ms` for an incoming datagram. Returns whether
    /// one is available.
    fn wait(&mut self, timeout_ms: u64) -> bool;

    /// An incoming datagram is ready without waiting.
    fn data_available(&mut self) -> bool;

    /// Send one datagram. Returns the number of bytes accepted.
    fn send(&mut self, data: &[u8]) -> usize;

    /// Receive one datagram into `buf`. Returns its length, 0 when none is
    /// pending.
    fn receive(&mut self, buf: &mut [u8]) -> usize;
}
