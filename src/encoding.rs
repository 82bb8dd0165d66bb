//! XOR stream obfuscation for the connected-phase channel.
//!
//! Both directions are XOR streams keyed off the connection challenge, the
//! per-packet secret key and the reliable command text, so applying the same
//! operation twice restores the input. This is legacy obfuscation, not
//! cryptography.

/// Command strings tracked per direction.
pub const MAX_RELIABLE_COMMANDS: usize = 64;

/// Per-connection XOR scrambler state.
///
/// `encode` covers client-to-server traffic and `decode` server-to-client.
/// The caller sets the acknowledge numbers and secret key from the packet
/// headers before transforming the payload that follows them.
pub struct XorEncoding {
    challenge: u32,
    secret_key: u32,
    message_acknowledge: u32,
    reliable_acknowledge: u32,
    reliable_commands: [String; MAX_RELIABLE_COMMANDS],
    server_commands: [String; MAX_RELIABLE_COMMANDS],
}

impl XorEncoding {
    pub fn new(challenge: u32) -> Self {
        Self {
            challenge,
            secret_key: 0,
            message_acknowledge: 0,
            reliable_acknowledge: 0,
            reliable_commands: std::array::from_fn(|_| String::new()),
            server_commands: std::array::from_fn(|_| String::new()),
        }
    }

    pub fn set_secret_key(&mut self, key: u32) {
        self.secret_key = key;
    }

    pub fn secret_key(&self) -> u32 {
        self.secret_key
    }

    pub fn set_message_acknowledge(&mut self, num: u32) {
        self.message_acknowledge = num;
    }

    pub fn message_acknowledge(&self) -> u32 {
        self.message_acknowledge
    }

    pub fn set_reliable_acknowledge(&mut self, num: u32) {
        self.reliable_acknowledge = num;
    }

    pub fn reliable_acknowledge(&self) -> u32 {
        self.reliable_acknowledge
    }

    pub fn set_reliable_command(&mut self, sequence: u32, command: &str) {
        self.reliable_commands[sequence as usize & (MAX_RELIABLE_COMMANDS - 1)] =
            command.to_string();
    }

    pub fn set_server_command(&mut self, sequence: u32, command: &str) {
        self.server_commands[sequence as usize & (MAX_RELIABLE_COMMANDS - 1)] =
            command.to_string();
    }

    /// Scramble an outgoing payload in place.
    pub fn encode(&self, data: &mut [u8]) {
        let index = self.reliable_acknowledge as usize & (MAX_RELIABLE_COMMANDS - 1);
        let string = self.server_commands[index].as_bytes();
        let seed = self.challenge ^ self.secret_key ^ self.message_acknowledge;
        xor_values(seed, string, data);
    }

    /// Unscramble an incoming payload in place.
    pub fn decode(&self, data: &mut [u8]) {
        let index = self.reliable_acknowledge as usize & (MAX_RELIABLE_COMMANDS - 1);
        let string = self.reliable_commands[index].as_bytes();
        let seed = self.challenge ^ self.secret_key;
        xor_values(seed, string, data);
    }
}

/// Mutate the running key from the command text and XOR it over the data.
/// Bytes above 127 and `%` contribute as `.` so the schedule stays within
/// the command token character set.
fn xor_values(seed: u32, string: &[u8], data: &mut [u8]) {
    let mut key = seed;
    let mut index = 0usize;
    for (i, b) in data.iter_mut().enumerate() {
        let c = if string.is_empty() {
            b'.'
        } else {
            if index >= string.len() {
                index = 0;
            }
            let c = string[index];
            index += 1;
            if c > 127 || c == b'%' {
                b'.'
            } else {
                c
            }
        };
        key ^= (c as u32) << (i & 1);
        *b ^= key as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_encoding() -> XorEncoding {
        let mut enc = XorEncoding::new(0x1234_5678);
        enc.set_secret_key(0x0badc0de);
        enc.set_message_acknowledge(42);
        enc.set_reliable_acknowledge(3);
        enc.set_server_command(3, "cmd userinfo");
        enc.set_reliable_command(3, "svc configstring 5");
        enc
    }

    #[test]
    fn encode_is_self_inverse() {
        let enc = sample_encoding();
        let original: Vec<u8> = (0u8..=255).collect();
        let mut data = original.clone();
        enc.encode(&mut data);
        assert_ne!(data, original);
        enc.encode(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn decode_is_self_inverse() {
        let enc = sample_encoding();
        let original = b"serverCommand 12 payload".to_vec();
        let mut data = original.clone();
        enc.decode(&mut data);
        assert_ne!(data, original);
        enc.decode(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn key_material_changes_output() {
        let enc1 = sample_encoding();
        let mut enc2 = sample_encoding();
        enc2.set_message_acknowledge(43);

        let mut a = b"same plaintext bytes".to_vec();
        let mut b = a.clone();
        enc1.encode(&mut a);
        enc2.encode(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn command_text_changes_output() {
        let enc1 = sample_encoding();
        let mut enc2 = sample_encoding();
        enc2.set_server_command(3, "cmd somethingelse");

        let mut a = b"same plaintext bytes".to_vec();
        let mut b = a.clone();
        enc1.encode(&mut a);
        enc2.encode(&mut b);
        assert_ne!(a, b);
    }
}
