//! Typed message serializer.
//!
//! [`Msg`] layers typed read/write/delta operations on top of the bit codec.
//! A message has one of three modes: reading, writing, or both (both keeps
//! the read and write accessors active at once; the `serialize_*` entry
//! points route to the read path whenever reading is active, so combined
//! differencing decodes into working memory first and encodes differences
//! against it).
//!
//! Field order and widths are the wire contract: both endpoints serialize
//! the same fields in the same order with the same bit counts. Strings are
//! NUL-terminated byte-for-byte; scrambled strings map every character
//! through the fixed substitution tables. Reading a string of unknown length
//! captures the full codec state, scans ahead to measure, restores the state
//! and re-reads definitively.

use crate::codec::{self, SCRATCH_SIZE};
use crate::scramble::{BYTE_TO_CHAR, CHAR_TO_BYTE, IDENTITY};
use crate::stream::MessageStream;

/// Bits in a packed entity number.
pub const ENTITY_NUM_BITS: i32 = 10;
/// Maximum entity count; entity numbers are masked to this.
pub const MAX_ENTITIES: u32 = 1 << ENTITY_NUM_BITS;

const COORD_SIGN: u32 = 1 << 18;
const COORD_MASK: u32 = COORD_SIGN - 1;
const COORD_SMALL_SIGN: u32 = 1 << 16;
const COORD_SMALL_MASK: u32 = COORD_SMALL_SIGN - 1;

/// Serializer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgMode {
    Reading,
    Writing,
    /// Both accessors active; `serialize_*` reads.
    Both,
}

/// Structures that serialize themselves through a [`Msg`].
pub trait Serializable {
    fn serialize<S: MessageStream>(&mut self, msg: &mut Msg<'_, S>);
}

/// Bit-level message over a stream, in one of three modes.
pub struct Msg<'a, S: MessageStream> {
    stream: &'a mut S,
    mode: MsgMode,
    bit: usize,
    scratch: [u8; SCRATCH_SIZE],
    /// Bytes of the stream consumed by scratch fills before the current one.
    consumed_before: usize,
    /// Bytes of the current scratch that came from the stream.
    scratch_valid: usize,
}

impl<'a, S: MessageStream> Msg<'a, S> {
    pub fn new(stream: &'a mut S, mode: MsgMode) -> Self {
        let mut msg = Self {
            stream,
            mode,
            bit: 0,
            scratch: [0; SCRATCH_SIZE],
            consumed_before: 0,
            scratch_valid: 0,
        };
        if msg.is_reading() {
            msg.reset();
        }
        msg
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.mode, MsgMode::Reading | MsgMode::Both)
    }

    pub fn is_writing(&self) -> bool {
        matches!(self.mode, MsgMode::Writing | MsgMode::Both)
    }

    /// Prime the scratch from the stream for a read pass.
    fn reset(&mut self) {
        self.scratch = [0; SCRATCH_SIZE];
        self.consumed_before = 0;
        let before = self.stream.position();
        codec::fill(&mut self.bit, self.stream, &mut self.scratch);
        self.scratch_valid = self.stream.position() - before;
    }

    fn refill(&mut self) {
        self.consumed_before += self.scratch_valid;
        let before = self.stream.position();
        codec::fill(&mut self.bit, self.stream, &mut self.scratch);
        self.scratch_valid = self.stream.position() - before;
    }

    /// Write any pending scratch bits to the stream as whole bytes.
    pub fn flush(&mut self) {
        if self.is_writing() {
            codec::flush(&mut self.bit, self.stream, &self.scratch);
        }
    }

    /// Bytes of the message consumed or produced so far.
    pub fn position(&self) -> usize {
        self.consumed_before + (self.bit >> 3)
    }

    /// All bits of the underlying stream have been consumed.
    fn exhausted(&self) -> bool {
        self.consumed_before * 8 + self.bit >= self.stream.len() * 8
    }

    // -----------------------------------------------------------------
    // Bit-level accessors
    // -----------------------------------------------------------------

    pub fn write_bits(&mut self, value: u32, bits: i32) {
        debug_assert!(self.is_writing());
        codec::encode_bits(value, bits, &mut self.bit, self.stream, &mut self.scratch);
    }

    pub fn read_bits(&mut self, bits: i32) -> u32 {
        debug_assert!(self.is_reading());
        let bits = bits.unsigned_abs() as usize;
        let mut value = 0u32;
        for i in 0..bits {
            if self.bit == SCRATCH_SIZE * 8 {
                self.refill();
            }
            let b = (self.scratch[self.bit >> 3] >> (self.bit & 7)) & 1;
            value |= (b as u32) << i;
            self.bit += 1;
        }
        value
    }

    pub fn serialize_bits(&mut self, value: &mut u32, bits: i32) {
        if !self.is_reading() {
            self.write_bits(*value, bits);
        } else {
            *value = self.read_bits(bits);
        }
    }

    // -----------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------

    pub fn write_bool(&mut self, value: bool) {
        self.write_bits(value as u32, 1);
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    pub fn write_byte(&mut self, value: u8) {
        self.write_bits(value as u32, 8);
    }

    pub fn read_byte(&mut self) -> u8 {
        self.read_bits(8) as u8
    }

    pub fn write_char(&mut self, value: i8) {
        self.write_bits(value as u8 as u32, 8);
    }

    pub fn read_char(&mut self) -> i8 {
        self.read_bits(8) as u8 as i8
    }

    /// A bool carried in a full byte.
    pub fn write_byte_bool(&mut self, value: bool) {
        self.write_bits(value as u32, 8);
    }

    pub fn read_byte_bool(&mut self) -> bool {
        self.read_bits(8) != 0
    }

    pub fn write_short(&mut self, value: i16) {
        self.write_bits(value as u16 as u32, 16);
    }

    pub fn read_short(&mut self) -> i16 {
        self.read_bits(16) as u16 as i16
    }

    pub fn write_ushort(&mut self, value: u16) {
        self.write_bits(value as u32, 16);
    }

    pub fn read_ushort(&mut self) -> u16 {
        self.read_bits(16) as u16
    }

    pub fn write_int(&mut self, value: i32) {
        self.write_bits(value as u32, 32);
    }

    pub fn read_int(&mut self) -> i32 {
        self.read_bits(32) as i32
    }

    pub fn write_uint(&mut self, value: u32) {
        self.write_bits(value, 32);
    }

    pub fn read_uint(&mut self) -> u32 {
        self.read_bits(32)
    }

    /// Floats travel as their raw bit pattern.
    pub fn write_float(&mut self, value: f32) {
        self.write_bits(value.to_bits(), 32);
    }

    pub fn read_float(&mut self) -> f32 {
        f32::from_bits(self.read_bits(32))
    }

    pub fn write_data(&mut self, data: &[u8]) {
        for &b in data {
            self.write_byte(b);
        }
    }

    pub fn read_data(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.read_byte();
        }
    }

    pub fn serialize_bool(&mut self, value: &mut bool) {
        if !self.is_reading() {
            self.write_bool(*value);
        } else {
            *value = self.read_bool();
        }
    }

    pub fn serialize_byte(&mut self, value: &mut u8) {
        if !self.is_reading() {
            self.write_byte(*value);
        } else {
            *value = self.read_byte();
        }
    }

    pub fn serialize_short(&mut self, value: &mut i16) {
        if !self.is_reading() {
            self.write_short(*value);
        } else {
            *value = self.read_short();
        }
    }

    pub fn serialize_ushort(&mut self, value: &mut u16) {
        if !self.is_reading() {
            self.write_ushort(*value);
        } else {
            *value = self.read_ushort();
        }
    }

    pub fn serialize_int(&mut self, value: &mut i32) {
        if !self.is_reading() {
            self.write_int(*value);
        } else {
            *value = self.read_int();
        }
    }

    pub fn serialize_uint(&mut self, value: &mut u32) {
        if !self.is_reading() {
            self.write_uint(*value);
        } else {
            *value = self.read_uint();
        }
    }

    pub fn serialize_float(&mut self, value: &mut f32) {
        if !self.is_reading() {
            self.write_float(*value);
        } else {
            *value = self.read_float();
        }
    }

    pub fn serialize_class<T: Serializable>(&mut self, value: &mut T) {
        value.serialize(self);
    }

    // -----------------------------------------------------------------
    // Strings
    // -----------------------------------------------------------------

    /// Plain string: bytes as-is, NUL terminated.
    pub fn write_string(&mut self, s: &str) {
        self.write_data(s.as_bytes());
        self.write_byte(0);
    }

    /// Scrambled string: each character through the write table; the
    /// terminator is the code that maps back to NUL.
    pub fn write_scrambled_string(&mut self, s: &str) {
        for &c in s.as_bytes() {
            self.write_byte(CHAR_TO_BYTE[c as usize]);
        }
        self.write_byte(CHAR_TO_BYTE[0]);
    }

    pub fn read_string(&mut self) -> String {
        self.read_string_internal(&IDENTITY)
    }

    pub fn read_scrambled_string(&mut self) -> String {
        self.read_string_internal(&BYTE_TO_CHAR)
    }

    /// Measure, rewind, re-read. The length of an incoming string is not
    /// known up front, so the codec state (bit offset, stream position,
    /// scratch contents) is captured, the string scanned to its terminator,
    /// the state restored, and the bytes then read definitively.
    fn read_string_internal(&mut self, map: &[u8; 256]) -> String {
        let saved_bit = self.bit;
        let saved_pos = self.stream.position();
        let saved_scratch = self.scratch;
        let saved_consumed = self.consumed_before;
        let saved_valid = self.scratch_valid;

        let mut len = 0usize;
        loop {
            if self.exhausted() {
                break;
            }
            let val = self.read_byte();
            let c = map[val as usize];
            len += 1;
            if c == 0 {
                break;
            }
        }

        let mut s = String::new();
        if len > 0 {
            self.bit = saved_bit;
            self.stream.seek(saved_pos);
            self.scratch = saved_scratch;
            self.consumed_before = saved_consumed;
            self.scratch_valid = saved_valid;

            let chars = len - 1; // not counting the terminator
            let mut bytes = Vec::with_capacity(chars);
            for _ in 0..chars {
                let val = self.read_byte();
                bytes.push(map[val as usize]);
            }
            // consume the terminator
            self.read_byte();
            s = String::from_utf8_lossy(&bytes).into_owned();
        }
        s
    }

    pub fn serialize_string(&mut self, s: &mut String) {
        if !self.is_reading() {
            self.write_string(s);
        } else {
            *s = self.read_string();
        }
    }

    pub fn serialize_scrambled_string(&mut self, s: &mut String) {
        if !self.is_reading() {
            self.write_scrambled_string(s);
        } else {
            *s = self.read_scrambled_string();
        }
    }

    // -----------------------------------------------------------------
    // Deltas
    // -----------------------------------------------------------------

    fn write_bits_from_bytes(&mut self, data: &[u8], bits: usize) {
        let full = bits / 8;
        for &b in &data[..full] {
            self.write_bits(b as u32, 8);
        }
        let rem = (bits % 8) as i32;
        if rem > 0 {
            self.write_bits(data[full] as u32, rem);
        }
    }

    fn read_bits_to_bytes(&mut self, data: &mut [u8], bits: usize) {
        let full = bits / 8;
        for b in &mut data[..full] {
            *b = self.read_bits(8) as u8;
        }
        let rem = (bits % 8) as i32;
        if rem > 0 {
            data[full] = self.read_bits(rem) as u8;
        }
    }

    /// One "unchanged" flag bit; only when the snapshots differ is the full
    /// field (re)written.
    pub fn serialize_delta(&mut self, a: &[u8], b: &mut [u8], bits: usize) {
        let cmp = (bits >> 3).max(1);
        if !self.is_reading() {
            let same = a[..cmp] == b[..cmp];
            self.write_bool(same);
            if !same {
                self.write_bits_from_bytes(b, bits);
            }
        } else {
            let same = self.read_bool();
            if !same {
                self.read_bits_to_bytes(b, bits);
            }
        }
    }

    /// Keyed delta: the changed field travels XOR-ed with the low byte of
    /// `key`; decoding XORs again after the read. Matching keys round-trip;
    /// mismatched keys do not reconstruct the value.
    pub fn serialize_delta_key(&mut self, a: &[u8], b: &mut [u8], key: u32, bits: usize) {
        let cmp = (bits >> 3).max(1);
        if !self.is_reading() {
            let same = a[..cmp] == b[..cmp];
            self.write_bool(same);
            if !same {
                let mut masked = b.to_vec();
                for v in masked[..cmp].iter_mut() {
                    *v ^= key as u8;
                }
                self.write_bits_from_bytes(&masked, bits);
            }
        } else {
            let same = self.read_bool();
            if !same {
                self.read_bits_to_bytes(b, bits);
                for v in b[..cmp].iter_mut() {
                    *v ^= key as u8;
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Coordinates and entity numbers
    // -----------------------------------------------------------------

    /// 19-bit coordinate: 18-bit magnitude at 1/16-unit resolution plus a
    /// sign bit. Magnitudes beyond the 18-bit range saturate to the maximum
    /// encodable value rather than wrapping.
    pub fn write_coord(&mut self, value: f32) {
        let mut mag = (value.abs() * 16.0) as u32;
        if mag > COORD_MASK {
            mag = COORD_MASK;
        }
        let bits = if value < 0.0 { mag | COORD_SIGN } else { mag };
        self.write_bits(bits, 19);
    }

    pub fn read_coord(&mut self) -> f32 {
        let read = self.read_bits(19);
        let sign = if read & COORD_SIGN != 0 { -1.0 } else { 1.0 };
        sign * (read & COORD_MASK) as f32 / 16.0
    }

    /// 17-bit coordinate: 16-bit magnitude at 1/8-unit resolution plus sign.
    pub fn write_coord_small(&mut self, value: f32) {
        let mut mag = (value.abs() * 8.0) as u32;
        if mag > COORD_SMALL_MASK {
            mag = COORD_SMALL_MASK;
        }
        let bits = if value < 0.0 { mag | COORD_SMALL_SIGN } else { mag };
        self.write_bits(bits, 17);
    }

    pub fn read_coord_small(&mut self) -> f32 {
        let read = self.read_bits(17);
        let sign = if read & COORD_SMALL_SIGN != 0 { -1.0 } else { 1.0 };
        sign * (read & COORD_SMALL_MASK) as f32 / 8.0
    }

    /// Delta coordinate: a leading flag selects the compact signed-offset
    /// form (8 bits, parity bit = sign, 1-based magnitude up to 128) when
    /// the change is small, else an absolute 16-bit form.
    pub fn write_delta_coord(&mut self, value: i32, offset: u32) {
        let d = value - offset as i32;
        let small = d != 0 && d.unsigned_abs() <= 128;
        self.write_bool(small);
        if small {
            let byte = ((d.unsigned_abs() - 1) << 1) | (d < 0) as u32;
            self.write_bits(byte, 8);
        } else {
            self.write_bits(value as u32 & 0xffff, 16);
        }
    }

    pub fn read_delta_coord(&mut self, offset: u32) -> i32 {
        if self.read_bool() {
            let byte = self.read_bits(8);
            let mut result = (byte >> 1) as i32 + 1;
            if byte & 1 != 0 {
                result = -result;
            }
            result + offset as i32
        } else {
            self.read_bits(16) as i32
        }
    }

    /// Wider delta coordinate: 10-bit compact form (magnitude up to 512),
    /// 18-bit absolute form.
    pub fn write_delta_coord_extra(&mut self, value: i32, offset: u32) {
        let d = value - offset as i32;
        let small = d != 0 && d.unsigned_abs() <= 512;
        self.write_bool(small);
        if small {
            let bits = ((d.unsigned_abs() - 1) << 1) | (d < 0) as u32;
            self.write_bits(bits, 10);
        } else {
            self.write_bits(value as u32 & 0x3ffff, 18);
        }
    }

    pub fn read_delta_coord_extra(&mut self, offset: u32) -> i32 {
        if self.read_bool() {
            let bits = self.read_bits(10);
            let mut result = (bits >> 1) as i32 + 1;
            if bits & 1 != 0 {
                result = -result;
            }
            result + offset as i32
        } else {
            self.read_bits(18) as i32
        }
    }

    /// Entity number, masked to the maximum entity count.
    pub fn write_entity_num(&mut self, num: u16) {
        self.write_bits(num as u32 & (MAX_ENTITIES - 1), ENTITY_NUM_BITS);
    }

    pub fn read_entity_num(&mut self) -> u16 {
        (self.read_bits(ENTITY_NUM_BITS) & (MAX_ENTITIES - 1)) as u16
    }

    /// "Minus one" entity number: 0 on the wire means "no entity".
    pub fn write_entity_num2(&mut self, num: u16) {
        self.write_bits((num as u32 + 1) & (MAX_ENTITIES - 1), ENTITY_NUM_BITS);
    }

    pub fn read_entity_num2(&mut self) -> u16 {
        (self.read_bits(ENTITY_NUM_BITS).wrapping_sub(1) & (MAX_ENTITIES - 1)) as u16
    }

    pub fn write_vector_coord(&mut self, value: &[f32; 3]) {
        for &c in value {
            self.write_coord(c);
        }
    }

    pub fn read_vector_coord(&mut self) -> [f32; 3] {
        [self.read_coord(), self.read_coord(), self.read_coord()]
    }
}

impl<S: MessageStream> Drop for Msg<'_, S> {
    fn drop(&mut self) {
        self.flush();
    }
}
