//! Bit-level codec: packs fixed-width fields into a byte stream through a
//! small scratch buffer.
//!
//! Bits are laid out LSB-first within each byte: bit `k` of the stream lives
//! at byte `k >> 3`, position `k & 7`, the legacy layout both endpoints
//! agree on. Values are emitted low bit first, raw bit pattern, no
//! variable-length tricks: wire compatibility requires the exact legacy
//! layout for every width from 1 to 32 bits.
//!
//! The scratch buffer holds not-yet-flushed bits. Encoding flushes it to the
//! stream as whole bytes whenever it fills and restarts at offset 0; decoding
//! refills it from the stream when exhausted. Reads past the end of the
//! stream yield zero bits; corrupt or truncated input degrades, it never
//! errors.

use crate::stream::MessageStream;

/// Size of the serializer scratch buffer in bytes.
pub const SCRATCH_SIZE: usize = 16;

/// Pack the low `bit_count` bits of `value` into `scratch` at `*bit`,
/// flushing to `stream` each time the scratch fills.
///
/// A negative `bit_count` is normalized to its magnitude. Unchecked
/// precondition: `bit_count <= 8 * scratch.len()`.
pub fn encode_bits(
    value: u32,
    bit_count: i32,
    bit: &mut usize,
    stream: &mut impl MessageStream,
    scratch: &mut [u8],
) {
    let bits = bit_count.unsigned_abs() as usize;
    for i in 0..bits {
        if *bit == scratch.len() * 8 {
            stream.write(scratch);
            *bit = 0;
        }
        // each byte is zeroed when its first bit lands in it
        if *bit & 7 == 0 {
            scratch[*bit >> 3] = 0;
        }
        scratch[*bit >> 3] |= (((value >> i) & 1) as u8) << (*bit & 7);
        *bit += 1;
    }
}

/// Exact mirror of [`encode_bits`]: unpack `bit_count` bits from `scratch`,
/// refilling from `stream` when the scratch is exhausted.
pub fn decode_bits(
    bit_count: i32,
    bit: &mut usize,
    stream: &mut impl MessageStream,
    scratch: &mut [u8],
) -> u32 {
    let bits = bit_count.unsigned_abs() as usize;
    let mut value = 0u32;
    for i in 0..bits {
        if *bit == scratch.len() * 8 {
            fill(bit, stream, scratch);
        }
        let b = (scratch[*bit >> 3] >> (*bit & 7)) & 1;
        value |= (b as u32) << i;
        *bit += 1;
    }
    value
}

/// Write any pending scratch bits to `stream` as whole bytes and reset the
/// offset to 0. Called at the end of a write pass.
pub fn flush(bit: &mut usize, stream: &mut impl MessageStream, scratch: &[u8]) {
    if *bit > 0 {
        let sz = ((*bit + 7) & !7) >> 3;
        stream.write(&scratch[..sz]);
        *bit = 0;
    }
}

/// Refill `scratch` from `stream` for a read pass, zero-extending past the
/// end of the stream, and reset the offset to 0.
pub fn fill(bit: &mut usize, stream: &mut impl MessageStream, scratch: &mut [u8]) {
    let n = stream.read(scratch);
    scratch[n..].fill(0);
    *bit = 0;
}
