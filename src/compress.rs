//! Compressed message blocks.
//!
//! Wire layout: a 16-bit big-endian header holding the original byte count,
//! followed by the adaptive Huffman bitstream (NYT-prefixed raw byte on the
//! first occurrence of each symbol). Each [`CompressedMessage`] call owns a
//! fresh [`Huff`] pair of trees; compressor state is never shared across
//! calls.
//!
//! Decompression is deliberately lenient: a size header larger than the
//! caller's bound is clamped, and input that runs out early produces a single
//! NUL terminator instead of an error. Hostile or corrupt wire data is
//! contained locally, never propagated.

use crate::huffman::{get_bit, Huff, NYT};
use crate::stream::MessageStream;

/// Bit window the coder works through. Sized so the longest possible code
/// (tree depth plus a raw byte) fits between flushes.
const WINDOW: usize = 80;

/// Write out the whole bytes accumulated in `window`, keeping the trailing
/// partial byte at the front. Its upper bits are guaranteed zero because
/// every byte is zeroed when the first bit lands in it.
fn flush_window(bloc: &mut usize, out: &mut impl MessageStream, window: &mut [u8; WINDOW]) {
    let n = *bloc >> 3;
    if n > 0 {
        out.write(&window[..n]);
        window[0] = window[n];
        *bloc &= 7;
    }
}

/// Drop the consumed whole bytes from the front of `window` and refill the
/// tail from `input`. `valid` tracks how many bits of the window came from
/// real input (short refills only ever happen at end of stream).
fn read_window(
    bloc: &mut usize,
    input: &mut impl MessageStream,
    window: &mut [u8; WINDOW],
    valid: &mut usize,
) {
    let n = *bloc >> 3;
    if n > 0 {
        window.copy_within(n.., 0);
        let read = input.read(&mut window[WINDOW - n..]);
        window[WINDOW - n + read..].fill(0);
        *bloc &= 7;
        *valid = valid.saturating_sub(8 * n) + 8 * read;
    }
}

/// Compresses or decompresses one block between two streams.
pub struct CompressedMessage<'a, I: MessageStream, O: MessageStream> {
    input: &'a mut I,
    output: &'a mut O,
}

impl<'a, I: MessageStream, O: MessageStream> CompressedMessage<'a, I, O> {
    pub fn new(input: &'a mut I, output: &'a mut O) -> Self {
        Self { input, output }
    }

    /// Compress `len` bytes of the input starting at `offset` into the
    /// output. An empty input writes nothing, not even the header.
    pub fn compress(&mut self, offset: usize, len: usize) {
        let size = len.min(self.input.len().saturating_sub(offset));
        if size == 0 {
            return;
        }

        let mut huff = Huff::new();
        let mut window = [0u8; WINDOW];

        // original byte count, big endian
        window[0] = (size >> 8) as u8;
        window[1] = (size & 0xff) as u8;
        let mut bloc = 16;

        self.input.seek(offset);
        flush_window(&mut bloc, self.output, &mut window);

        let mut buffer = [0u8; 8];
        let mut done = 0;
        while done < size {
            let chunk = buffer.len().min(size - done);
            self.input.read(&mut buffer[..chunk]);
            for &ch in &buffer[..chunk] {
                huff.transmit(ch as usize, &mut window, &mut bloc);
                huff.add_ref(ch);
                flush_window(&mut bloc, self.output, &mut window);
            }
            done += chunk;
        }

        if bloc > 0 {
            // trailing partial byte
            self.output.write(&window[..(bloc >> 3) + 1]);
        }
    }

    /// Decompress the input starting at `offset` into the output, writing at
    /// most `len` bytes. The announced count is clamped to `len`; truncated
    /// input yields a NUL terminator and stops.
    pub fn decompress(&mut self, offset: usize, len: usize) {
        if self.input.len().saturating_sub(offset) == 0 {
            return;
        }

        let mut huff = Huff::new();
        self.input.seek(offset);

        let mut window = [0u8; WINDOW];
        let read0 = self.input.read(&mut window);
        let mut valid = 8 * read0;

        // don't overflow with bad messages
        let announced = (window[0] as usize) * 256 + window[1] as usize;
        let count = announced.min(len);
        let mut bloc = 16;

        self.output.seek(0);

        let mut buffer = [0u8; 8];
        let mut pos = 0;

        for _ in 0..count {
            read_window(&mut bloc, self.input, &mut window, &mut valid);

            if bloc >= valid {
                // ran out of real input bits: contain the damage
                if pos > 0 {
                    self.output.write(&buffer[..pos]);
                    pos = 0;
                }
                self.output.write(&[0]);
                break;
            }

            let mut ch = huff.receive(&window, &mut bloc);
            if ch == NYT {
                // first occurrence: the raw byte follows
                ch = 0;
                for _ in 0..8 {
                    ch = (ch << 1) + get_bit(&window, &mut bloc) as usize;
                }
            }

            buffer[pos] = ch as u8;
            huff.add_ref(ch as u8);

            pos += 1;
            if pos == buffer.len() {
                self.output.write(&buffer);
                pos = 0;
            }
        }

        if pos > 0 {
            self.output.write(&buffer[..pos]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DynamicStream;

    fn compress_bytes(data: &[u8]) -> Vec<u8> {
        let mut input = DynamicStream::from_vec(data.to_vec());
        let mut output = DynamicStream::new();
        CompressedMessage::new(&mut input, &mut output).compress(0, data.len());
        output.into_vec()
    }

    fn decompress_bytes(data: &[u8], len: usize) -> Vec<u8> {
        let mut input = DynamicStream::from_vec(data.to_vec());
        let mut output = DynamicStream::new();
        CompressedMessage::new(&mut input, &mut output).decompress(0, len);
        output.into_vec()
    }

    #[test]
    fn roundtrip_text() {
        let data = b"challenge 12345 challenge 12345 challenge 12345";
        let packed = compress_bytes(data);
        assert_eq!(decompress_bytes(&packed, data.len()), data);
    }

    #[test]
    fn roundtrip_all_zero() {
        let data = vec![0u8; 300];
        let packed = compress_bytes(&data);
        assert!(packed.len() < data.len());
        assert_eq!(decompress_bytes(&packed, data.len()), data);
    }

    #[test]
    fn roundtrip_all_distinct() {
        let data: Vec<u8> = (0u8..=255).collect();
        let packed = compress_bytes(&data);
        assert_eq!(decompress_bytes(&packed, data.len()), data);
    }

    #[test]
    fn header_is_big_endian_byte_count() {
        let data = vec![7u8; 0x0123];
        let packed = compress_bytes(&data);
        assert_eq!(packed[0], 0x01);
        assert_eq!(packed[1], 0x23);
    }

    #[test]
    fn empty_input_writes_nothing() {
        assert!(compress_bytes(&[]).is_empty());
    }

    #[test]
    fn announced_count_is_clamped_to_bound() {
        let data: Vec<u8> = (0u8..64).collect();
        let packed = compress_bytes(&data);
        let out = decompress_bytes(&packed, 16);
        assert_eq!(out, &data[..16]);
    }

    #[test]
    fn truncated_input_emits_terminator_and_stops() {
        let data = b"some reasonably long payload to compress for truncation";
        let packed = compress_bytes(data);
        let cut = &packed[..6];
        let out = decompress_bytes(cut, data.len());
        assert!(out.len() <= data.len());
        assert_eq!(out.last(), Some(&0), "terminator byte expected");
    }

    #[test]
    fn compress_respects_offset() {
        let mut raw = b"connect ".to_vec();
        raw.extend_from_slice(b"\\challenge\\12345\\qport\\20000");
        let payload_len = raw.len() - 8;

        let mut input = DynamicStream::from_vec(raw.clone());
        let mut output = DynamicStream::new();
        CompressedMessage::new(&mut input, &mut output).compress(8, payload_len);
        let packed = output.into_vec();

        assert_eq!(decompress_bytes(&packed, payload_len), &raw[8..]);
    }
}
