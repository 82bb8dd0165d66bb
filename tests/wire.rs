//! Cross-module wire format tests: compressed payload framing, the string
//! cipher as seen on the wire, and keyed delta obfuscation, all through the
//! public API.

use moh_proto::compress::CompressedMessage;
use moh_proto::{DynamicStream, MessageStream, Msg, MsgMode};

fn compress_tail(text: &[u8], offset: usize) -> Vec<u8> {
    let mut input = DynamicStream::from_vec(text.to_vec());
    let mut output = DynamicStream::new();
    output.write(&text[..offset]);
    CompressedMessage::new(&mut input, &mut output).compress(offset, text.len() - offset);
    output.into_vec()
}

fn decompress_tail(wire: &[u8], offset: usize, bound: usize) -> Vec<u8> {
    let mut input = DynamicStream::from_vec(wire.to_vec());
    let mut output = DynamicStream::new();
    CompressedMessage::new(&mut input, &mut output).decompress(offset, bound);
    output.into_vec()
}

#[test]
fn connect_style_payload_roundtrips() {
    let text = b"connect  \"\\challenge\\42\\version\\1.11\\protocol\\8\\qport\\27901\\name\\newbie\"";
    let wire = compress_tail(text, 8);

    // prefix stays verbatim, then the 16-bit big-endian original byte count
    assert_eq!(&wire[..8], b"connect ");
    let tail_len = text.len() - 8;
    assert_eq!(wire[8] as usize, tail_len >> 8);
    assert_eq!(wire[9] as usize, tail_len & 0xff);

    let recovered = decompress_tail(&wire, 8, 2048);
    assert_eq!(recovered, &text[8..]);
}

#[test]
fn compression_is_deterministic() {
    let text = b"connect  \"\\name\\player one\\rate\\25000\"";
    assert_eq!(compress_tail(text, 8), compress_tail(text, 8));
}

#[test]
fn truncated_compressed_payload_is_contained() {
    let text = b"connect  \"\\name\\somebody\\snaps\\20\"";
    let wire = compress_tail(text, 8);

    // cut the huffman stream short; the decoder must clamp and terminate
    let cut = &wire[..wire.len() - 6];
    let recovered = decompress_tail(cut, 8, 2048);
    assert!(recovered.len() <= text.len() - 8);
    assert_eq!(recovered.last(), Some(&0), "NUL terminator on truncation");
}

#[test]
fn scrambled_string_differs_on_the_wire() {
    let mut plain = DynamicStream::new();
    {
        let mut msg = Msg::new(&mut plain, MsgMode::Writing);
        msg.write_string("maps/dm/mohdm1.bsp");
    }
    let mut scrambled = DynamicStream::new();
    {
        let mut msg = Msg::new(&mut scrambled, MsgMode::Writing);
        msg.write_scrambled_string("maps/dm/mohdm1.bsp");
    }

    let plain = plain.into_vec();
    let scrambled = scrambled.into_vec();
    assert_eq!(plain.len(), scrambled.len());
    assert_ne!(plain, scrambled);
    // the scrambled terminator is the code that decodes to NUL, not NUL
    assert_eq!(plain.last(), Some(&0));
    assert_eq!(scrambled.last(), Some(&254));

    let mut stream = DynamicStream::from_vec(scrambled);
    stream.seek(0);
    let mut msg = Msg::new(&mut stream, MsgMode::Reading);
    assert_eq!(msg.read_scrambled_string(), "maps/dm/mohdm1.bsp");
}

#[test]
fn keyed_delta_needs_the_matching_key() {
    let baseline = [0u8; 4];
    let mut field = 0x00c0ffeeu32.to_le_bytes();

    let mut stream = DynamicStream::new();
    {
        let mut msg = Msg::new(&mut stream, MsgMode::Writing);
        msg.serialize_delta_key(&baseline, &mut field, 0x77, 32);
    }

    stream.seek(0);
    let mut good = [0u8; 4];
    {
        let mut msg = Msg::new(&mut stream, MsgMode::Reading);
        msg.serialize_delta_key(&baseline, &mut good, 0x77, 32);
    }
    assert_eq!(good, 0x00c0ffeeu32.to_le_bytes());

    stream.seek(0);
    let mut bad = [0u8; 4];
    {
        let mut msg = Msg::new(&mut stream, MsgMode::Reading);
        msg.serialize_delta_key(&baseline, &mut bad, 0x78, 32);
    }
    assert_ne!(bad, 0x00c0ffeeu32.to_le_bytes());
}
