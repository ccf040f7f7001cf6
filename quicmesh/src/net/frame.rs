//! Length-prefixed JSON frame codec (QUIC path) and frame normalisation.
//!
//! Every message on a QUIC stream is a little-endian signed 64-bit length
//! followed by that many bytes of UTF-8 JSON. WebTransport sessions skip
//! this entirely (one datagram is one frame); see [`crate::net::transport`].

use bytes::{Buf, BytesMut};
use serde_json::Value;

use super::Error;

const LEN_PREFIX: usize = 8;

/// Encode one frame for the QUIC wire: `i64` length prefix + JSON body.
pub fn encode(frame: &Value) -> Result<Vec<u8>, Error> {
    let body = serde_json::to_vec(frame)?;
    let mut buf = Vec::with_capacity(LEN_PREFIX + body.len());
    buf.extend_from_slice(&(body.len() as i64).to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Incremental decoder for the QUIC length-prefixed frame stream.
///
/// Bytes arrive in arbitrary chunks (zero, one, or many logical frames per
/// read); [`Decoder::push`] reassembles them and [`Decoder::next_frame`]
/// drains whatever complete frames are currently buffered.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: BytesMut,
    max_frame_len: usize,
}

impl Decoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Append newly-received bytes to the reassembly buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Try to parse one complete frame out of the buffer, per §4.1's
    /// receive-path algorithm. Returns `Ok(None)` when more bytes are
    /// needed; callers loop until that happens.
    pub fn next_frame(&mut self) -> Result<Option<Value>, Error> {
        if self.buffer.len() < LEN_PREFIX {
            return Ok(None);
        }

        let len = i64::from_le_bytes(self.buffer[..LEN_PREFIX].try_into().unwrap());
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }
        if len as usize > self.max_frame_len {
            return Err(Error::FrameTooLarge(len, self.max_frame_len));
        }

        let total = LEN_PREFIX + len as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        self.buffer.advance(LEN_PREFIX);
        let body = self.buffer.split_to(len as usize);
        let value: Value = serde_json::from_slice(&body)?;
        Ok(Some(value))
    }

    /// Drain every complete frame currently buffered.
    pub fn drain(&mut self) -> Result<Vec<Value>, Error> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Parse a single WebTransport datagram body (no length prefix) into a
/// frame, rejecting anything that isn't a JSON object.
pub fn decode_datagram(bytes: &[u8]) -> Result<Value, Error> {
    let value: Value = serde_json::from_slice(bytes)?;
    if !value.is_object() {
        return Err(Error::NotAnObject);
    }
    Ok(value)
}

/// Normalise a frame before handler dispatch: every string value has NUL
/// bytes and single quotes replaced by a space, walked recursively through
/// objects and arrays. Hardens against later string concatenation into
/// persistence queries.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect())
        }
        other => other,
    }
}

fn sanitize_str(s: &str) -> String {
    s.chars()
        .map(|c| if c == '\0' || c == '\'' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_round_trip() {
        let frame = json!({"requestType": 1, "accountId": "a"});
        let bytes = encode(&frame).unwrap();

        let mut decoder = Decoder::new(16 * 1024 * 1024);
        decoder.push(&bytes);
        assert_eq!(decoder.next_frame().unwrap(), Some(frame));
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn test_multiple_frames_one_chunk() {
        let frames = vec![json!({"requestType": 0}), json!({"requestType": 1})];
        let mut bytes = Vec::new();
        for frame in &frames {
            bytes.extend(encode(frame).unwrap());
        }

        let mut decoder = Decoder::new(16 * 1024 * 1024);
        decoder.push(&bytes);
        assert_eq!(decoder.drain().unwrap(), frames);
    }

    #[test]
    fn test_byte_at_a_time_chunking() {
        let frames = vec![
            json!({"requestType": 0, "a": 1}),
            json!({"requestType": 1, "b": [1, 2, 3]}),
            json!({"requestType": 2}),
        ];
        let mut bytes = Vec::new();
        for frame in &frames {
            bytes.extend(encode(frame).unwrap());
        }

        let mut decoder = Decoder::new(16 * 1024 * 1024);
        let mut received = Vec::new();
        for byte in bytes {
            decoder.push(&[byte]);
            received.extend(decoder.drain().unwrap());
        }

        assert_eq!(received, frames);
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut decoder = Decoder::new(16 * 1024 * 1024);
        decoder.push(&(-1i64).to_le_bytes());
        assert!(matches!(
            decoder.next_frame(),
            Err(Error::NegativeLength(-1))
        ));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut decoder = Decoder::new(4);
        decoder.push(&(100i64).to_le_bytes());
        assert!(matches!(decoder.next_frame(), Err(Error::FrameTooLarge(100, 4))));
    }

    #[test]
    fn test_sanitize_strips_nul_and_quotes() {
        let value = json!({"name": "a\0b'c", "nested": {"x": ["o'k"]}});
        let sanitized = sanitize(value);
        assert_eq!(sanitized["name"], "a b c");
        assert_eq!(sanitized["nested"]["x"][0], "o k");
    }
}
