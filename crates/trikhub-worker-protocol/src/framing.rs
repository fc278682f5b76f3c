//! Newline-delimited JSON framing over a worker's stdio pipes.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::message::RpcMessage;

/// Maximum single-line frame size. Guards against a misbehaving worker
/// writing an unbounded line and exhausting memory.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// A [`tokio_util::codec::Decoder`]/[`Encoder`] pair that reads and
/// writes one [`RpcMessage`] per newline-delimited line.
#[derive(Debug, Default)]
pub struct RpcCodec {
    lines: LinesCodec,
}

impl RpcCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_FRAME_BYTES),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RpcCodecError {
    #[error("line framing error: {0}")]
    Framing(#[from] LinesCodecError),
    #[error("malformed JSON-RPC frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Decoder for RpcCodec {
    type Item = RpcMessage;
    type Error = RpcCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.lines.decode(src)? {
            Some(line) if line.trim().is_empty() => self.decode(src),
            Some(line) => Ok(Some(serde_json::from_str(&line)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<RpcMessage> for RpcCodec {
    type Error = RpcCodecError;

    fn encode(&mut self, item: RpcMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&item)?;
        self.lines.encode(line, dst)?;
        Ok(())
    }
}

/// Advance past leading whitespace-only bytes; used by callers that
/// pre-buffer raw reads before handing them to the codec.
pub fn skip_leading_blank_lines(buf: &mut BytesMut) {
    while buf.first().is_some_and(u8::is_ascii_whitespace) {
        buf.advance(1);
    }
}
