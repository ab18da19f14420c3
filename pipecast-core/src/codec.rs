//! Stream framer for the `Header || Body` wire format.
//!
//! [`StreamCodec`] is a two-state machine over the framed transport's
//! receive buffer. It yields a [`StreamItem::Header`] as soon as a full
//! header is buffered and a [`StreamItem::Body`] once the declared NV12
//! body is complete, so header side effects (pipe registration, FPS)
//! happen at header time exactly as the bytes allow. The output does not
//! depend on how the byte stream was chunked.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::control::ControlCommand;
use crate::error::PipecastError;
use crate::header::{HEADER_SIZE, Header};

// ── StreamItem ───────────────────────────────────────────────────

/// Frame description extracted from a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    pub pipe_id: u32,
    pub frame_id: u32,
    pub width: u32,
    pub height: u32,
    /// Body length the header implies: `width * height * 3 / 2`.
    pub body_len: usize,
    pub header: Header,
}

impl FrameMeta {
    pub fn from_header(header: Header) -> Self {
        let width = header.frame_width();
        let height = header.frame_height();
        Self {
            pipe_id: header.pipe_id(),
            frame_id: header.frame_id(),
            width,
            height,
            body_len: body_len(width, height),
            header,
        }
    }
}

/// Body length for an NV12 frame, saturating on absurd geometry.
pub fn body_len(width: u32, height: u32) -> usize {
    (width as u128 * height as u128 * 3 / 2).try_into().unwrap_or(usize::MAX)
}

/// One unit of decoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Header(FrameMeta),
    /// Exactly `body_len` bytes of the preceding header's frame.
    Body(Bytes),
}

// ── StreamCodec ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecodeState {
    #[default]
    AwaitingHeader,
    AwaitingBody {
        len: usize,
    },
}

/// Decoder for inbound frames, encoder for outbound control commands.
#[derive(Debug, Default)]
pub struct StreamCodec {
    state: DecodeState,
    max_body: Option<usize>,
}

impl StreamCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject headers whose body would exceed `max` bytes.
    ///
    /// Without a cap a corrupt header parks the decoder until enough bytes
    /// arrive, however many that is.
    pub fn with_max_body(mut self, max: Option<usize>) -> Self {
        self.max_body = max;
        self
    }

    /// `true` while a header has been consumed but its body has not.
    pub fn awaiting_body(&self) -> bool {
        matches!(self.state, DecodeState::AwaitingBody { .. })
    }

    /// Bytes still required before the next item can be produced.
    pub fn needed(&self, buffered: usize) -> usize {
        let want = match self.state {
            DecodeState::AwaitingHeader => HEADER_SIZE,
            DecodeState::AwaitingBody { len } => len,
        };
        want.saturating_sub(buffered)
    }

    /// Return to `AwaitingHeader`, forgetting any half-read frame.
    pub fn reset(&mut self) {
        self.state = DecodeState::AwaitingHeader;
    }
}

impl Decoder for StreamCodec {
    type Item = StreamItem;
    type Error = PipecastError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.state {
            DecodeState::AwaitingHeader => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let raw = src.split_to(HEADER_SIZE);
                let meta = FrameMeta::from_header(Header::decode(&raw));

                if let Some(max) = self.max_body {
                    if meta.body_len > max {
                        return Err(PipecastError::BodyTooLarge {
                            size: meta.body_len,
                            max,
                        });
                    }
                }

                debug!(
                    pipe = meta.pipe_id,
                    frame = meta.frame_id,
                    width = meta.width,
                    height = meta.height,
                    body_len = meta.body_len,
                    "header"
                );
                self.state = DecodeState::AwaitingBody { len: meta.body_len };
                src.reserve(meta.body_len.min(64 * 1024 * 1024));
                Ok(Some(StreamItem::Header(meta)))
            }
            DecodeState::AwaitingBody { len } => {
                if src.len() < len {
                    trace!(buffered = src.len(), needed = len, "waiting for body");
                    return Ok(None);
                }
                let body = src.split_to(len).freeze();
                self.state = DecodeState::AwaitingHeader;
                Ok(Some(StreamItem::Body(body)))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if !src.is_empty() || self.awaiting_body() {
            debug!(buffered = src.len(), "stream ended mid-frame; discarding");
            src.clear();
        }
        self.reset();
        Ok(None)
    }
}

impl Encoder<ControlCommand> for StreamCodec {
    type Error = PipecastError;

    fn encode(&mut self, item: ControlCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
