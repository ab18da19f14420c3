//! Fixed-size binary header that precedes every message on the wire.
//!
//! ## Wire format
//!
//! Twenty little-endian `u32` words, 80 bytes total:
//! ```text
//! offset  field
//!  0..16  sync[4]        sentinel words (not validated)
//! 16..20  crc            not validated
//! 20..24  len
//! 24..28  data_type      DataType
//! 28..32  format         PixelFormat
//! 32..56  metadata[6]    picture info (or uninterpreted)
//! 56..68  packinfo[3]    receive / send addressing (or uninterpreted)
//! 68..72  chip_version
//! 72..76  plugin_id
//! 76..80  reserved
//! ```
//!
//! The codec is a pure layout transform: encoding a decoded header gives
//! back the exact input bytes, whatever the discriminants say.

use std::fmt;

use crate::error::PipecastError;

/// Size of an encoded [`Header`] in bytes.
pub const HEADER_SIZE: usize = 80;

const METADATA_WORDS: usize = 6;
const PACKINFO_WORDS: usize = 3;

pub type HeaderBytes = [u8; HEADER_SIZE];

// ── DataType ─────────────────────────────────────────────────────

/// Payload discriminant carried in the header's `data_type` word.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Raw sensor data.
    Raw = 0,
    /// Processed YUV (NV12) frames.
    Yuv = 1,
    /// Transfer control (start/stop stream).
    Control = 13,
}

impl TryFrom<u32> for DataType {
    type Error = PipecastError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Raw),
            1 => Ok(DataType::Yuv),
            13 => Ok(DataType::Control),
            _ => Err(PipecastError::UnknownVariant {
                type_name: "DataType",
                value: value as u64,
            }),
        }
    }
}

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout named by the header's `format` word.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Sbggr8 = 0,
    Sgbrg8,
    Sgrbg8,
    Srggb8,
    Sbggr10,
    Sgbrg10,
    Sgrbg10,
    Srggb10,
    Sbggr12,
    Sgbrg12,
    Sgrbg12,
    Srggb12,
    Nv12,
    Rgb565,
}

impl TryFrom<u32> for PixelFormat {
    type Error = PipecastError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use PixelFormat::*;
        const ALL: [PixelFormat; 14] = [
            Sbggr8, Sgbrg8, Sgrbg8, Srggb8, Sbggr10, Sgbrg10, Sgrbg10, Srggb10, Sbggr12, Sgbrg12,
            Sgrbg12, Srggb12, Nv12, Rgb565,
        ];
        ALL.get(value as usize)
            .copied()
            .ok_or(PipecastError::UnknownVariant {
                type_name: "PixelFormat",
                value: value as u64,
            })
    }
}

// ── PictureInfo ──────────────────────────────────────────────────

/// Picture-info view of the metadata union.
///
/// Slot order on the wire is `stride, height, width, frame_plane,
/// code_type, pipe_info`. The frame geometry used for body sizing is
/// `stride` x `height`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PictureInfo {
    pub stride: u32,
    pub height: u32,
    pub width: u32,
    /// Frame plane / sensor mode.
    pub frame_plane: u32,
    pub code_type: u32,
    pub pipe_info: u32,
}

impl PictureInfo {
    fn from_words(w: [u32; METADATA_WORDS]) -> Self {
        Self {
            stride: w[0],
            height: w[1],
            width: w[2],
            frame_plane: w[3],
            code_type: w[4],
            pipe_info: w[5],
        }
    }

    fn to_words(self) -> [u32; METADATA_WORDS] {
        [
            self.stride,
            self.height,
            self.width,
            self.frame_plane,
            self.code_type,
            self.pipe_info,
        ]
    }
}

/// Metadata union, keyed by [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metadata {
    /// Picture description for raw / YUV frames.
    Picture(PictureInfo),
    /// Register, calibration or API payloads this client does not read.
    Uninterpreted([u32; METADATA_WORDS]),
}

impl Metadata {
    fn words(&self) -> [u32; METADATA_WORDS] {
        match self {
            Metadata::Picture(p) => p.to_words(),
            Metadata::Uninterpreted(w) => *w,
        }
    }

    /// Reads the union as picture info regardless of the variant.
    pub fn picture_info(&self) -> PictureInfo {
        match self {
            Metadata::Picture(p) => *p,
            Metadata::Uninterpreted(w) => PictureInfo::from_words(*w),
        }
    }
}

// ── PackInfo ─────────────────────────────────────────────────────

/// Addressing for frames travelling from the peer to us.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveInfo {
    pub pipe_id: u32,
    pub channel_id: u32,
    pub frame_id: u32,
}

/// Addressing for messages we send to the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendInfo {
    pub pipe_id: u32,
    pub direction: u32,
    pub count_id: u32,
}

/// Pack-info union, keyed by [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackInfo {
    Receive(ReceiveInfo),
    Send(SendInfo),
    Uninterpreted([u32; PACKINFO_WORDS]),
}

impl PackInfo {
    fn words(&self) -> [u32; PACKINFO_WORDS] {
        match self {
            PackInfo::Receive(r) => [r.pipe_id, r.channel_id, r.frame_id],
            PackInfo::Send(s) => [s.pipe_id, s.direction, s.count_id],
            PackInfo::Uninterpreted(w) => *w,
        }
    }

    /// Reads the union as receive info regardless of the variant.
    pub fn receive_info(&self) -> ReceiveInfo {
        let w = self.words();
        ReceiveInfo {
            pipe_id: w[0],
            channel_id: w[1],
            frame_id: w[2],
        }
    }
}

// ── Header ───────────────────────────────────────────────────────

/// One decoded message header.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sync: [u32; 4],
    pub crc: u32,
    pub len: u32,
    pub data_type: u32,
    pub format: u32,
    pub metadata: Metadata,
    pub packinfo: PackInfo,
    pub chip_version: u32,
    pub plugin_id: u32,
    pub reserved: u32,
}

fn word(bytes: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl Header {
    /// Decode the first [`HEADER_SIZE`] bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`HEADER_SIZE`]. Use
    /// [`try_decode`](Self::try_decode) when the length is not known.
    pub fn decode(bytes: &[u8]) -> Self {
        assert!(
            bytes.len() >= HEADER_SIZE,
            "header decode needs {HEADER_SIZE} bytes, got {}",
            bytes.len()
        );

        let data_type = word(bytes, 6);
        let meta_words: [u32; METADATA_WORDS] = std::array::from_fn(|i| word(bytes, 8 + i));
        let pack_words: [u32; PACKINFO_WORDS] = std::array::from_fn(|i| word(bytes, 14 + i));

        let (metadata, packinfo) = match DataType::try_from(data_type) {
            Ok(DataType::Raw | DataType::Yuv) => (
                Metadata::Picture(PictureInfo::from_words(meta_words)),
                PackInfo::Receive(ReceiveInfo {
                    pipe_id: pack_words[0],
                    channel_id: pack_words[1],
                    frame_id: pack_words[2],
                }),
            ),
            Ok(DataType::Control) => (
                Metadata::Uninterpreted(meta_words),
                PackInfo::Send(SendInfo {
                    pipe_id: pack_words[0],
                    direction: pack_words[1],
                    count_id: pack_words[2],
                }),
            ),
            Err(_) => (
                Metadata::Uninterpreted(meta_words),
                PackInfo::Uninterpreted(pack_words),
            ),
        };

        Self {
            sync: [word(bytes, 0), word(bytes, 1), word(bytes, 2), word(bytes, 3)],
            crc: word(bytes, 4),
            len: word(bytes, 5),
            data_type,
            format: word(bytes, 7),
            metadata,
            packinfo,
            chip_version: word(bytes, 17),
            plugin_id: word(bytes, 18),
            reserved: word(bytes, 19),
        }
    }

    /// Checked variant of [`decode`](Self::decode).
    pub fn try_decode(bytes: &[u8]) -> Result<Self, PipecastError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PipecastError::ShortHeader {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self::decode(bytes))
    }

    /// Serialize to the exact wire layout.
    pub fn encode(&self) -> HeaderBytes {
        let mut words = [0u32; HEADER_SIZE / 4];
        words[0..4].copy_from_slice(&self.sync);
        words[4] = self.crc;
        words[5] = self.len;
        words[6] = self.data_type;
        words[7] = self.format;
        words[8..14].copy_from_slice(&self.metadata.words());
        words[14..17].copy_from_slice(&self.packinfo.words());
        words[17] = self.chip_version;
        words[18] = self.plugin_id;
        words[19] = self.reserved;

        let mut buf: HeaderBytes = [0; HEADER_SIZE];
        for (chunk, w) in buf.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&w.to_le_bytes());
        }
        buf
    }

    /// Frame width in pixels, as the stream uses it (the `stride` slot).
    pub fn frame_width(&self) -> u32 {
        self.metadata.picture_info().stride
    }

    /// Frame height in pixels.
    pub fn frame_height(&self) -> u32 {
        self.metadata.picture_info().height
    }

    pub fn pipe_id(&self) -> u32 {
        self.packinfo.receive_info().pipe_id
    }

    pub fn frame_id(&self) -> u32 {
        self.packinfo.receive_info().frame_id
    }

    /// Typed view of `data_type`, if it is a known value.
    pub fn kind(&self) -> Option<DataType> {
        DataType::try_from(self.data_type).ok()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("len", &self.len)
            .field("data_type", &self.data_type)
            .field("format", &self.format)
            .field("metadata", &self.metadata)
            .field("packinfo", &self.packinfo)
            .field("crc", &self.crc)
            .finish()
    }
}

/// Build a YUV frame header with the given geometry and addressing.
///
/// Mostly useful for peers and tests; width goes into the `stride` slot.
pub fn frame_header(pipe_id: u32, frame_id: u32, width: u32, height: u32) -> Header {
    Header {
        sync: [0; 4],
        crc: 0,
        len: width.wrapping_mul(height).wrapping_mul(3) / 2,
        data_type: DataType::Yuv as u32,
        format: PixelFormat::Nv12 as u32,
        metadata: Metadata::Picture(PictureInfo {
            stride: width,
            height,
            width,
            ..PictureInfo::default()
        }),
        packinfo: PackInfo::Receive(ReceiveInfo {
            pipe_id,
            channel_id: 0,
            frame_id,
        }),
        chip_version: 0,
        plugin_id: 0,
        reserved: 0,
    }
}

// ── Tests ────────────────────────────────────────────────────────
