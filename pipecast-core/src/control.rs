//! Start/stop commands sent to the capture peer.
//!
//! Each command is an 80-byte [`Header`] (`len = 24`, `data_type = 13`)
//! followed by a 24-byte [`TransferConfig`]. The peer compares these
//! bytes literally, so the values below are fixed.
//!
//! ## TransferConfig wire format (24 bytes, little-endian)
//! ```text
//!  0  tcp_open        u8
//!  1  raw_enable      u8
//!  2  yuv_enable      u8
//!  3  jpeg_enable     u8
//!  4  isp_enable      u8
//!  5  video_enable    u8
//!  6  ack_enable      u8
//!  7  reserved        u8
//!  8  bitstream       u16
//! 10  frame_interval  u16
//! 12  pipe_line       u16
//! 14  channel_id      u16
//! 16  param[2]        u32 x 2
//! ```

use std::fmt;

use crate::header::{DataType, HEADER_SIZE, Header, Metadata, PackInfo, SendInfo};

/// Size of an encoded [`TransferConfig`].
pub const TRANSFER_CONFIG_SIZE: usize = 24;

/// Size of a complete encoded control command.
pub const CONTROL_MESSAGE_SIZE: usize = HEADER_SIZE + TRANSFER_CONFIG_SIZE;

const TRANSFER_API_START: u32 = 0x0001;
const TRANSFER_API_STOP: u32 = 0x0002;

// ── TransferConfig ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferConfig {
    pub tcp_open: u8,
    pub raw_enable: u8,
    pub yuv_enable: u8,
    pub jpeg_enable: u8,
    pub isp_enable: u8,
    pub video_enable: u8,
    pub ack_enable: u8,
    pub reserved: u8,
    pub bitstream: u16,
    pub frame_interval: u16,
    pub pipe_line: u16,
    pub channel_id: u16,
    pub param: [u32; 2],
}

impl TransferConfig {
    /// Enables TCP delivery of raw and YUV frames.
    pub const START: Self = Self {
        tcp_open: 1,
        raw_enable: 1,
        yuv_enable: 1,
        jpeg_enable: 0,
        isp_enable: 0,
        video_enable: 0,
        ack_enable: 0,
        reserved: 0,
        bitstream: 0,
        frame_interval: 1,
        pipe_line: 0,
        channel_id: 0,
        param: [0, 0],
    };

    /// Everything off.
    pub const STOP: Self = Self {
        tcp_open: 0,
        raw_enable: 0,
        yuv_enable: 0,
        jpeg_enable: 0,
        isp_enable: 0,
        video_enable: 0,
        ack_enable: 0,
        reserved: 0,
        bitstream: 0,
        frame_interval: 0,
        pipe_line: 0,
        channel_id: 0,
        param: [0, 0],
    };

    pub fn encode(&self) -> [u8; TRANSFER_CONFIG_SIZE] {
        let mut buf = [0u8; TRANSFER_CONFIG_SIZE];
        buf[0..8].copy_from_slice(&[
            self.tcp_open,
            self.raw_enable,
            self.yuv_enable,
            self.jpeg_enable,
            self.isp_enable,
            self.video_enable,
            self.ack_enable,
            self.reserved,
        ]);
        buf[8..10].copy_from_slice(&self.bitstream.to_le_bytes());
        buf[10..12].copy_from_slice(&self.frame_interval.to_le_bytes());
        buf[12..14].copy_from_slice(&self.pipe_line.to_le_bytes());
        buf[14..16].copy_from_slice(&self.channel_id.to_le_bytes());
        buf[16..20].copy_from_slice(&self.param[0].to_le_bytes());
        buf[20..24].copy_from_slice(&self.param[1].to_le_bytes());
        buf
    }
}

// ── ControlCommand ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Ask the peer to start streaming.
    Start,
    /// Ask the peer to stop streaming.
    Stop,
}

impl ControlCommand {
    pub fn header(self) -> Header {
        let api = match self {
            ControlCommand::Start => TRANSFER_API_START,
            ControlCommand::Stop => TRANSFER_API_STOP,
        };
        Header {
            sync: [0; 4],
            crc: 0,
            len: TRANSFER_CONFIG_SIZE as u32,
            data_type: DataType::Control as u32,
            format: 0,
            metadata: Metadata::Uninterpreted([api, 0, 0, 0, 0, 0]),
            packinfo: PackInfo::Send(SendInfo {
                pipe_id: 0,
                direction: 1,
                count_id: 1,
            }),
            chip_version: 0,
            plugin_id: 0,
            reserved: 0,
        }
    }

    pub fn transfer_config(self) -> TransferConfig {
        match self {
            ControlCommand::Start => TransferConfig::START,
            ControlCommand::Stop => TransferConfig::STOP,
        }
    }

    /// The full wire message: header followed by transfer config.
    pub fn to_bytes(self) -> [u8; CONTROL_MESSAGE_SIZE] {
        let mut buf = [0u8; CONTROL_MESSAGE_SIZE];
        buf[..HEADER_SIZE].copy_from_slice(&self.header().encode());
        buf[HEADER_SIZE..].copy_from_slice(&self.transfer_config().encode());
        buf
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Start => write!(f, "start"),
            ControlCommand::Stop => write!(f, "stop"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
