//! # pipecast-core
//!
//! Client-side core for streams of raw NV12 frames multiplexed from
//! several capture pipes over one TCP connection.
//!
//! This crate contains:
//! - **Header codec**: `Header`, the fixed 80-byte wire header
//! - **Stream framer**: `StreamCodec` for `Header || Body` reassembly via `tokio_util`
//! - **Pipe registry**: `PipeRegistry` / `PipeState`, per-pipe bookkeeping
//! - **Frame rate**: `FrameRateTracker`, instantaneous FPS per pipe
//! - **Colour**: `nv12_to_rgb` producing `RgbImage`
//! - **Control**: `ControlCommand` start/stop messages
//! - **Monitor**: `PipeMonitor`, applies decoded items and publishes `MonitorEvent`s
//! - **Session**: `StreamClient`, the TCP connection lifecycle
//! - **Error**: `PipecastError` / `ConvertError`, `thiserror`-based

pub mod codec;
pub mod color;
pub mod control;
pub mod error;
pub mod event;
pub mod fps;
pub mod header;
pub mod image_id;
pub mod monitor;
pub mod registry;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{FrameMeta, StreamCodec, StreamItem};
pub use color::{RgbImage, nv12_to_rgb};
pub use control::{ControlCommand, TransferConfig};
pub use error::{ConvertError, PipecastError};
pub use event::{EventBus, FrameInfo, MonitorEvent};
pub use fps::FrameRateTracker;
pub use header::{HEADER_SIZE, Header};
pub use image_id::parse_image_id;
pub use monitor::PipeMonitor;
pub use registry::{PipeRegistry, PipeState};
pub use session::{SessionConfig, SessionEnd, SharedMonitor, StreamClient, shared_monitor};
