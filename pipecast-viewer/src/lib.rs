//! # pipecast-viewer: headless stream viewer
//!
//! Connects to a capture peer, keeps the per-pipe state current through
//! `pipecast-core`, and reports pipe activity as log lines and a periodic
//! summary. Rendering the decoded images is left to a UI layer built on
//! [`PipeMonitor::image_for`](pipecast_core::PipeMonitor::image_for).

pub mod config;
pub mod logging;
pub mod report;
