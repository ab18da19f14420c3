//! Change notifications published to the presentation layer.

use tokio::sync::broadcast;

/// Default capacity of the event channel.
pub const EVENT_CAPACITY: usize = 256;

/// Pipe, frame and rate of the most recently parsed header.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    pub pipe_id: u32,
    pub frame_id: u32,
    pub fps: f64,
}

/// Something observable changed. Each event is sent only when the
/// underlying value actually changed.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    ConnectionChanged(bool),
    StatusChanged(String),
    /// The ordered set of active pipe ids changed.
    PipeSetChanged(Vec<u32>),
    /// The image stored for this pipe was replaced or cleared.
    ImageChanged(u32),
    FrameInfoChanged(FrameInfo),
}

/// Sending half of the event channel.
///
/// Sends never fail: with no subscribers the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
