//! Pipe monitor: applies decoded stream items to per-pipe state.
//!
//! The monitor is the single owner of the [`PipeRegistry`] for a client.
//! It is driven synchronously, one [`StreamItem`] at a time, by whoever
//! owns the transport (see [`crate::session`]), and publishes
//! [`MonitorEvent`]s on an [`EventBus`].

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::codec::{FrameMeta, StreamItem};
use crate::color::{RgbImage, nv12_to_rgb};
use crate::event::{EventBus, FrameInfo, MonitorEvent};
use crate::image_id::parse_image_id;
use crate::registry::{PipeRegistry, PipeState};

const PREVIEW_BYTES: usize = 20;

/// Connection-scoped view of every pipe on the stream.
#[derive(Debug)]
pub struct PipeMonitor {
    registry: PipeRegistry,
    /// Header whose body is being assembled.
    pending: Option<FrameMeta>,
    connected: bool,
    status: String,
    frame_info: Option<FrameInfo>,
    current_image: Option<Arc<RgbImage>>,
    received_data: String,
    placeholder: Arc<RgbImage>,
    events: EventBus,
}

impl PipeMonitor {
    pub fn new() -> Self {
        Self::with_events(EventBus::new())
    }

    pub fn with_events(events: EventBus) -> Self {
        Self {
            registry: PipeRegistry::new(),
            pending: None,
            connected: false,
            status: "Disconnected".into(),
            frame_info: None,
            current_image: None,
            received_data: String::new(),
            placeholder: Arc::new(RgbImage::placeholder()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    // ── Stream input ─────────────────────────────────────────────

    /// Apply one decoded item; `now` is the arrival time used for FPS.
    pub fn apply(&mut self, item: StreamItem, now: Instant) {
        match item {
            StreamItem::Header(meta) => self.on_header(meta, now),
            StreamItem::Body(body) => self.on_body(body),
        }
    }

    fn on_header(&mut self, meta: FrameMeta, now: Instant) {
        let created = self
            .registry
            .upsert(meta.pipe_id, meta.frame_id, meta.width, meta.height);
        if created {
            debug!(pipe = meta.pipe_id, "new pipe");
            self.events
                .emit(MonitorEvent::PipeSetChanged(self.registry.active_ids().to_vec()));
        }

        let fps = self
            .registry
            .record_arrival(meta.pipe_id, now)
            .unwrap_or_default();

        self.set_frame_info(FrameInfo {
            pipe_id: meta.pipe_id,
            frame_id: meta.frame_id,
            fps,
        });
        self.set_status(format!(
            "Received header - pipe: {}, frame: {}, width: {}, height: {}, fps: {:.1}",
            meta.pipe_id, meta.frame_id, meta.width, meta.height, fps
        ));
        self.pending = Some(meta);
    }

    fn on_body(&mut self, body: Bytes) {
        let Some(meta) = self.pending.take() else {
            warn!(len = body.len(), "body without a header; dropped");
            return;
        };

        let mut info = format!("receive pipe: {}, Length: {}", meta.pipe_id, body.len());

        if meta.width == 0 || meta.height == 0 {
            debug!(
                pipe = meta.pipe_id,
                width = meta.width,
                height = meta.height,
                "invalid dimensions"
            );
            let _ = write!(info, "\nInvalid dimensions: {}x{}", meta.width, meta.height);
        } else {
            match nv12_to_rgb(&body, meta.width, meta.height) {
                Ok(image) => {
                    let image = Arc::new(image);
                    self.registry
                        .record_image(meta.pipe_id, Some(Arc::clone(&image)));
                    self.current_image = Some(image);
                    let fps = self.fps_for_pipe(meta.pipe_id);
                    let _ = write!(
                        info,
                        "\nImage converted: {}x{}, pipe: {}, frame: {}, fps: {:.1}",
                        meta.width, meta.height, meta.pipe_id, meta.frame_id, fps
                    );
                    self.events.emit(MonitorEvent::ImageChanged(meta.pipe_id));
                }
                Err(e) => {
                    warn!(pipe = meta.pipe_id, frame = meta.frame_id, "conversion failed: {e}");
                    let had_image = self.image_for_pipe(meta.pipe_id).is_some();
                    self.registry.record_image(meta.pipe_id, None);
                    if had_image {
                        self.events.emit(MonitorEvent::ImageChanged(meta.pipe_id));
                    }
                    info.push_str("\nImage conversion failed");
                }
            }
        }

        if !body.is_empty() {
            info.push_str("\nData preview: ");
            for b in body.iter().take(PREVIEW_BYTES) {
                let _ = write!(info, "{b:02x} ");
            }
        }
        self.received_data = info;
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            self.events.emit(MonitorEvent::ConnectionChanged(connected));
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        if self.status != status {
            self.status = status;
            self.events
                .emit(MonitorEvent::StatusChanged(self.status.clone()));
        }
    }

    fn set_frame_info(&mut self, info: FrameInfo) {
        if self.frame_info != Some(info) {
            self.frame_info = Some(info);
            self.events.emit(MonitorEvent::FrameInfoChanged(info));
        }
    }

    /// Drop every pipe and any half-assembled frame.
    pub fn reset(&mut self) {
        let had_pipes = !self.registry.is_empty();
        self.registry.reset();
        self.pending = None;
        if had_pipes {
            self.events.emit(MonitorEvent::PipeSetChanged(Vec::new()));
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn active_pipes(&self) -> &[u32] {
        self.registry.active_ids()
    }

    pub fn pipe(&self, pipe_id: u32) -> Option<&PipeState> {
        self.registry.get(pipe_id)
    }

    pub fn current_frame_info(&self) -> Option<FrameInfo> {
        self.frame_info
    }

    /// Latest successfully converted image on any pipe.
    pub fn current_image(&self) -> Option<Arc<RgbImage>> {
        self.current_image.clone()
    }

    /// Summary of the most recent body: pipe, length, outcome, hex preview.
    pub fn received_data(&self) -> &str {
        &self.received_data
    }

    pub fn image_for_pipe(&self, pipe_id: u32) -> Option<Arc<RgbImage>> {
        self.registry.get(pipe_id)?.image.clone()
    }

    pub fn frame_for_pipe(&self, pipe_id: u32) -> Option<u32> {
        self.registry.get(pipe_id)?.frame_id
    }

    pub fn fps_for_pipe(&self, pipe_id: u32) -> f64 {
        self.registry.get(pipe_id).map(PipeState::fps).unwrap_or(0.0)
    }

    /// Resolve a `pipe<N>/<suffix>` identifier.
    ///
    /// A known pipe without an image yields the 1x1 black placeholder. An
    /// identifier that does not name a pipe yields the current image, or
    /// the placeholder when there is none.
    pub fn image_for(&self, id: &str) -> Arc<RgbImage> {
        let image = match parse_image_id(id) {
            Some(pipe) => self.image_for_pipe(pipe),
            None => self.current_image(),
        };
        image.unwrap_or_else(|| Arc::clone(&self.placeholder))
    }
}

impl Default for PipeMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::frame_header;
    use std::time::Duration;

    fn header(pipe: u32, frame: u32, w: u32, h: u32) -> StreamItem {
        StreamItem::Header(FrameMeta::from_header(frame_header(pipe, frame, w, h)))
    }

    fn gray_body(w: u32, h: u32) -> StreamItem {
        StreamItem::Body(Bytes::from(vec![128u8; (w * h * 3 / 2) as usize]))
    }

    fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn header_registers_pipe_and_body_stores_image() {
        let mut mon = PipeMonitor::new();
        let mut rx = mon.subscribe();
        let now = Instant::now();

        mon.apply(header(0, 1, 4, 2), now);
        assert_eq!(mon.active_pipes(), &[0]);
        assert_eq!(mon.frame_for_pipe(0), Some(1));
        assert!(mon.image_for_pipe(0).is_none());

        mon.apply(gray_body(4, 2), now);
        let img = mon.image_for_pipe(0).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
        assert!(mon.current_image().is_some());

        let events = drain(&mut rx);
        assert_eq!(events[0], MonitorEvent::PipeSetChanged(vec![0]));
        assert!(events.contains(&MonitorEvent::FrameInfoChanged(FrameInfo {
            pipe_id: 0,
            frame_id: 1,
            fps: 0.0
        })));
        assert_eq!(events.last(), Some(&MonitorEvent::ImageChanged(0)));
        assert!(mon.status().starts_with("Received header - pipe: 0, frame: 1"));
    }

    #[test]
    fn pipe_set_event_only_for_new_pipes() {
        let mut mon = PipeMonitor::new();
        let mut rx = mon.subscribe();
        let now = Instant::now();
        for (pipe, frame) in [(0, 1), (1, 1), (0, 2), (1, 2)] {
            mon.apply(header(pipe, frame, 2, 2), now);
            mon.apply(gray_body(2, 2), now);
        }
        let sets: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                MonitorEvent::PipeSetChanged(ids) => Some(ids),
                _ => None,
            })
            .collect();
        assert_eq!(sets, vec![vec![0], vec![0, 1]]);
    }

    #[test]
    fn fps_follows_header_arrivals() {
        let mut mon = PipeMonitor::new();
        let start = Instant::now();
        mon.apply(header(0, 1, 2, 2), start);
        mon.apply(gray_body(2, 2), start);
        mon.apply(header(0, 2, 2, 2), start + Duration::from_millis(50));
        assert!((mon.fps_for_pipe(0) - 20.0).abs() < 1e-9);
        assert_eq!(mon.current_frame_info().unwrap().frame_id, 2);
        assert_eq!(mon.fps_for_pipe(9), 0.0);
    }

    #[test]
    fn invalid_dimensions_keep_previous_image() {
        let mut mon = PipeMonitor::new();
        let now = Instant::now();
        mon.apply(header(0, 1, 2, 2), now);
        mon.apply(gray_body(2, 2), now);
        let before = mon.image_for_pipe(0).unwrap();

        let mut rx = mon.subscribe();
        mon.apply(header(0, 2, 0, 480), now);
        mon.apply(StreamItem::Body(Bytes::new()), now);
        assert!(Arc::ptr_eq(&before, &mon.image_for_pipe(0).unwrap()));
        assert!(!drain(&mut rx).contains(&MonitorEvent::ImageChanged(0)));
        assert!(mon.received_data().contains("Invalid dimensions: 0x480"));
    }

    #[test]
    fn failed_conversion_stores_null_image() {
        let mut mon = PipeMonitor::new();
        let now = Instant::now();
        mon.apply(header(0, 1, 2, 2), now);
        mon.apply(gray_body(2, 2), now);
        assert!(mon.image_for_pipe(0).is_some());

        // Odd geometry cannot be converted.
        mon.apply(header(0, 2, 3, 3), now);
        let mut rx = mon.subscribe();
        mon.apply(StreamItem::Body(Bytes::from(vec![0u8; 13])), now);
        assert!(mon.image_for_pipe(0).is_none());
        assert_eq!(drain(&mut rx), vec![MonitorEvent::ImageChanged(0)]);
        assert!(mon.received_data().contains("Image conversion failed"));

        // Already absent: a second failure changes nothing observable.
        mon.apply(header(0, 3, 3, 3), now);
        let mut rx = mon.subscribe();
        mon.apply(StreamItem::Body(Bytes::from(vec![0u8; 13])), now);
        assert!(mon.image_for_pipe(0).is_none());
        assert!(!drain(&mut rx).contains(&MonitorEvent::ImageChanged(0)));
    }

    #[test]
    fn failed_first_conversion_emits_no_image_event() {
        let mut mon = PipeMonitor::new();
        let mut rx = mon.subscribe();
        let now = Instant::now();
        mon.apply(header(1, 1, 5, 2), now);
        mon.apply(StreamItem::Body(Bytes::from(vec![0u8; 15])), now);
        assert!(mon.image_for_pipe(1).is_none());
        assert!(!drain(&mut rx).contains(&MonitorEvent::ImageChanged(1)));
    }

    #[test]
    fn status_and_connection_events_are_deduplicated() {
        let mut mon = PipeMonitor::new();
        let mut rx = mon.subscribe();
        mon.set_connected(false);
        mon.set_status("Disconnected");
        assert!(drain(&mut rx).is_empty());

        mon.set_connected(true);
        mon.set_connected(true);
        mon.set_status("Connected");
        mon.set_status("Connected");
        assert_eq!(
            drain(&mut rx),
            vec![
                MonitorEvent::ConnectionChanged(true),
                MonitorEvent::StatusChanged("Connected".into()),
            ]
        );
    }

    #[test]
    fn reset_clears_pipes_and_pending_frame() {
        let mut mon = PipeMonitor::new();
        let now = Instant::now();
        mon.apply(header(0, 1, 2, 2), now);
        mon.apply(gray_body(2, 2), now);
        mon.apply(header(1, 1, 2, 2), now);

        let mut rx = mon.subscribe();
        mon.reset();
        assert!(mon.active_pipes().is_empty());
        assert!(mon.image_for_pipe(0).is_none());
        assert_eq!(drain(&mut rx), vec![MonitorEvent::PipeSetChanged(vec![])]);

        // A body left over from before the reset has no header to attach to.
        mon.apply(gray_body(2, 2), now);
        assert!(mon.active_pipes().is_empty());

        mon.reset();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn image_lookup_by_identifier() {
        let mut mon = PipeMonitor::new();
        let now = Instant::now();
        mon.apply(header(2, 1, 2, 2), now);
        mon.apply(gray_body(2, 2), now);

        assert_eq!(mon.image_for("pipe2/1699999").width, 2);
        let fallback = mon.image_for("pipe7/1");
        assert_eq!((fallback.width, fallback.height), (1, 1));
        assert_eq!(fallback.data, vec![0, 0, 0]);
    }

    #[test]
    fn malformed_identifier_falls_back_to_current_image() {
        let mut mon = PipeMonitor::new();
        assert_eq!(mon.image_for("garbage").data, vec![0, 0, 0]);

        let now = Instant::now();
        mon.apply(header(0, 1, 4, 4), now);
        mon.apply(gray_body(4, 4), now);

        let current = mon.current_image().unwrap();
        let img = mon.image_for("garbage");
        assert!(Arc::ptr_eq(&img, &current));
        assert_eq!((img.width, img.height), (4, 4));
        assert_eq!(mon.image_for("pipe/1").width, 4);
        // A parsed id for an unknown pipe still gets the placeholder.
        assert_eq!(mon.image_for("pipe3/1").width, 1);
    }

    #[test]
    fn received_data_previews_body() {
        let mut mon = PipeMonitor::new();
        let now = Instant::now();
        mon.apply(header(0, 1, 2, 2), now);
        mon.apply(StreamItem::Body(Bytes::from(vec![0xAB; 6])), now);
        let data = mon.received_data();
        assert!(data.starts_with("receive pipe: 0, Length: 6"));
        assert!(data.ends_with("ab ab ab ab ab ab "));
    }
}
