//! Per-pipe state store.
//!
//! Tracks every pipe seen since the last reset, in first-seen order.
//! The ordered id list and the map always hold the same key set.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::color::RgbImage;
use crate::fps::FrameRateTracker;

// ── PipeState ────────────────────────────────────────────────────

/// Everything known about a single pipe.
#[derive(Debug, Clone, Default)]
pub struct PipeState {
    /// Frame id from the most recent header.
    pub frame_id: Option<u32>,
    pub width: u32,
    pub height: u32,
    /// Most recent decoded image; `None` if the last conversion failed
    /// or no body has been converted yet.
    pub image: Option<Arc<RgbImage>>,
    rate: FrameRateTracker,
}

impl PipeState {
    pub fn fps(&self) -> f64 {
        self.rate.fps()
    }
}

// ── PipeRegistry ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PipeRegistry {
    pipes: HashMap<u32, PipeState>,
    order: Vec<u32>,
}

impl PipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `pipe_id` if needed, then overwrite its frame
    /// id and geometry. Returns `true` when the pipe was new.
    pub fn upsert(&mut self, pipe_id: u32, frame_id: u32, width: u32, height: u32) -> bool {
        let created = !self.pipes.contains_key(&pipe_id);
        if created {
            self.order.push(pipe_id);
        }
        let state = self.pipes.entry(pipe_id).or_default();
        state.frame_id = Some(frame_id);
        state.width = width;
        state.height = height;
        created
    }

    /// Record a header arrival for FPS purposes. Unknown pipes are ignored.
    pub fn record_arrival(&mut self, pipe_id: u32, now: Instant) -> Option<f64> {
        self.pipes
            .get_mut(&pipe_id)
            .map(|state| state.rate.record_at(now))
    }

    /// Store the latest image for `pipe_id`, replacing any previous one.
    ///
    /// Returns `false` if the pipe is not registered.
    pub fn record_image(&mut self, pipe_id: u32, image: Option<Arc<RgbImage>>) -> bool {
        match self.pipes.get_mut(&pipe_id) {
            Some(state) => {
                state.image = image;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, pipe_id: u32) -> Option<&PipeState> {
        self.pipes.get(&pipe_id)
    }

    /// Pipe ids seen since the last reset, in first-seen order.
    pub fn active_ids(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn reset(&mut self) {
        self.pipes.clear();
        self.order.clear();
    }
}

// ── Tests ────────────────────────────────────────────────────────
