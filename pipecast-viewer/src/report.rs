//! Text reporting of pipe activity.

use pipecast_core::{MonitorEvent, PipeMonitor};

/// One line per active pipe, in first-seen order.
pub fn pipe_summary(monitor: &PipeMonitor) -> Vec<String> {
    monitor
        .active_pipes()
        .iter()
        .filter_map(|&id| {
            let pipe = monitor.pipe(id)?;
            let frame = pipe
                .frame_id
                .map_or_else(|| "-".to_string(), |f| f.to_string());
            let image = match &pipe.image {
                Some(img) => format!("{}x{}", img.width, img.height),
                None => "none".to_string(),
            };
            Some(format!(
                "pipe:{id} frame:{frame} size:{}x{} fps:{:.1} image:{image}",
                pipe.width,
                pipe.height,
                pipe.fps()
            ))
        })
        .collect()
}

/// Human-readable description of an event.
pub fn describe(event: &MonitorEvent) -> String {
    match event {
        MonitorEvent::ConnectionChanged(true) => "connected".into(),
        MonitorEvent::ConnectionChanged(false) => "disconnected".into(),
        MonitorEvent::StatusChanged(s) => format!("status: {s}"),
        MonitorEvent::PipeSetChanged(ids) => format!("active pipes: {ids:?}"),
        MonitorEvent::ImageChanged(id) => format!("image updated on pipe {id}"),
        MonitorEvent::FrameInfoChanged(info) => format!(
            "pipe:{} frame:{} fps:{:.1}",
            info.pipe_id, info.frame_id, info.fps
        ),
    }
}
