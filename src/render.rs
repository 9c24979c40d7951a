//! Render sink contract
//!
//! The simulation hands a [`RenderFrame`] (or nothing, for the empty scene)
//! to a sink once per tick. Sinks own the mapping to their canvas space.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::logical_to_canvas;
use crate::sim::Ball;

/// Ball state as seen by a painter, in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: [f32; 4],
}

impl RenderFrame {
    pub fn from_ball(ball: &Ball) -> Self {
        Self {
            x: ball.pos.x,
            y: ball.pos.y,
            radius: ball.radius,
            color: ball.color,
        }
    }

    /// Ball centre in canvas pixels, for a scene `width` units wide
    #[inline]
    pub fn canvas_center(&self, width: f32) -> Vec2 {
        logical_to_canvas(Vec2::new(self.x, self.y), width)
    }
}

/// Consumer of simulation frames
pub trait RenderSink {
    /// Paint one frame; `None` paints the empty scene
    fn present(&mut self, frame: Option<&RenderFrame>);
}

/// Sink that keeps every frame it was given
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<Option<RenderFrame>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&RenderFrame> {
        self.frames.last().and_then(|f| f.as_ref())
    }
}

impl RenderSink for RecordingSink {
    fn present(&mut self, frame: Option<&RenderFrame>) {
        self.frames.push(frame.copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_maps_to_canvas() {
        let frame = RenderFrame::from_ball(&Ball::at(10.0, 50.0, 30.0));
        assert_eq!(frame.canvas_center(500.0), Vec2::new(260.0, 50.0));
        assert_eq!(frame.canvas_center(600.0), Vec2::new(310.0, 50.0));
        assert_eq!(frame.radius, 30.0);
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.present(None);
        assert!(sink.last().is_none());

        let frame = RenderFrame::from_ball(&Ball::new(20.0));
        sink.present(Some(&frame));
        assert_eq!(sink.last(), Some(&frame));
        assert_eq!(sink.frames.len(), 2);
    }
}
