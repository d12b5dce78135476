//! Delayed linear interpolation of remote entities
//!
//! Remote entities are drawn one server tick in the past so there is almost
//! always a snapshot on each side of the render time. When there is not, the
//! entity keeps its last computed position; nothing is extrapolated.

use std::collections::VecDeque;

/// Authoritative position observed at a local receive time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
}

/// Samples for one remote entity, oldest first
#[derive(Debug, Default, Clone)]
pub struct PositionBuffer {
    samples: VecDeque<PositionSample>,
}

impl PositionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: u64, x: f64, y: f64) {
        self.samples.push_back(PositionSample { timestamp, x, y });
    }

    /// Position at `render_timestamp`, or `None` to hold the last one
    ///
    /// Samples that can no longer bracket the render time are dropped.
    pub fn interpolate(&mut self, render_timestamp: u64) -> Option<(f64, f64)> {
        while self.samples.len() >= 2 && self.samples[1].timestamp <= render_timestamp {
            self.samples.pop_front();
        }

        if self.samples.len() < 2 {
            return None;
        }
        let (from, to) = (self.samples[0], self.samples[1]);
        if from.timestamp > render_timestamp || render_timestamp > to.timestamp {
            return None;
        }

        let span = (to.timestamp - from.timestamp) as f64;
        let t = (render_timestamp - from.timestamp) as f64 / span;
        Some((from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t))
    }

    pub fn front(&self) -> Option<&PositionSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_interpolates_between_straddling_samples() {
        let mut buffer = PositionBuffer::new();
        buffer.push(1000, 0.0, 0.0);
        buffer.push(1100, 10.0, -20.0);

        let (x, y) = buffer.interpolate(1050).unwrap();
        assert_approx_eq!(x, 5.0);
        assert_approx_eq!(y, -10.0);
    }

    #[test]
    fn test_drops_samples_behind_render_time() {
        let mut buffer = PositionBuffer::new();
        buffer.push(1000, 0.0, 0.0);
        buffer.push(1100, 10.0, 0.0);
        buffer.push(1200, 20.0, 0.0);

        let (x, _) = buffer.interpolate(1150).unwrap();
        assert_approx_eq!(x, 15.0);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.front().unwrap().timestamp, 1100);
    }

    #[test]
    fn test_holds_when_render_time_is_past_all_samples() {
        let mut buffer = PositionBuffer::new();
        buffer.push(1000, 0.0, 0.0);
        buffer.push(1100, 10.0, 0.0);

        assert!(buffer.interpolate(1500).is_none());
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.front().unwrap().x, 10.0);
    }

    #[test]
    fn test_holds_when_render_time_precedes_samples() {
        let mut buffer = PositionBuffer::new();
        buffer.push(1000, 0.0, 0.0);
        buffer.push(1100, 10.0, 0.0);

        assert!(buffer.interpolate(900).is_none());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_single_sample_never_interpolates() {
        let mut buffer = PositionBuffer::new();
        assert!(buffer.interpolate(0).is_none());
        buffer.push(1000, 3.0, 4.0);
        assert!(buffer.interpolate(1000).is_none());
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_render_time_on_second_sample_shifts_buffer() {
        let mut buffer = PositionBuffer::new();
        buffer.push(1000, 0.0, 0.0);
        buffer.push(1100, 10.0, 0.0);
        buffer.push(1200, 30.0, 0.0);

        let (x, _) = buffer.interpolate(1100).unwrap();
        assert_approx_eq!(x, 10.0);
        assert_eq!(buffer.front().unwrap().timestamp, 1100);
    }
}
