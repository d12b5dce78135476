//! Self-rescheduling fixed-rate tick bookkeeping
//!
//! The scheduler holds no timer of its own. The owning loop asks how long to
//! sleep, calls [`TickScheduler::begin_tick`] when the deadline passes and
//! [`TickScheduler::finish_tick`] once the work is done; the next deadline
//! is then `max(1, interval - processing)` after the finish time.

/// Elapsed time beyond this factor of the interval is reported as late
pub const LATE_TICK_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStart {
    /// 1-based index of the tick being started
    pub index: u64,
    /// Measured time since the previous tick started
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval_ms: u64,
    next_deadline_ms: u64,
    last_start_ms: Option<u64>,
    current_start_ms: Option<u64>,
    last_processing_ms: u64,
    tick_index: u64,
}

impl TickScheduler {
    /// First tick becomes due `initial_delay_ms` after `now_ms`
    pub fn new(interval_ms: u64, now_ms: u64, initial_delay_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_deadline_ms: now_ms + initial_delay_ms,
            last_start_ms: None,
            current_start_ms: None,
            last_processing_ms: 0,
            tick_index: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn next_deadline_ms(&self) -> u64 {
        self.next_deadline_ms
    }

    pub fn last_processing_ms(&self) -> u64 {
        self.last_processing_ms
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_deadline_ms
    }

    pub fn delay_until_next(&self, now_ms: u64) -> u64 {
        self.next_deadline_ms.saturating_sub(now_ms)
    }

    /// Marks the start of a tick and measures the real time since the last one
    pub fn begin_tick(&mut self, now_ms: u64) -> TickStart {
        let elapsed_ms = match self.last_start_ms {
            Some(last) => now_ms.saturating_sub(last),
            None => self.interval_ms,
        };
        self.last_start_ms = Some(now_ms);
        self.current_start_ms = Some(now_ms);
        self.tick_index += 1;

        TickStart {
            index: self.tick_index,
            elapsed_ms,
        }
    }

    /// Records processing time and schedules the next deadline; returns the processing time
    pub fn finish_tick(&mut self, now_ms: u64) -> u64 {
        let started = self.current_start_ms.take().unwrap_or(now_ms);
        self.last_processing_ms = now_ms.saturating_sub(started);
        let delay = self
            .interval_ms
            .saturating_sub(self.last_processing_ms)
            .max(1);
        self.next_deadline_ms = now_ms + delay;
        self.last_processing_ms
    }

    pub fn is_late(&self, elapsed_ms: u64) -> bool {
        elapsed_ms as f64 > self.interval_ms as f64 * LATE_TICK_FACTOR
    }
}
