//! Held-control tracking and input sequencing

use shared::{Controls, PendingInput};

/// Turns held controls into sequenced inputs, one per game tick
#[derive(Debug, Clone)]
pub struct InputManager {
    next_sequence: u32,
    held: Controls,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            held: Controls::default(),
        }
    }

    pub fn held(&self) -> Controls {
        self.held
    }

    /// Replaces every held control at once
    pub fn set_held(&mut self, controls: Controls) {
        self.held = controls;
    }

    pub fn press_up(&mut self) {
        self.held.up = true;
    }

    pub fn press_down(&mut self) {
        self.held.down = true;
    }

    pub fn press_left(&mut self) {
        self.held.left = true;
    }

    pub fn press_right(&mut self) {
        self.held.right = true;
    }

    pub fn press_fire(&mut self) {
        self.held.fire = true;
    }

    pub fn release_up(&mut self) {
        self.held.up = false;
    }

    pub fn release_down(&mut self) {
        self.held.down = false;
    }

    pub fn release_left(&mut self) {
        self.held.left = false;
    }

    pub fn release_right(&mut self) {
        self.held.right = false;
    }

    pub fn release_fire(&mut self) {
        self.held.fire = false;
    }

    /// Sequence number the next input will carry
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Packages the held controls for a tick of `duration_ms`
    ///
    /// Returns `None` and consumes no sequence number when nothing is held.
    pub fn next_input(&mut self, duration_ms: f64) -> Option<PendingInput> {
        if !self.held.any() {
            return None;
        }

        let input = PendingInput {
            sequence_number: self.next_sequence,
            controls: self.held,
            elapsed_seconds: duration_ms / 1000.0,
        };
        self.next_sequence += 1;
        Some(input)
    }

    /// Restarts sequencing for a fresh session; held controls are kept
    pub fn reset_sequence(&mut self) {
        self.next_sequence = 1;
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
