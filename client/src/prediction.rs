//! Inputs applied locally but not yet confirmed by the server

use log::debug;
use shared::PendingInput;

/// Unacknowledged inputs in sequence order
#[derive(Debug, Default)]
pub struct Predictor {
    pending: Vec<PendingInput>,
    last_acknowledged: u32,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, input: PendingInput) {
        self.pending.push(input);
    }

    /// Discards every input the server has processed
    ///
    /// Returns how many inputs were dropped. An acknowledgement older than a
    /// previous one drops nothing.
    pub fn acknowledge(&mut self, sequence_number: u32) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|input| input.sequence_number > sequence_number);
        self.last_acknowledged = self.last_acknowledged.max(sequence_number);

        let dropped = before - self.pending.len();
        if dropped > 0 {
            debug!(
                "Acknowledged up to {}, {} inputs still pending",
                sequence_number,
                self.pending.len()
            );
        }
        dropped
    }

    /// Inputs to replay on top of an authoritative position
    pub fn unacknowledged(&self) -> &[PendingInput] {
        &self.pending
    }

    pub fn last_acknowledged(&self) -> u32 {
        self.last_acknowledged
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_acknowledged = 0;
    }
}
