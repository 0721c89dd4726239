//! Time wheel (calendar queue) of synaptic input awaiting delivery.

use qif_core::{Fixed, Receptor};

/// Weight routed to one neuron, due at timestep `time`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynapticEvent {
    pub target: u32,
    pub receptor: Receptor,
    pub weight: Fixed,
    pub time: u64,
}

pub struct InputWheel {
    buckets: Vec<Vec<SynapticEvent>>,
    current_time: u64,
    wheel_size: u64,
    pending: usize,
}

impl InputWheel {
    pub fn new(wheel_size: u64) -> Self {
        Self::starting_at(wheel_size, 0)
    }

    /// Empty wheel whose first slot is timestep `time`.
    pub fn starting_at(wheel_size: u64, time: u64) -> Self {
        let wheel_size = wheel_size.max(1);
        Self {
            buckets: (0..wheel_size).map(|_| Vec::new()).collect(),
            current_time: time,
            wheel_size,
            pending: 0,
        }
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Furthest timestep that can be scheduled right now (exclusive).
    pub fn horizon(&self) -> u64 {
        self.current_time.saturating_add(self.wheel_size)
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Queue `event`; refused when it lies in the past or beyond the horizon,
    /// where it would alias a nearer slot.
    #[inline]
    pub fn schedule(&mut self, event: SynapticEvent) -> bool {
        if event.time < self.current_time || event.time >= self.horizon() {
            return false;
        }
        let slot = (event.time % self.wheel_size) as usize;
        self.buckets[slot].push(event);
        self.pending += 1;
        true
    }

    /// Return all events due at the current timestep, then advance time by 1 tick.
    pub fn next(&mut self) -> Vec<SynapticEvent> {
        let slot = (self.current_time % self.wheel_size) as usize;
        let events = core::mem::take(&mut self.buckets[slot]);
        self.pending -= events.len();
        self.current_time = self.current_time.saturating_add(1);
        events
    }
}
