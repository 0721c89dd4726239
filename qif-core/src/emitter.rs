//! Spike events and the bounded per-timestep buffer that collects them.

use crate::error::CapacityError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpikeEvent {
    pub neuron_id: u32,
    pub time: u64,
}

/// Receives the spikes of a timestep when the buffer is flushed.
pub trait SpikeSink {
    fn on_spikes(&mut self, timestep: u64, spikes: &[SpikeEvent]);
}

impl SpikeSink for Vec<SpikeEvent> {
    fn on_spikes(&mut self, _timestep: u64, spikes: &[SpikeEvent]) {
        self.extend_from_slice(spikes);
    }
}

/// Bounded spike buffer for one timestep.
///
/// Overflow is reported, never dropped silently: events past capacity are
/// counted and [`SpikeEmitter::finish`] turns the count into an error.
#[derive(Clone, Debug)]
pub struct SpikeEmitter {
    buffer: Vec<SpikeEvent>,
    capacity: usize,
    overflow: usize,
    timestep: u64,
}

impl SpikeEmitter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            overflow: 0,
            timestep: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.buffer.truncate(capacity);
    }

    /// Start collecting for `timestep`, discarding the previous step's events.
    pub fn begin(&mut self, timestep: u64) {
        self.buffer.clear();
        self.overflow = 0;
        self.timestep = timestep;
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    #[inline]
    pub fn emit(&mut self, neuron_id: u32) -> Result<(), CapacityError> {
        if self.buffer.len() >= self.capacity {
            self.overflow += 1;
            return Err(self.overflow_error());
        }
        self.buffer.push(SpikeEvent {
            neuron_id,
            time: self.timestep,
        });
        Ok(())
    }

    /// Error if anything overflowed during this timestep.
    pub fn finish(&self) -> Result<(), CapacityError> {
        if self.overflow > 0 {
            Err(self.overflow_error())
        } else {
            Ok(())
        }
    }

    fn overflow_error(&self) -> CapacityError {
        CapacityError::SpikeBuffer {
            timestep: self.timestep,
            capacity: self.capacity,
            attempted: self.buffer.len() + self.overflow,
        }
    }

    pub fn events(&self) -> &[SpikeEvent] {
        &self.buffer
    }

    /// Hand this step's events to `sink` and empty the buffer.
    pub fn flush<S: SpikeSink + ?Sized>(&mut self, sink: &mut S) {
        sink.on_spikes(self.timestep, &self.buffer);
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_events_with_current_timestep() {
        let mut em = SpikeEmitter::with_capacity(4);
        em.begin(7);
        em.emit(3).unwrap();
        em.emit(1).unwrap();
        assert_eq!(
            em.events(),
            &[
                SpikeEvent { neuron_id: 3, time: 7 },
                SpikeEvent { neuron_id: 1, time: 7 }
            ]
        );
        assert!(em.finish().is_ok());
    }

    #[test]
    fn overflow_is_reported_and_buffer_kept() {
        let mut em = SpikeEmitter::with_capacity(2);
        em.begin(0);
        em.emit(0).unwrap();
        em.emit(1).unwrap();
        assert!(em.emit(2).is_err());
        assert!(em.emit(3).is_err());
        assert_eq!(em.events().len(), 2);
        assert_eq!(
            em.finish(),
            Err(CapacityError::SpikeBuffer {
                timestep: 0,
                capacity: 2,
                attempted: 4
            })
        );

        em.begin(1);
        assert!(em.finish().is_ok());
    }

    #[test]
    fn flush_hands_over_and_clears() {
        let mut em = SpikeEmitter::with_capacity(8);
        let mut sink: Vec<SpikeEvent> = Vec::new();
        em.begin(5);
        em.emit(2).unwrap();
        em.flush(&mut sink);
        assert_eq!(sink, vec![SpikeEvent { neuron_id: 2, time: 5 }]);
        assert!(em.events().is_empty());
    }
}
