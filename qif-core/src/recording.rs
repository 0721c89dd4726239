//! Per-timestep recording of tracked variables.
//!
//! Samples are `(neuron, timestep, value)` tuples. They can be pulled with
//! [`Recorder::take`] or pushed into a [`RecordingSink`].

use crate::error::CapacityError;
use crate::fixed::Fixed;
use crate::neuron::Neuron;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Recordable {
    V,
    U,
    GsynExc,
    GsynInh,
    Spikes,
}

impl Recordable {
    pub const ALL: [Recordable; 5] = [
        Recordable::V,
        Recordable::U,
        Recordable::GsynExc,
        Recordable::GsynInh,
        Recordable::Spikes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Recordable::V => "v",
            Recordable::U => "u",
            Recordable::GsynExc => "gsyn_exc",
            Recordable::GsynInh => "gsyn_inh",
            Recordable::Spikes => "spikes",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Recordable::V => "mV",
            Recordable::U => "mV/ms",
            Recordable::GsynExc | Recordable::GsynInh => "nA",
            Recordable::Spikes => "",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub neuron: u32,
    pub timestep: u64,
    pub value: Fixed,
}

pub trait RecordingSink {
    fn on_sample(&mut self, variable: Recordable, sample: Sample);
}

impl RecordingSink for Vec<(Recordable, Sample)> {
    fn on_sample(&mut self, variable: Recordable, sample: Sample) {
        self.push((variable, sample));
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    All,
    Indices(Vec<u32>),
}

impl Selection {
    fn contains(&self, neuron: u32) -> bool {
        match self {
            Selection::All => true,
            Selection::Indices(ids) => ids.contains(&neuron),
        }
    }
}

#[derive(Clone, Debug)]
struct Channel {
    variable: Recordable,
    selection: Selection,
    samples: Vec<Sample>,
}

#[derive(Clone, Debug, Default)]
pub struct Recorder {
    channels: Vec<Channel>,
    capacity: Option<usize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the total number of buffered samples across all variables.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Start (or replace) tracking of `variable` for `selection`.
    pub fn track(&mut self, variable: Recordable, selection: Selection) {
        self.untrack(variable);
        self.channels.push(Channel {
            variable,
            selection,
            samples: Vec::new(),
        });
    }

    /// Stop tracking `variable`; buffered samples are discarded.
    pub fn untrack(&mut self, variable: Recordable) {
        self.channels.retain(|c| c.variable != variable);
    }

    pub fn is_tracking(&self, variable: Recordable) -> bool {
        self.channels.iter().any(|c| c.variable == variable)
    }

    /// Samples currently buffered across all variables.
    pub fn len(&self) -> usize {
        self.channels.iter().map(|c| c.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record one timestep. `fired` must be in ascending neuron order.
    ///
    /// A timestep is stored whole or not at all: on overflow every sample
    /// already pushed for `timestep` is dropped again.
    pub(crate) fn sample(
        &mut self,
        timestep: u64,
        neurons: &[Neuron],
        fired: &[u32],
    ) -> Result<(), CapacityError> {
        if self.channels.is_empty() {
            return Ok(());
        }
        let marks: Vec<usize> = self.channels.iter().map(|c| c.samples.len()).collect();
        let result = self.push_step(timestep, neurons, fired);
        if result.is_err() {
            for (channel, mark) in self.channels.iter_mut().zip(marks) {
                channel.samples.truncate(mark);
            }
        }
        result
    }

    fn push_step(&mut self, timestep: u64, neurons: &[Neuron], fired: &[u32]) -> Result<(), CapacityError> {
        let mut stored = self.len();
        let capacity = self.capacity;
        let full = CapacityError::RecordingBuffer {
            timestep,
            capacity: capacity.unwrap_or(usize::MAX),
        };

        for channel in &mut self.channels {
            let mut push = |neuron: u32, value: Fixed| -> Result<(), CapacityError> {
                if capacity.is_some_and(|cap| stored >= cap) {
                    return Err(full);
                }
                channel.samples.push(Sample {
                    neuron,
                    timestep,
                    value,
                });
                stored += 1;
                Ok(())
            };

            if channel.variable == Recordable::Spikes {
                for &id in fired {
                    if channel.selection.contains(id) {
                        push(id, Fixed::ONE)?;
                    }
                }
                continue;
            }

            let variable = channel.variable;
            let read = |n: &Neuron| match variable {
                Recordable::V => n.state.v,
                Recordable::U => n.state.u,
                Recordable::GsynExc => n.last_current().exc,
                Recordable::GsynInh => n.last_current().inh,
                Recordable::Spikes => Fixed::ZERO,
            };
            match &channel.selection {
                Selection::All => {
                    for n in neurons {
                        push(n.id, read(n))?;
                    }
                }
                Selection::Indices(ids) => {
                    for &id in ids {
                        if let Some(n) = neurons.get(id as usize) {
                            push(id, read(n))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Drain the buffered samples of `variable`.
    pub fn take(&mut self, variable: Recordable) -> Vec<Sample> {
        self.channels
            .iter_mut()
            .find(|c| c.variable == variable)
            .map(|c| core::mem::take(&mut c.samples))
            .unwrap_or_default()
    }

    /// Push every buffered sample into `sink`, emptying the buffers.
    pub fn flush_into<S: RecordingSink + ?Sized>(&mut self, sink: &mut S) {
        for channel in &mut self.channels {
            for sample in channel.samples.drain(..) {
                sink.on_sample(channel.variable, sample);
            }
        }
    }
}
