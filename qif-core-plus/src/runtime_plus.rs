//! Extended runtime that composes a qif-core population and adds:
//! - delayed synaptic input through a time wheel
//! - per-step limits (spike budget, partitioned parallel update)
//! - a stop handle checked at every tick boundary
//!
//! Semantics:
//! - step_once() delivers the input due at the current tick, updates every
//!   neuron and returns the spikes emitted during that tick.
//! - Input scheduled for tick t is seen by the update of tick t.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use qif_core::{update_neurons, CapacityError, Fixed, Population, Receptor, SpikeEvent, SpikeSink};
use tracing::{debug, info, trace, warn};

use crate::input_wheel::{InputWheel, SynapticEvent};
use crate::parallel::update_partitioned;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepLimits {
    /// Tighter spike budget for a tick; exceeding it fails the tick.
    pub max_spikes_per_step: Option<usize>,
    /// Update neurons in partitions of this size on the rayon pool.
    pub partition_size: Option<usize>,
}

/// Cooperative stop flag shared with other threads.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub spikes: u64,
    /// The run ended early on a stop request.
    pub stopped: bool,
}

pub struct QifRuntimePlus {
    pub inner: Population,
    inputs: InputWheel,
    limits: StepLimits,
    stop: StopHandle,
}

impl QifRuntimePlus {
    /// Wrap `inner`; input can be scheduled up to `wheel_size` ticks ahead.
    pub fn new(inner: Population, wheel_size: u64) -> Self {
        let inputs = InputWheel::starting_at(wheel_size, inner.current_time());
        Self {
            inner,
            inputs,
            limits: StepLimits::default(),
            stop: StopHandle::default(),
        }
    }

    pub fn population(&self) -> &Population {
        &self.inner
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.inner
    }

    pub fn into_inner(self) -> Population {
        self.inner
    }

    pub fn limits(&self) -> StepLimits {
        self.limits
    }

    /// Limits used by step_once() and the run loops.
    pub fn set_limits(&mut self, limits: StepLimits) {
        self.limits = limits;
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn pending_inputs(&self) -> usize {
        self.inputs.pending()
    }

    pub fn schedule_input(&mut self, event: SynapticEvent) -> bool {
        let accepted = self.inputs.schedule(event);
        if !accepted {
            debug!(
                neuron = event.target,
                time = event.time,
                now = self.inputs.current_time(),
                horizon = self.inputs.horizon(),
                "input outside schedulable window"
            );
        }
        accepted
    }

    /// Schedule `weight` onto `target` after `delay` ticks (0 = the next tick).
    pub fn schedule(&mut self, target: u32, receptor: Receptor, weight: Fixed, delay: u64) -> bool {
        let time = self.inner.current_time().saturating_add(delay);
        self.schedule_input(SynapticEvent {
            target,
            receptor,
            weight,
            time,
        })
    }

    fn deliver_due(&mut self) {
        let now = self.inner.current_time();
        // the population may have been stepped directly; drop input it skipped
        while self.inputs.current_time() < now {
            let stale = self.inputs.next();
            if !stale.is_empty() {
                warn!(dropped = stale.len(), "input skipped by direct population stepping");
            }
        }
        if self.inputs.current_time() != now {
            return;
        }
        for ev in self.inputs.next() {
            if !self.inner.deliver(ev.target, ev.receptor, ev.weight) {
                trace!(neuron = ev.target, "input for unknown neuron ignored");
            }
        }
    }

    /// Advance one tick under `limits`; returns the spikes of that tick.
    pub fn step_once_with_limits(&mut self, limits: StepLimits) -> Result<Vec<SpikeEvent>, CapacityError> {
        self.deliver_due();

        let capacity = self.inner.spike_capacity();
        if let Some(max) = limits.max_spikes_per_step {
            self.inner.set_spike_capacity(max.min(capacity));
        }

        let result = match limits.partition_size {
            Some(size) => self
                .inner
                .step_with(|neurons, kernel, threshold| update_partitioned(neurons, kernel, threshold, size)),
            None => self.inner.step_with(update_neurons),
        }
        .map(<[SpikeEvent]>::to_vec);

        self.inner.set_spike_capacity(capacity);
        result
    }

    pub fn step_once(&mut self) -> Result<Vec<SpikeEvent>, CapacityError> {
        self.step_once_with_limits(self.limits)
    }

    /// Run until the given tick (inclusive), passing every tick's spikes to `sink`.
    pub fn run_until<S: SpikeSink + ?Sized>(&mut self, until: u64, sink: &mut S) -> Result<RunSummary, CapacityError> {
        let start = self.inner.current_time();
        let started = Instant::now();
        info!(
            population = self.inner.label(),
            from = start,
            until,
            neurons = self.inner.len(),
            "run started"
        );

        let mut summary = RunSummary::default();
        while self.inner.current_time() <= until {
            if self.stop.is_stopped() {
                self.stop.clear();
                summary.stopped = true;
                break;
            }
            let tick = self.inner.current_time();
            let spikes = self.step_once()?;
            summary.ticks += 1;
            summary.spikes += spikes.len() as u64;
            sink.on_spikes(tick, &spikes);
        }

        info!(
            population = self.inner.label(),
            ticks = summary.ticks,
            spikes = summary.spikes,
            stopped = summary.stopped,
            saturation_events = self.inner.saturation_events(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }

    /// Run a fixed number of ticks.
    pub fn run_ticks<S: SpikeSink + ?Sized>(&mut self, ticks: u64, sink: &mut S) -> Result<RunSummary, CapacityError> {
        if ticks == 0 {
            return Ok(RunSummary::default());
        }
        let until = self.inner.current_time().saturating_add(ticks - 1);
        self.run_until(until, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qif_core::model::QIF_CURR_DELTA;
    use qif_core::{PopulationBuilder, TimestepContext};

    fn runtime(size: usize, v: f64) -> QifRuntimePlus {
        let pop = PopulationBuilder::new("p", size, &QIF_CURR_DELTA)
            .set("v", v)
            .build(TimestepContext::default())
            .unwrap();
        QifRuntimePlus::new(pop, 8)
    }

    #[test]
    fn delayed_input_lands_on_its_tick() {
        let mut rt = runtime(1, -60.0);
        assert!(rt.schedule(0, Receptor::Excitatory, Fixed::from_f64(5.0), 3));
        for _ in 0..3 {
            rt.step_once().unwrap();
            assert_eq!(rt.population().neuron(0).unwrap().state.v, Fixed::from_f64(-60.0));
        }
        rt.step_once().unwrap();
        assert!(rt.population().neuron(0).unwrap().state.v > Fixed::from_f64(-60.0));
        assert_eq!(rt.pending_inputs(), 0);
    }

    #[test]
    fn schedule_beyond_wheel_is_refused() {
        let mut rt = runtime(1, -60.0);
        assert!(!rt.schedule(0, Receptor::Excitatory, Fixed::ONE, 8));
        assert!(rt.schedule(0, Receptor::Excitatory, Fixed::ONE, 7));
    }

    #[test]
    fn spike_limit_applies_to_one_tick_only() {
        let mut rt = runtime(4, 99.0);
        let limits = StepLimits {
            max_spikes_per_step: Some(2),
            partition_size: None,
        };
        let err = rt.step_once_with_limits(limits).unwrap_err();
        assert!(matches!(err, CapacityError::SpikeBuffer { capacity: 2, attempted: 4, .. }));
        assert_eq!(rt.population().spike_capacity(), 4);
    }

    #[test]
    fn run_reports_ticks_and_spikes() {
        let mut rt = runtime(3, 99.0);
        rt.set_limits(StepLimits {
            max_spikes_per_step: None,
            partition_size: Some(2),
        });
        let mut sink: Vec<SpikeEvent> = Vec::new();
        let summary = rt.run_ticks(5, &mut sink).unwrap();
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.spikes, 3);
        assert_eq!(sink.iter().map(|s| s.neuron_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(rt.population().current_time(), 5);
    }

    #[test]
    fn stop_request_ends_run_at_tick_boundary() {
        let mut rt = runtime(1, -60.0);
        let handle = rt.stop_handle();
        handle.stop();
        let summary = rt.run_until(100, &mut Vec::new()).unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.ticks, 0);
        assert!(!handle.is_stopped());

        let summary = rt.run_until(9, &mut Vec::new()).unwrap();
        assert_eq!(summary.ticks, 10);
    }
}
