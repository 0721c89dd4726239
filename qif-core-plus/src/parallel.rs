//! Partitioned population update on the rayon pool.
//!
//! Neurons only read shared constants and their own state, so contiguous
//! partitions can be updated independently. Outputs are concatenated in
//! partition order, which keeps fired ids ascending and the result identical
//! to a serial pass.

use qif_core::{update_neurons, Kernel, Neuron, StaticThreshold, StepOutput};
use rayon::prelude::*;

pub fn update_partitioned(
    neurons: &mut [Neuron],
    kernel: &Kernel,
    threshold: StaticThreshold,
    partition_size: usize,
) -> StepOutput {
    let partitions: Vec<StepOutput> = neurons
        .par_chunks_mut(partition_size.max(1))
        .map(|chunk| update_neurons(chunk, kernel, threshold))
        .collect();

    partitions.into_iter().fold(StepOutput::default(), |mut acc, part| {
        acc.append(part);
        acc
    })
}
