// Application state for the TUI: circular spike raster and membrane trace.

use std::collections::VecDeque;

use tracing::error;

use crate::backend::QifBackend;

/// Raster rows shown at most; larger populations show their first neurons.
pub const MAX_RASTER_ROWS: usize = 48;

pub struct App<B: QifBackend> {
    pub backend: B,
    pub width: usize,           // number of columns (time window)
    pub raster: Vec<Vec<char>>, // [neuron][col]
    pub trace: VecDeque<f64>,
    pub running: bool,
    pub total_spikes: u64,
    pub last_spikes: usize,
    /// Auto-pause once this tick is reached.
    pub pause_at: Option<u64>,
    pub message: Option<String>,
}

impl<B: QifBackend> App<B> {
    pub fn new(backend: B, width: usize) -> Self {
        let rows = backend.neurons().min(MAX_RASTER_ROWS);
        Self {
            backend,
            width,
            raster: vec![vec![' '; width]; rows],
            trace: VecDeque::with_capacity(width),
            running: false,
            total_spikes: 0,
            last_spikes: 0,
            pause_at: None,
            message: None,
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
        if self.running {
            self.message = None;
        }
    }

    /// Advance simulation by one tick and update the raster for the current column.
    pub fn step(&mut self) {
        if self.pause_at.is_some_and(|t| self.backend.tick() >= t) {
            self.running = false;
            self.message = Some(format!("reached tick {}", self.backend.tick()));
            return;
        }

        let col = (self.backend.tick() as usize) % self.width;
        let spikes = match self.backend.step() {
            Ok(spikes) => spikes,
            Err(e) => {
                error!(error = %e, "step failed");
                self.running = false;
                self.message = Some(e.to_string());
                return;
            }
        };

        for row in self.raster.iter_mut() {
            row[col] = ' ';
        }
        for sp in &spikes {
            if let Some(row) = self.raster.get_mut(sp.neuron_id as usize) {
                row[col] = '•';
            }
        }
        self.last_spikes = spikes.len();
        self.total_spikes += spikes.len() as u64;

        if let Some(v) = self.backend.trace() {
            if self.trace.len() == self.width {
                self.trace.pop_front();
            }
            self.trace.push_back(v);
        }
    }
}
