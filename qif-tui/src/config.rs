// Simulation configuration: TOML file, then CLI overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use qif_core::{find_model, ParamValue, Receptor};
use serde::Deserialize;

#[derive(Debug, Clone, Parser)]
#[command(name = "qif-tui", about = "Spike raster and membrane trace of a QIF population")]
pub struct Cli {
    /// TOML simulation config; built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Simulation timestep in microseconds
    #[arg(long)]
    pub timestep_us: Option<u32>,
    /// Number of neurons
    #[arg(long)]
    pub size: Option<usize>,
    /// Ticks to simulate (headless) or auto-pause after (interactive)
    #[arg(long)]
    pub ticks: Option<u64>,
    /// Partition size for the parallel update
    #[arg(long)]
    pub partition_size: Option<usize>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Log filter, e.g. "info" or "qif_core=debug"; RUST_LOG wins
    #[arg(long)]
    pub log_level: Option<String>,
    /// Run without the terminal UI and print a summary
    #[arg(long)]
    pub headless: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub timestep_us: u32,
    pub ticks: Option<u64>,
    pub wheel_size: u64,
    pub partition_size: Option<usize>,
    pub population: PopulationConfig,
    pub stimuli: Vec<StimulusConfig>,
    pub logging: LogConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timestep_us: 1000,
            ticks: None,
            wheel_size: 64,
            partition_size: None,
            population: PopulationConfig::default(),
            stimuli: Vec::new(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub label: String,
    pub model: String,
    pub size: usize,
    pub seed: u64,
    pub spike_capacity: Option<usize>,
    /// Neuron whose membrane potential is traced.
    pub trace_neuron: u32,
    pub params: BTreeMap<String, ParamValue>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            label: "pop".into(),
            model: "QIFCurrDelta".into(),
            size: 32,
            seed: 0,
            spike_capacity: None,
            trace_neuron: 0,
            params: BTreeMap::new(),
        }
    }
}

/// Weight delivered to `targets` at `start`, then every `period` ticks (0 = once).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StimulusConfig {
    pub targets: Vec<u32>,
    #[serde(default = "excitatory")]
    pub receptor: Receptor,
    pub weight: f64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub period: u64,
    #[serde(default)]
    pub stop: Option<u64>,
}

fn excitatory() -> Receptor {
    Receptor::Excitatory
}

impl StimulusConfig {
    pub fn fires_at(&self, tick: u64) -> bool {
        if tick < self.start || self.stop.is_some_and(|stop| tick > stop) {
            return false;
        }
        match self.period {
            0 => tick == self.start,
            period => (tick - self.start) % period == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("qif-tui.log"),
            level: "info".into(),
        }
    }
}

impl SimConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` (or the defaults) and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::read(path)?,
            None => Self::default(),
        };
        config.apply_cli_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(us) = cli.timestep_us {
            self.timestep_us = us;
        }
        if let Some(size) = cli.size {
            self.population.size = size;
        }
        if let Some(ticks) = cli.ticks {
            self.ticks = Some(ticks);
        }
        if let Some(partition) = cli.partition_size {
            self.partition_size = Some(partition);
        }
        if let Some(file) = &cli.log_file {
            self.logging.file = file.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        if find_model(&self.population.model).is_none() {
            return Err(anyhow!("unknown neuron model '{}'", self.population.model));
        }
        if self.population.trace_neuron as usize >= self.population.size.max(1) {
            return Err(anyhow!(
                "trace_neuron {} out of range for {} neurons",
                self.population.trace_neuron,
                self.population.size
            ));
        }
        if self.wheel_size == 0 {
            return Err(anyhow!("wheel_size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qif_core::RandomDistribution;

    const SAMPLE: &str = r#"
        timestep_us = 100
        ticks = 5000

        [population]
        label = "exc"
        model = "QifSd"
        size = 16
        seed = 3

        [population.params]
        i_offset = 8.0
        v = { distribution = "uniform", low = -80.0, high = -60.0 }
        tau_syn_E = [1.0, 2.0]

        [[stimuli]]
        targets = [0, 1]
        weight = 2.5
        period = 10

        [logging]
        level = "debug"
    "#;

    #[test]
    fn parses_sample() {
        let config = SimConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.timestep_us, 100);
        assert_eq!(config.population.model, "QifSd");
        assert_eq!(config.population.params["i_offset"], ParamValue::Scalar(8.0));
        assert_eq!(
            config.population.params["v"],
            ParamValue::Random(RandomDistribution::Uniform { low: -80.0, high: -60.0 })
        );
        assert_eq!(config.population.params["tau_syn_E"], ParamValue::PerNeuron(vec![1.0, 2.0]));
        assert_eq!(config.stimuli[0].receptor, Receptor::Excitatory);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, PathBuf::from("qif-tui.log"));
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = SimConfig::from_toml(SAMPLE).unwrap();
        let cli = Cli::parse_from(["qif-tui", "--size", "64", "--timestep-us", "1000", "--log-level", "warn"]);
        config.apply_cli_overrides(&cli);
        assert_eq!(config.population.size, 64);
        assert_eq!(config.timestep_us, 1000);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.ticks, Some(5000));
    }

    #[test]
    fn rejects_unknown_model() {
        let err = SimConfig::from_toml("[population]\nmodel = \"Lif\"\n").unwrap_err();
        assert!(err.to_string().contains("Lif"));
    }

    #[test]
    fn stimulus_schedule() {
        let s = StimulusConfig {
            targets: vec![0],
            receptor: Receptor::Excitatory,
            weight: 1.0,
            start: 5,
            period: 3,
            stop: Some(11),
        };
        let due: Vec<u64> = (0..20).filter(|t| s.fires_at(*t)).collect();
        assert_eq!(due, vec![5, 8, 11]);

        let once = StimulusConfig { period: 0, stop: None, ..s };
        assert_eq!((0..20).filter(|t| once.fires_at(*t)).count(), 1);
    }

    #[test]
    fn shipped_config_is_valid() {
        let config = SimConfig::from_toml(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config.population.model, "QIFCurrDelta");
        assert_eq!(config.stimuli.len(), 2);
        assert_eq!(config.stimuli[1].receptor, Receptor::Inhibitory);
    }
}
