// TUI rendering: spike raster (time on X, neuron IDs on Y), membrane trace and status.

use std::io::Stdout;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph, Sparkline},
    Terminal,
};

use crate::app::App;
use crate::backend::QifBackend;

/// Draws the UI each frame:
/// - Top: spike raster grid as rows (neurons) x columns (time, circular).
/// - Middle: membrane potential of the traced neuron.
/// - Bottom: tick, neuron count, spike counts, run state, controls.
pub fn draw<B: QifBackend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App<B>,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Percentage(60),
                Constraint::Percentage(25),
                Constraint::Percentage(15),
            ])
            .split(f.size());

        let label_width = app.raster.len().saturating_sub(1).to_string().len().max(2);
        let lines: Vec<String> = app
            .raster
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let mut line = format!("n{row_idx:0label_width$} |");
                line.extend(row.iter());
                line
            })
            .collect();
        let title = if app.backend.neurons() > app.raster.len() {
            format!("Spike Raster  (time →, first {} of {})", app.raster.len(), app.backend.neurons())
        } else {
            "Spike Raster  (time →)".to_string()
        };
        let raster_widget = Paragraph::new(Text::from(lines.join("\n")))
            .block(Block::default().title(title).borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        f.render_widget(raster_widget, chunks[0]);

        let (lo, hi) = app
            .trace
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let span = (hi - lo).max(1.0);
        let data: Vec<u64> = app.trace.iter().map(|v| ((v - lo) / span * 100.0) as u64).collect();
        let trace_title = match app.trace.back() {
            Some(v) => format!("Membrane potential  v = {v:.2} mV  [{lo:.1}, {hi:.1}]"),
            None => "Membrane potential".to_string(),
        };
        let trace_widget = Sparkline::default()
            .block(Block::default().title(trace_title).borders(Borders::ALL))
            .data(&data)
            .max(100)
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(trace_widget, chunks[1]);

        let mut status = format!(
            "Tick: {} | Neurons: {} | Spikes: {} (last {}) | Saturated: {} | Running: {} | Controls: [s] Step  [r] Run/Pause  [q] Quit",
            app.backend.tick(),
            app.backend.neurons(),
            app.total_spikes,
            app.last_spikes,
            app.backend.saturation_events(),
            if app.running { "yes" } else { "no" }
        );
        if let Some(msg) = &app.message {
            status.push_str(&format!("\n{msg}"));
        }
        let status_widget = Paragraph::new(status)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[2]);
    })?;
    Ok(())
}
