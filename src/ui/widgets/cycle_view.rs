use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Row, Table},
    Frame,
};

use crate::analysis::Tempo;
use crate::sync::BeatPhase;

/// Most beats drawn in the grid before it is cut off
const MAX_GRID_BEATS: u32 = 64;

/// Snapshot of what the cycle view draws
pub struct CycleViewState {
    pub active: bool,
    pub progress: f64,
    pub phase: BeatPhase,
    pub tempo: Tempo,
    pub metronome_enabled: bool,
    pub volume: f32,
}

/// Render cycle progress, the beat grid and metronome state
pub fn render_cycle_view(frame: &mut Frame, area: Rect, state: &CycleViewState) {
    let progress_color = if state.active { Color::Green } else { Color::DarkGray };

    let progress_str = format!(
        "{} {:3}%",
        create_progress_string(state.progress, 40),
        (state.progress * 100.0) as u8
    );

    let grid = if state.active {
        Line::from(beat_grid_spans(
            state.tempo.total_beats_in_cycle,
            state.tempo.beats_per_bar,
            state.phase.beat_index_in_cycle,
        ))
    } else {
        Line::from(Span::styled("-", Style::default().fg(Color::DarkGray)))
    };

    let metronome_str = format!(
        "{} {} {:3}%",
        if state.metronome_enabled { "[on] " } else { "[off]" },
        create_progress_string(state.volume as f64, 20),
        (state.volume * 100.0).round() as u8
    );
    let metronome_color = if state.metronome_enabled { Color::Yellow } else { Color::Gray };

    let rows = vec![
        Row::new(vec![
            Cell::from("  "),
            Cell::from("cycle"),
            Cell::from(progress_str).style(Style::default().fg(progress_color)),
        ]),
        Row::new(vec![Cell::from("  "), Cell::from("beats"), Cell::from(grid)]),
        Row::new(vec![
            Cell::from("  "),
            Cell::from("click"),
            Cell::from(metronome_str).style(Style::default().fg(metronome_color)),
        ]),
    ];

    let table = Table::new(
        rows,
        [
            Constraint::Length(2), // Left padding
            Constraint::Length(5), // Label
            Constraint::Min(20),   // Value
        ],
    )
    .column_spacing(1);

    frame.render_widget(table, area);
}

/// Text progress bar for a fraction in [0, 1]
fn create_progress_string(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = (fraction * width as f64) as usize;

    let mut bar = String::with_capacity(width * 3);
    for i in 0..width {
        bar.push(if i < filled { '▓' } else { '░' });
    }
    bar
}

/// One glyph per beat; bar starts are marked and the current beat is highlighted
fn beat_grid_spans(total_beats: u32, beats_per_bar: u32, current: u32) -> Vec<Span<'static>> {
    let beats_per_bar = beats_per_bar.max(1);
    let shown = total_beats.min(MAX_GRID_BEATS);

    let mut spans = Vec::with_capacity(shown as usize + 1);
    for beat in 0..shown {
        let bar_start = beat % beats_per_bar == 0;
        let glyph = if bar_start { "■" } else { "□" };

        let style = if beat == current {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if beat < current {
            Style::default().fg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        if bar_start && beat > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(glyph, style));
    }

    if total_beats > shown {
        spans.push(Span::raw(" …"));
    }
    spans
}
