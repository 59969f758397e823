use ratatui::{
    layout::{Alignment, Rect},
    widgets::Paragraph,
    Frame,
};

use crate::analysis::Tempo;
use crate::types::CycleState;

/// Render the status bar
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    take: &str,
    state: CycleState,
    tempo: &Tempo,
    position: &str,
) {
    // Simple format: "take: {name}; state: {synced|stopped}; bpm: {N}; beats: {N} ({B}/4); pos: {position}"
    let state_text = match state {
        CycleState::Active => "synced",
        CycleState::Inactive => "stopped",
    };

    let status_text = format!(
        "  take: {}; state: {}; bpm: {}; beats: {} ({}/4); pos: {}",
        take,
        state_text,
        tempo.bpm,
        tempo.total_beats_in_cycle,
        tempo.beats_per_bar,
        position
    );
    let status_widget = Paragraph::new(status_text).alignment(Alignment::Left);

    frame.render_widget(status_widget, area);
}
