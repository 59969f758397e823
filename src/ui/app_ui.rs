use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, MessageType};
use crate::sync::ClickSink;
use crate::ui::widgets::{render_cycle_view, render_help_view, render_status_bar, CycleViewState};

/// Render the main UI
pub fn render_ui<S: ClickSink>(frame: &mut Frame, app: &App<S>) {
    // If help is shown, render help view instead of normal UI
    if app.show_help {
        render_help_view(frame, frame.area());
        return;
    }

    let mut constraints = vec![
        Constraint::Length(1), // Status bar
        Constraint::Length(1), // Line break
    ];
    if app.message.is_some() {
        constraints.push(Constraint::Length(3)); // Message bar
    }
    constraints.push(Constraint::Min(1)); // Cycle view

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    let sync = &app.sync;
    let position = app.cycle_position_str();
    let take = app.take_name();
    render_status_bar(
        frame,
        chunks[0],
        &take,
        sync.cycle().state(),
        sync.tempo(),
        &position,
    );

    if let Some(ref msg) = app.message {
        let (color, prefix) = match msg.msg_type {
            MessageType::Info => (Color::Cyan, "• "),
            MessageType::Warning => (Color::Yellow, "⚠ "),
            MessageType::Error => (Color::Red, "✖ "),
        };
        let text = format!("{}{}", prefix, msg.text);
        let message_widget = Paragraph::new(Line::from(text))
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(message_widget, chunks[2]);
    }

    let state = CycleViewState {
        active: sync.cycle().is_active(),
        progress: sync.cycle_progress(),
        phase: sync.beat_phase(),
        tempo: *sync.tempo(),
        metronome_enabled: sync.metronome().is_enabled(),
        volume: sync.metronome().volume(),
    };
    let view_area = chunks[chunks.len() - 1];
    render_cycle_view(frame, view_area, &state);
}
