use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render the help view
pub fn render_help_view(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(""),
        Line::from("  loopsync - loop cycle clock and metronome"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Cycle", Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from("    s                Start or stop sync"),
        Line::from("    r                Restart the cycle now (keeps its length)"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Metronome", Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from("    m                Toggle metronome"),
        Line::from("    + / -            Tempo up / down by 1 BPM"),
        Line::from("    b                Beats per bar (2-7)"),
        Line::from("    ↑↓ or k/j        Click volume up / down"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Other", Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from("    ?                Toggle this help"),
        Line::from("    q or Ctrl+c      Quit"),
        Line::from(""),
        Line::from("  Press ? to close"),
    ];

    let paragraph = Paragraph::new(help_text).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}
