use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use crate::app::App;
use crate::sync::ClickSink;

/// Wait up to `timeout` for a key and handle it
pub fn handle_input<S: ClickSink>(app: &mut App<S>, timeout: Duration) -> anyhow::Result<()> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                handle_key_event(app, key);
            }
        }
    }
    Ok(())
}

/// Handle a key event
fn handle_key_event<S: ClickSink>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => {
            app.quit();
        }

        // Ctrl+C - quit
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.quit();
        }

        // Cycle
        KeyCode::Char('s') => {
            app.toggle_sync();
        }
        KeyCode::Char('r') => {
            app.reanchor();
        }

        // Metronome
        KeyCode::Char('m') => {
            app.toggle_metronome();
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.bpm_up();
        }
        KeyCode::Char('-') => {
            app.bpm_down();
        }
        KeyCode::Char('b') => {
            app.cycle_beats_per_bar();
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.volume_up();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.volume_down();
        }

        // ? - toggle help
        KeyCode::Char('?') => {
            app.toggle_help();
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ClickEvent, LoopSync, MonotonicClock, SessionSettings};
    use std::path::PathBuf;

    fn press(app: &mut App<Vec<ClickEvent>>, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_key_bindings() {
        let sync = LoopSync::new(MonotonicClock, Vec::new(), SessionSettings::default());
        let mut app = App::new(sync, PathBuf::from("take.wav"), 8.0);

        press(&mut app, KeyCode::Char('s'));
        assert!(app.sync.cycle().is_active());

        press(&mut app, KeyCode::Char('m'));
        assert!(app.sync.metronome().is_enabled());

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.sync.tempo().bpm, 121);
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.sync.tempo().bpm, 119);

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.sync.tempo().beats_per_bar, 5);

        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);

        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit());
    }
}
