//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::runtime::App;
use crate::config::ScenarioConfig;

/// What a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePause,
    Faster,
    Slower,
    /// Load `ScenarioConfig::PRESETS[i]`.
    Preset(usize),
    CycleStrategy,
    /// Run exactly one step; only honoured while paused.
    StepOnce,
    Restart,
}

/// Maps a key event to an action.
///
/// Only [`KeyEventKind::Press`] counts; some terminals also report releases.
pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('+' | '=') | KeyCode::Right => Action::Faster,
        KeyCode::Char('-') | KeyCode::Left => Action::Slower,
        KeyCode::Char('s') => Action::CycleStrategy,
        KeyCode::Char('n') => Action::StepOnce,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Char(c @ '1'..='9') => {
            let idx = c as usize - '1' as usize;
            if idx >= ScenarioConfig::PRESETS.len() {
                return None;
            }
            Action::Preset(idx)
        }
        _ => return None,
    };
    Some(action)
}

pub fn apply(app: &mut App, action: Action) {
    match action {
        Action::Quit => app.quit = true,
        Action::TogglePause => app.toggle_pause(),
        Action::Faster => app.speed_up(),
        Action::Slower => app.speed_down(),
        Action::Preset(idx) => app.switch_preset(ScenarioConfig::PRESETS[idx]),
        Action::CycleStrategy => app.cycle_strategy(),
        Action::StepOnce => {
            if app.paused {
                app.tick();
            }
        }
        Action::Restart => app.restart(),
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if let Some(action) = action_for(key) {
        apply(app, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::strategy::DieselStrategy;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_select_known_presets_only() {
        assert_eq!(action_for(press(KeyCode::Char('1'))), Some(Action::Preset(0)));
        assert_eq!(action_for(press(KeyCode::Char('3'))), Some(Action::Preset(2)));
        assert_eq!(action_for(press(KeyCode::Char('9'))), None);
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(action_for(release), None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(ctrl_c), Some(Action::Quit));
    }

    #[test]
    fn step_once_only_while_paused() {
        let mut app = App::new("baseline", &ScenarioConfig::baseline()).unwrap();
        handle_key(&mut app, press(KeyCode::Char('n')));
        assert_eq!(app.step_index(), 0);

        handle_key(&mut app, press(KeyCode::Char(' ')));
        handle_key(&mut app, press(KeyCode::Char('n')));
        assert_eq!(app.step_index(), 1);
    }

    #[test]
    fn keys_drive_preset_and_strategy() {
        let mut app = App::new("baseline", &ScenarioConfig::baseline()).unwrap();
        handle_key(&mut app, press(KeyCode::Char('2')));
        assert_eq!(app.preset_name, "off_grid");
        handle_key(&mut app, press(KeyCode::Char('s')));
        assert_eq!(app.strategy(), DieselStrategy::Manual);
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(app.quit);
    }
}
