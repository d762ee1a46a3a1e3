//! Live terminal view of an engine run (feature `tui`, launched with `--tui`).

mod controls;
mod layout;
pub mod runtime;
mod style;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::config::ScenarioConfig;
use runtime::App;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Raw mode and the alternate screen, undone on drop.
struct TerminalGuard {
    terminal: Term,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                Err(e)
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Runs `scenario` (shown as `name`) until the user quits.
///
/// # Errors
///
/// Returns an I/O error if the fleet cannot be built, the terminal cannot be
/// set up, or drawing fails.
pub fn run(name: &str, scenario: &ScenarioConfig) -> io::Result<()> {
    let mut app = App::new(name, scenario).map_err(io::Error::other)?;
    let mut guard = TerminalGuard::enter()?;
    event_loop(&mut guard.terminal, &mut app)
}

fn event_loop(terminal: &mut Term, app: &mut App) -> io::Result<()> {
    while !app.quit {
        terminal.draw(|frame| layout::render(frame, app))?;

        let interval = Duration::from_millis(app.tick_interval_ms());
        let wait = (app.last_tick + interval).saturating_duration_since(Instant::now());
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                controls::handle_key(app, key);
            }
        }

        let due = app.last_tick.elapsed() >= interval;
        if due && !app.paused && !app.is_finished() {
            app.tick();
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}
