// Terminal event handling
//
// This module translates keyboard, mouse and resize events into
// dashboard controller operations.

use super::{Dashboard, Screen};
use crate::net::FragmentKind;
use crate::window::Preset;
use crossterm::event::{Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};

/// Handle keyboard events and update dashboard state
///
/// Returns `true` if the application should continue running,
/// `false` if it should exit.
///
/// # Key Bindings
/// - `q`, `Q`, `Esc` - Quit the application
/// - `1`..`8` - Period presets (today, 1 hour, ... yearly)
/// - `Left` / `Right` - Previous / next day
/// - `l`, `L` - Resume live refresh
/// - `r`, `R` - Refresh now
/// - `+`, `=` - Slower refresh (longer cadence)
/// - `-`, `_` - Faster refresh (shorter cadence)
/// - `t`, `f`, `s`, `b` - Show/hide the timeline, flow, stats and band panels
pub fn handle_key_event(app: &mut Dashboard, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.teardown();
            false
        }
        KeyCode::Char(c @ '1'..='8') => {
            let idx = c as usize - '1' as usize;
            app.select_preset(Preset::ALL[idx]);
            true
        }
        KeyCode::Left => {
            app.previous_day();
            true
        }
        KeyCode::Right => {
            app.next_day();
            true
        }
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.resume_live();
            true
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.refresh_now();
            true
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.slower_cadence();
            true
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.faster_cadence();
            true
        }
        KeyCode::Char('t') | KeyCode::Char('T') => {
            app.toggle_fragment(FragmentKind::Timeline);
            true
        }
        KeyCode::Char('f') | KeyCode::Char('F') => {
            app.toggle_fragment(FragmentKind::Flow);
            true
        }
        KeyCode::Char('s') | KeyCode::Char('S') => {
            app.toggle_fragment(FragmentKind::Stats);
            true
        }
        KeyCode::Char('b') | KeyCode::Char('B') => {
            app.toggle_fragment(FragmentKind::Band);
            true
        }
        _ => true,
    }
}

/// Handle mouse movement (hover) and left clicks (timeline day jumps)
pub fn handle_mouse_event(app: &mut Dashboard, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
            app.pointer_moved(mouse.column, mouse.row);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            app.pointer_moved(mouse.column, mouse.row);
            app.clicked(mouse.column, mouse.row);
        }
        _ => {}
    }
}

/// Dispatch one terminal event; returns `false` once the app should exit
pub fn handle_terminal_event(app: &mut Dashboard, event: Event) -> bool {
    match event {
        // Windows reports releases too
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(app, key.code),
        Event::Mouse(mouse) => {
            handle_mouse_event(app, mouse);
            true
        }
        Event::Resize(cols, rows) => {
            app.resize(Screen::detect(cols, rows));
            true
        }
        _ => true,
    }
}
