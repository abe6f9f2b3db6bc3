use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, ViewState};
use crate::query::Direction;

// --- Input Events ---

/// Keys the client reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Char(char),
  Up,
  Down,
  Left,
  Right,
  Backspace,
  Delete,
  Enter,
  Esc,
  PageUp,
  PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
  Key(Key),
  Resize,
}

/// Map a terminal event to an [`Input`], dropping everything we don't handle.
pub fn translate(event: &Event) -> Option<Input> {
  match event {
    Event::Key(key) if key.kind == KeyEventKind::Press => translate_key(key).map(Input::Key),
    Event::Resize(..) => Some(Input::Resize),
    _ => None,
  }
}

fn translate_key(key: &KeyEvent) -> Option<Key> {
  let k = match key.code {
    KeyCode::Char(_) if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => return None,
    KeyCode::Char(c) => Key::Char(c),
    KeyCode::Up => Key::Up,
    KeyCode::Down => Key::Down,
    KeyCode::Left => Key::Left,
    KeyCode::Right => Key::Right,
    KeyCode::Backspace => Key::Backspace,
    KeyCode::Delete => Key::Delete,
    KeyCode::Enter => Key::Enter,
    KeyCode::Esc => Key::Esc,
    KeyCode::PageUp => Key::PageUp,
    KeyCode::PageDown => Key::PageDown,
    _ => return None,
  };
  Some(k)
}

// --- Event Handling ---

type KeyHandler = fn(&mut App, Key);

fn handler_for(view: ViewState) -> KeyHandler {
  match view {
    ViewState::Start => handle_start_key,
    ViewState::Search => handle_search_key,
    ViewState::Searching => handle_searching_key,
    ViewState::Select => handle_select_key,
    ViewState::Play => handle_play_key,
  }
}

/// Dispatch one input. Scrolling and resize are the same in every view and
/// never reach the per-view handlers. `rows` is the current terminal height.
pub fn handle_input(app: &mut App, input: Input, rows: u16) {
  match input {
    Input::Resize => app.scroll.reset(),
    Input::Key(Key::PageUp) => app.scroll.page_up(rows),
    Input::Key(Key::PageDown) => app.scroll.page_down(rows),
    Input::Key(key) => handler_for(app.view)(app, key),
  }
}

fn handle_start_key(app: &mut App, key: Key) {
  match key {
    Key::Char('q') => app.quit(),
    Key::Char('s') => app.enter_search(),
    _ => {}
  }
}

fn handle_play_key(app: &mut App, key: Key) {
  match key {
    Key::Char('q') => app.quit(),
    Key::Char('s') => app.enter_search(),
    Key::Char('n') => app.skip(),
    Key::Char('p') => app.toggle_pause(),
    Key::Char('N') => app.force_next_mix(),
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: Key) {
  match key {
    Key::Enter => app.commit_search(),
    Key::Esc => app.exit_search(),
    Key::Char(c) => {
      app.query.insert(c);
    }
    Key::Backspace => app.query.delete_before(),
    Key::Delete => app.query.delete_at(),
    Key::Left => app.query.move_cursor(Direction::Left),
    Key::Right => app.query.move_cursor(Direction::Right),
    _ => {}
  }
}

fn handle_searching_key(app: &mut App, key: Key) {
  if key == Key::Esc {
    app.cancel_search();
  }
}

fn handle_select_key(app: &mut App, key: Key) {
  match key {
    Key::Up => app.select_prev(),
    Key::Down => app.select_next(),
    Key::Enter => app.choose_selected(),
    Key::Esc => app.exit_select(),
    Key::Char('s') => app.enter_search(),
    _ => {}
  }
}
