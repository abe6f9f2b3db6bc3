//! Single-line, cursor-addressed search input.

use crate::wrap::char_width;

/// What an empty query is sent as. The mix service lists everything for it.
pub const EMPTY_QUERY: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Left,
  Right,
}

/// Code points typed so far plus a cursor in `0..=len`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryBuffer {
  chars: Vec<char>,
  cursor: usize,
}

/// Control characters a terminal may hand us as plain chars.
fn is_rejected(c: char) -> bool {
  matches!(c, '\0' | '\x07' | '\x08' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

impl QueryBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.chars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  /// Insert `c` before the cursor and step past it. Returns false for rejected control chars.
  pub fn insert(&mut self, c: char) -> bool {
    if is_rejected(c) {
      return false;
    }
    self.chars.insert(self.cursor, c);
    self.cursor += 1;
    true
  }

  /// Backspace.
  pub fn delete_before(&mut self) {
    if self.cursor == 0 {
      return;
    }
    self.cursor -= 1;
    self.chars.remove(self.cursor);
  }

  /// Delete key: the cursor stays put.
  pub fn delete_at(&mut self) {
    if self.cursor < self.chars.len() {
      self.chars.remove(self.cursor);
    }
  }

  pub fn move_cursor(&mut self, direction: Direction) {
    match direction {
      Direction::Left => self.cursor = self.cursor.saturating_sub(1),
      Direction::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
    }
  }

  pub fn clear(&mut self) {
    self.chars.clear();
    self.cursor = 0;
  }

  /// The buffer as typed.
  pub fn text(&self) -> String {
    self.chars.iter().collect()
  }

  /// The string handed to the search service.
  pub fn to_query(&self) -> String {
    if self.chars.is_empty() { EMPTY_QUERY.to_string() } else { self.text() }
  }

  /// Display columns occupied by everything before the cursor.
  pub fn cursor_column(&self) -> usize {
    self.chars[..self.cursor].iter().copied().map(char_width).sum()
  }
}
