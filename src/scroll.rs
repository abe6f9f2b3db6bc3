/// Header and footer rows eaten out of the terminal height before paging.
const CHROME_ROWS: usize = 7;

/// Number of wrapped body lines to skip before drawing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOffset(usize);

impl ScrollOffset {
  pub fn get(self) -> usize {
    self.0
  }

  pub fn reset(&mut self) {
    self.0 = 0;
  }

  pub fn page_up(&mut self, rows: u16) {
    self.0 = self.0.saturating_sub(page_step(rows));
  }

  pub fn page_down(&mut self, rows: u16) {
    self.0 = self.0.saturating_add(page_step(rows));
  }
}

/// A third of the body height, never less than one line.
pub fn page_step(rows: u16) -> usize {
  (usize::from(rows).saturating_sub(CHROME_ROWS) / 3).max(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_step_is_a_third_of_the_body() {
    assert_eq!(page_step(37), 10);
    assert_eq!(page_step(24), 5);
  }

  #[test]
  fn page_step_is_at_least_one() {
    assert_eq!(page_step(0), 1);
    assert_eq!(page_step(7), 1);
    assert_eq!(page_step(9), 1);
  }

  #[test]
  fn never_goes_negative() {
    let mut s = ScrollOffset::default();
    for _ in 0..50 {
      s.page_up(40);
    }
    assert_eq!(s.get(), 0);
  }

  #[test]
  fn down_then_up_returns_home() {
    let mut s = ScrollOffset::default();
    s.page_down(24);
    s.page_down(24);
    assert_eq!(s.get(), 10);
    s.page_up(24);
    assert_eq!(s.get(), 5);
    s.reset();
    assert_eq!(s.get(), 0);
  }
}
