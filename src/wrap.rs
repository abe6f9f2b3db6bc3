//! Display-width aware text wrapping.
//!
//! Widths are measured in terminal columns, not chars: a CJK ideograph takes two
//! cells, a combining mark none. Wrap decisions have to agree with what the
//! terminal draws or the right border of the viewport gets overrun.

use unicode_width::UnicodeWidthChar;

/// Below this width wrapping is not attempted.
pub const MIN_WRAP_WIDTH: usize = 3;

/// Column width of a single char. Control characters count as zero.
pub fn char_width(c: char) -> usize {
  c.width().unwrap_or(0)
}

/// Column width of a whole string (newlines count as zero).
pub fn display_width(s: &str) -> usize {
  s.chars().map(char_width).sum()
}

/// Wrap `text` so that no line (text between newlines) is wider than `max_width` columns.
///
/// Lines are broken at the last space before the overflowing char; a word with no
/// space to break at is hard-broken right before the char that would overflow.
/// Tabs become single spaces. Nothing is removed or reordered: the result only
/// differs from the input by inserted newlines and spaces turned into newlines.
///
/// Returns `None` when `max_width` is below [`MIN_WRAP_WIDTH`].
pub fn wrap(text: &str, max_width: usize) -> Option<String> {
  if max_width < MIN_WRAP_WIDTH {
    return None;
  }

  let mut chars: Vec<char> = text.chars().map(|c| if c == '\t' { ' ' } else { c }).collect();
  let mut line_start = 0;
  let mut width = 0;
  let mut i = 0;

  while i < chars.len() {
    if chars[i] == '\n' {
      line_start = i + 1;
      width = 0;
      i += 1;
      continue;
    }

    width += char_width(chars[i]);
    if width <= max_width {
      i += 1;
      continue;
    }

    match (line_start..=i).rev().find(|&j| chars[j] == ' ') {
      Some(j) => {
        chars[j] = '\n';
        line_start = j + 1;
        i = j + 1;
      }
      None => {
        chars.insert(i, '\n');
        line_start = i + 1;
        i += 1;
      }
    }
    width = 0;
  }

  Some(chars.into_iter().collect())
}

/// Cut `s` down to `max_width` columns, ending in "…" when anything was dropped.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
  if display_width(s) <= max_width {
    return s.to_string();
  }
  if max_width == 0 {
    return String::new();
  }

  let budget = max_width - 1;
  let mut used = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = char_width(c);
    if used + w > budget {
      break;
    }
    used += w;
    out.push(c);
  }
  out.push('…');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn widest_line(s: &str) -> usize {
    s.split('\n').map(display_width).max().unwrap_or(0)
  }

  /// Walk input and output together; the output may only add newlines or turn spaces into newlines.
  fn only_breaks_added(input: &str, output: &str) -> bool {
    let src: Vec<char> = input.chars().map(|c| if c == '\t' { ' ' } else { c }).collect();
    let mut p = 0;
    for c in output.chars() {
      match src.get(p).copied() {
        Some(s) if s == c => p += 1,
        Some(' ') if c == '\n' => p += 1,
        _ if c == '\n' => {}
        _ => return false,
      }
    }
    p == src.len()
  }

  // --- wrap ---

  #[test]
  fn short_line_is_untouched() {
    assert_eq!(wrap("hello", 10).as_deref(), Some("hello"));
    assert_eq!(wrap("", 10).as_deref(), Some(""));
  }

  #[test]
  fn exact_fit_is_untouched() {
    assert_eq!(wrap("abcde", 5).as_deref(), Some("abcde"));
  }

  #[test]
  fn breaks_at_last_space() {
    assert_eq!(wrap("the quick brown fox", 10).as_deref(), Some("the quick\nbrown fox"));
  }

  #[test]
  fn long_word_is_hard_broken_at_width() {
    assert_eq!(wrap("abcdefghij", 4).as_deref(), Some("abcd\nefgh\nij"));
  }

  #[test]
  fn existing_newlines_reset_width() {
    assert_eq!(wrap("abcd\nefgh", 4).as_deref(), Some("abcd\nefgh"));
    assert_eq!(wrap("ab\n\ncd", 3).as_deref(), Some("ab\n\ncd"));
  }

  #[test]
  fn tabs_become_spaces() {
    assert_eq!(wrap("a\tb", 10).as_deref(), Some("a b"));
    assert_eq!(wrap("aaa\tbbb", 4).as_deref(), Some("aaa\nbbb"));
  }

  #[test]
  fn wide_glyphs_count_two_columns() {
    // Each ideograph is two columns wide, so only two fit in five columns.
    assert_eq!(wrap("日本語テキスト", 5).as_deref(), Some("日本\n語テ\nキス\nト"));
  }

  #[test]
  fn wide_glyphs_break_at_spaces() {
    assert_eq!(wrap("日本 語テ", 6).as_deref(), Some("日本\n語テ"));
  }

  #[test]
  fn word_after_hard_break_keeps_its_space() {
    let out = wrap("abcdefgh ij", 5).unwrap_or_default();
    assert_eq!(out, "abcde\nfgh\nij");
  }

  #[test]
  fn degenerate_width_is_rejected() {
    assert!(wrap("anything", 2).is_none());
    assert!(wrap("anything", 0).is_none());
    assert!(wrap("anything", MIN_WRAP_WIDTH).is_some());
  }

  #[test]
  fn wrapping_twice_changes_nothing() {
    let text = "Description:\nA long, winding description of a mix with 日本語 words and tabs\tin it.";
    let once = wrap(text, 12).unwrap_or_default();
    assert_eq!(wrap(&once, 12).as_deref(), Some(once.as_str()));
  }

  // --- truncate_to_width ---

  #[test]
  fn truncate_keeps_short_strings() {
    assert_eq!(truncate_to_width("Chill Vibes", 20), "Chill Vibes");
    assert_eq!(truncate_to_width("abc", 3), "abc");
  }

  #[test]
  fn truncate_adds_ellipsis() {
    assert_eq!(truncate_to_width("Chill Vibes", 6), "Chill…");
    assert_eq!(truncate_to_width("abc", 0), "");
  }

  #[test]
  fn truncate_respects_wide_glyphs() {
    // Two columns of budget before the ellipsis hold one ideograph.
    assert_eq!(truncate_to_width("日本語", 4), "日…");
    assert_eq!(display_width(&truncate_to_width("日本語", 4)), 3);
  }

  // --- properties ---

  proptest! {
    #[test]
    fn lines_never_exceed_width(text in "[a-z \t\n日本é]{0,80}", width in 3usize..24) {
      let out = wrap(&text, width).unwrap_or_default();
      prop_assert!(widest_line(&out) <= width);
    }

    #[test]
    fn wrapping_only_adds_breaks(text in "[a-z \t\n日本é]{0,80}", width in 3usize..24) {
      let out = wrap(&text, width).unwrap_or_default();
      prop_assert!(only_breaks_added(&text, &out));
    }

    #[test]
    fn wrapping_is_idempotent(text in "[a-z \t\n日本é]{0,80}", width in 3usize..24) {
      let once = wrap(&text, width).unwrap_or_default();
      let twice = wrap(&once, width).unwrap_or_default();
      prop_assert_eq!(once, twice);
    }
  }
}
