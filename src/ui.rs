//! Viewport renderer: header box, paginated body, footer line.
//!
//! Everything is drawn straight into a [`Buffer`] from the current [`App`]
//! so the layout rules can be checked without a terminal. Each region is
//! skipped as a whole when the frame is too small for it; nothing is ever
//! written outside the frame.

use ratatui::{
  Frame,
  buffer::Buffer,
  layout::{Position, Rect},
  style::{Modifier, Style},
  symbols::border,
  widgets::{Block, Borders, Widget},
};

use crate::app::{App, ViewState};
use crate::wrap::{char_width, display_width, truncate_to_width, wrap};

// --- Layout ---

pub const HEADER_ROWS: u16 = 4;
pub const FOOTER_ROWS: u16 = 3;

const MIN_HEADER_ROWS: u16 = 6;
const MIN_FOOTER_ROWS: u16 = 7;
const MIN_BODY_ROWS: u16 = HEADER_ROWS + FOOTER_ROWS + 1;
const MIN_FRAME_COLS: u16 = 4;
/// Border plus padding on each side leaves `cols - 4` columns of text.
const MIN_BODY_COLS: u16 = 7;

/// Border and padding before the first text column.
const INSET: u16 = 2;

const PROGRAM_TITLE: &str = " 8p ";
const MIX_LABEL: &str = "Mix:   ";
const TRACK_LABEL: &str = "Track: ";

const START_HINTS: &str = "q Quit  s Search";
const PLAY_HINTS: &str = "q Quit  s Search  p Play/Pause  n Next track  N Next mix";
const SELECT_HINTS: &str = "ESC Exit  Enter Select";
const SEARCH_PROMPT: &str = "ESC Exit |  Search: ";

const START_TEXT: [&str; 2] = ["Welcome to 8p.", "Press \"s\" to start searching for 8tracks.com mixes."];

const SEARCH_HELP: [&str; 16] = [
  "Search Help",
  "-----------",
  "",
  "Search by using Smart ID, for example:",
  "",
  "Smart ID                    Result",
  "all:popular                 all mixes",
  "tags:chill                  mixes tagged \"chill\"",
  "tags:chill+hip_hop:recent   new mixes tagged \"chill\" & \"hip hop\"",
  "artist:Radiohead            mixes including songs by Radiohead",
  "keyword:ocarina             mixes including the text \"ocarina\"",
  "dj:1                        mixes published by the user with id=1",
  "liked:1                     mixes liked by the user with id=1",
  "similar:14                  mixes similar to mix with id=14",
  "",
  "Note: no spaces allowed.",
];

/// Where each region goes for a given frame; `None` means the region is not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
  pub header: Option<Rect>,
  pub body: Option<Rect>,
  pub footer: Option<Rect>,
}

pub fn layout(area: Rect) -> Regions {
  let (rows, cols) = (area.height, area.width);

  let header = (rows >= MIN_HEADER_ROWS && cols >= MIN_FRAME_COLS).then(|| Rect { height: HEADER_ROWS, ..area });
  let footer = (rows >= MIN_FOOTER_ROWS && cols >= MIN_FRAME_COLS)
    .then(|| Rect { y: area.y + rows - FOOTER_ROWS, height: FOOTER_ROWS, ..area });
  let body = (rows >= MIN_BODY_ROWS && cols >= MIN_BODY_COLS)
    .then(|| Rect { y: area.y + HEADER_ROWS, height: rows - HEADER_ROWS - FOOTER_ROWS, ..area });

  Regions { header, body, footer }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &App) {
  let area = frame.area();
  if let Some(cursor) = render(app, area, frame.buffer_mut()) {
    frame.set_cursor_position(cursor);
  }
}

/// Draw the whole viewport. Returns where the terminal cursor goes, if it is shown at all.
pub fn render(app: &App, area: Rect, buf: &mut Buffer) -> Option<Position> {
  let regions = layout(area);
  if let Some(header) = regions.header {
    render_header(app, header, regions.body.is_some(), buf);
  }
  if let Some(body) = regions.body {
    render_body(app, body, buf);
  }
  regions.footer.and_then(|footer| render_footer(app, footer, buf))
}

fn render_header(app: &App, area: Rect, joined: bool, buf: &mut Buffer) {
  let set = if joined { border::Set { bottom_left: "├", bottom_right: "┤", ..border::PLAIN } } else { border::PLAIN };
  Block::bordered().border_set(set).render(area, buf);

  let inner = usize::from(area.width - MIN_FRAME_COLS);
  buf.set_stringn(area.x + 3, area.y, PROGRAM_TITLE, inner, Style::default());

  let value_w = inner.saturating_sub(display_width(MIX_LABEL));
  let mix = match &app.mix {
    Some(mix) => format!("{}{}", MIX_LABEL, truncate_to_width(&mix.name, value_w)),
    None => MIX_LABEL.trim_end().to_string(),
  };
  let track = match app.current_track() {
    Some(track) => format!("{}{}", TRACK_LABEL, truncate_to_width(&track.label(), value_w)),
    None => TRACK_LABEL.trim_end().to_string(),
  };
  buf.set_stringn(area.x + INSET, area.y + 1, mix, inner, Style::default());
  buf.set_stringn(area.x + INSET, area.y + 2, track, inner, Style::default());
}

// --- Body ---

/// Prints wrapped blocks top to bottom, honouring the scroll offset and the
/// bottom edge of the body.
struct BodyPrinter<'a> {
  buf: &'a mut Buffer,
  x: u16,
  width: usize,
  y: u16,
  bottom: u16,
  scroll: usize,
}

impl<'a> BodyPrinter<'a> {
  fn new(area: Rect, scroll: usize, buf: &'a mut Buffer) -> Self {
    Self {
      buf,
      x: area.x + INSET,
      width: usize::from(area.width - 2 * INSET),
      y: area.y,
      bottom: area.bottom(),
      scroll,
    }
  }

  fn print(&mut self, text: &str) {
    self.print_styled(text, false);
  }

  fn print_highlighted(&mut self, text: &str) {
    self.print_styled(text, true);
  }

  fn print_styled(&mut self, text: &str, highlight: bool) {
    // Starts below the body: this block and everything after it is invisible.
    if self.y >= self.bottom {
      return;
    }
    let Some(wrapped) = wrap(text, self.width) else { return };
    let style = if highlight { Style::default().add_modifier(Modifier::REVERSED) } else { Style::default() };

    for line in block_lines(&wrapped) {
      if self.scroll > 0 {
        self.scroll -= 1;
        continue;
      }
      if self.y >= self.bottom {
        return;
      }
      self.buf.set_stringn(self.x, self.y, line, self.width, style);
      self.y += 1;
    }
  }
}

/// Lines of a wrapped block. A trailing newline ends the last line rather than
/// opening an empty one; an empty block is one blank line.
fn block_lines(text: &str) -> std::str::Split<'_, char> {
  text.strip_suffix('\n').unwrap_or(text).split('\n')
}

fn render_body(app: &App, area: Rect, buf: &mut Buffer) {
  Block::new().borders(Borders::LEFT | Borders::RIGHT).render(area, buf);

  let mut out = BodyPrinter::new(area, app.scroll.get(), buf);
  match app.view {
    ViewState::Start => START_TEXT.iter().for_each(|line| out.print(line)),
    ViewState::Search => SEARCH_HELP.iter().for_each(|line| out.print(line)),
    ViewState::Searching => out.print("Searching..."),
    ViewState::Select => render_results(app, &mut out),
    ViewState::Play => render_playlist(app, &mut out),
  }
}

fn render_results(app: &App, out: &mut BodyPrinter) {
  let Some(list) = app.results.as_ref().filter(|l| !l.is_empty()) else {
    out.print("Search returned no results.");
    return;
  };

  let selected = list.selected();
  for (i, entry) in list.iter_from_selected() {
    let Some(mix) = entry else {
      out.print("-. Error");
      continue;
    };
    let title = format!("{}. {}", i + 1, mix.name);
    if i == selected {
      out.print_highlighted(&title);
      out.print("");
    } else {
      out.print(&title);
    }
    out.print(&format!("\nDescription:\n{}", mix.description));
    out.print(&format!("Tags: {}", mix.tags));
    out.print(&format!("Number of plays: {}", mix.plays_count));
    out.print(&format!("Number of likes: {}", mix.likes_count));
    out.print("\n---\n\n");
  }
}

fn render_playlist(app: &App, out: &mut BodyPrinter) {
  out.print("Playlist");
  out.print("--------");
  let Some(mix) = &app.mix else { return };
  for (i, track) in mix.tracks.iter().enumerate() {
    out.print(&format!("{}. {}", i + 1, track.label()));
  }
}

// --- Footer ---

fn render_footer(app: &App, area: Rect, buf: &mut Buffer) -> Option<Position> {
  Block::bordered().border_set(border::Set { top_left: "├", top_right: "┤", ..border::PLAIN }).render(area, buf);

  let x = area.x + INSET;
  let y = area.y + 1;
  let inner = usize::from(area.width - MIN_FRAME_COLS);

  if app.view == ViewState::Search {
    return Some(render_prompt(app, x, y, inner, buf));
  }

  let text = match (app.warning(), app.view) {
    (Some(msg), _) => format!("Warning: {}", msg),
    (None, ViewState::Start) => START_HINTS.to_string(),
    (None, ViewState::Play) => PLAY_HINTS.to_string(),
    (None, ViewState::Select) => SELECT_HINTS.to_string(),
    (None, _) => String::new(),
  };
  buf.set_stringn(x, y, text, inner, Style::default());
  None
}

/// Search prompt plus the query. Long queries scroll horizontally to keep the cursor visible.
fn render_prompt(app: &App, x: u16, y: u16, inner: usize, buf: &mut Buffer) -> Position {
  buf.set_stringn(x, y, SEARCH_PROMPT, inner, Style::default());

  let prompt_w = display_width(SEARCH_PROMPT);
  let avail = inner.saturating_sub(prompt_w);
  let cursor_col = app.query.cursor_column();
  let glyphs: Vec<(usize, usize, char)> = app
    .query
    .text()
    .chars()
    .scan(0usize, |col, c| {
      let start = *col;
      *col += char_width(c);
      Some((start, *col, c))
    })
    .collect();

  // The first visible column always starts a glyph so no wide glyph is cut in half.
  let wanted = if cursor_col < avail { 0 } else { (cursor_col + 1).saturating_sub(avail) };
  let origin = glyphs.iter().map(|&(start, _, _)| start).find(|&start| start >= wanted).unwrap_or(cursor_col);

  let visible: String = glyphs
    .iter()
    .skip_while(|(start, _, _)| *start < origin)
    .take_while(|(_, end, _)| *end <= origin + avail)
    .map(|&(_, _, c)| c)
    .collect();
  if avail > 0 {
    buf.set_stringn(x + prompt_w as u16, y, visible, avail, Style::default());
  }

  let last_col = x + inner.saturating_sub(1) as u16;
  let cursor_x = (usize::from(x) + prompt_w + cursor_col.saturating_sub(origin)).min(usize::from(last_col)) as u16;
  Position::new(cursor_x, y)
}
