use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::model::{Mix, ResultList, Track};
use crate::query::QueryBuffer;
use crate::scroll::ScrollOffset;

// --- Types ---

/// The active screen. Only the controller moves between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
  Start,
  Search,
  Searching,
  Select,
  Play,
}

/// Where the media side of the current mix stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
  /// No mix chosen yet.
  Idle,
  Playing,
  /// A next-track or next-mix request is in flight.
  Advancing,
  /// Fetching the next track failed; waits for the user to skip again.
  Ended,
}

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
  Search,
  NextMix,
  NextTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
  id: RequestId,
  kind: RequestKind,
}

/// Side effects requested by the controller, executed by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  Search { id: RequestId, query: String },
  NextMix { id: RequestId, mix_id: u64, smart_id: String },
  NextTrack { id: RequestId, mix_id: u64, first: bool },
  Report { track_id: u64, mix_id: u64 },
  Play { url: String },
  TogglePause,
  Stop,
  /// Abort the request in flight, if any.
  Cancel,
}

/// Result of a background request, tagged with the id it was issued under.
#[derive(Debug)]
pub struct Response {
  pub id: RequestId,
  pub outcome: Outcome,
}

#[derive(Debug)]
pub enum Outcome {
  Search { query: String, result: Result<Vec<Option<Mix>>> },
  NextMix(Result<Mix>),
  NextTrack(Result<Track>),
}

impl Outcome {
  fn kind(&self) -> RequestKind {
    match self {
      Outcome::Search { .. } => RequestKind::Search,
      Outcome::NextMix(_) => RequestKind::NextMix,
      Outcome::NextTrack(_) => RequestKind::NextTrack,
    }
  }
}

/// What the media service reported this iteration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MediaStatus {
  pub elapsed_ms: u64,
  pub ended: bool,
}

// --- Messages ---

pub const SEARCH_FAILED: &str = "Search failed.";
pub const NEXT_MIX_NOT_FOUND: &str = "Next mix not found.";
pub const SKIP_NOT_ALLOWED: &str = "Skip not allowed.";
pub const MIX_UNAVAILABLE: &str = "Mix unavailable.";
pub const NEXT_TRACK_FAILED: &str = "Next track not found.";

// --- App State ---

pub struct App {
  pub view: ViewState,
  /// State `Search` returns to on Esc or failure.
  pub previous: ViewState,
  /// State `Select` returns to on Esc.
  pub select_return: ViewState,
  pub query: QueryBuffer,
  pub scroll: ScrollOffset,
  pub results: Option<ResultList>,
  pub mix: Option<Mix>,
  /// Smart id the current mix was found with.
  pub smart_id: String,
  pub playback: Playback,
  pub should_quit: bool,
  warning: Option<String>,
  /// When the warning was raised, for auto-dismiss.
  warning_time: Option<Instant>,
  pending: Option<Pending>,
  next_id: RequestId,
  effects: Vec<Effect>,
}

impl Default for App {
  fn default() -> Self {
    Self::new()
  }
}

impl App {
  pub fn new() -> Self {
    Self {
      view: ViewState::Start,
      previous: ViewState::Start,
      select_return: ViewState::Start,
      query: QueryBuffer::new(),
      scroll: ScrollOffset::default(),
      results: None,
      mix: None,
      smart_id: String::new(),
      playback: Playback::Idle,
      should_quit: false,
      warning: None,
      warning_time: None,
      pending: None,
      next_id: 0,
      effects: Vec::new(),
    }
  }

  /// Drain the effects queued since the last call.
  pub fn take_effects(&mut self) -> Vec<Effect> {
    std::mem::take(&mut self.effects)
  }

  pub fn warning(&self) -> Option<&str> {
    self.warning.as_deref()
  }

  pub fn current_track(&self) -> Option<&Track> {
    self.mix.as_ref().and_then(Mix::current_track)
  }

  /// Show a warning in the footer for a few seconds.
  pub fn set_warning(&mut self, msg: &str) {
    self.warning = Some(msg.to_string());
    self.warning_time = Some(Instant::now());
  }

  /// Clear the warning once its time is up. The search prompt hides the
  /// warning, so its time only runs outside `Search`.
  pub fn expire_warning(&mut self) {
    if self.view == ViewState::Search {
      return;
    }
    if let Some(t) = self.warning_time
      && t.elapsed() >= Duration::from_secs(constants().warning_secs)
    {
      self.warning = None;
      self.warning_time = None;
    }
  }

  fn set_view(&mut self, view: ViewState) {
    if self.view != view {
      debug!(from = ?self.view, to = ?view, "view change");
    }
    if self.view == ViewState::Search && view != ViewState::Search && self.warning.is_some() {
      self.warning_time = Some(Instant::now());
    }
    self.view = view;
    self.scroll.reset();
  }

  // --- Requests ---

  /// Issue a background request. Whatever was in flight is superseded.
  fn request(&mut self, kind: RequestKind, effect: impl FnOnce(RequestId) -> Effect) {
    if let Some(old) = self.pending.take() {
      debug!(id = old.id, kind = ?old.kind, "request superseded");
      self.on_cancelled(old.kind);
    }
    self.next_id += 1;
    let id = self.next_id;
    self.pending = Some(Pending { id, kind });
    self.effects.push(effect(id));
  }

  fn cancel_pending(&mut self) {
    if let Some(old) = self.pending.take() {
      info!(id = old.id, kind = ?old.kind, "request cancelled");
      self.on_cancelled(old.kind);
      self.effects.push(Effect::Cancel);
    }
  }

  fn on_cancelled(&mut self, kind: RequestKind) {
    // The end of the track is noticed again on the next tick in Play.
    if kind != RequestKind::Search && self.playback == Playback::Advancing {
      self.playback = Playback::Playing;
    }
  }

  fn request_next_track(&mut self) {
    let Some(mix) = &self.mix else { return };
    let (mix_id, first) = (mix.id, mix.tracks.is_empty());
    info!(mix_id, first, "requesting next track");
    self.request(RequestKind::NextTrack, |id| Effect::NextTrack { id, mix_id, first });
    self.playback = Playback::Advancing;
  }

  fn request_next_mix(&mut self) {
    let Some(mix) = &self.mix else { return };
    let mix_id = mix.id;
    let smart_id = self.smart_id.clone();
    info!(mix_id, smart_id = %smart_id, "requesting next mix");
    self.request(RequestKind::NextMix, |id| Effect::NextMix { id, mix_id, smart_id });
    self.playback = Playback::Advancing;
  }

  /// Move on from the current track: a new mix first if it was the mix's last track.
  fn advance(&mut self) {
    if self.current_track().is_some_and(|t| t.last) {
      self.request_next_mix();
    } else {
      self.request_next_track();
    }
  }

  // --- Responses ---

  pub fn on_response(&mut self, response: Response) {
    let kind = response.outcome.kind();
    match self.pending {
      Some(p) if p.id == response.id && p.kind == kind => self.pending = None,
      _ => {
        debug!(id = response.id, kind = ?kind, "stale response ignored");
        return;
      }
    }

    match response.outcome {
      Outcome::Search { query, result } => self.on_search(query, result),
      Outcome::NextMix(result) => self.on_next_mix(result),
      Outcome::NextTrack(result) => self.on_next_track(result),
    }
  }

  fn on_search(&mut self, query: String, result: Result<Vec<Option<Mix>>>) {
    match result {
      Ok(entries) => {
        info!(query = %query, results = entries.len(), "search complete");
        if self.previous != ViewState::Select {
          self.select_return = self.previous;
        }
        self.results = Some(ResultList::new(entries, query));
        self.set_view(ViewState::Select);
      }
      Err(e) => {
        warn!(query = %query, err = %format!("{:#}", e), "search failed");
        self.set_warning(SEARCH_FAILED);
        self.set_view(self.previous);
      }
    }
  }

  fn on_next_mix(&mut self, result: Result<Mix>) {
    match result {
      Ok(mix) => {
        info!(mix_id = mix.id, name = %mix.name, "next mix");
        self.mix = Some(mix);
        if self.view == ViewState::Play {
          self.scroll.reset();
        }
        self.request_next_track();
      }
      Err(e) => {
        warn!(err = %format!("{:#}", e), "next mix failed");
        self.set_warning(NEXT_MIX_NOT_FOUND);
        self.playback = Playback::Idle;
        self.effects.push(Effect::Stop);
        self.leave_play();
      }
    }
  }

  fn on_next_track(&mut self, result: Result<Track>) {
    match result {
      Ok(track) => {
        let Some(mix) = self.mix.as_mut() else { return };
        info!(track_id = track.id, mix_id = mix.id, track = %track.label(), "track started");
        self.effects.push(Effect::Play { url: track.url.clone() });
        mix.tracks.push(track);
        self.playback = Playback::Playing;
      }
      Err(e) => {
        warn!(err = %format!("{:#}", e), "next track failed");
        self.set_warning(NEXT_TRACK_FAILED);
        self.playback = Playback::Ended;
      }
    }
  }

  /// Play is no longer reachable: send it and every return path to it back to Start.
  fn leave_play(&mut self) {
    if self.view == ViewState::Play {
      self.set_view(ViewState::Start);
    }
    if self.previous == ViewState::Play {
      self.previous = ViewState::Start;
    }
    if self.select_return == ViewState::Play {
      self.select_return = ViewState::Start;
    }
  }

  // --- Periodic checks ---

  /// Run once per loop iteration with the latest media status.
  pub fn tick(&mut self, status: MediaStatus) {
    self.expire_warning();
    if self.view != ViewState::Play || self.playback != Playback::Playing {
      return;
    }

    let threshold = constants().report_after_ms;
    if status.elapsed_ms >= threshold
      && let Some(mix) = self.mix.as_mut()
    {
      let mix_id = mix.id;
      if let Some(track) = mix.current_track_mut()
        && !track.reported
      {
        track.reported = true;
        info!(track_id = track.id, mix_id, "reporting play");
        self.effects.push(Effect::Report { track_id: track.id, mix_id });
      }
    }

    if status.ended {
      debug!("track ended");
      self.advance();
    }
  }

  // --- Commands ---

  pub fn quit(&mut self) {
    info!("quit requested");
    self.should_quit = true;
  }

  pub fn enter_search(&mut self) {
    self.previous = self.view;
    self.query.clear();
    self.set_view(ViewState::Search);
  }

  pub fn exit_search(&mut self) {
    self.query.clear();
    self.set_view(self.previous);
  }

  pub fn commit_search(&mut self) {
    let query = self.query.to_query();
    self.query.clear();
    self.set_view(ViewState::Searching);
    info!(query = %query, "search triggered");
    self.request(RequestKind::Search, |id| Effect::Search { id, query });
  }

  pub fn cancel_search(&mut self) {
    self.cancel_pending();
    self.set_view(self.previous);
  }

  pub fn select_next(&mut self) {
    if let Some(list) = self.results.as_mut() {
      list.select_next();
      self.scroll.reset();
    }
  }

  pub fn select_prev(&mut self) {
    if let Some(list) = self.results.as_mut() {
      list.select_prev();
      self.scroll.reset();
    }
  }

  pub fn exit_select(&mut self) {
    self.results = None;
    self.set_view(self.select_return);
  }

  /// Play the selected mix. The rest of the list is dropped.
  pub fn choose_selected(&mut self) {
    let Some(list) = self.results.as_ref() else { return };
    if list.is_empty() {
      return;
    }
    if list.selected_entry().is_none() {
      self.set_warning(MIX_UNAVAILABLE);
      return;
    }

    let Some(list) = self.results.take() else { return };
    let smart_id = list.smart_id.clone();
    let Some(mix) = list.take_selected() else { return };
    info!(mix_id = mix.id, name = %mix.name, "mix chosen");
    self.smart_id = smart_id;
    self.mix = Some(mix);
    self.set_view(ViewState::Play);
    self.request_next_track();
  }

  /// `n`: only allowed when the mix service lets the current track be skipped.
  pub fn skip(&mut self) {
    match self.playback {
      Playback::Idle | Playback::Advancing => {}
      Playback::Ended => self.advance(),
      Playback::Playing => match self.current_track() {
        Some(t) if t.skip_allowed && !t.last => {
          info!(track_id = t.id, "skip");
          self.request_next_track();
        }
        _ => self.set_warning(SKIP_NOT_ALLOWED),
      },
    }
  }

  /// `N`: drop the current mix for the next one.
  pub fn force_next_mix(&mut self) {
    if self.mix.is_some() {
      self.request_next_mix();
    }
  }

  pub fn toggle_pause(&mut self) {
    if self.playback != Playback::Idle {
      self.effects.push(Effect::TogglePause);
    }
  }
}
