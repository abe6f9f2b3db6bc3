//! Mix and track records as the controller and renderer see them.
//!
//! Remote JSON is decoded through private record types so the rest of the
//! crate never touches `serde_json::Value`. Required fields are enforced by
//! serde; everything optional collapses to an empty string or zero.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
  pub id: u64,
  pub name: String,
  pub performer: String,
  pub url: String,
  /// Last track of the mix; the next one has to come from a new mix.
  pub last: bool,
  pub skip_allowed: bool,
  /// Play was reported to the mix service for this track.
  pub reported: bool,
}

impl Track {
  /// "performer - title", as shown in the header and playlist.
  pub fn label(&self) -> String {
    format!("{} - {}", self.performer, self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mix {
  pub id: u64,
  pub name: String,
  pub user_id: u64,
  pub description: String,
  pub likes_count: u64,
  pub plays_count: u64,
  pub tags: String,
  pub liked: bool,
  /// Tracks started so far, oldest first.
  pub tracks: Vec<Track>,
}

impl Mix {
  pub fn current_track(&self) -> Option<&Track> {
    self.tracks.last()
  }

  pub fn current_track_mut(&mut self) -> Option<&mut Track> {
    self.tracks.last_mut()
  }
}

// --- Wire records ---

#[derive(Deserialize)]
struct MixRecord {
  id: u64,
  name: String,
  #[serde(default)]
  user_id: Option<u64>,
  #[serde(default)]
  description: Option<String>,
  #[serde(default)]
  likes_count: Option<u64>,
  #[serde(default)]
  plays_count: Option<u64>,
  #[serde(default)]
  tag_list_cache: Option<String>,
  #[serde(default)]
  liked_by_current_user: Option<bool>,
}

impl From<MixRecord> for Mix {
  fn from(r: MixRecord) -> Self {
    Self {
      id: r.id,
      name: r.name,
      user_id: r.user_id.unwrap_or_default(),
      description: r.description.unwrap_or_default(),
      likes_count: r.likes_count.unwrap_or_default(),
      plays_count: r.plays_count.unwrap_or_default(),
      tags: r.tag_list_cache.unwrap_or_default(),
      liked: r.liked_by_current_user.unwrap_or_default(),
      tracks: Vec::new(),
    }
  }
}

#[derive(Deserialize)]
struct SetRecord {
  at_last_track: bool,
  skip_allowed: bool,
  track: TrackRecord,
}

#[derive(Deserialize)]
struct TrackRecord {
  id: u64,
  name: String,
  performer: String,
  track_file_stream_url: String,
}

/// Decode one mix object.
pub fn decode_mix(value: &Value) -> Result<Mix> {
  let record = MixRecord::deserialize(value).context("Malformed mix record")?;
  Ok(record.into())
}

/// Decode every element of a `mixes` array on its own; a broken element becomes `None`.
pub fn decode_mix_list(values: &[Value]) -> Vec<Option<Mix>> {
  values.iter().map(|v| decode_mix(v).ok()).collect()
}

/// Decode the `set` object returned by the play/next endpoints.
pub fn decode_track(set: &Value) -> Result<Track> {
  let record = SetRecord::deserialize(set).context("Malformed track record")?;
  Ok(Track {
    id: record.track.id,
    name: record.track.name,
    performer: record.track.performer,
    url: record.track.track_file_stream_url,
    last: record.at_last_track,
    skip_allowed: record.skip_allowed,
    reported: false,
  })
}

// --- Result list ---

/// Search results shown in the select view. Failed entries are kept as `None`
/// so numbering matches what the service returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultList {
  entries: Vec<Option<Mix>>,
  selected: usize,
  /// Smart id that produced this list; reused when asking for the next mix.
  pub smart_id: String,
}

impl ResultList {
  pub fn new(entries: Vec<Option<Mix>>, smart_id: String) -> Self {
    Self { entries, selected: 0, smart_id }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Selected index, always in range for a non-empty list.
  pub fn selected(&self) -> usize {
    if self.entries.is_empty() { 0 } else { self.selected % self.entries.len() }
  }

  pub fn select_next(&mut self) {
    self.step(1);
  }

  pub fn select_prev(&mut self) {
    self.step(-1);
  }

  fn step(&mut self, delta: isize) {
    let count = self.entries.len();
    if count == 0 {
      return;
    }
    let count = count as isize;
    self.selected = (self.selected() as isize + delta).rem_euclid(count) as usize;
  }

  /// Every entry once, starting at the selected one and wrapping around.
  pub fn iter_from_selected(&self) -> impl Iterator<Item = (usize, Option<&Mix>)> + '_ {
    let count = self.entries.len();
    let start = self.selected();
    (0..count).map(move |k| {
      let i = (start + k) % count;
      (i, self.entries[i].as_ref())
    })
  }

  pub fn selected_entry(&self) -> Option<&Mix> {
    self.entries.get(self.selected()).and_then(Option::as_ref)
  }

  /// Consume the list, keeping only the selected mix.
  pub fn take_selected(mut self) -> Option<Mix> {
    let i = self.selected();
    if i < self.entries.len() { self.entries.swap_remove(i) } else { None }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn mix(id: u64, name: &str) -> Mix {
    Mix {
      id,
      name: name.to_string(),
      user_id: 0,
      description: String::new(),
      likes_count: 0,
      plays_count: 0,
      tags: String::new(),
      liked: false,
      tracks: Vec::new(),
    }
  }

  fn list(n: u64) -> ResultList {
    ResultList::new((1..=n).map(|i| Some(mix(i, &format!("mix {i}")))).collect(), "all".to_string())
  }

  // --- decoding ---

  #[test]
  fn decode_full_mix() {
    let v = json!({
      "id": 14, "name": "Chill Vibes", "user_id": 3, "description": "slow songs",
      "likes_count": 12, "plays_count": 340, "tag_list_cache": "chill, lofi",
      "liked_by_current_user": true
    });
    let m = decode_mix(&v).unwrap();
    assert_eq!(m.id, 14);
    assert_eq!(m.name, "Chill Vibes");
    assert_eq!(m.plays_count, 340);
    assert_eq!(m.tags, "chill, lofi");
    assert!(m.liked);
    assert!(m.tracks.is_empty());
  }

  #[test]
  fn decode_mix_defaults_optional_fields() {
    let m = decode_mix(&json!({ "id": 1, "name": "x", "description": null })).unwrap();
    assert_eq!(m.description, "");
    assert_eq!(m.likes_count, 0);
    assert!(!m.liked);
  }

  #[test]
  fn decode_mix_requires_id_and_name() {
    assert!(decode_mix(&json!({ "name": "x" })).is_err());
    assert!(decode_mix(&json!({ "id": 1 })).is_err());
  }

  #[test]
  fn broken_list_entries_become_none() {
    let values = vec![json!({ "id": 1, "name": "a" }), json!({ "bogus": true }), json!({ "id": 3, "name": "c" })];
    let decoded = decode_mix_list(&values);
    assert_eq!(decoded.len(), 3);
    assert!(decoded[0].is_some());
    assert!(decoded[1].is_none());
    assert_eq!(decoded[2].as_ref().map(|m| m.id), Some(3));
  }

  #[test]
  fn decode_track_from_set() {
    let set = json!({
      "at_last_track": false, "skip_allowed": true,
      "track": { "id": 9, "name": "Song", "performer": "Band", "track_file_stream_url": "http://x/9.mp3" }
    });
    let t = decode_track(&set).unwrap();
    assert_eq!(t.id, 9);
    assert_eq!(t.label(), "Band - Song");
    assert!(t.skip_allowed);
    assert!(!t.last);
    assert!(!t.reported);
  }

  #[test]
  fn decode_track_requires_stream_url() {
    let set = json!({
      "at_last_track": false, "skip_allowed": true,
      "track": { "id": 9, "name": "Song", "performer": "Band" }
    });
    assert!(decode_track(&set).is_err());
  }

  // --- result list ---

  #[test]
  fn down_n_times_returns_home() {
    let mut l = list(4);
    l.select_next();
    let start = l.selected();
    for _ in 0..4 {
      l.select_next();
    }
    assert_eq!(l.selected(), start);
  }

  #[test]
  fn up_from_zero_wraps_to_last() {
    let mut l = list(5);
    l.select_prev();
    assert_eq!(l.selected(), 4);
  }

  #[test]
  fn empty_list_navigation_is_noop() {
    let mut l = ResultList::new(Vec::new(), "all".to_string());
    l.select_next();
    l.select_prev();
    assert_eq!(l.selected(), 0);
    assert!(l.selected_entry().is_none());
    assert!(l.take_selected().is_none());
  }

  #[test]
  fn iteration_starts_at_selection() {
    let mut l = list(3);
    l.select_prev();
    let order: Vec<usize> = l.iter_from_selected().map(|(i, _)| i).collect();
    assert_eq!(order, vec![2, 0, 1]);
  }

  #[test]
  fn take_selected_keeps_only_chosen_mix() {
    let mut l = list(3);
    l.select_next();
    assert_eq!(l.take_selected().map(|m| m.id), Some(2));
  }

  #[test]
  fn failed_entry_is_not_selectable() {
    let l = ResultList::new(vec![None, Some(mix(2, "b"))], "all".to_string());
    assert!(l.selected_entry().is_none());
  }
}
