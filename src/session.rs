//! Carries out the effects the controller queues.
//!
//! Network work runs on spawned tasks and comes back as [`Response`]
//! messages; media effects go straight to the player. At most one
//! search/next-mix/next-track task is alive at a time.

use anyhow::Result;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::api::MixClient;
use crate::app::{App, Effect, MediaStatus, Outcome, Response};
use crate::player::MediaPlayer;

pub struct Session {
  client: MixClient,
  player: MediaPlayer,
  tx: mpsc::UnboundedSender<Response>,
  rx: mpsc::UnboundedReceiver<Response>,
  in_flight: Option<JoinHandle<()>>,
}

impl Session {
  pub fn new(client: MixClient, player: MediaPlayer) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { client, player, tx, rx, in_flight: None }
  }

  /// Hand every response that has arrived to the controller.
  pub fn poll_responses(&mut self, app: &mut App) {
    while let Ok(response) = self.rx.try_recv() {
      debug!(id = response.id, "session: response received");
      app.on_response(response);
    }
  }

  pub fn media_status(&mut self) -> MediaStatus {
    self.player.status()
  }

  /// Execute everything the controller queued since the last flush.
  pub async fn flush(&mut self, app: &mut App) {
    for effect in app.take_effects() {
      debug!(effect = ?effect, "session: effect");
      match effect {
        Effect::Search { id, query } => {
          let client = self.client.clone();
          self.spawn_request(async move {
            let result = client.search(&query).await;
            Response { id, outcome: Outcome::Search { query, result } }
          });
        }
        Effect::NextMix { id, mix_id, smart_id } => {
          let client = self.client.clone();
          self.spawn_request(async move {
            Response { id, outcome: Outcome::NextMix(client.next_mix(mix_id, &smart_id).await) }
          });
        }
        Effect::NextTrack { id, mix_id, first } => {
          let client = self.client.clone();
          self.spawn_request(async move {
            Response { id, outcome: Outcome::NextTrack(client.next_track(mix_id, first).await) }
          });
        }
        Effect::Report { track_id, mix_id } => {
          let client = self.client.clone();
          tokio::spawn(async move {
            if let Err(e) = client.report(track_id, mix_id).await {
              warn!(track_id, mix_id, err = %format!("{:#}", e), "report failed");
            }
          });
        }
        Effect::Cancel => self.abort_in_flight(),
        Effect::Play { url } => {
          if let Err(e) = self.player.play(&url).await {
            warn!(url = %url, err = %format!("{:#}", e), "playback failed");
            app.set_warning(&e.to_string());
          }
        }
        Effect::TogglePause => {
          if let Err(e) = self.player.toggle_pause().await {
            warn!(err = %format!("{:#}", e), "pause failed");
          }
        }
        Effect::Stop => {
          if let Err(e) = self.player.stop().await {
            warn!(err = %format!("{:#}", e), "stop failed");
          }
        }
      }
    }
  }

  /// Run `request` in the background, replacing whatever was in flight.
  fn spawn_request<F>(&mut self, request: F)
  where
    F: Future<Output = Response> + Send + 'static,
  {
    self.abort_in_flight();
    let tx = self.tx.clone();
    self.in_flight = Some(tokio::spawn(async move {
      let _ = tx.send(request.await);
    }));
  }

  fn abort_in_flight(&mut self) {
    if let Some(handle) = self.in_flight.take()
      && !handle.is_finished()
    {
      debug!("session: request aborted");
      handle.abort();
    }
  }

  pub async fn shutdown(&mut self) -> Result<()> {
    self.abort_in_flight();
    self.player.stop().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::{Playback, ViewState};
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn session(server: &MockServer) -> Session {
    Session::new(MixClient::new(&server.uri(), "key").unwrap(), MediaPlayer::new("mpv"))
  }

  async fn search(app: &mut App, session: &mut Session) {
    app.enter_search();
    app.commit_search();
    session.flush(app).await;
  }

  /// Poll until the controller leaves `Searching` or we give up.
  async fn settle(app: &mut App, session: &mut Session) {
    for _ in 0..200 {
      session.poll_responses(app);
      if app.view != ViewState::Searching {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  // --- requests ---

  #[tokio::test]
  async fn search_response_reaches_controller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/all"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": "200 OK",
        "mix_set": { "mixes": [{ "id": 1, "name": "Chill Vibes" }] }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let mut app = App::new();
    let mut session = session(&server);
    search(&mut app, &mut session).await;
    settle(&mut app, &mut session).await;

    assert_eq!(app.view, ViewState::Select);
    assert_eq!(app.results.as_ref().map(|l| l.len()), Some(1));
  }

  #[tokio::test]
  async fn failed_search_returns_with_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/all"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let mut app = App::new();
    let mut session = session(&server);
    search(&mut app, &mut session).await;
    settle(&mut app, &mut session).await;

    assert_eq!(app.view, ViewState::Start);
    assert_eq!(app.warning(), Some(crate::app::SEARCH_FAILED));
  }

  #[tokio::test]
  async fn cancel_aborts_request_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/all"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "status": "200 OK", "mix_set": { "mixes": [] } }))
          .set_delay(Duration::from_millis(300)),
      )
      .mount(&server)
      .await;

    let mut app = App::new();
    let mut session = session(&server);
    search(&mut app, &mut session).await;
    assert!(session.in_flight.is_some());

    app.cancel_search();
    session.flush(&mut app).await;
    assert!(session.in_flight.is_none());

    tokio::time::sleep(Duration::from_millis(400)).await;
    session.poll_responses(&mut app);
    assert_eq!(app.view, ViewState::Start);
    assert!(app.results.is_none());
  }

  #[tokio::test]
  async fn search_after_cancel_keeps_only_new_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/slow"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "status": "200 OK", "mix_set": { "mixes": [{ "id": 9, "name": "Old" }] } }))
          .set_delay(Duration::from_millis(300)),
      )
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/fast"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": "200 OK",
        "mix_set": { "mixes": [{ "id": 1, "name": "New" }, { "id": 2, "name": "Newer" }] }
      })))
      .mount(&server)
      .await;

    let mut app = App::new();
    let mut session = session(&server);
    app.enter_search();
    "slow".chars().for_each(|c| {
      app.query.insert(c);
    });
    app.commit_search();
    session.flush(&mut app).await;

    app.cancel_search();
    app.enter_search();
    "fast".chars().for_each(|c| {
      app.query.insert(c);
    });
    app.commit_search();
    session.flush(&mut app).await;
    settle(&mut app, &mut session).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    session.poll_responses(&mut app);
    assert_eq!(app.view, ViewState::Select);
    assert_eq!(app.results.as_ref().map(|l| l.smart_id.as_str()), Some("fast"));
    assert_eq!(app.results.as_ref().map(|l| l.len()), Some(2));
  }

  // --- media ---

  #[tokio::test]
  async fn playback_failure_becomes_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/mix_sets/all"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": "200 OK",
        "mix_set": { "mixes": [{ "id": 7, "name": "Chill Vibes" }] }
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/sets/new"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "200 OK", "play_token": "tok" })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/sets/tok/play"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "status": "200 OK",
        "set": {
          "at_last_track": false, "skip_allowed": true,
          "track": { "id": 5, "name": "Song", "performer": "Band", "track_file_stream_url": "http://s/5.mp3" }
        }
      })))
      .mount(&server)
      .await;

    let mut app = App::new();
    let mut session =
      Session::new(MixClient::new(&server.uri(), "key").unwrap(), MediaPlayer::new("eightp-no-such-player"));
    search(&mut app, &mut session).await;
    settle(&mut app, &mut session).await;
    app.choose_selected();
    session.flush(&mut app).await;

    for _ in 0..200 {
      session.poll_responses(&mut app);
      if app.playback == Playback::Playing {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    session.flush(&mut app).await;

    assert_eq!(app.view, ViewState::Play);
    assert!(app.warning().is_some_and(|w| w.contains("not found")));
    assert_eq!(session.media_status(), MediaStatus::default());
    session.shutdown().await.unwrap();
  }
}
