use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::{
  io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
  net::UnixStream,
  process::{Child, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::app::MediaStatus;
use crate::constants::constants;

const OBSERVE_TIME_POS: &[u8] = b"{\"command\":[\"observe_property\",1,\"time-pos\"]}\n";
const CYCLE_PAUSE: &[u8] = b"{\"command\":[\"cycle\",\"pause\"]}\n";

/// Plays one stream URL at a time through an `mpv` child process.
///
/// Each track gets its own process; the track has ended once that process
/// exits, whether it finished or failed.
pub struct MediaPlayer {
  binary: String,
  current_process: Option<Child>,
  monitor_handle: Option<JoinHandle<()>>,
  position_rx: Option<mpsc::Receiver<u64>>,
  elapsed_ms: u64,
  ended: bool,
  ipc_socket_path: Option<PathBuf>,
  paused: bool,
}

impl MediaPlayer {
  pub fn new(binary: &str) -> Self {
    Self {
      binary: binary.to_string(),
      current_process: None,
      monitor_handle: None,
      position_rx: None,
      elapsed_ms: 0,
      ended: false,
      ipc_socket_path: None,
      paused: false,
    }
  }

  /// Elapsed time and end-of-track state for the current track.
  pub fn status(&mut self) -> MediaStatus {
    if let Some(rx) = &mut self.position_rx {
      while let Ok(ms) = rx.try_recv() {
        self.elapsed_ms = ms;
      }
    }

    if !self.ended
      && let Some(child) = &mut self.current_process
    {
      match child.try_wait() {
        Ok(Some(exit)) => {
          info!(exit = %exit, elapsed_ms = self.elapsed_ms, "player: track ended");
          self.ended = true;
        }
        Ok(None) => {}
        Err(e) => {
          warn!(err = %e, "player: could not poll mpv");
          self.ended = true;
        }
      }
    }

    MediaStatus { elapsed_ms: self.elapsed_ms, ended: self.ended }
  }

  pub async fn play(&mut self, url: &str) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;

    let socket_path = std::env::temp_dir().join(format!("eightp-mpv-{}.sock", std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Stale socket from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new(&self.binary);
    cmd.args(["--no-video", "--really-quiet", &format!("--input-ipc-server={}", socket_path_str), url]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    // Never piped: an undrained pipe would block mpv.
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("{} not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)", self.binary)
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;
    info!(url = %url, pid = child.id(), "player: started");

    let (tx, rx) = mpsc::channel::<u64>(16);
    let monitor_path = socket_path.clone();
    let monitor_handle = tokio::spawn(async move {
      if let Err(e) = monitor_position(monitor_path, tx).await {
        debug!(err = %format!("{:#}", e), "player: monitor stopped");
      }
    });

    self.current_process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    self.position_rx = Some(rx);
    self.ipc_socket_path = Some(socket_path);
    Ok(())
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let mut stream = UnixStream::connect(socket_path).await.context("Failed to connect to mpv IPC socket")?;
    stream.write_all(CYCLE_PAUSE).await.context("Failed to send pause command to mpv")?;
    self.paused = !self.paused;
    debug!(paused = self.paused, "player: pause toggled");
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.position_rx = None;
    self.elapsed_ms = 0;
    self.ended = false;
    self.paused = false;

    // The socket goes even if the process can't be reaped.
    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }

    if let Some(mut child) = self.current_process.take()
      && child.try_wait().context("Failed to poll mpv process")?.is_none()
    {
      child.kill().await.context("Failed to kill mpv process")?;
      debug!("player: stopped");
    }
    Ok(())
  }
}

/// Connect to mpv's IPC socket once it exists and forward `time-pos` updates.
async fn monitor_position(socket_path: PathBuf, tx: mpsc::Sender<u64>) -> Result<()> {
  let c = constants();
  let mut attempt = 0;
  let mut stream = loop {
    match UnixStream::connect(&socket_path).await {
      Ok(stream) => break stream,
      Err(e) if attempt + 1 < c.ipc_connect_attempts => {
        attempt += 1;
        debug!(attempt, err = %e, "player: IPC socket not ready");
        tokio::time::sleep(Duration::from_millis(c.ipc_connect_interval_ms)).await;
      }
      Err(e) => return Err(anyhow!(e).context("Failed to connect to mpv IPC socket")),
    }
  };

  stream.write_all(OBSERVE_TIME_POS).await.context("Failed to observe time-pos")?;
  let mut lines = BufReader::new(stream).lines();
  while let Some(line) = lines.next_line().await.context("Failed to read from mpv IPC socket")? {
    if let Some(ms) = parse_time_pos(&line)
      && tx.send(ms).await.is_err()
    {
      break;
    }
  }
  Ok(())
}

/// Elapsed milliseconds from an mpv `property-change` event for `time-pos`.
fn parse_time_pos(line: &str) -> Option<u64> {
  let val: Value = serde_json::from_str(line).ok()?;
  if val.get("event").and_then(Value::as_str) != Some("property-change")
    || val.get("name").and_then(Value::as_str) != Some("time-pos")
  {
    return None;
  }
  let secs = val.get("data").and_then(Value::as_f64)?;
  (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0) as u64)
}
