//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Mix service
  pub api_url: String,
  pub api_key: String,
  pub api_version: String,
  pub user_agent: String,
  /// Value of the `include` parameter on mix listings.
  pub mix_include: String,
  pub request_timeout_secs: u64,

  // Playback
  /// Elapsed play time after which a track counts as played.
  pub report_after_ms: u64,
  pub mpv_binary: String,
  pub ipc_connect_attempts: u32,
  pub ipc_connect_interval_ms: u64,

  // Event loop
  pub input_poll_ms: u64,
  pub warning_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
