use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

/// User preferences from `prefs.toml`. Every field is optional and falls
/// back to the embedded constants.
#[derive(Deserialize, Default, Debug, PartialEq)]
pub struct Config {
  pub api_key: Option<String>,
  pub api_url: Option<String>,
  /// `tracing` filter directive used when `RUST_LOG` is unset.
  pub log_filter: Option<String>,
  pub mpv_path: Option<String>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "eightp")
}

impl Config {
  pub fn load() -> Self {
    project_dirs().map(|dirs| Self::load_from(&dirs.config_dir().join("prefs.toml"))).unwrap_or_default()
  }

  /// Missing or malformed files give the defaults.
  fn load_from(path: &std::path::Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  /// Where the log file goes unless overridden on the command line.
  pub fn default_log_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_local_dir().join("eightp.log"))
  }
}
