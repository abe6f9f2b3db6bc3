mod api;
mod app;
mod config;
mod constants;
mod input;
mod model;
mod player;
mod query;
mod scroll;
mod session;
mod ui;
mod wrap;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{DefaultTerminal, crossterm::event};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use api::MixClient;
use app::App;
use config::Config;
use constants::constants;
use player::MediaPlayer;
use session::Session;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Terminal client for 8tracks mixes", long_about = None)]
struct Args {
  /// 8tracks API key (overrides prefs.toml)
  #[arg(long)]
  api_key: Option<String>,

  /// Base URL of the mix service (overrides prefs.toml)
  #[arg(long)]
  api_url: Option<String>,

  /// Write logs here instead of the per-user data directory
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Print shell completions and exit
  #[arg(long, value_enum)]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a file; the terminal belongs to the UI. Keep the guard alive for
/// the whole run or buffered lines are lost.
fn init_logging(path: Option<&Path>, config: &Config) -> Option<WorkerGuard> {
  let path = path.map(Path::to_path_buf).or_else(Config::default_log_path)?;
  let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
  let file_name = path.file_name()?;
  std::fs::create_dir_all(dir).ok()?;

  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => {
      EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
  };

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).try_init().ok()?;
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "eightp", &mut std::io::stdout());
    return Ok(());
  }

  let config = Config::load();
  let _log_guard = init_logging(args.log_file.as_deref(), &config);

  let c = constants();
  let api_url = args.api_url.or(config.api_url).unwrap_or_else(|| c.api_url.clone());
  let api_key = args.api_key.or(config.api_key).unwrap_or_else(|| c.api_key.clone());
  let mpv = config.mpv_path.unwrap_or_else(|| c.mpv_binary.clone());
  let client = MixClient::new(&api_url, &api_key).context("Failed to set up mix service client")?;
  let session = Session::new(client, MediaPlayer::new(&mpv));
  info!(api_url = %api_url, mpv = %mpv, "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, session).await;
  ratatui::restore();
  info!(ok = result.is_ok(), "exiting");
  result
}

async fn run(terminal: &mut DefaultTerminal, mut session: Session) -> Result<()> {
  let mut app = App::new();
  let poll_timeout = Duration::from_millis(constants().input_poll_ms);

  loop {
    session.poll_responses(&mut app);
    session.flush(&mut app).await;

    let status = session.media_status();
    app.tick(status);
    session.flush(&mut app).await;

    terminal.draw(|frame| ui::ui(frame, &app))?;

    if event::poll(poll_timeout)?
      && let Some(input) = input::translate(&event::read()?)
    {
      let rows = terminal.size()?.height;
      input::handle_input(&mut app, input, rows);
      session.flush(&mut app).await;
    }

    if app.should_quit {
      break;
    }
  }

  session.shutdown().await
}
