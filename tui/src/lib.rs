// Forbid accidental stdout/stderr writes in the *library* portion of the TUI.
// The standalone `swesh` binary prints the exit information after the
// terminal has been restored.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fs::OpenOptions;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use swesh_core::SessionControl;
use swesh_core::agent_event_channel;
use swesh_core::config::ConfigToml;
use swesh_core::config::find_swesh_home;
use swesh_core::config::load_config;
use swesh_core::config::log_dir;
use swesh_core::environment::LocalEnvironment;
use swesh_core::model::Model;
use swesh_core::model::ReplayModel;
use swesh_core::model::UnconfiguredModel;
use swesh_core::notice::NoticeRegistry;
use swesh_core::spawn_agent;
use swesh_protocol::AgentMode;
use tokio::sync::mpsc::unbounded_channel;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod cli;
mod help;
mod input_bar;
mod notices;
mod render;
mod status_line;
mod transcript_view;
mod tui;

pub use app::AppExitInfo;
pub use cli::Cli;

use crate::app::App;
use crate::tui::Tui;

/// How long to wait for the step loop to wind down after the user quits.
const AGENT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run_main(cli: Cli) -> anyhow::Result<AppExitInfo> {
    let swesh_home = find_swesh_home()?;
    let mut config = load_config(cli.config.as_deref(), &swesh_home)?;
    config.apply_overrides(&cli.config_overrides());

    let model: Box<dyn Model> = match &cli.replay {
        Some(path) => Box::new(ReplayModel::from_file(path)?),
        None => {
            // Without a model the human drives every step.
            config.agent.mode = AgentMode::Human;
            Box::new(UnconfiguredModel)
        }
    };

    let task = match cli.task {
        Some(task) => task,
        None => read_task()?,
    };

    let log_dir = log_dir(&swesh_home);
    std::fs::create_dir_all(&log_dir)?;
    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    // Only the current user may read the log.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(log_dir.join("swesh-tui.log"))?;
    let (non_blocking, _guard) = non_blocking(log_file);

    // use RUST_LOG env var, default to info for swesh crates.
    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("swesh_core=info,swesh_tui=info"))
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter());

    let notices = NoticeRegistry::new();
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(notices.layer())
        .try_init();

    run_ratatui_app(config, model, task, notices)
        .await
        .map_err(into_anyhow)
}

/// Convert the UI's eyre report without losing its cause chain.
fn into_anyhow(report: color_eyre::Report) -> anyhow::Error {
    anyhow::anyhow!(Box::<dyn std::error::Error + Send + Sync>::from(report))
}

#[allow(clippy::print_stderr)]
fn read_task() -> anyhow::Result<String> {
    eprint!("What should the agent do? ");
    let mut task = String::new();
    std::io::stdin().lock().read_line(&mut task)?;
    let task = task.trim();
    if task.is_empty() {
        anyhow::bail!("no task given");
    }
    Ok(task.to_string())
}

async fn run_ratatui_app(
    config: ConfigToml,
    model: Box<dyn Model>,
    task: String,
    notices: NoticeRegistry,
) -> color_eyre::Result<AppExitInfo> {
    color_eyre::install()?;

    // Forward panic reports through tracing so they land in the log, then
    // chain to the previous hook for the usual report.
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        prev_hook(info);
    }));

    let (events_tx, events_rx) = agent_event_channel();
    let control = Arc::new(SessionControl::new(config.agent.mode, events_tx.clone()));
    let env = Arc::new(LocalEnvironment::new(&config.env));
    info!(mode = %config.agent.mode, "starting session");
    let handle = spawn_agent(
        config.agent,
        model,
        env,
        task,
        Arc::clone(&control),
        events_tx,
    )?;

    let (notice_tx, notice_rx) = unbounded_channel();
    let _notice_guard = notices.register(notice_tx);

    let mut terminal = match tui::init() {
        Ok(terminal) => terminal,
        Err(err) => {
            control.cancel();
            return Err(err.into());
        }
    };
    terminal.clear()?;
    let mut tui = Tui::new(terminal);

    let app = App::new(
        Arc::clone(&handle.control),
        Arc::clone(&handle.log),
        Arc::clone(&handle.stats),
        tui.frame_requester(),
    );
    let app_result = app.run(&mut tui, events_rx, notice_rx).await;

    tui::restore()?;
    // No-op when the agent already finished.
    control.cancel();

    if let Some(exit) = app_result? {
        return Ok(exit);
    }
    match tokio::time::timeout(AGENT_SHUTDOWN_GRACE, handle.join).await {
        Ok(Ok(exit)) => Ok(exit.into()),
        Ok(Err(err)) => {
            error!(error = %err, "agent task failed");
            Ok(AppExitInfo::interrupted(err.to_string()))
        }
        Err(_) => {
            warn!("agent did not stop within the shutdown grace period");
            Ok(AppExitInfo::interrupted(String::new()))
        }
    }
}
