use std::path::PathBuf;

use clap::Parser;
use swesh_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(version, about = "Interactive shell agent console")]
pub struct Cli {
    /// Task for the agent. Read from stdin when omitted.
    #[arg(long, short = 't')]
    pub task: Option<String>,

    /// Start in yolo mode: run every proposed command without asking.
    #[arg(long, short = 'y', default_value_t = false)]
    pub yolo: bool,

    /// Stop the session once model spend reaches this many dollars (0 disables).
    #[arg(long = "cost-limit", short = 'l', value_name = "DOLLARS")]
    pub cost_limit: Option<f64>,

    /// Path to a config file. Defaults to `$SWESH_HOME/config.toml`.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Accept the agent's submission without offering a follow-up task.
    #[arg(long = "exit-immediately", default_value_t = false)]
    pub exit_immediately: bool,

    /// Replay scripted model responses from a JSON file instead of querying a model.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Run commands in the specified directory.
    #[clap(long = "cd", short = 'C', value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

impl Cli {
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            yolo: self.yolo,
            cost_limit: self.cost_limit,
            exit_immediately: self.exit_immediately,
            cwd: self.cwd.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_short_flags_into_overrides() {
        let cli = Cli::parse_from([
            "swesh", "-t", "fix the bug", "-y", "-l", "1.5", "-C", "/tmp/work",
        ]);
        assert_eq!(cli.task.as_deref(), Some("fix the bug"));
        let overrides = cli.config_overrides();
        assert!(overrides.yolo);
        assert_eq!(overrides.cost_limit, Some(1.5));
        assert!(!overrides.exit_immediately);
        assert_eq!(overrides.cwd, Some(PathBuf::from("/tmp/work")));
    }

    #[test]
    fn long_flags() {
        let cli = Cli::parse_from([
            "swesh",
            "--exit-immediately",
            "--replay",
            "script.json",
            "--config",
            "swesh.toml",
        ]);
        assert_eq!(cli.task, None);
        assert!(cli.config_overrides().exit_immediately);
        assert_eq!(cli.replay, Some(PathBuf::from("script.json")));
        assert_eq!(cli.config, Some(PathBuf::from("swesh.toml")));
    }
}
