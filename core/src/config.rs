//! Configuration loaded from `config.toml`.
//!
//! The file lives at `$SWESH_HOME/config.toml` (default `~/.swesh/config.toml`)
//! and has two tables:
//!
//! ```toml
//! [agent]
//! mode = "confirm"
//! whitelist_actions = ["ls", "cat ", "git (status|diff)"]
//! confirm_exit = true
//! step_limit = 0
//! cost_limit = 3.0
//!
//! [env]
//! timeout_secs = 30
//! shell = "bash"
//! ```
//!
//! Every key is optional. CLI flags are applied on top of the loaded values.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use swesh_protocol::AgentMode;

use crate::error::Result;
use crate::error::SweshErr;

pub const SWESH_HOME_ENV_VAR: &str = "SWESH_HOME";
const CONFIG_TOML_FILE: &str = "config.toml";

const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a helpful assistant that can interact with a computer.

Your response must contain exactly ONE bash code block with ONE command (or commands connected with && or ||).
Include a THOUGHT section before your command where you explain your reasoning process.
Format your response as shown in <format_example>.

<format_example>
THOUGHT: Your reasoning and analysis here. Explain why you want to perform the action.

```bash
your_command_here
```
</format_example>

Failure to follow these rules will cause your response to be rejected.";

const DEFAULT_INSTANCE_TEMPLATE: &str = "Please solve this task: {{task}}

You can execute bash commands and edit files to implement the necessary changes.
Every response must contain exactly one bash code block. Directory or environment variable
changes are not persistent: every action is executed in a new subshell.

When you are done, finish your work by issuing the following command on its own:
`echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT`
Do not combine it with any other command.";

const DEFAULT_FORMAT_ERROR_TEMPLATE: &str = "Please always provide EXACTLY ONE action in triple backticks, found {{actions}} actions.
If you want to end the task, please issue the following command: `echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT`
without any other command.
Else, please format your response exactly as follows:

THOUGHT: Your reasoning and analysis here.

```bash
your_command_here
```";

const DEFAULT_TIMEOUT_TEMPLATE: &str = "The last command <command>{{action}}</command> timed out and has been killed.
The output of the command was:
<output>
{{output}}
</output>
Please try another command and make sure to avoid those requiring interactive input.";

/// Parsed contents of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigToml {
    pub agent: AgentConfig,
    pub env: EnvironmentConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub mode: AgentMode,
    /// Regex patterns matched against the start of a command. A match skips
    /// the confirmation prompt in `confirm` mode.
    pub whitelist_actions: Vec<String>,
    /// Offer a follow-up task before accepting the agent's submission.
    pub confirm_exit: bool,
    /// Maximum number of model calls; 0 disables the limit.
    pub step_limit: u64,
    /// Maximum model spend in dollars; 0 disables the limit.
    pub cost_limit: f64,
    pub system_template: String,
    pub instance_template: String,
    pub format_error_template: String,
    pub timeout_template: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: AgentMode::default(),
            whitelist_actions: Vec::new(),
            confirm_exit: true,
            step_limit: 0,
            cost_limit: 3.0,
            system_template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            instance_template: DEFAULT_INSTANCE_TEMPLATE.to_string(),
            format_error_template: DEFAULT_FORMAT_ERROR_TEMPLATE.to_string(),
            timeout_template: DEFAULT_TIMEOUT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub cwd: Option<PathBuf>,
    pub timeout_secs: u64,
    pub env: HashMap<String, String>,
    pub shell: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout_secs: 30,
            env: HashMap::new(),
            shell: "bash".to_string(),
        }
    }
}

impl EnvironmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub yolo: bool,
    pub cost_limit: Option<f64>,
    pub exit_immediately: bool,
    pub cwd: Option<PathBuf>,
}

impl ConfigToml {
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if overrides.yolo {
            self.agent.mode = AgentMode::Yolo;
        }
        if let Some(cost_limit) = overrides.cost_limit {
            self.agent.cost_limit = cost_limit;
        }
        if overrides.exit_immediately {
            self.agent.confirm_exit = false;
        }
        if let Some(cwd) = &overrides.cwd {
            self.env.cwd = Some(cwd.clone());
        }
    }
}

/// Returns `$SWESH_HOME`, falling back to `~/.swesh`.
pub fn find_swesh_home() -> std::io::Result<PathBuf> {
    if let Ok(value) = std::env::var(SWESH_HOME_ENV_VAR)
        && !value.is_empty()
    {
        return Ok(PathBuf::from(value));
    }
    let mut home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not find home directory",
        )
    })?;
    home.push(".swesh");
    Ok(home)
}

pub fn log_dir(swesh_home: &Path) -> PathBuf {
    swesh_home.join("log")
}

/// Load the config. An explicit `path` must exist; the default location may
/// be absent, in which case defaults are returned.
pub fn load_config(path: Option<&Path>, swesh_home: &Path) -> Result<ConfigToml> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (swesh_home.join(CONFIG_TOML_FILE), false),
    };
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Ok(ConfigToml::default());
        }
        Err(err) => return Err(SweshErr::Io(err)),
    };
    toml::from_str(&contents).map_err(|source| SweshErr::Config { path, source })
}
