//! The step loop.
//!
//! One generic driver ([`run_agent`]) repeats `produce → gate → execute →
//! record` until a step terminates the session. Where actions come from and
//! how submissions are handled is supplied by a [`StepCapabilities`]
//! implementation; [`DefaultCapabilities`] picks the model or the human
//! depending on the active mode.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use swesh_protocol::Action;
use swesh_protocol::AgentMode;
use swesh_protocol::Message;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::async_utils::OrCancelExt;
use crate::config::AgentConfig;
use crate::control::SessionControl;
use crate::environment::Environment;
use crate::error::EnvironmentError;
use crate::error::Result;
use crate::error::SweshErr;
use crate::events::AgentEvent;
use crate::events::AgentEventSender;
use crate::gate::GateDecision;
use crate::gate::Whitelist;
use crate::gate::should_execute;
use crate::input::collect_input;
use crate::message_log::MessageLog;
use crate::mode::Directive;
use crate::model::Model;
use crate::templates;
use crate::templates::render;
use crate::transcript::bash_blocks;

/// First output line of a command that ends the task.
pub const SUBMISSION_MARKERS: [&str; 2] = [
    "COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT",
    "MINI_SWE_AGENT_FINAL_OUTPUT",
];

pub const HUMAN_COMMAND_PROMPT: &str = "Enter a command (/h for help)";
pub const EXIT_PROMPT: &str =
    "Agent wants to finish. Type a comment for a new task or press Enter to quit.";

pub const EXIT_STATUS_SUBMITTED: &str = "Submitted";
pub const EXIT_STATUS_LIMITS_EXCEEDED: &str = "LimitsExceeded";

/// Result of one step, switched on by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The step did not run anything. The reason is recorded for the model and
    /// the loop goes on.
    Withheld(String),
    /// The agent declared the task done; the payload is its final output.
    Submitted(String),
    Terminated {
        exit_status: String,
        message: String,
    },
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentExit {
    pub exit_status: String,
    pub result: String,
}

/// An action together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedAction {
    pub action: Action,
    /// Set only when the human typed the command during this step.
    pub from_human: bool,
}

/// What `produce_action` came up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced {
    Action(ProposedAction),
    /// Nothing to execute; end the step with this outcome.
    Outcome(StepOutcome),
}

/// Model spend, readable from the UI while the loop runs.
#[derive(Debug, Default)]
pub struct RunStats {
    cost_bits: AtomicU64,
    n_calls: AtomicU64,
}

impl RunStats {
    pub fn record(&self, cost: f64, n_calls: u64) {
        self.cost_bits.store(cost.to_bits(), Ordering::Relaxed);
        self.n_calls.store(n_calls, Ordering::Relaxed);
    }

    pub fn cost(&self) -> f64 {
        f64::from_bits(self.cost_bits.load(Ordering::Relaxed))
    }

    pub fn n_calls(&self) -> u64 {
        self.n_calls.load(Ordering::Relaxed)
    }
}

/// Everything a step needs besides the capabilities.
pub struct AgentContext {
    pub config: AgentConfig,
    pub whitelist: Whitelist,
    pub control: Arc<SessionControl>,
    pub log: Arc<MessageLog>,
    pub events: AgentEventSender,
    pub env: Arc<dyn Environment>,
    pub stats: Arc<RunStats>,
}

impl AgentContext {
    pub fn append(&self, message: Message) {
        let len = self.log.push(message);
        self.events.send(AgentEvent::MessageAppended { len });
    }
}

/// The three points where step behavior varies.
#[async_trait]
pub trait StepCapabilities: Send {
    async fn produce_action(&mut self, cx: &AgentContext) -> Result<Produced>;

    async fn gate_action(&mut self, proposed: &ProposedAction, cx: &AgentContext) -> GateDecision;

    /// Called with the payload of a submission. Return
    /// [`StepOutcome::Continue`] to keep going, or a terminating outcome.
    async fn on_submitted(&mut self, payload: String, cx: &AgentContext) -> Result<StepOutcome>;
}

/// Asks the model for the next action.
pub struct ModelSource {
    model: Box<dyn Model>,
}

impl ModelSource {
    pub fn new(model: Box<dyn Model>) -> Self {
        Self { model }
    }

    async fn produce(&mut self, cx: &AgentContext) -> Result<Produced> {
        if let Some(message) = limits_exceeded(&cx.config, self.model.as_ref()) {
            info!("{message}");
            return Ok(Produced::Outcome(StepOutcome::Terminated {
                exit_status: EXIT_STATUS_LIMITS_EXCEEDED.to_string(),
                message,
            }));
        }

        let messages = cx.log.snapshot();
        let token = cx.control.cancellation_token();
        let response = self
            .model
            .query(&messages)
            .or_cancel(&token)
            .await
            .map_err(|_| SweshErr::Interrupted)??;
        cx.stats.record(self.model.cost(), self.model.n_calls());
        cx.append(Message::assistant(response.as_str()));

        Ok(parse_action(&response, &cx.config))
    }
}

fn limits_exceeded(config: &AgentConfig, model: &dyn Model) -> Option<String> {
    let n_calls = model.n_calls();
    if config.step_limit > 0 && config.step_limit <= n_calls {
        return Some(format!(
            "{EXIT_STATUS_LIMITS_EXCEEDED}: reached the step limit of {} model calls",
            config.step_limit
        ));
    }
    let cost = model.cost();
    if config.cost_limit > 0.0 && config.cost_limit <= cost {
        return Some(format!(
            "{EXIT_STATUS_LIMITS_EXCEEDED}: reached the cost limit of ${:.2}",
            config.cost_limit
        ));
    }
    None
}

/// Extract the single bash block from a model response.
pub fn parse_action(response: &str, config: &AgentConfig) -> Produced {
    let blocks = bash_blocks(response);
    match blocks.as_slice() {
        [block] => Produced::Action(ProposedAction {
            action: Action::new(block.body.trim()),
            from_human: false,
        }),
        blocks => Produced::Outcome(StepOutcome::Withheld(render(
            &config.format_error_template,
            &[("actions", &blocks.len().to_string())],
        ))),
    }
}

/// Reads the next command from the human.
#[derive(Debug, Default)]
pub struct HumanSource;

impl HumanSource {
    /// Returns `None` when the human switched away from human mode instead of
    /// entering a command.
    async fn produce(&mut self, cx: &AgentContext) -> Result<Option<Produced>> {
        loop {
            let line =
                collect_input(HUMAN_COMMAND_PROMPT, &cx.control, cx.env.as_ref(), &cx.events)
                    .await?;
            if cx.control.mode() != AgentMode::Human {
                debug!(mode = %cx.control.mode(), "left human mode while waiting for a command");
                return Ok(None);
            }
            if Directive::parse(&line).is_some() {
                continue;
            }
            cx.append(Message::assistant(format!("```bash\n{line}\n```")));
            return Ok(Some(Produced::Action(ProposedAction {
                action: Action::new(line),
                from_human: true,
            })));
        }
    }
}

/// Human input in `human` mode, the model otherwise.
pub struct DefaultCapabilities {
    model: ModelSource,
    human: HumanSource,
}

impl DefaultCapabilities {
    pub fn new(model: Box<dyn Model>) -> Self {
        Self {
            model: ModelSource::new(model),
            human: HumanSource,
        }
    }
}

#[async_trait]
impl StepCapabilities for DefaultCapabilities {
    async fn produce_action(&mut self, cx: &AgentContext) -> Result<Produced> {
        if cx.control.mode() == AgentMode::Human
            && let Some(produced) = self.human.produce(cx).await?
        {
            return Ok(produced);
        }
        self.model.produce(cx).await
    }

    async fn gate_action(&mut self, proposed: &ProposedAction, cx: &AgentContext) -> GateDecision {
        should_execute(
            &proposed.action,
            cx.control.mode(),
            &cx.whitelist,
            proposed.from_human,
            &cx.control,
        )
        .await
    }

    async fn on_submitted(&mut self, payload: String, cx: &AgentContext) -> Result<StepOutcome> {
        let submitted = StepOutcome::Terminated {
            exit_status: EXIT_STATUS_SUBMITTED.to_string(),
            message: payload,
        };
        if !cx.config.confirm_exit {
            return Ok(submitted);
        }
        loop {
            let reply = collect_input(EXIT_PROMPT, &cx.control, cx.env.as_ref(), &cx.events).await?;
            if Directive::parse(&reply).is_some() {
                continue;
            }
            let task = reply.trim();
            if task.is_empty() {
                return Ok(submitted);
            }
            cx.append(Message::user(format!("The user added a new task: {task}")));
            return Ok(StepOutcome::Continue);
        }
    }
}

/// If the first line of `output` is a submission marker, return the rest.
pub fn submission_payload(output: &str) -> Option<String> {
    let mut lines = output.trim_start().split_inclusive('\n');
    let first = lines.next()?.trim();
    SUBMISSION_MARKERS
        .iter()
        .any(|marker| *marker == first)
        .then(|| lines.collect())
}

async fn execute_step(caps: &mut dyn StepCapabilities, cx: &AgentContext) -> Result<StepOutcome> {
    let proposed = match caps.produce_action(cx).await? {
        Produced::Action(proposed) => proposed,
        Produced::Outcome(outcome) => return Ok(outcome),
    };

    if let GateDecision::Withhold(reason) = caps.gate_action(&proposed, cx).await {
        return Ok(StepOutcome::Withheld(reason));
    }
    if cx.control.is_cancelled() {
        return Err(SweshErr::Interrupted);
    }

    let command = proposed.action.command.as_str();
    let token = cx.control.cancellation_token();
    let result = cx
        .env
        .execute(command)
        .or_cancel(&token)
        .await
        .map_err(|_| SweshErr::Interrupted)?;

    match result {
        Ok(observation) => {
            if let Some(payload) = submission_payload(&observation.output) {
                return Ok(StepOutcome::Submitted(payload));
            }
            cx.append(Message::user(observation.render()));
            Ok(StepOutcome::Continue)
        }
        Err(EnvironmentError::Timeout { output, .. }) => Ok(StepOutcome::Withheld(render(
            &cx.config.timeout_template,
            &[("action", command), ("output", &output)],
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Run the step loop for `task` until it terminates.
///
/// Sends [`AgentEvent::Finished`] as the very last event.
pub async fn run_agent(
    caps: &mut dyn StepCapabilities,
    cx: &AgentContext,
    task: &str,
) -> AgentExit {
    cx.append(Message::system(render(&cx.config.system_template, &[])));
    cx.append(Message::user(render(
        &cx.config.instance_template,
        &[("task", task)],
    )));

    let exit = loop {
        let outcome = match execute_step(caps, cx).await {
            Ok(StepOutcome::Submitted(payload)) => caps.on_submitted(payload, cx).await,
            other => other,
        };
        match outcome {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Withheld(reason)) => {
                debug!(%reason, "step withheld");
                cx.append(Message::user(reason));
            }
            Ok(StepOutcome::Submitted(payload)) => {
                if !payload.is_empty() {
                    cx.append(Message::user(payload.as_str()));
                }
                break AgentExit {
                    exit_status: EXIT_STATUS_SUBMITTED.to_string(),
                    result: payload,
                };
            }
            Ok(StepOutcome::Terminated {
                exit_status,
                message,
            }) => {
                if !message.is_empty() {
                    cx.append(Message::user(message.as_str()));
                }
                break AgentExit {
                    exit_status,
                    result: message,
                };
            }
            Err(SweshErr::Interrupted) => {
                info!("agent interrupted by user");
                break AgentExit {
                    exit_status: SweshErr::Interrupted.name().to_string(),
                    result: String::new(),
                };
            }
            Err(err) => {
                error!(error = %err, "agent stopped");
                break AgentExit {
                    exit_status: err.name().to_string(),
                    result: err.to_string(),
                };
            }
        }
    };

    info!(exit_status = %exit.exit_status, "agent finished");
    cx.events.send(AgentEvent::Finished {
        exit_status: exit.exit_status.clone(),
        result: exit.result.clone(),
    });
    exit
}

/// Handles to a step loop running on a background task.
pub struct AgentHandle {
    pub control: Arc<SessionControl>,
    pub log: Arc<MessageLog>,
    pub stats: Arc<RunStats>,
    pub join: JoinHandle<AgentExit>,
}

/// Start the step loop with [`DefaultCapabilities`] on a tokio task.
pub fn spawn_agent(
    config: AgentConfig,
    model: Box<dyn Model>,
    env: Arc<dyn Environment>,
    task: String,
    control: Arc<SessionControl>,
    events: AgentEventSender,
) -> Result<AgentHandle> {
    let whitelist = Whitelist::new(&config.whitelist_actions)?;
    templates::validate(&config)?;
    let log = Arc::new(MessageLog::new());
    let stats = Arc::new(RunStats::default());
    let cx = AgentContext {
        config,
        whitelist,
        control: Arc::clone(&control),
        log: Arc::clone(&log),
        events,
        env,
        stats: Arc::clone(&stats),
    };
    let join = tokio::spawn(async move {
        let mut caps = DefaultCapabilities::new(model);
        run_agent(&mut caps, &cx, &task).await
    });
    Ok(AgentHandle {
        control,
        log,
        stats,
        join,
    })
}
