//! Language model backends.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use swesh_protocol::Message;
use tracing::info;

use crate::error::Result;
use crate::error::SweshErr;

/// Reply sent by [`ReplayModel`] once its script has run out.
pub const REPLAY_EXHAUSTED_RESPONSE: &str = "THOUGHT: No scripted responses remain, submitting.

```bash
echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT
```";

/// A completion backend that tracks its own spend.
#[async_trait]
pub trait Model: Send {
    /// Produce the next assistant message for the conversation so far.
    async fn query(&mut self, messages: &[Message]) -> Result<String>;

    /// Total cost in dollars of all queries so far.
    fn cost(&self) -> f64;

    fn n_calls(&self) -> u64;
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum ReplayEntry {
    Text(String),
    Detailed {
        content: String,
        #[serde(default)]
        cost: f64,
    },
}

/// Replays a fixed list of responses, in order.
///
/// The JSON script is an array whose elements are either plain strings or
/// `{"content": "...", "cost": 0.01}` objects.
#[derive(Debug, Clone, Default)]
pub struct ReplayModel {
    responses: Vec<(String, f64)>,
    next: usize,
    cost: f64,
    n_calls: u64,
}

impl ReplayModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_costs(responses.into_iter().map(|response| (response, 0.0)))
    }

    pub fn with_costs<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|(response, cost)| (response.into(), cost))
                .collect(),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<ReplayEntry> =
            serde_json::from_str(&contents).map_err(|source| SweshErr::ReplayFile {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), responses = entries.len(), "loaded replay script");
        Ok(Self::with_costs(entries.into_iter().map(|entry| match entry {
            ReplayEntry::Text(content) => (content, 0.0),
            ReplayEntry::Detailed { content, cost } => (content, cost),
        })))
    }
}

#[async_trait]
impl Model for ReplayModel {
    async fn query(&mut self, _messages: &[Message]) -> Result<String> {
        self.n_calls += 1;
        let Some((response, cost)) = self.responses.get(self.next) else {
            return Ok(REPLAY_EXHAUSTED_RESPONSE.to_string());
        };
        self.next += 1;
        self.cost += cost;
        Ok(response.clone())
    }

    fn cost(&self) -> f64 {
        self.cost
    }

    fn n_calls(&self) -> u64 {
        self.n_calls
    }
}

/// Stand-in used when no backend was configured. Every query fails, so the
/// session is started in human mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredModel;

#[async_trait]
impl Model for UnconfiguredModel {
    async fn query(&mut self, _messages: &[Message]) -> Result<String> {
        Err(SweshErr::NoModelConfigured)
    }

    fn cost(&self) -> f64 {
        0.0
    }

    fn n_calls(&self) -> u64 {
        0
    }
}
