//! Agent side of the swesh console: the step loop, the prompt channel it
//! shares with the UI, and the transcript builder the UI renders from.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the UI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod agent;
mod async_utils;
pub mod config;
pub mod control;
pub mod environment;
pub mod error;
pub mod events;
pub mod gate;
pub mod input;
pub mod message_log;
pub mod mode;
pub mod model;
pub mod notice;
pub mod session_state;
pub mod templates;
pub mod transcript;

pub use agent::AgentExit;
pub use agent::AgentHandle;
pub use agent::RunStats;
pub use agent::spawn_agent;
pub use control::SessionControl;
pub use error::Result;
pub use error::SweshErr;
pub use events::AgentEvent;
pub use events::AgentEventSender;
pub use events::agent_event_channel;
pub use message_log::MessageLog;
pub use session_state::SessionState;
