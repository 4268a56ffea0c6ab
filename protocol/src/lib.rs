//! Data types shared between the agent loop and the terminal UI.
//!
//! Nothing in this crate performs I/O; it only describes the message log,
//! operating modes and the textual observation format the agent writes back
//! into the log after each command.

pub mod config_types;
pub mod exec;
pub mod models;

pub use config_types::AgentMode;
pub use exec::Action;
pub use exec::Observation;
pub use models::ContentPart;
pub use models::Message;
pub use models::MessageContent;
pub use models::Role;
