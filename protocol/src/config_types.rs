use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

/// How the agent loop treats proposed commands.
///
/// Exactly one mode is active per session. The UI and in-band directives may
/// switch between any two modes at any time.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentMode {
    /// Ask the human before running anything that is not whitelisted.
    #[default]
    Confirm,
    /// Run every model-proposed command without asking.
    Yolo,
    /// The human types the commands; model output is never executed.
    Human,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn default_mode_is_confirm() {
        assert_eq!(AgentMode::default(), AgentMode::Confirm);
    }

    #[test]
    fn mode_names_round_trip_through_strum() {
        assert_eq!(AgentMode::Yolo.to_string(), "yolo");
        assert_eq!(AgentMode::from_str("human"), Ok(AgentMode::Human));
        assert!(AgentMode::from_str("Human").is_err());
    }

    #[test]
    fn mode_deserializes_from_lowercase_name() {
        let mode: AgentMode = serde_json::from_str("\"yolo\"").expect("parse mode");
        assert_eq!(mode, AgentMode::Yolo);
    }
}
