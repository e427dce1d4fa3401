use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection lifecycle of a peer engine.
///
/// Transitions happen only inside the engine task; everything else observes
/// through the proxy or the `on_state_change` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Init,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// `Closed` is terminal: calls issued afterwards queue and only ever
    /// complete by timeout.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Init => "INIT",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ConnectionState::Connected.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Reconnecting.is_terminal());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Reconnecting).unwrap(),
            r#""RECONNECTING""#
        );
    }
}
