use std::fmt;

use serde::{Deserialize, Serialize};

/// Estado de un nodo durante el recorrido.
///
/// Transiciones: `Pending -> Ready -> Running -> {Complete, Error, Retrying,
/// Skipped, Paused}`; `Retrying -> Running`. Un nodo `Pending`/`Ready` pasa a
/// `Skipped` cuando un productor falla o se cancela la ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Retrying,
    Complete,
    Error,
    Skipped,
    Paused,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Retrying => "retrying",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
