use std::fmt;

use serde::{Deserialize, Serialize};

/// Ciclo de vida de una solicitud.
///
/// `pending -> {approved, denied}`, `approved -> in_processing`,
/// `in_processing -> {paused, complete, error}`, `paused -> in_processing`.
/// `denied`, `complete` y `error` son terminales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyRequestStatus {
    Pending,
    Approved,
    Denied,
    InProcessing,
    Paused,
    Complete,
    Error,
}

impl PrivacyRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::InProcessing => "in_processing",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Complete | Self::Error)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use PrivacyRequestStatus::*;
        matches!((self, next),
                 (Pending, Approved)
                 | (Pending, Denied)
                 | (Approved, InProcessing)
                 | (InProcessing, Paused)
                 | (InProcessing, Complete)
                 | (InProcessing, Error)
                 | (Paused, InProcessing))
    }
}

impl fmt::Display for PrivacyRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
