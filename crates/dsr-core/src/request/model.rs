use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PrivacyRequestStatus;
use crate::errors::RequestStateError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyRequest {
    pub id: String,
    pub external_id: Option<String>,
    pub policy_key: String,
    pub status: PrivacyRequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub started_processing_at: Option<DateTime<Utc>>,
    pub finished_processing_at: Option<DateTime<Utc>>,
    /// Webhook previo en el que quedó pausada la solicitud.
    pub paused_at_webhook: Option<String>,
    pub failure_reason: Option<String>,
}

impl PrivacyRequest {
    pub fn new(policy_key: impl Into<String>, external_id: Option<String>) -> Self {
        Self { id: format!("pri_{}", Uuid::new_v4()),
               external_id,
               policy_key: policy_key.into(),
               status: PrivacyRequestStatus::Pending,
               created_at: Utc::now(),
               reviewed_at: None,
               reviewed_by: None,
               started_processing_at: None,
               finished_processing_at: None,
               paused_at_webhook: None,
               failure_reason: None }
    }

    fn transition(&mut self, next: PrivacyRequestStatus) -> Result<(), RequestStateError> {
        if !self.status.can_transition_to(next) {
            return Err(RequestStateError::InvalidTransition { id: self.id.clone(),
                                                              from: self.status,
                                                              to: next });
        }
        self.status = next;
        Ok(())
    }

    fn review(&mut self, next: PrivacyRequestStatus, reviewer: Option<&str>) -> Result<(), RequestStateError> {
        if self.status != PrivacyRequestStatus::Pending {
            return Err(RequestStateError::CannotReview { id: self.id.clone(),
                                                         status: self.status });
        }
        self.status = next;
        self.reviewed_at = Some(Utc::now());
        self.reviewed_by = reviewer.map(str::to_string);
        Ok(())
    }

    pub fn approve(&mut self, reviewer: Option<&str>) -> Result<(), RequestStateError> {
        self.review(PrivacyRequestStatus::Approved, reviewer)
    }

    pub fn deny(&mut self, reviewer: Option<&str>) -> Result<(), RequestStateError> {
        self.review(PrivacyRequestStatus::Denied, reviewer)
    }

    pub fn start_processing(&mut self) -> Result<(), RequestStateError> {
        self.transition(PrivacyRequestStatus::InProcessing)?;
        self.started_processing_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    pub fn pause(&mut self, webhook: Option<String>) -> Result<(), RequestStateError> {
        self.transition(PrivacyRequestStatus::Paused)?;
        self.paused_at_webhook = webhook;
        Ok(())
    }

    /// Sólo válido desde `paused`; cualquier otro estado falla sin mutar.
    pub fn resume(&mut self) -> Result<(), RequestStateError> {
        if self.status != PrivacyRequestStatus::Paused {
            return Err(RequestStateError::InvalidResume { id: self.id.clone(),
                                                          status: self.status });
        }
        self.status = PrivacyRequestStatus::InProcessing;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), RequestStateError> {
        self.transition(PrivacyRequestStatus::Complete)?;
        self.finished_processing_at = Some(Utc::now());
        self.paused_at_webhook = None;
        Ok(())
    }

    pub fn error(&mut self, reason: impl Into<String>) -> Result<(), RequestStateError> {
        self.transition(PrivacyRequestStatus::Error)?;
        self.finished_processing_at = Some(Utc::now());
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}
