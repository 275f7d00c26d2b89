//! Aprobación/denegación en lote. Cada id se evalúa por separado: un fallo
//! nunca aborta el resto del lote.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PrivacyRequest;
use crate::repo::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub message: String,
    pub data: Value,
}

impl BulkFailure {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self { message: message.into(),
               data }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkReviewResponse {
    pub succeeded: Vec<PrivacyRequest>,
    pub failed: Vec<BulkFailure>,
}

pub fn review_privacy_requests<R>(repo: &R, ids: &[String], action: ReviewAction, reviewer: Option<&str>) -> BulkReviewResponse
    where R: Repository + ?Sized
{
    let mut response = BulkReviewResponse::default();
    for id in ids {
        let mut request = match repo.get_privacy_request(id) {
            Ok(Some(r)) => r,
            Ok(None) => {
                response.failed.push(BulkFailure::new(format!("No privacy request found with id '{id}'"),
                                                      json!({ "privacy_request_id": id })));
                continue;
            }
            Err(e) => {
                warn!("review of {id} could not load the request: {e}");
                response.failed.push(BulkFailure::new("Privacy request could not be updated", json!({ "privacy_request_id": id })));
                continue;
            }
        };
        let snapshot = serde_json::to_value(&request).unwrap_or(Value::Null);
        let transition = match action {
            ReviewAction::Approve => request.approve(reviewer),
            ReviewAction::Deny => request.deny(reviewer),
        };
        if let Err(e) = transition {
            response.failed.push(BulkFailure::new(e.to_string(), snapshot));
            continue;
        }
        match repo.save_privacy_request(&request) {
            Ok(()) => {
                info!("privacy request {} {}", request.id, request.status);
                response.succeeded.push(request);
            }
            Err(e) => {
                warn!("review of {id} could not be saved: {e}");
                response.failed.push(BulkFailure::new("Privacy request could not be updated", snapshot));
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemoryRepository;
    use crate::request::PrivacyRequestStatus;

    #[test]
    fn partitions_batch_without_aborting() {
        let repo = InMemoryRepository::new();
        let pending = PrivacyRequest::new("p", None);
        let mut denied = PrivacyRequest::new("p", None);
        denied.deny(None).expect("deny");
        repo.save_privacy_request(&pending).expect("save");
        repo.save_privacy_request(&denied).expect("save");

        let ids = vec!["pri_missing".to_string(), denied.id.clone(), pending.id.clone()];
        let res = review_privacy_requests(&repo, &ids, ReviewAction::Approve, Some("reviewer"));

        assert_eq!(res.succeeded.len(), 1);
        assert_eq!(res.succeeded[0].id, pending.id);
        assert_eq!(res.failed.len(), 2);
        assert_eq!(res.failed[0].message, "No privacy request found with id 'pri_missing'");
        assert_eq!(res.failed[1].message, "Cannot transition status");

        let stored = repo.get_privacy_request(&denied.id).expect("get").expect("exists");
        assert_eq!(stored.status, PrivacyRequestStatus::Denied);
        let stored = repo.get_privacy_request(&pending.id).expect("get").expect("exists");
        assert_eq!(stored.status, PrivacyRequestStatus::Approved);
    }
}
