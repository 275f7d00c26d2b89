//! Solicitudes de privacidad y su máquina de estados.

pub mod model;
pub mod review;
pub mod status;

pub use model::PrivacyRequest;
pub use review::{review_privacy_requests, BulkFailure, BulkReviewResponse, ReviewAction};
pub use status::PrivacyRequestStatus;
