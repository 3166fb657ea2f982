//! Mail DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_mail::Folder;
use infra_db::repositories::NewsletterRow;

#[derive(Debug, Deserialize)]
pub struct FlagsRequest {
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub is_starred: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub folder: Folder,
}

/// At most 500 ids per request
#[derive(Debug, Deserialize, Validate)]
pub struct BulkTrashRequest {
    #[validate(length(min = 1, max = 500))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_for: DateTime<Utc>,
}

/// Outcome of a newsletter send
#[derive(Debug, Serialize)]
pub struct NewsletterSendResponse {
    pub newsletter: NewsletterRow,
    pub delivered: usize,
    pub failed: usize,
}
