use serde::{Deserialize, Serialize};

use docflow_infra::{InvocationReport, ObjectCreated};

/// Body of `POST /v1/events/object-created`.
///
/// Accepts either a single `{bucket, objectKey}` or an object-store
/// notification envelope with a `Records` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObjectCreatedRequest {
    Notification {
        #[serde(rename = "Records")]
        records: Vec<NotificationRecord>,
    },
    Single(ObjectCreated),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub s3: NotificationEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEntity {
    pub bucket: NotificationBucket,
    pub object: NotificationObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationBucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationObject {
    /// URL-encoded, as delivered.
    pub key: String,
}

impl ObjectCreatedRequest {
    pub fn into_triggers(self) -> Vec<ObjectCreated> {
        match self {
            ObjectCreatedRequest::Single(trigger) => vec![trigger],
            ObjectCreatedRequest::Notification { records } => records
                .into_iter()
                .map(|r| ObjectCreated {
                    bucket: r.s3.bucket.name,
                    object_key: r.s3.object.key,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    pub reports: Vec<InvocationReport>,
}
