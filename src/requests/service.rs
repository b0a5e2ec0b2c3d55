use uuid::Uuid;
use validator::Validate;

use crate::{
    requests::{
        error::{RequestError, invalid_request, persistence_failed},
        types::{DataSubjectRequest, RequestStatus, RequestSubject, RequestType},
    },
    sanitize::{sanitize_email, sanitize_input},
    storage::SafeStorage,
};

pub const REQUEST_STORAGE_KEY: &str = "ndpr_requests";

#[derive(Debug, Validate)]
struct NewRequest {
    #[validate(length(min = 1, max = 200))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(max = 5000))]
    details: String,
}

/// Data subject requests kept as one JSON array in the shared store.
#[derive(Debug, Clone)]
pub struct RequestService {
    storage: SafeStorage,
}

impl RequestService {
    pub fn new(storage: SafeStorage) -> Self {
        Self { storage }
    }

    pub fn create_request(
        &self,
        request_type: RequestType,
        requester_name: &str,
        requester_email: &str,
        details: &str,
    ) -> Result<DataSubjectRequest, RequestError> {
        NewRequest {
            name: requester_name.trim().to_string(),
            email: requester_email.trim().to_string(),
            details: details.to_string(),
        }
        .validate()
        .map_err(|err| invalid_request(format!("invalid data subject request: {err}")))?;

        let email = sanitize_email(requester_email.trim())
            .map_err(|err| invalid_request(format!("invalid requester email: {err}")))?;
        let now = self.storage.clock().now_millis();
        let request = DataSubjectRequest {
            id: Uuid::new_v4(),
            request_type,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            subject: RequestSubject {
                name: sanitize_input(requester_name.trim()),
                email,
                phone: None,
            },
            description: sanitize_input(details),
        };

        if self
            .storage
            .append_to_array(REQUEST_STORAGE_KEY, &request)
            .is_none()
        {
            return Err(persistence_failed(
                "failed to save request; storage may be full or unavailable",
            ));
        }

        tracing::info!(
            target: "requests",
            request_id = %request.id,
            request_type = ?request.request_type,
            "data_subject_request_created"
        );
        Ok(request)
    }

    /// Moves a request to `status`. `Ok(None)` when no request has that id.
    pub fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<DataSubjectRequest>, RequestError> {
        // Undecodable elements stay in the array untouched.
        let Some(mut requests) = self.storage.read_json_array(REQUEST_STORAGE_KEY) else {
            return Ok(None);
        };
        let mut updated = None;
        for item in requests.iter_mut() {
            let Ok(mut request) = serde_json::from_value::<DataSubjectRequest>(item.clone()) else {
                continue;
            };
            if request.id != id {
                continue;
            }
            request.status = status;
            request.updated_at = self.storage.clock().now_millis();
            *item = serde_json::to_value(&request)
                .map_err(|err| persistence_failed(format!("failed to encode request: {err}")))?;
            updated = Some(request);
            break;
        }
        let Some(updated) = updated else {
            return Ok(None);
        };

        if !self.storage.write(REQUEST_STORAGE_KEY, &requests) {
            return Err(persistence_failed("failed to update request status"));
        }

        tracing::info!(
            target: "requests",
            request_id = %updated.id,
            status = ?updated.status,
            "data_subject_request_updated"
        );
        Ok(Some(updated))
    }

    pub fn get_request(&self, id: Uuid) -> Option<DataSubjectRequest> {
        self.all_requests()
            .into_iter()
            .find(|request| request.id == id)
    }

    pub fn all_requests(&self) -> Vec<DataSubjectRequest> {
        self.storage.read_array(REQUEST_STORAGE_KEY)
    }

    pub fn clear(&self) -> bool {
        self.storage.remove(REQUEST_STORAGE_KEY)
    }
}
