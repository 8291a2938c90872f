//! Response envelope and error mapping shared by every handler

pub mod validated_json;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::errors::DomainError;
use crate::shared::types::PaginatedResult;

pub use validated_json::ValidatedJson;

/// Standard API envelope.
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured error context, e.g. the field that failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub type ApiError<T> = (StatusCode, Json<ApiResponse<T>>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Conflict { .. }
        | DomainError::StaleWrite { .. }
        | DomainError::IllegalTransition { .. } => StatusCode::CONFLICT,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain failure onto the HTTP envelope.
pub fn domain_error<T>(err: DomainError) -> ApiError<T> {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }

    let details = match &err {
        DomainError::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
        DomainError::Conflict {
            room_id,
            check_in,
            check_out,
            conflicting_ids,
        } => Some(serde_json::json!({
            "roomId": room_id,
            "checkIn": check_in,
            "checkOut": check_out,
            "conflictingIds": conflicting_ids,
        })),
        DomainError::StaleWrite {
            id,
            expected_version,
        } => Some(serde_json::json!({ "id": id, "expectedVersion": expected_version })),
        DomainError::IllegalTransition { id, from, action } => Some(serde_json::json!({
            "id": id,
            "status": from,
            "action": action,
        })),
        DomainError::NotFound { .. } | DomainError::Storage(_) => None,
    };

    let mut body = ApiResponse::error(err.to_string());
    body.details = details;
    (status, Json(body))
}

/// Paginated list with page metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T, U: Into<T>> From<PaginatedResult<U>> for PaginatedResponse<T> {
    fn from(result: PaginatedResult<U>) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LifecycleAction, ReservationStatus};
    use chrono::NaiveDate;

    #[test]
    fn status_mapping() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let cases = [
            (DomainError::validation("totalPrice", "must be > 0"), StatusCode::BAD_REQUEST),
            (DomainError::reservation_not_found(1), StatusCode::NOT_FOUND),
            (
                DomainError::Conflict {
                    room_id: 1,
                    check_in: day,
                    check_out: day.succ_opt().unwrap(),
                    conflicting_ids: vec![3],
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::StaleWrite {
                    id: 1,
                    expected_version: 0,
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::IllegalTransition {
                    id: 1,
                    from: ReservationStatus::Cancelled,
                    action: LifecycleAction::Confirm,
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{err}");
        }
    }

    #[test]
    fn conflict_details_carry_ids() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (status, Json(body)) = domain_error::<()>(DomainError::Conflict {
            room_id: 7,
            check_in: day,
            check_out: day.succ_opt().unwrap(),
            conflicting_ids: vec![11, 12],
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.success);
        let details = body.details.unwrap();
        assert_eq!(details["conflictingIds"], serde_json::json!([11, 12]));
        assert_eq!(details["checkIn"], "2024-06-01");
    }
}
