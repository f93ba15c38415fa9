//! Borrow request model and related types

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::enums::{RequestStatus, ViewRole};
use super::item::Item;
use super::user::User;

/// Borrow request as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub id: i64,
    pub item: Item,
    pub borrower: User,
    pub lender: User,
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
}

impl BorrowRequest {
    /// The other party, seen from `role`
    pub fn counterpart(&self, role: ViewRole) -> &User {
        match role {
            ViewRole::Borrower => &self.lender,
            ViewRole::Lender => &self.borrower,
        }
    }

    /// `returnedAt` is set iff RETURNED/COMPLETED, `completedAt` iff COMPLETED.
    pub fn timestamps_consistent(&self) -> bool {
        let returned = matches!(self.status, RequestStatus::Returned | RequestStatus::Completed);
        let completed = self.status == RequestStatus::Completed;
        self.returned_at.is_some() == returned && self.completed_at.is_some() == completed
    }

    /// Number of calendar days covered by the loan
    pub fn duration_days(&self) -> i64 {
        (self.return_date - self.borrow_date).num_days()
    }
}

/// Create borrow request payload (`POST /requests?itemId=`)
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_date_range", skip_on_field_errors = false))]
pub struct CreateBorrowRequest {
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Request message must not exceed 500 characters"))]
    pub request_message: Option<String>,
}

fn validate_date_range(dto: &CreateBorrowRequest) -> Result<(), ValidationError> {
    if dto.borrow_date < Local::now().date_naive() {
        let mut err = ValidationError::new("borrow_date_past");
        err.message = Some("Borrow date cannot be in the past".into());
        return Err(err);
    }
    if dto.return_date <= dto.borrow_date {
        let mut err = ValidationError::new("date_range");
        err.message = Some("Return date must be after borrow date".into());
        return Err(err);
    }
    Ok(())
}

/// Lender response attached to approve/reject
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Response message must not exceed 500 characters"))]
    pub response_message: Option<String>,
}

impl ResponsePayload {
    /// Blank messages are not sent
    pub fn new(message: Option<String>) -> Self {
        Self {
            response_message: message.filter(|m| !m.trim().is_empty()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "id": 42,
            "item": {
                "id": 9, "title": "Tent", "description": "4 person", "category": "Outdoor",
                "imageUrl": "https://res.cloudinary.com/x/tent.jpg", "status": "AVAILABLE",
                "owner": {"id": 2, "username": "lena", "fullName": "Lena Park"}
            },
            "borrower": {"id": 1, "username": "bob", "email": "bob@example.com", "fullName": "Bob Ray"},
            "lender": {"id": 2, "username": "lena", "email": "lena@example.com", "fullName": "Lena Park", "phone": "555"},
            "status": "PENDING",
            "requestMessage": "Camping trip",
            "borrowDate": "2025-06-01",
            "returnDate": "2025-06-03",
            "createdAt": "2025-05-20T08:15:30.123",
            "updatedAt": "2025-05-20T08:15:30"
        }"#;

        let request: BorrowRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, 42);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.lender.phone.as_deref(), Some("555"));
        assert_eq!(request.borrower.phone, None);
        assert_eq!(request.duration_days(), 2);
        assert!(request.timestamps_consistent());
    }

    #[test]
    fn test_counterpart() {
        let request = fixtures::request(1, RequestStatus::Pending);
        assert_eq!(request.counterpart(ViewRole::Borrower).username, "lena");
        assert_eq!(request.counterpart(ViewRole::Lender).username, "bob");
    }

    #[test]
    fn test_fixtures_respect_timestamp_invariant() {
        for status in RequestStatus::ALL {
            assert!(fixtures::request(1, status).timestamps_consistent());
        }
    }

    #[test]
    fn test_create_request_validation() {
        let today = Local::now().date_naive();
        let ok = CreateBorrowRequest {
            borrow_date: today + Duration::days(1),
            return_date: today + Duration::days(3),
            request_message: Some("Please".to_string()),
        };
        assert!(ok.validate().is_ok());

        let same_day = CreateBorrowRequest {
            return_date: ok.borrow_date,
            ..ok.clone()
        };
        assert!(same_day.validate().is_err());

        let past = CreateBorrowRequest {
            borrow_date: today - Duration::days(2),
            return_date: today + Duration::days(2),
            request_message: None,
        };
        assert!(past.validate().is_err());

        let long = CreateBorrowRequest {
            request_message: Some("x".repeat(501)),
            ..ok
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_response_payload_drops_blank_message() {
        let payload = ResponsePayload::new(Some("   ".to_string()));
        assert_eq!(serde_json::to_string(&payload).unwrap(), "{}");

        let payload = ResponsePayload::new(Some("ok".to_string()));
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"responseMessage":"ok"}"#);
        assert!(ResponsePayload::new(Some("y".repeat(501))).validate().is_err());
    }
}
