//! Reservation DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::application::HotelStatistics;
use crate::domain::reservation::model::{MAX_PRICE, PRICE_SCALE};
use crate::domain::{Reservation, ReservationDraft};

/// E.164-style phone: optional `+`, a non-zero digit, then 1 to 14 digits
fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("guest phone must be valid".into()))
    }
}

fn validate_guest_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::new("blank").with_message("guest name is required".into()))
    } else {
        Ok(())
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("range").with_message("total price must be greater than 0".into()));
    }
    if price.normalize().scale() > PRICE_SCALE || *price > MAX_PRICE {
        return Err(ValidationError::new("precision").with_message(
            "total price must have at most 2 decimal places and not exceed 99999999.99".into(),
        ));
    }
    Ok(())
}

/// Booking fields for create and update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub hotel_id: i64,
    pub room_id: i64,
    #[validate(
        custom(function = "validate_guest_name"),
        length(max = 100, message = "guest name must be at most 100 characters")
    )]
    pub guest_name: String,
    #[validate(
        email(message = "guest email must be valid"),
        length(max = 100, message = "guest email must be at most 100 characters")
    )]
    pub guest_email: String,
    #[validate(custom(function = "validate_phone"))]
    pub guest_phone: String,
    /// First night (YYYY-MM-DD)
    #[serde(alias = "checkInDate")]
    pub check_in: NaiveDate,
    /// Departure day, exclusive (YYYY-MM-DD)
    #[serde(alias = "checkOutDate")]
    pub check_out: NaiveDate,
    #[validate(range(min = 1, max = 10, message = "number of guests must be between 1 and 10"))]
    pub number_of_guests: i32,
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = String, example = "250.00")]
    pub total_price: Decimal,
    #[validate(length(max = 500, message = "special requests must be at most 500 characters"))]
    pub special_requests: Option<String>,
    /// Version the caller last read; only used by updates
    pub version: Option<i64>,
}

impl ReservationRequest {
    pub fn into_draft(self) -> (ReservationDraft, Option<i64>) {
        let version = self.version;
        let draft = ReservationDraft {
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            guest_name: self.guest_name.trim().to_string(),
            guest_email: self.guest_email.trim().to_string(),
            guest_phone: self.guest_phone,
            check_in: self.check_in,
            check_out: self.check_out,
            number_of_guests: self.number_of_guests,
            total_price: self.total_price,
            special_requests: self.special_requests.filter(|s| !s.trim().is_empty()),
        };
        (draft, version)
    }
}

/// Reservation in API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: i64,
    pub hotel_id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    #[schema(value_type = String, example = "250.00")]
    pub total_price: Decimal,
    pub special_requests: Option<String>,
    /// Pending, Confirmed, Cancelled or Completed
    pub status: String,
    pub active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            hotel_id: r.hotel_id,
            room_id: r.room_id,
            guest_name: r.guest_name,
            guest_email: r.guest_email,
            guest_phone: r.guest_phone,
            check_in: r.check_in,
            check_out: r.check_out,
            number_of_guests: r.number_of_guests,
            total_price: r.total_price,
            special_requests: r.special_requests,
            status: r.status.as_str().to_string(),
            active: r.active,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Room and stay to check for conflicts
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ConflictQuery {
    pub room_id: i64,
    #[serde(alias = "checkInDate")]
    pub check_in: NaiveDate,
    #[serde(alias = "checkOutDate")]
    pub check_out: NaiveDate,
    /// Reservation to ignore, e.g. the one being edited
    pub exclude_id: Option<i64>,
}

/// Listing filters and page
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListReservationsQuery {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub guest_email: Option<String>,
    /// Case-insensitive part of the guest name
    pub guest_name: Option<String>,
    /// Pending, Confirmed, Cancelled or Completed (case-insensitive)
    pub status: Option<String>,
    /// Earliest check-in (inclusive)
    pub check_in_from: Option<NaiveDate>,
    /// Latest check-in (inclusive)
    pub check_in_to: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotelStatisticsResponse {
    pub hotel_id: i64,
    pub total_reservations: u64,
    #[schema(value_type = Object)]
    pub by_status: std::collections::BTreeMap<String, u64>,
    #[schema(value_type = Option<String>)]
    pub average_price: Option<Decimal>,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
}

impl From<HotelStatistics> for HotelStatisticsResponse {
    fn from(s: HotelStatistics) -> Self {
        Self {
            hotel_id: s.hotel_id,
            total_reservations: s.total_reservations,
            by_status: s
                .by_status
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            average_price: s.average_price,
            total_revenue: s.total_revenue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ReservationRequest {
        serde_json::from_value(json).unwrap()
    }

    fn body() -> serde_json::Value {
        serde_json::json!({
            "hotelId": 1,
            "roomId": 101,
            "guestName": "Ada Lovelace",
            "guestEmail": "ada@example.com",
            "guestPhone": "+441234567890",
            "checkIn": "2024-07-01",
            "checkOut": "2024-07-03",
            "numberOfGuests": 2,
            "totalPrice": "250.00"
        })
    }

    #[test]
    fn accepts_legacy_date_names() {
        let mut json = body();
        let obj = json.as_object_mut().unwrap();
        obj.remove("checkIn");
        obj.remove("checkOut");
        obj.insert("checkInDate".into(), "2024-07-01".into());
        obj.insert("checkOutDate".into(), "2024-07-03".into());

        let req = request(json);
        assert_eq!(req.check_in, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+441234567890").is_ok());
        assert!(validate_phone("12").is_ok());
        assert!(validate_phone("0123456").is_err());
        assert!(validate_phone("+1").is_err());
        assert!(validate_phone("+1234567890123456").is_err());
        assert!(validate_phone("555-0100").is_err());
    }

    #[test]
    fn blank_name_and_fractional_cents_are_rejected() {
        let mut json = body();
        json["guestName"] = "   ".into();
        json["totalPrice"] = "250.005".into();
        let errors = request(json).validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("guest_name"));
        assert!(fields.contains_key("total_price"));

        let mut json = body();
        json["totalPrice"] = "250.50".into();
        assert!(request(json).validate().is_ok());
    }

    #[test]
    fn rejects_zero_price_and_too_many_guests() {
        let mut json = body();
        json["totalPrice"] = "0".into();
        json["numberOfGuests"] = 11.into();
        let errors = request(json).validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("total_price"));
        assert!(fields.contains_key("number_of_guests"));
    }

    #[test]
    fn response_serializes_price_as_string() {
        let (draft, _) = request(body()).into_draft();
        let r = Reservation::from_draft(5, draft, Utc::now());
        let json = serde_json::to_value(ReservationResponse::from(r)).unwrap();
        assert_eq!(json["totalPrice"], "250.00");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["checkOut"], "2024-07-03");
    }
}
