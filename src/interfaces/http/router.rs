//! API Router with Swagger UI

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{
    BookingCoordinator, LifecycleService, ReservationQueries, SharedEventBus,
};
use crate::domain::RepositoryProvider;
use crate::interfaces::ws::{create_notification_state, ws_notifications_handler};

use super::common::{ApiResponse, PaginatedResponse};
use super::modules::health::{self, ComponentHealth, HealthResponse, HealthState, OutboxBacklog};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::outbox::{self, OutboxState, OutboxStatsResponse};
use super::modules::request_id::request_id_middleware;
use super::modules::reservations::{
    self,
    dto::{HotelStatisticsResponse, ReservationRequest, ReservationResponse},
    ReservationAppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::update_reservation,
        reservations::delete_reservation,
        reservations::confirm_reservation,
        reservations::cancel_reservation,
        reservations::complete_reservation,
        reservations::check_conflicts,
        reservations::list_conflicts,
        reservations::upcoming,
        reservations::check_ins_today,
        reservations::check_outs_today,
        reservations::overdue,
        reservations::statistics,
        outbox::outbox_stats,
    ),
    components(schemas(
        ApiResponse<ReservationResponse>,
        PaginatedResponse<ReservationResponse>,
        ReservationRequest,
        ReservationResponse,
        HotelStatisticsResponse,
        OutboxStatsResponse,
        HealthResponse,
        ComponentHealth,
        OutboxBacklog,
    )),
    tags(
        (name = "Reservations", description = "Room booking and lifecycle"),
        (name = "Hotel views", description = "Per-hotel arrivals, departures and statistics"),
        (name = "Outbox", description = "Booking event delivery"),
        (name = "Health", description = "Service health")
    ),
    info(
        title = "Hotel Reservation Service",
        description = "Room reservations with store-enforced interval exclusivity"
    )
)]
pub struct ApiDoc;

/// Everything the HTTP layer needs from the running service
#[derive(Clone)]
pub struct ApiContext {
    pub repos: Arc<dyn RepositoryProvider>,
    pub coordinator: Arc<BookingCoordinator>,
    pub event_bus: SharedEventBus,
    /// `None` on the in-memory store
    pub db: Option<DatabaseConnection>,
    /// `None` when no Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
    pub request_timeout: Duration,
    pub started_at: Arc<Instant>,
}

pub fn create_api_router(ctx: ApiContext) -> Router {
    let reservation_state = ReservationAppState {
        coordinator: ctx.coordinator.clone(),
        lifecycle: LifecycleService::new(ctx.repos.clone()),
        queries: ReservationQueries::new(ctx.repos.clone()),
    };

    let reservation_routes = Router::new()
        .route(
            "/api/v1/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/api/v1/reservations/conflicts",
            get(reservations::check_conflicts),
        )
        .route(
            "/api/v1/reservations/conflicts/details",
            get(reservations::list_conflicts),
        )
        .route(
            "/api/v1/reservations/{id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route(
            "/api/v1/reservations/{id}/confirm",
            put(reservations::confirm_reservation),
        )
        .route(
            "/api/v1/reservations/{id}/cancel",
            put(reservations::cancel_reservation),
        )
        .route(
            "/api/v1/reservations/{id}/complete",
            put(reservations::complete_reservation),
        )
        .route(
            "/api/v1/reservations/hotel/{hotel_id}/upcoming",
            get(reservations::upcoming),
        )
        .route(
            "/api/v1/reservations/hotel/{hotel_id}/check-ins/today",
            get(reservations::check_ins_today),
        )
        .route(
            "/api/v1/reservations/hotel/{hotel_id}/check-outs/today",
            get(reservations::check_outs_today),
        )
        .route(
            "/api/v1/reservations/hotel/{hotel_id}/overdue",
            get(reservations::overdue),
        )
        .route(
            "/api/v1/reservations/hotel/{hotel_id}/statistics",
            get(reservations::statistics),
        )
        .with_state(reservation_state);

    let outbox_routes = Router::new()
        .route("/api/v1/outbox/stats", get(outbox::outbox_stats))
        .with_state(OutboxState {
            repos: ctx.repos.clone(),
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(HealthState {
            db: ctx.db.clone(),
            repos: ctx.repos.clone(),
            started_at: ctx.started_at.clone(),
        });

    // Long-lived; kept outside the request timeout
    let event_routes = Router::new()
        .route("/api/v1/events/ws", get(ws_notifications_handler))
        .with_state(create_notification_state(ctx.event_bus.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut api = Router::new()
        .merge(reservation_routes)
        .merge(outbox_routes)
        .merge(health_routes)
        .layer(TimeoutLayer::new(ctx.request_timeout));

    if let Some(handle) = ctx.metrics {
        api = api.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .merge(event_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::coordinator::tests::coordinator;
    use crate::application::create_event_bus;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let (coordinator, repos) = coordinator();
        create_api_router(ApiContext {
            repos,
            coordinator,
            event_bus: create_event_bus(16),
            db: None,
            metrics: None,
            request_timeout: Duration::from_secs(5),
            started_at: Arc::new(Instant::now()),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn booking(room_id: i64, check_in: &str, check_out: &str) -> Value {
        json!({
            "hotelId": 1,
            "roomId": room_id,
            "guestName": "Grace Hopper",
            "guestEmail": "grace@example.com",
            "guestPhone": "+15551234567",
            "checkIn": check_in,
            "checkOut": check_out,
            "numberOfGuests": 2,
            "totalPrice": "250.00"
        })
    }

    #[tokio::test]
    async fn create_then_check_conflicts() {
        let app = app();

        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(booking(101, "2024-07-01", "2024-07-03"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "Pending");
        assert_eq!(body["data"]["totalPrice"], "250.00");

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/reservations/conflicts?roomId=101&checkIn=2024-07-02&checkOut=2024-07-04",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], true);

        let (_, body) = send(
            &app,
            "GET",
            "/api/v1/reservations/conflicts?roomId=101&checkInDate=2024-07-03&checkOutDate=2024-07-05",
            None,
        )
        .await;
        assert_eq!(body["data"], false);

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/reservations/conflicts/details?roomId=101&checkIn=2024-07-02&checkOut=2024-07-04",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overlapping_booking_is_409_with_ids() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/v1/reservations", Some(booking(7, "2024-07-01", "2024-07-05"))).await;
        let id = created["data"]["id"].clone();

        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(booking(7, "2024-07-04", "2024-07-06"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["details"]["conflictingIds"], json!([id]));
    }

    #[tokio::test]
    async fn too_many_guests_is_400_naming_the_field() {
        let app = app();
        let mut body = booking(101, "2024-07-01", "2024-07-03");
        body["numberOfGuests"] = json!(11);

        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "numberOfGuests");
    }

    #[tokio::test]
    async fn blank_guest_name_is_400_and_nothing_is_stored() {
        let app = app();
        let mut body = booking(101, "2024-07-01", "2024-07-03");
        body["guestName"] = json!("   ");

        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "guestName");

        let (_, list) = send(&app, "GET", "/api/v1/reservations", None).await;
        assert_eq!(list["data"]["total"], 0);
    }

    #[tokio::test]
    async fn sub_cent_price_is_400() {
        let app = app();
        let mut body = booking(101, "2024-07-01", "2024-07-03");
        body["totalPrice"] = json!("250.005");

        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "totalPrice");
    }

    #[tokio::test]
    async fn inverted_dates_are_400_naming_check_out() {
        let app = app();
        let (status, body) = send(&app, "POST", "/api/v1/reservations", Some(booking(101, "2024-07-03", "2024-07-03"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "checkOut");

        let (status, _) = send(
            &app,
            "GET",
            "/api/v1/reservations/conflicts?roomId=101&checkIn=2024-07-04&checkOut=2024-07-02",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn confirming_cancelled_reservation_is_409() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/v1/reservations", Some(booking(3, "2024-07-01", "2024-07-03"))).await;
        let id = created["data"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, "PUT", &format!("/api/v1/reservations/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "Cancelled");

        let (status, body) = send(&app, "PUT", &format!("/api/v1/reservations/{id}/confirm"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn delete_is_204_then_404() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/v1/reservations", Some(booking(4, "2024-07-01", "2024-07-03"))).await;
        let uri = format!("/api/v1/reservations/{}", created["data"]["id"]);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_with_stale_version_is_409() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/v1/reservations", Some(booking(5, "2024-07-01", "2024-07-03"))).await;
        let uri = format!("/api/v1/reservations/{}", created["data"]["id"]);
        let version = created["data"]["version"].as_i64().unwrap();

        let mut update = booking(5, "2024-07-01", "2024-07-04");
        update["version"] = json!(version);
        let (status, body) = send(&app, "PUT", &uri, Some(update.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["checkOut"], "2024-07-04");

        let (status, _) = send(&app, "PUT", &uri, Some(update)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn listing_and_unknown_status() {
        let app = app();
        for room in 1..=3 {
            send(&app, "POST", "/api/v1/reservations", Some(booking(room, "2024-07-01", "2024-07-03"))).await;
        }

        let (status, body) = send(&app, "GET", "/api/v1/reservations?hotelId=1&status=pending&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["totalPages"], 2);

        let (status, _) = send(&app, "GET", "/api/v1/reservations?status=lost", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_by_guest_name_dates_and_price() {
        let app = app();
        send(&app, "POST", "/api/v1/reservations", Some(booking(1, "2024-07-01", "2024-07-03"))).await;
        let mut ada = booking(2, "2024-08-01", "2024-08-03");
        ada["guestName"] = json!("Ada Lovelace");
        ada["totalPrice"] = json!("480.00");
        send(&app, "POST", "/api/v1/reservations", Some(ada)).await;

        let (status, body) = send(&app, "GET", "/api/v1/reservations?guestName=LOVE", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["guestName"], "Ada Lovelace");

        let (_, body) = send(
            &app,
            "GET",
            "/api/v1/reservations?checkInFrom=2024-06-15&checkInTo=2024-07-15",
            None,
        )
        .await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["roomId"], 1);

        let (_, body) = send(&app, "GET", "/api/v1/reservations?minPrice=300&maxPrice=500", None).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["totalPrice"], "480.00");

        let (status, body) = send(&app, "GET", "/api/v1/reservations?minPrice=500&maxPrice=300", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "maxPrice");
    }

    #[tokio::test]
    async fn health_outbox_and_request_id() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-request-id"], "abc-123");

        let (status, body) = send(&app, "GET", "/api/v1/outbox/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["failed"], 0);
    }
}
