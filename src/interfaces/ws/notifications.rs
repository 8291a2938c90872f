//! WebSocket stream of published reservation events
//!
//! Downstream consumers (notification senders, dashboards) attach here.
//! While at least one client is connected the bus publisher can deliver.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::select;
use tracing::{debug, error, info, warn};

use crate::application::events::{EventMessage, SharedEventBus};

/// Query parameters for filtering events
#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only events for this hotel
    pub hotel_id: Option<i64>,
    /// Comma-separated event types, e.g. `RESERVATION_CREATED`
    pub event_types: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &EventMessage) -> bool {
        if let Some(hotel_id) = self.hotel_id {
            if event.payload.get("hotel_id").and_then(|v| v.as_i64()) != Some(hotel_id) {
                return false;
            }
        }

        if let Some(ref types) = self.event_types {
            if !types
                .split(',')
                .map(str::trim)
                .any(|t| t == event.event_type)
            {
                return false;
            }
        }

        true
    }
}

#[derive(Clone)]
pub struct NotificationState {
    pub event_bus: SharedEventBus,
}

pub async fn ws_notifications_handler(
    ws: WebSocketUpgrade,
    State(state): State<NotificationState>,
    Query(filter): Query<EventFilter>,
) -> impl IntoResponse {
    info!(
        hotel_id = ?filter.hotel_id,
        event_types = ?filter.event_types,
        "New event stream connection"
    );

    ws.on_upgrade(move |socket| handle_event_socket(socket, state, filter))
}

async fn handle_event_socket(socket: WebSocket, state: NotificationState, filter: EventFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscriber = state.event_bus.subscribe();

    let welcome = serde_json::json!({
        "type": "connected",
        "message": "Connected to reservation event stream",
        "filter": {
            "hotel_id": filter.hotel_id,
            "event_types": filter.event_types
        }
    });

    if let Err(e) = sender
        .send(Message::Text(welcome.to_string().into()))
        .await
    {
        error!(error = %e, "Failed to send welcome message");
        return;
    }

    loop {
        select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            error!(error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "Event stream socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            event = subscriber.recv() => {
                let Some(event) = event else {
                    warn!("Event bus closed");
                    break;
                };
                if !filter.matches(&event) {
                    continue;
                }

                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(e) = sender.send(Message::Text(json.into())).await {
                            error!(error = %e, "Failed to send event");
                            break;
                        }
                        debug!(event_id = %event.id, "Event streamed to client");
                    }
                    Err(e) => error!(error = %e, "Failed to serialize event"),
                }
            }
        }
    }

    info!("Event stream client disconnected");
}

pub fn create_notification_state(event_bus: SharedEventBus) -> NotificationState {
    NotificationState { event_bus }
}
