//! HTTP API handlers
//!
//! Request handlers for users, events and health.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use ourcal_core::{CreateEventRequest, Event, EventChange, UpdateEventRequest, User};

use crate::error::Result;
use crate::server::AppState;

// ============================================================================
// Response types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Plain confirmation message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint; never touches the database
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Our Calendar API is running",
    })
}

/// List all users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.calendar.list_users()?))
}

/// List all events ordered by start date
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.calendar.list_events()?))
}

/// Get a single event
pub async fn get_event(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Event>> {
    let Path(id) = id?;
    Ok(Json(state.calendar.get_event(id)?))
}

/// Create an event and notify the other user when the policy says so
pub async fn create_event(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>)> {
    let Json(request) = payload?;
    debug!("Create event request: {:?}", request);

    let change = state.calendar.create_event(request)?;
    notify(&state, &change);

    Ok((StatusCode::CREATED, Json(change.event)))
}

/// Apply a partial update to an event
pub async fn update_event(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Json<Event>> {
    let Path(id) = id?;
    let Json(request) = payload?;
    debug!("Update event {} request: {:?}", id, request);

    let change = state.calendar.update_event(id, request)?;
    notify(&state, &change);

    Ok(Json(change.event))
}

/// Delete an event
pub async fn delete_event(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = id?;
    state.calendar.delete_event(id)?;

    Ok(Json(MessageResponse {
        message: "Event deleted successfully".to_string(),
    }))
}

/// Hand a completed write to the dispatcher; the outcome never affects the response
fn notify(state: &AppState, change: &EventChange) {
    let decision = state.dispatcher.dispatch(change);
    debug!(
        "Notification decision for event {}: {:?}",
        change.event.id, decision
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use ourcal_core::{CalendarService, Config, NotifyConfig};
    use ourcal_notify::{DispatcherHandle, Mailer, Notification, NotificationDispatcher, NotificationPolicy};

    use crate::routes::routes;
    use crate::server::AppState;

    struct RecordingMailer {
        tx: mpsc::UnboundedSender<Notification>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, message: &Notification) -> ourcal_notify::Result<()> {
            let _ = self.tx.send(message.clone());
            Ok(())
        }
    }

    struct TestApp {
        router: Router,
        calendar: CalendarService,
        angel_id: i64,
        andrea_id: i64,
        sent: mpsc::UnboundedReceiver<Notification>,
        _worker: DispatcherHandle,
    }

    fn test_app() -> TestApp {
        let calendar = CalendarService::in_memory().unwrap();
        let users = calendar
            .seed_users(&["Angel".to_string(), "Andrea".to_string()])
            .unwrap();

        let (tx, sent) = mpsc::unbounded_channel();
        let (dispatcher, worker) = NotificationDispatcher::start(
            NotificationPolicy::new(NotifyConfig::default().rules),
            Arc::new(RecordingMailer { tx }),
            16,
        );

        let state = AppState::new(Config::default(), calendar.clone(), dispatcher);
        TestApp {
            router: routes().with_state(state),
            calendar,
            angel_id: users[0].id,
            andrea_id: users[1].id,
            sent,
            _worker: worker,
        }
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn trip(user_id: i64) -> Value {
        json!({
            "title": "Trip",
            "event_type": "holiday",
            "start_date": "2025-01-05T09:00:00Z",
            "end_date": "2025-01-06T09:00:00Z",
            "user_id": user_id
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app.router, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "Our Calendar API is running");
    }

    #[tokio::test]
    async fn test_list_users() {
        let app = test_app();
        let (status, body) = send(&app.router, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"id": app.angel_id, "name": "Angel"},
                {"id": app.andrea_id, "name": "Andrea"}
            ])
        );
    }

    #[tokio::test]
    async fn test_create_by_angel_schedules_notification() {
        let mut app = test_app();
        let (status, body) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.angel_id))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["id"].as_i64().is_some());
        assert_eq!(body["title"], "Trip");
        assert_eq!(body["description"], "");
        assert_eq!(body["event_type"], "holiday");
        assert_eq!(body["start_date"], "2025-01-05T09:00:00Z");
        assert_eq!(body["end_date"], "2025-01-06T09:00:00Z");
        assert_eq!(body["user_id"], app.angel_id);
        assert_eq!(body["applies_to_both"], false);

        let message = tokio::time::timeout(Duration::from_secs(5), app.sent.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.subject, "Calendar Update: Trip created");
        assert_eq!(message.to_name, "Andrea");
    }

    #[tokio::test]
    async fn test_create_by_andrea_sends_nothing() {
        let mut app = test_app();
        let (status, _) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.andrea_id))).await;
        assert_eq!(status, StatusCode::CREATED);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(app.sent.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let app = test_app();
        let mut payload = trip(app.angel_id);
        payload["description"] = json!("Mountains");
        payload["applies_to_both"] = json!(true);

        let (_, created) = send(&app.router, Method::POST, "/api/events", Some(payload)).await;
        let uri = format!("/api/events/{}", created["id"]);
        let (status, fetched) = send(&app.router, Method::GET, &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
        assert_eq!(fetched["description"], "Mountains");
        assert_eq!(fetched["applies_to_both"], true);
    }

    #[tokio::test]
    async fn test_create_missing_field() {
        let app = test_app();
        for field in ["title", "event_type", "start_date", "end_date", "user_id"] {
            let mut payload = trip(app.angel_id);
            payload.as_object_mut().unwrap().remove(field);

            let (status, body) = send(&app.router, Method::POST, "/api/events", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], format!("Missing required field: {}", field));
        }
        assert_eq!(app.calendar.count_events().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_invalid_event_type() {
        let app = test_app();
        let mut payload = trip(app.angel_id);
        payload["event_type"] = json!("party");

        let (status, body) = send(&app.router, Method::POST, "/api/events", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid event type. Must be one of: work, holiday, other"
        );
        assert_eq!(app.calendar.count_events().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_unparseable_date() {
        let app = test_app();
        let mut payload = trip(app.angel_id);
        payload["start_date"] = json!("not a date");

        let (status, body) = send(&app.router, Method::POST, "/api/events", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("not a date"));
    }

    #[tokio::test]
    async fn test_create_unknown_user() {
        let app = test_app();
        let (status, body) =
            send(&app.router, Method::POST, "/api/events", Some(trip(999))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
        assert_eq!(app.calendar.count_events().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_malformed_body() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/events",
            Some(json!({"title": "Trip", "user_id": "angel"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_list_events_sorted() {
        let app = test_app();
        for start in [
            "2025-03-01T00:00:00Z",
            "2025-01-01T00:00:00Z",
            "2025-02-01T00:00:00Z",
        ] {
            let mut payload = trip(app.andrea_id);
            payload["start_date"] = json!(start);
            send(&app.router, Method::POST, "/api/events", Some(payload)).await;
        }

        let (status, body) = send(&app.router, Method::GET, "/api/events", None).await;
        assert_eq!(status, StatusCode::OK);
        let starts: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["start_date"].as_str().unwrap())
            .collect();
        assert_eq!(
            starts,
            vec![
                "2025-01-01T00:00:00Z",
                "2025-02-01T00:00:00Z",
                "2025-03-01T00:00:00Z"
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_update() {
        let mut app = test_app();
        let (_, created) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.angel_id))).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), app.sent.recv()).await;

        let uri = format!("/api/events/{}", created["id"]);
        let (status, updated) = send(
            &app.router,
            Method::PUT,
            &uri,
            Some(json!({"title": "Ski trip", "applies_to_both": true})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Ski trip");
        assert_eq!(updated["applies_to_both"], true);
        for field in ["description", "event_type", "start_date", "end_date", "user_id"] {
            assert_eq!(updated[field], created[field], "{} changed", field);
        }

        let message = tokio::time::timeout(Duration::from_secs(5), app.sent.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.subject, "Calendar Update: Ski trip updated");
    }

    #[tokio::test]
    async fn test_update_invalid_event_type_does_not_mutate() {
        let app = test_app();
        let (_, created) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.andrea_id))).await;
        let uri = format!("/api/events/{}", created["id"]);

        let (status, _) = send(
            &app.router,
            Method::PUT,
            &uri,
            Some(json!({"title": "Changed", "event_type": "party"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, fetched) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let app = test_app();
        let (_, created) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.andrea_id))).await;
        let uri = format!("/api/events/{}", created["id"]);

        let (status, body) =
            send(&app.router, Method::PUT, &uri, Some(json!({"user_id": 999}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");

        let (_, fetched) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_update_nonexistent_event() {
        let mut app = test_app();
        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/api/events/12345",
            Some(json!({"title": "Nope"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Event not found");
        assert_eq!(app.calendar.count_events().unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(app.sent.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let app = test_app();
        let (_, created) =
            send(&app.router, Method::POST, "/api/events", Some(trip(app.andrea_id))).await;
        let uri = format!("/api/events/{}", created["id"]);

        let (status, body) = send(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Event deleted successfully");

        let (status, _) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app.router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Event not found");
    }

    #[tokio::test]
    async fn test_non_numeric_id() {
        let app = test_app();
        let (status, body) = send(&app.router, Method::GET, "/api/events/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_storage_failure_is_500_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.db");
        let calendar = CalendarService::open(path.to_str().unwrap()).unwrap();
        let users = calendar
            .seed_users(&["Angel".to_string(), "Andrea".to_string()])
            .unwrap();
        let andrea_id = users[1].id;

        let state = AppState::new(
            Config::default(),
            calendar.clone(),
            NotificationDispatcher::disabled(),
        );
        let router = routes().with_state(state);

        let (_, created) =
            send(&router, Method::POST, "/api/events", Some(trip(andrea_id))).await;
        let uri = format!("/api/events/{}", created["id"]);

        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_insert BEFORE INSERT ON events
             BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END;
             CREATE TRIGGER reject_update BEFORE UPDATE ON events
             BEGIN SELECT RAISE(ABORT, 'storage unavailable'); END;",
        )
        .unwrap();

        let (status, body) =
            send(&router, Method::POST, "/api/events", Some(trip(andrea_id))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("storage unavailable"));
        assert_eq!(calendar.count_events().unwrap(), 1);

        let (status, body) =
            send(&router, Method::PUT, &uri, Some(json!({"title": "Changed"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("storage unavailable"));

        let (status, fetched) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        conn.execute_batch("DROP TABLE events;").unwrap();
        let (status, body) = send(&router, Method::GET, "/api/events", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("no such table"));
    }
}
