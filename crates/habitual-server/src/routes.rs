use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono_tz::Tz;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use habitual_db::Database;
use habitual_reminder::ReminderScheduler;
use habitual_types::api::{CycleReport, HealthResponse};

#[derive(Clone)]
pub struct AppState {
    /// `None` when reminders are disabled.
    pub scheduler: Option<ReminderScheduler<Database>>,
    pub timezone: Tz,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reminders/last-cycle", get(last_cycle))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        reminders_enabled: state.scheduler.is_some(),
        timezone: state.timezone.name().to_string(),
    })
}

/// Tally of the most recent reminder cycle. 404 until one has run, or when
/// reminders are disabled.
pub async fn last_cycle(State(state): State<AppState>) -> Result<Json<CycleReport>, StatusCode> {
    let scheduler = state.scheduler.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    scheduler
        .last_report()
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    use habitual_reminder::{Ack, Dispatcher, NotificationGateway, SendError};

    struct NoopGateway;

    #[async_trait::async_trait]
    impl NotificationGateway for NoopGateway {
        async fn send(&self, _recipient: i64, _text: &str) -> Result<Ack, SendError> {
            Ok(Ack { message_id: None })
        }
    }

    fn scheduler() -> ReminderScheduler<Database> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ReminderScheduler::new(
            Dispatcher::new(db, Arc::new(NoopGateway), Duration::from_secs(1)),
            chrono_tz::Europe::Berlin,
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_disabled_reminders() {
        let app = router(AppState {
            scheduler: None,
            timezone: chrono_tz::UTC,
        });
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["reminders_enabled"], false);
        assert_eq!(body["timezone"], "UTC");
    }

    #[tokio::test]
    async fn last_cycle_is_404_until_a_cycle_ran() {
        let scheduler = scheduler();
        let app = router(AppState {
            scheduler: Some(scheduler.clone()),
            timezone: scheduler.timezone(),
        });

        let (status, _) = get_json(app.clone(), "/reminders/last-cycle").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        scheduler
            .run_once_at(Utc.with_ymd_and_hms(2026, 1, 1, 11, 30, 0).unwrap())
            .await
            .unwrap();

        let (status, body) = get_json(app, "/reminders/last-cycle").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["local_minute"], "2026-01-01 12:30");
        assert_eq!(body["sent"], 0);
    }
}
