use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::notifications::{CreateNotificationError, NewNotification, NotificationService};

use super::identity::{Identity, IdentityProvider};
use super::state::{GuardedNotificationService, ServerState};
use super::websocket::ws_handler;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    pub unread: usize,
}

#[derive(Serialize)]
struct MarkAllReadResponse {
    pub marked: usize,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn post_notification(
    _identity: Identity,
    State(service): State<GuardedNotificationService>,
    Json(body): Json<NewNotification>,
) -> Response {
    match service.create_notification(&body).await {
        Ok(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        Err(CreateNotificationError::Invalid(reason)) => {
            (StatusCode::BAD_REQUEST, reason).into_response()
        }
        Err(err) => {
            error!("Failed to create notification: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_notifications(
    identity: Identity,
    State(service): State<GuardedNotificationService>,
    Query(params): Query<ListParams>,
) -> Response {
    Json(service.list_for_user(&identity.user_id, params.limit)).into_response()
}

async fn get_unread_count(
    identity: Identity,
    State(service): State<GuardedNotificationService>,
) -> Response {
    Json(UnreadCountResponse {
        unread: service.get_unread_count(&identity.user_id),
    })
    .into_response()
}

async fn mark_notification_read(
    identity: Identity,
    State(service): State<GuardedNotificationService>,
    Path(id): Path<String>,
) -> Response {
    match service.mark_as_read(&id, &identity.user_id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to mark notification {} read: {}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn mark_all_notifications_read(
    identity: Identity,
    State(service): State<GuardedNotificationService>,
) -> Response {
    match service.mark_all_as_read(&identity.user_id).await {
        Ok(marked) => Json(MarkAllReadResponse { marked }).into_response(),
        Err(err) => {
            error!(
                "Failed to mark all notifications read for user {}: {}",
                identity.user_id, err
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delete_notification(
    identity: Identity,
    State(service): State<GuardedNotificationService>,
    Path(id): Path<String>,
) -> Response {
    match service.delete_notification(&id, &identity.user_id).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete notification {}: {}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    notification_service: Arc<NotificationService>,
    identity_provider: Arc<dyn IdentityProvider>,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        notification_service,
        identity_provider,
        hash: env!("GIT_HASH").to_string(),
    };

    let notification_routes: Router = Router::new()
        .route("/notifications", post(post_notification))
        .route("/notifications", get(get_notifications))
        .route("/notifications/unread-count", get(get_unread_count))
        .route("/notifications/read-all", post(mark_all_notifications_read))
        .route("/notifications/{id}/read", post(mark_notification_read))
        .route("/notifications/{id}", delete(delete_notification))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1", notification_routes);

    app.layer(middleware::from_fn_with_state(
        config.requests_logging_level,
        log_requests,
    ))
}

pub async fn run_server(
    config: ServerConfig,
    notification_service: Arc<NotificationService>,
    identity_provider: Arc<dyn IdentityProvider>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, notification_service, identity_provider);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
