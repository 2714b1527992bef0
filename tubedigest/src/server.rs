use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{catch, catchers, delete, get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::ServerConfig;

use crate::auth::{AuthError, TokenVerifier};
use crate::error::ServiceError;
use crate::service::{SummaryService, RECENT_DAYS};
use crate::storage::{SummaryRecord, SummaryStats};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub service: Arc<SummaryService>,
    pub verifier: Arc<TokenVerifier>,
    /// Overall deadline for one summarize request
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<SummaryService>, verifier: Arc<TokenVerifier>, request_timeout: Duration) -> Self {
        Self {
            started_at: Utc::now(),
            service,
            verifier,
            request_timeout,
        }
    }
}

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Internal server error.")]
    Internal,
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Timeout(_) => Status::GatewayTimeout,
            ApiError::Internal => Status::InternalServerError,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => {
                tracing::warn!(error = %e, "rejected summarize request");
                ApiError::BadRequest(e.to_string())
            }
            ServiceError::Resolution(e) => {
                tracing::error!(error = %e, "summarization error");
                ApiError::BadRequest(e.to_string())
            }
            ServiceError::DeadlineExceeded(d) => {
                ApiError::Timeout(ServiceError::DeadlineExceeded(d).to_string())
            }
            ServiceError::Storage(e) => {
                tracing::error!(error = %format!("{:#}", e), "storage failure");
                ApiError::Internal
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).respond_to(req)
    }
}

/// Authenticated caller, taken from the `Authorization` header.
pub struct AuthUser {
    pub user_id: i64,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, AuthError::NotConfigured));
        };

        match state.verifier.verify_header(req.headers().get_one("Authorization")) {
            Ok(user_id) => Outcome::Success(AuthUser { user_id }),
            Err(e) => {
                tracing::warn!(error = %e, path = %req.uri(), "rejected request credentials");
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    ai_summaries_enabled: bool,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

#[get("/status")]
async fn service_status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        ai_summaries_enabled: state.service.generator().strategy_names().contains(&"llm"),
    })
}

/// Resolve, summarize and store a video for the caller.
#[post("/summaries/summarize", data = "<body>")]
async fn summarize(
    state: &State<AppState>,
    user: AuthUser,
    body: Json<SummarizeRequest>,
) -> Result<Json<SummaryRecord>, ApiError> {
    let url = body.into_inner().url.unwrap_or_default();
    let record = state
        .service
        .summarize_with_deadline(user.user_id, &url, state.request_timeout)
        .await?;
    Ok(Json(record))
}

#[get("/summaries")]
async fn list_summaries(state: &State<AppState>, user: AuthUser) -> Result<Json<Vec<SummaryRecord>>, ApiError> {
    Ok(Json(state.service.list(user.user_id).await?))
}

/// Summaries from the last 7 days.
#[get("/summaries/recent")]
async fn recent(state: &State<AppState>, user: AuthUser) -> Result<Json<Vec<SummaryRecord>>, ApiError> {
    Ok(Json(state.service.list_recent(user.user_id, RECENT_DAYS).await?))
}

#[get("/summaries/stats")]
async fn stats(state: &State<AppState>, user: AuthUser) -> Result<Json<SummaryStats>, ApiError> {
    Ok(Json(state.service.stats(user.user_id).await?))
}

#[get("/summaries/<id>")]
async fn get_summary(state: &State<AppState>, user: AuthUser, id: i64) -> Result<Json<SummaryRecord>, ApiError> {
    state
        .service
        .get(user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Summary not found.".to_string()))
}

#[delete("/summaries/<id>")]
async fn delete_summary(state: &State<AppState>, user: AuthUser, id: i64) -> Result<Status, ApiError> {
    if state.service.delete(user.user_id, id).await? {
        Ok(Status::NoContent)
    } else {
        Err(ApiError::NotFound("Summary not found.".to_string()))
    }
}

/// Clear all of the caller's summaries.
#[delete("/summaries/clear_history")]
async fn clear_history(state: &State<AppState>, user: AuthUser) -> Result<Status, ApiError> {
    state.service.clear_all(user.user_id).await?;
    Ok(Status::NoContent)
}

/// Every error the routes do not answer themselves still gets a JSON body.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let error = match status.code {
        401 => "Authentication credentials were not provided or are invalid.".to_string(),
        404 => "Not found.".to_string(),
        422 => "Request body is invalid.".to_string(),
        _ => status.reason_lossy().to_string(),
    };
    (status, Json(ErrorBody { error }))
}

/// Build the Rocket instance with managed state, routes and catchers.
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![health])
        .mount(
            "/api",
            routes![
                service_status,
                summarize,
                list_summaries,
                recent,
                stats,
                get_summary,
                delete_summary,
                clear_history,
            ],
        )
        .register("/", catchers![default_catcher])
}

/// Launch the server on the configured address. Blocks until Rocket shuts down.
pub async fn launch_rocket(state: AppState, server: &ServerConfig) -> Result<()> {
    let figment = rocket::Config::figment()
        .merge(("address", server.bind.clone()))
        .merge(("port", server.port));

    tracing::info!(bind = %server.bind, port = server.port, "Starting Rocket HTTP server");
    build_rocket(state, figment)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
