//! HTTP surface over the command layer.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    commands,
    core::{
        errors::AppError,
        types::{
            ClearNarrationResponse, Document, GenerateNarrationResponse, HealthResponse,
            ListDecksResponse, SaveDeckRequest, SaveNarrationResponse, SetProviderKeyRequest,
            SetProviderKeyResponse, SlideNarration,
        },
    },
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub project_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderAuth
            | AppError::ProviderRateLimited
            | AppError::ProviderTimeout
            | AppError::ProviderInvalidResponse(_)
            | AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        (status, Json(self)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/tts/cache",
            get(get_narration_cache)
                .post(save_narration_cache)
                .delete(clear_narration_cache),
        )
        .route("/api/tts/generate", post(generate_narration))
        .route("/api/decks", get(list_decks))
        .route("/api/decks/:project_id", get(get_deck).put(save_deck))
        .route("/api/settings/provider-key", put(set_provider_key))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        message: "slidevoice is alive".into(),
    })
}

async fn get_narration_cache(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<SlideNarration>, AppError> {
    let grouped = commands::narration::get_narration_cache(&state, query.project_id.as_deref()).await?;
    Ok(Json(grouped))
}

// Bodies are extracted fallibly so malformed JSON gets the AppError shape.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

// Raw JSON so batch shape errors surface as InvalidInput.
async fn save_narration_cache(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveNarrationResponse>, AppError> {
    let body = json_body(body)?;
    let saved = commands::narration::save_narration_cache(&state, body).await?;
    Ok(Json(saved))
}

async fn clear_narration_cache(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<ClearNarrationResponse>, AppError> {
    let cleared = commands::narration::clear_narration_cache(&state, query.project_id.as_deref()).await?;
    Ok(Json(cleared))
}

async fn generate_narration(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateNarrationResponse>, AppError> {
    let body = json_body(body)?;
    let report = commands::narration::generate_narration(&state, body).await?;
    Ok(Json(report))
}

async fn list_decks(State(state): State<AppState>) -> Result<Json<ListDecksResponse>, AppError> {
    Ok(Json(commands::decks::list_decks(&state).await?))
}

async fn get_deck(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(commands::decks::get_deck(&state, &project_id).await?))
}

async fn save_deck(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    request: Result<Json<SaveDeckRequest>, JsonRejection>,
) -> Result<Json<Document>, AppError> {
    let request = json_body(request)?;
    Ok(Json(commands::decks::save_deck(&state, &project_id, request).await?))
}

async fn set_provider_key(
    request: Result<Json<SetProviderKeyRequest>, JsonRejection>,
) -> Result<Json<SetProviderKeyResponse>, AppError> {
    let request = json_body(request)?;
    Ok(Json(
        commands::settings::set_provider_key(request.provider, request.api_key).await?,
    ))
}
