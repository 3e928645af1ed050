mod chat;
#[cfg(test)]
mod test_support;
mod tracking;
mod training;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use drivetrain_core::artifacts::{ArtifactStore, IndexAttachment};
use drivetrain_core::departments::DepartmentDirectory;
use drivetrain_core::openai::{ChatCompletionEnricher, OpenAiClient};
use drivetrain_core::relay::{AssistantRuns, ChatRelay};
use drivetrain_core::services::StoreHandle;
use drivetrain_core::source::{
    DocumentSource, GoogleDriveSource, ServiceAccountCredentials, ServiceAccountTokenProvider,
};
use drivetrain_core::sync::Reconciler;
use drivetrain_core::tracking::{LearningTracker, PageEnricher};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider seams the handlers run against.
pub struct Adapters {
    pub source: Arc<dyn DocumentSource>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub index: Arc<dyn IndexAttachment>,
    pub runs: Arc<dyn AssistantRuns>,
    pub enricher: Arc<dyn PageEnricher>,
}

#[derive(Clone)]
pub struct AppState {
    departments: Arc<DepartmentDirectory>,
    reconciler: Reconciler,
    relay: ChatRelay,
    tracker: LearningTracker,
    store: StoreHandle,
}

impl AppState {
    pub fn from_adapters(
        adapters: Adapters,
        store: StoreHandle,
        departments: DepartmentDirectory,
    ) -> Self {
        Self {
            departments: Arc::new(departments),
            reconciler: Reconciler::new(
                adapters.source,
                adapters.artifacts,
                adapters.index,
                store.clone(),
            ),
            relay: ChatRelay::new(adapters.runs),
            tracker: LearningTracker::new(store.clone(), adapters.enricher),
            store,
        }
    }

    /// Wire the Google Drive and OpenAI clients from configuration.
    pub fn from_config(config: &AppConfig, store: StoreHandle) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.http_timeout)
            .build()
            .map_err(|error| AppError::Config(format!("HTTP client: {error}")))?;

        let credentials = ServiceAccountCredentials::new(
            config.google_client_email.clone(),
            &config.google_private_key,
        );
        let tokens =
            ServiceAccountTokenProvider::new(client.clone(), credentials, &config.google_token_url);
        let drive = GoogleDriveSource::new(client.clone(), &config.google_drive_api_base, tokens);

        let openai = OpenAiClient::new(client, &config.openai_api_base, &config.openai_api_key)
            .with_processing_poll(config.artifact_poll_policy());
        let enricher = ChatCompletionEnricher::new(openai.clone(), &config.enrichment_model);

        let departments = match &config.departments_file {
            Some(path) => DepartmentDirectory::load(path).map_err(|error| {
                AppError::Config(format!("DEPARTMENTS_FILE {}: {error}", path.display()))
            })?,
            None => {
                tracing::warn!("DEPARTMENTS_FILE not set; department lookups are disabled");
                DepartmentDirectory::default()
            }
        };

        let openai = Arc::new(openai);
        Ok(Self::from_adapters(
            Adapters {
                source: Arc::new(drive),
                artifacts: openai.clone(),
                index: openai.clone(),
                runs: openai,
                enricher: Arc::new(enricher),
            },
            store,
            departments,
        ))
    }
}

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/departments", get(list_departments))
        .route("/train", post(training::train))
        .route("/admin/flush-training", post(training::flush_training))
        .route("/chat/stream", post(chat::stream))
        .route("/chat/thread-history", post(chat::thread_history))
        .route("/tracking/ingest", post(tracking::ingest))
        .route("/tracking/records", get(tracking::records));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any)
                .expose_headers([chat::THREAD_ID_HEADER]),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    /// Whether the record store connection is currently open
    store: &'static str,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = if state.store.is_connected().await {
        "connected"
    } else {
        "idle"
    };
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        store,
    })
}

#[derive(Debug, Serialize)]
struct DepartmentsResponse {
    departments: Vec<String>,
}

async fn list_departments(State(state): State<AppState>) -> Json<DepartmentsResponse> {
    Json(DepartmentsResponse {
        departments: state.departments.keys(),
    })
}
