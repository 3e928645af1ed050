//! In-process fakes and request helpers for router tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use drivetrain_core::artifacts::{ArtifactStore, IndexAttachment};
use drivetrain_core::departments::DepartmentDirectory;
use drivetrain_core::models::Enrichment;
use drivetrain_core::relay::{AssistantRuns, RunEvent, RunEventStream, ThreadMessage};
use drivetrain_core::services::StoreHandle;
use drivetrain_core::source::{DocumentSource, SourceEntry};
use drivetrain_core::tracking::PageEnricher;
use drivetrain_core::{Error, Result};
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tower::ServiceExt;

use super::{app_router, Adapters, AppState};

pub const DIRECTORY: &str = r#"{
    "hr": { "folderId": "folder-hr", "vectorStoreId": "vs_hr", "assistantId": "asst_hr" },
    "marketing": { "folderId": "folder-mkt", "vectorStoreId": "vs_mkt", "assistantId": "asst_mkt" }
}"#;

pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct FakeSource {
    pub entries: Mutex<Vec<SourceEntry>>,
    pub fail_listing: bool,
    pub log: CallLog,
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<SourceEntry>> {
        self.log.lock().unwrap().push(format!("list:{folder_id}"));
        if self.fail_listing {
            return Err(Error::NotFound(format!("folder {folder_id}")));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn download(&self, document_id: &str) -> Result<Vec<u8>> {
        Ok(document_id.as_bytes().to_vec())
    }

    async fn export_plain_text(&self, document_id: &str) -> Result<Vec<u8>> {
        Ok(document_id.as_bytes().to_vec())
    }
}

#[derive(Default)]
pub struct FakeArtifacts {
    pub failing: HashSet<String>,
    pub log: CallLog,
}

#[async_trait]
impl ArtifactStore for FakeArtifacts {
    async fn upload(&self, name: &str, _bytes: Vec<u8>) -> Result<String> {
        self.log.lock().unwrap().push(format!("upload:{name}"));
        if self.failing.contains(name) {
            return Err(Error::ArtifactFailed(format!("file-{name}")));
        }
        Ok(format!("file-{name}"))
    }

    async fn delete(&self, artifact_id: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("delete:{artifact_id}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeIndex {
    pub log: CallLog,
}

#[async_trait]
impl IndexAttachment for FakeIndex {
    async fn attach(&self, index_id: &str, artifact_id: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("attach:{index_id}:{artifact_id}"));
        Ok(())
    }

    async fn detach(&self, index_id: &str, artifact_id: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("detach:{index_id}:{artifact_id}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRuns {
    pub events: Vec<std::result::Result<RunEvent, String>>,
    pub fail_start: bool,
    pub fail_history: bool,
    pub log: CallLog,
}

#[async_trait]
impl AssistantRuns for FakeRuns {
    async fn create_thread(&self) -> Result<String> {
        self.log.lock().unwrap().push("create_thread".to_string());
        Ok("thread_new".to_string())
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("message:{thread_id}:{content}"));
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        self.log
            .lock()
            .unwrap()
            .push(format!("run:{thread_id}:{assistant_id}"));
        if self.fail_start {
            return Err(Error::Upstream {
                service: "OpenAI",
                message: "HTTP 500: upstream secret detail".to_string(),
            });
        }
        let events: Vec<Result<RunEvent>> = self
            .events
            .iter()
            .cloned()
            .map(|event| event.map_err(Error::Timeout))
            .collect();
        Ok(stream::iter(events).boxed())
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        if self.fail_history {
            return Err(Error::NotFound("thread".to_string()));
        }
        Ok(vec![
            ThreadMessage {
                role: "user".to_string(),
                content: "Hi".to_string(),
                timestamp: 1_700_000_000,
            },
            ThreadMessage {
                role: "assistant".to_string(),
                content: "Hello!".to_string(),
                timestamp: 1_700_000_005,
            },
        ])
    }
}

pub struct FakeEnricher;

#[async_trait]
impl PageEnricher for FakeEnricher {
    async fn enrich(&self, _page_content: &str) -> Result<Enrichment> {
        Ok(Enrichment {
            title: "Rust book".to_string(),
            description: "Learn Rust.".to_string(),
            subject: "Software Development".to_string(),
            confidence: "High".to_string(),
        })
    }
}

pub struct TestApp {
    pub source: Arc<FakeSource>,
    pub artifacts: Arc<FakeArtifacts>,
    pub index: Arc<FakeIndex>,
    pub runs: Arc<FakeRuns>,
    pub store: StoreHandle,
    pub log: CallLog,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(
            FakeSource::default(),
            FakeArtifacts::default(),
            FakeRuns::default(),
        )
    }

    pub fn with(source: FakeSource, artifacts: FakeArtifacts, runs: FakeRuns) -> Self {
        let log = CallLog::default();
        Self {
            source: Arc::new(FakeSource {
                log: log.clone(),
                ..source
            }),
            artifacts: Arc::new(FakeArtifacts {
                log: log.clone(),
                ..artifacts
            }),
            index: Arc::new(FakeIndex { log: log.clone() }),
            runs: Arc::new(FakeRuns {
                log: log.clone(),
                ..runs
            }),
            store: StoreHandle::in_memory(),
            log,
        }
    }

    /// Swap the in-memory record store for `store`.
    pub fn with_store(mut self, store: StoreHandle) -> Self {
        self.store = store;
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState::from_adapters(
            Adapters {
                source: self.source.clone(),
                artifacts: self.artifacts.clone(),
                index: self.index.clone(),
                runs: self.runs.clone(),
                enricher: Arc::new(FakeEnricher),
            },
            self.store.clone(),
            DepartmentDirectory::from_json(DIRECTORY).unwrap(),
        );
        app_router(state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

pub fn entry(id: &str, name: &str, modified: &str) -> SourceEntry {
    SourceEntry {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        mime_type: Some("application/pdf".to_string()),
        modified_time: Some(modified.to_string()),
    }
}

pub async fn post_raw(router: Router, uri: &str, body: impl Into<Body>) -> Response {
    router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn post_json(router: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = post_raw(router, uri, body.to_string()).await;
    let status = response.status();
    let text = body_text(response).await;
    (status, serde_json::from_str(&text).unwrap())
}

pub async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let text = body_text(response).await;
    (status, serde_json::from_str(&text).unwrap())
}
