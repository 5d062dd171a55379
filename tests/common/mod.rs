#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use mosaic::config::Config;
use mosaic::error::{CaptureError, NotifyError, StorageError};
use mosaic::kiosk::camera::{Camera, MediaStream};
use mosaic::kiosk::ids::IdGenerator;
use mosaic::kiosk::notifier::Notifier;
use mosaic::kiosk::storage::{ObjectStorage, UploadOptions, UploadedObject};
use mosaic::kiosk::store::SubmissionStore;
use mosaic::kiosk::{Kiosk, KioskServices};
use mosaic::models::{NewSubmission, Submission};
use mosaic::state::SharedState;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running relay hub bound to a random local port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect a WebSocket client and wait until the hub has registered it.
    pub async fn connect(&self) -> WsClient {
        let before = self.state.hub.connection_count();
        let (ws, _) = connect_async(self.ws_url())
            .await
            .expect("websocket connect failed");
        self.wait_for_connections(before + 1).await;
        ws
    }

    pub async fn wait_for_connections(&self, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.state.hub.connection_count() != expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "hub never reached {expected} connections (has {})",
                self.state.hub.connection_count()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub async fn spawn_app() -> TestApp {
    let config = Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
    };

    let (app, state) = mosaic::build_app(config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        state,
        client: Client::new(),
    }
}

// ── Fake Supabase ───────────────────────────────────────────────

/// One request received by the fake storage API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct FakeSupabase {
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Answer uploads with a 500 while set.
    pub fail: Arc<AtomicBool>,
}

impl FakeSupabase {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record_upload(
    State(api): State<FakeSupabase>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    api.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        headers,
        body,
    });

    if api.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "bucket on fire".to_string());
    }
    let key = uri.path().trim_start_matches("/storage/v1/object/");
    (StatusCode::OK, format!(r#"{{"Key":"{key}"}}"#))
}

/// Serve a recording stand-in for the storage REST API on a random local port.
pub async fn spawn_supabase() -> (SocketAddr, FakeSupabase) {
    let api = FakeSupabase::default();
    let app = Router::new()
        .route("/storage/v1/object/{*rest}", post(record_upload))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (addr, api)
}

// ── Test database ───────────────────────────────────────────────

/// A freshly migrated, uniquely named Postgres database.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a test database next to `DATABASE_URL`. Returns `None` when no database is configured.
pub async fn spawn_db() -> Option<TestDb> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let db_name = format!("mosaic_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    Some(TestDb { pool, db_name })
}

/// Drop the test database after the test completes.
pub async fn cleanup_db(db: TestDb) {
    db.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for cleanup");
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        db.db_name
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}

// ── WebSocket helpers ───────────────────────────────────────────

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::text(text.to_string()))
        .await
        .expect("websocket send failed");
}

/// Next JSON text frame, or None if nothing arrives within `wait`.
pub async fn next_text(ws: &mut WsClient, wait: Duration) -> Option<String> {
    loop {
        let msg = tokio::time::timeout(wait, ws.next()).await.ok()??.ok()?;
        if let Message::Text(text) = msg {
            return Some(text.as_str().to_string());
        }
    }
}

pub async fn next_json(ws: &mut WsClient, wait: Duration) -> Option<Value> {
    let text = next_text(ws, wait).await?;
    Some(serde_json::from_str(&text).expect("hub sent invalid JSON"))
}

pub fn assert_v4_uuid(id: &str) {
    assert_eq!(id.len(), 36, "bad length: {id}");
    for (i, c) in id.chars().enumerate() {
        match i {
            8 | 13 | 18 | 23 => assert_eq!(c, '-', "expected hyphen at {i}: {id}"),
            14 => assert_eq!(c, '4', "bad version nibble: {id}"),
            19 => assert!(matches!(c, '8' | '9' | 'a' | 'b'), "bad variant nibble: {id}"),
            _ => assert!(c.is_ascii_hexdigit() && !c.is_ascii_uppercase(), "bad char: {id}"),
        }
    }
}

// ── Kiosk fakes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageMode {
    Ok,
    Reject,
    NoPublicUrl,
    EmptyPath,
}

pub struct FakeStorage {
    pub mode: Mutex<StorageMode>,
    pub uploads: Mutex<Vec<(String, Bytes, UploadOptions)>>,
    /// When set, uploads wait until `release` is notified.
    pub gate: Option<Arc<Notify>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(StorageMode::Ok),
            uploads: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn set_mode(&self, mode: StorageMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        options: &UploadOptions,
    ) -> Result<UploadedObject, StorageError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mode = *self.mode.lock().unwrap();
        if mode == StorageMode::Reject {
            return Err(StorageError::Rejected {
                status: 500,
                body: "storage down".to_string(),
            });
        }

        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), body, options.clone()));

        let path = if mode == StorageMode::EmptyPath {
            String::new()
        } else {
            path.to_string()
        };
        Ok(UploadedObject { path })
    }

    fn public_url(&self, path: &str) -> Option<String> {
        if *self.mode.lock().unwrap() == StorageMode::NoPublicUrl {
            return None;
        }
        Some(format!("https://cdn.test/mosaic/{path}"))
    }
}

pub struct FakeStore {
    pub rows: Mutex<Vec<Submission>>,
    pub fail: AtomicBool,
    pub return_nothing: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            return_nothing: AtomicBool::new(false),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionStore for FakeStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<Option<Submission>, sqlx::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("insert rejected".to_string()));
        }

        let row = Submission {
            id: Uuid::new_v4(),
            user_id: submission.user_id.clone(),
            user_message: submission.user_message.clone(),
            image_url: submission.image_url.clone(),
            created_at: chrono::Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());

        if self.return_nothing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(row))
    }
}

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Connect("hub unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

/// Counts opens and stops so tests can check the device is released.
pub struct FakeCamera {
    pub available: bool,
    pub frame: Bytes,
    pub opened: Arc<AtomicUsize>,
    pub stopped: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(frame: &[u8]) -> Self {
        Self {
            available: true,
            frame: Bytes::copy_from_slice(frame),
            opened: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(b"")
        }
    }

    pub fn live_streams(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.stopped.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    frame: Bytes,
    stopped: Arc<AtomicUsize>,
    done: bool,
}

#[async_trait]
impl MediaStream for FakeStream {
    async fn capture_frame(&mut self) -> Result<Bytes, CaptureError> {
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        if !self.done {
            self.done = true;
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn open(&self) -> Result<Box<dyn MediaStream>, CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable("permission denied".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            frame: self.frame.clone(),
            stopped: self.stopped.clone(),
            done: false,
        }))
    }
}

/// A kiosk wired to fakes, with handles to inspect them.
pub struct TestKiosk {
    pub kiosk: Kiosk,
    pub camera: Arc<FakeCamera>,
    pub storage: Arc<FakeStorage>,
    pub store: Arc<FakeStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub const RESET_DELAY: Duration = Duration::from_secs(10);

pub fn kiosk_with(camera: FakeCamera, storage: FakeStorage) -> TestKiosk {
    let camera = Arc::new(camera);
    let storage = Arc::new(storage);
    let store = Arc::new(FakeStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let kiosk = Kiosk::new(
        KioskServices {
            camera: camera.clone(),
            storage: storage.clone(),
            store: store.clone(),
            notifier: notifier.clone(),
            ids: Arc::new(IdGenerator::Secure),
        },
        RESET_DELAY,
    );

    TestKiosk {
        kiosk,
        camera,
        storage,
        store,
        notifier,
    }
}

pub fn test_kiosk() -> TestKiosk {
    kiosk_with(FakeCamera::new(b"\xff\xd8jpeg-frame\xff\xd9"), FakeStorage::new())
}

/// Write a small image file and return the temp dir keeping it alive.
pub fn image_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}
