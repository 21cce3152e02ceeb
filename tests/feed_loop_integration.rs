//! Integration tests for the full monitor loop and the Gemini backend.
//!
//! Loop tests drive a recorded feed through the replay surface with a stub
//! backend and a real processed-id file. Backend tests run the Gemini
//! client against a mock server and exercise key rotation over the wire.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_responder::composer::{PromptTemplates, ResponseComposer};
use feed_responder::dedup::{DedupStore, JsonFileStore};
use feed_responder::error::{BackendError, GenerationError};
use feed_responder::llm::{CompletionBackend, CredentialPool, GeminiBackend, GenerationClient};
use feed_responder::monitor::{FeedMonitorLoop, MonitorSettings};
use feed_responder::orchestrator::ActionOrchestrator;
use feed_responder::stop::StopSignal;
use feed_responder::surface::{ActionKind, Item, MonitorTarget, ReplaySurface};
use feed_responder::timing::TimingModel;

/// Maximum time any network test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub backend that echoes a fixed reply and counts calls per key.
#[derive(Clone, Default)]
struct StubBackend {
    calls: Arc<Mutex<Vec<String>>>,
    exhausted: Vec<String>,
}

#[async_trait]
impl CompletionBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        credential: &SecretString,
        _prompt: &str,
    ) -> Result<String, BackendError> {
        let key = credential.expose_secret().to_string();
        self.calls.lock().unwrap().push(key.clone());
        if self.exhausted.contains(&key) {
            return Err(BackendError::critical("stub", "RESOURCE_EXHAUSTED: quota exceeded"));
        }
        Ok("\"Nice one\"".to_string())
    }
}

fn build_loop(
    backend: StubBackend,
    keys: &str,
    keywords: &[&str],
    surface: Arc<ReplaySurface>,
    store_path: &Path,
    target: MonitorTarget,
    cycles: u64,
) -> (FeedMonitorLoop, StopSignal) {
    let stop = StopSignal::new();
    let client = GenerationClient::new(
        Box::new(backend),
        CredentialPool::from_csv(keys).unwrap(),
        stop.clone(),
    )
    .with_rotation_pause(Duration::ZERO);
    let composer = ResponseComposer::new(
        client,
        PromptTemplates::new("너는 친근한 친구야."),
        keywords.iter().map(|s| s.to_string()).collect(),
        stop.clone(),
    );
    let orchestrator = ActionOrchestrator::new(
        composer,
        TimingModel::new(StdRng::seed_from_u64(7)),
        StdRng::seed_from_u64(8),
        stop.clone(),
    )
    .with_filter_keyword(target.filter_keyword().map(str::to_string));

    let monitor = FeedMonitorLoop::new(
        orchestrator,
        surface,
        Box::new(JsonFileStore::new(store_path)),
        target,
        stop.clone(),
    )
    .with_settings(MonitorSettings {
        max_cycles: Some(cycles),
        ..Default::default()
    });
    (monitor, stop)
}

fn feed() -> Vec<Item> {
    let mut own = Item::new("mine", "my own post");
    own.is_own = true;
    vec![
        Item::new("p1", "Rust 2024 edition is out, thoughts?"),
        Item::new("p2", "오늘 날씨 정말 좋다"),
        own,
        Item::new("p3", "Anyone tried async closures yet?"),
    ]
}

#[tokio::test(start_paused = true)]
async fn full_loop_responds_records_and_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let store_path = dir.path().join("processed.json");
    let surface = Arc::new(ReplaySurface::new(feed()));
    let backend = StubBackend::default();

    let (monitor, _) = build_loop(
        backend.clone(),
        "k1,k2",
        &["cargo"],
        surface.clone(),
        &store_path,
        MonitorTarget::Home,
        2,
    );
    let summary = monitor.run().await;

    assert_eq!(summary.items_processed, 3);
    assert_eq!(summary.errors, 0);

    let submissions = surface.submissions().await;
    assert_eq!(submissions.len(), 6);
    for id in ["p1", "p2", "p3"] {
        let kinds: Vec<ActionKind> = submissions
            .iter()
            .filter(|s| s.item_id == id)
            .map(|s| s.kind)
            .collect();
        assert_eq!(kinds.len(), 2, "{id} should get both actions");
        assert_ne!(kinds[0], kinds[1]);
    }
    for s in &submissions {
        assert!(s.text.to_lowercase().contains("cargo"), "{:?}", s.text);
        assert!(!s.text.starts_with('"'));
        assert!(s.typing_time > Duration::ZERO);
    }
    assert!(submissions.iter().all(|s| s.item_id != "mine"));

    let stored = JsonFileStore::new(&store_path).load().await;
    assert!(stored.iter().eq(["p1", "p2", "p3"]));
    assert!(backend.calls.lock().unwrap().iter().all(|k| k == "k1"));
}

#[tokio::test(start_paused = true)]
async fn restart_skips_items_processed_by_an_earlier_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let store_path = dir.path().join("processed.json");
    JsonFileStore::new(&store_path)
        .save(&["p1".to_string(), "p3".to_string()].into_iter().collect())
        .await
        .unwrap();

    let surface = Arc::new(ReplaySurface::new(feed()));
    let (monitor, _) = build_loop(
        StubBackend::default(),
        "k1",
        &[],
        surface.clone(),
        &store_path,
        MonitorTarget::Home,
        1,
    );
    let summary = monitor.run().await;

    assert_eq!(summary.items_processed, 1);
    let submissions = surface.submissions().await;
    assert!(submissions.iter().all(|s| s.item_id == "p2"));
    let stored = JsonFileStore::new(&store_path).load().await;
    assert!(stored.iter().eq(["p1", "p3", "p2"]));
}

#[tokio::test(start_paused = true)]
async fn keyword_target_only_acts_on_matching_items() {
    let dir = tempfile::TempDir::new().unwrap();
    let surface = Arc::new(ReplaySurface::new(feed()));
    let target = MonitorTarget::Keyword {
        keyword: "ASYNC".into(),
    };
    let (monitor, _) = build_loop(
        StubBackend::default(),
        "k1",
        &[],
        surface.clone(),
        &dir.path().join("processed.json"),
        target.clone(),
        1,
    );
    let summary = monitor.run().await;

    assert_eq!(surface.current_target().await, Some(target));
    // Non-matching items are still recorded so they are not re-checked.
    assert_eq!(summary.items_processed, 3);
    let submissions = surface.submissions().await;
    assert_eq!(submissions.len(), 2);
    assert!(submissions.iter().all(|s| s.item_id == "p3"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_keys_stop_the_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let store_path = dir.path().join("processed.json");
    let surface = Arc::new(ReplaySurface::new(feed()));
    let backend = StubBackend {
        exhausted: vec!["k1".into(), "k2".into()],
        ..Default::default()
    };

    let (monitor, stop) = build_loop(
        backend.clone(),
        "k1,k2",
        &[],
        surface.clone(),
        &store_path,
        MonitorTarget::Home,
        100,
    );
    let summary = monitor.run().await;

    assert!(stop.is_stopped());
    assert_eq!(summary.cycles, 1);
    assert_eq!(*backend.calls.lock().unwrap(), vec!["k1", "k2"]);
    assert!(surface.submissions().await.is_empty());
    assert!(store_path.exists());
}

// ── Gemini backend over HTTP ────────────────────────────────────────

const GEMINI_PATH: &str = "/models/gemini-test:generateContent";

/// Mount a 429 for `key`.
async fn reject_key(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(header("x-goog-api-key", key))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a successful completion for `key`.
async fn accept_key(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(header("x-goog-api-key", key))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": format!("\"hello from {key}\"\n")}]}
            }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn gemini_client(server: &MockServer, keys: &str, stop: &StopSignal) -> GenerationClient {
    GenerationClient::new(
        Box::new(GeminiBackend::new("gemini-test").with_base_url(server.uri())),
        CredentialPool::from_csv(keys).unwrap(),
        stop.clone(),
    )
    .with_rotation_pause(Duration::ZERO)
}

#[tokio::test]
async fn gemini_backend_rotates_past_rate_limited_key() {
    let server = MockServer::start().await;
    reject_key(&server, "bad").await;
    accept_key(&server, "good").await;
    let stop = StopSignal::new();
    let mut client = gemini_client(&server, "bad,good", &stop);

    let text = timeout(TEST_TIMEOUT, client.generate("hi"))
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(text, "hello from good");
    assert_eq!(client.pool().index(), 1);
    assert!(!stop.is_stopped());
}

#[tokio::test]
async fn gemini_backend_exhaustion_raises_stop() {
    let server = MockServer::start().await;
    reject_key(&server, "a").await;
    reject_key(&server, "b").await;
    let stop = StopSignal::new();
    let mut client = gemini_client(&server, "a,b", &stop);

    let result = timeout(TEST_TIMEOUT, client.generate("hi"))
        .await
        .expect("timed out");
    assert!(matches!(result, Err(GenerationError::Exhausted { pool_size: 2 })));
    assert!(stop.is_stopped());
}
