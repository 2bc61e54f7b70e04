#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::navigation::Navigator;
use bridge_traits::storage::SessionStorage;
use bridge_traits::time::Clock;
use chrono::{DateTime, TimeZone, Utc};
use core_auth::{AuthorizedClient, SessionManager, SessionState, Token, TokenStore};
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

pub const ISSUED: i64 = 1_700_000_000;
pub const ROOT_URL: &str = "http://localhost:3000/";
pub const REFRESH_URL: &str = "http://localhost:8888/refresh_token";
pub const LOGIN_URL: &str = "http://localhost:8888/login";
pub const STORAGE_KEY: &str = "spotify_session";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    pub async fn record(&self) -> Option<serde_json::Value> {
        self.raw(STORAGE_KEY)
            .await
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values.lock().await.insert(key.into(), value.into());
        Ok(())
    }

    async fn remove(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

pub struct RecordingNavigator {
    url: std::sync::Mutex<String>,
    pub replaced: std::sync::Mutex<Vec<String>>,
    pub redirects: std::sync::Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(url: &str) -> Self {
        Self {
            url: std::sync::Mutex::new(url.to_string()),
            replaced: Default::default(),
            redirects: Default::default(),
        }
    }

    pub fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_url(&self) -> BridgeResult<String> {
        Ok(self.url())
    }

    fn replace_url(&self, url: &str) -> BridgeResult<()> {
        *self.url.lock().unwrap() = url.to_string();
        self.replaced.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn redirect(&self, url: &str) -> BridgeResult<()> {
        self.redirects.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: std::sync::Mutex::new(at(secs)),
        }
    }

    pub fn set(&self, secs: i64) {
        *self.now.lock().unwrap() = at(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// HTTP fake answering from per-URL queues and recording every request.
#[derive(Default)]
pub struct ScriptedHttp {
    script: std::sync::Mutex<HashMap<String, VecDeque<BridgeResult<HttpResponse>>>>,
    requests: std::sync::Mutex<Vec<HttpRequest>>,
    delay: std::sync::Mutex<Option<Duration>>,
    gate: std::sync::Mutex<Option<Arc<Notify>>>,
    pub started: Arc<Notify>,
}

impl ScriptedHttp {
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(HttpResponse::new(status, body.to_string())));
    }

    pub fn fail(&self, url: &str, error: BridgeError) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Every response waits this long before being returned.
    pub fn delay_responses(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Responses are withheld until the returned handle is notified.
    pub fn hold_responses(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.script
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(BridgeError::OperationFailed(format!("unscripted {}", url))))
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<ManualClock>,
    pub http: Arc<ScriptedHttp>,
    pub events: EventBus,
    pub manager: Arc<SessionManager>,
    pub config: SessionConfig,
}

impl Harness {
    pub fn new(url: &str, now: i64) -> Self {
        let config = SessionConfig::builder().build().unwrap();
        let storage = Arc::new(MemoryStorage::default());
        let navigator = Arc::new(RecordingNavigator::at(url));
        let clock = Arc::new(ManualClock::at(now));
        let http = Arc::new(ScriptedHttp::default());
        let events = EventBus::new(64);

        let manager = Arc::new(SessionManager::from_config(
            &config,
            http.clone(),
            storage.clone(),
            navigator.clone(),
            clock.clone(),
            events.clone(),
        ));

        Self {
            storage,
            navigator,
            clock,
            http,
            events,
            manager,
            config,
        }
    }

    pub async fn seed(&self, token: &Token) {
        TokenStore::new(self.storage.clone(), STORAGE_KEY)
            .save(token)
            .await
            .unwrap();
    }

    pub fn client(&self) -> AuthorizedClient {
        AuthorizedClient::new(
            self.manager.clone(),
            self.http.clone(),
            self.config.api_base_url.clone(),
        )
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }
}

/// Session events received so far, in order.
pub fn drain_session_events(stream: &mut EventStream) -> Vec<SessionEvent> {
    stream
        .drain()
        .into_iter()
        .map(|CoreEvent::Session(event)| event)
        .collect()
}

/// Polls until the manager reports `expected`, failing after one second.
pub async fn wait_for_state(manager: &SessionManager, expected: SessionState) {
    let reached = tokio::time::timeout(Duration::from_secs(1), async {
        while manager.state().await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(reached.is_ok(), "session never reached {:?}", expected);
}

pub fn stored_token(access: &str, refresh: &str) -> Token {
    Token::new(access, at(ISSUED), 3600, Some(refresh.to_string()))
}
