use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use serendipity_request::{CallContext, RequestExecutor, Transport};
use serendipity_strava::{ClientParams, StravaClient, TokenManager, Tokens};

pub const USER_ID: &str = "user-1";

/// Routes this thread's events into a buffer until the guard drops.
pub fn capture_logs() -> (Arc<Mutex<Vec<u8>>>, tracing::subscriber::DefaultGuard) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer = LogBuffer(buffer.clone());
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

#[derive(Clone)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Remembers every save; fails them all when built with `failing`.
#[derive(Default)]
pub struct RecordingTokenManager {
    saved: Mutex<Vec<(String, Tokens)>>,
    fail: bool,
}

impl RecordingTokenManager {
    pub fn failing() -> Self {
        RecordingTokenManager {
            fail: true,
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Vec<(String, Tokens)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TokenManager for RecordingTokenManager {
    async fn set_user_tokens(
        &self,
        _ctx: &CallContext,
        user_id: &str,
        tokens: &Tokens,
    ) -> anyhow::Result<()> {
        self.saved
            .lock()
            .unwrap()
            .push((user_id.to_string(), tokens.clone()));
        if self.fail {
            anyhow::bail!("database is unavailable");
        }
        Ok(())
    }
}

pub fn params(api_base_url: &str) -> ClientParams {
    ClientParams::new("mockClientId", "mockSecret", "mockRedirecturi").with_api_base_url(api_base_url)
}

pub fn valid_tokens() -> Tokens {
    Tokens::new("old-access", "old-refresh", chrono::Utc::now().timestamp() + 3600)
}

pub fn expired_tokens() -> Tokens {
    Tokens::new("old-access", "old-refresh", chrono::Utc::now().timestamp() - 60)
}

pub fn client<T: Transport>(
    transport: T,
    tokens: Tokens,
    manager: Arc<RecordingTokenManager>,
    params: ClientParams,
) -> StravaClient {
    StravaClient::new(
        USER_ID,
        tokens,
        manager,
        params,
        RequestExecutor::default_for(transport),
    )
}

pub fn refresh_body() -> Value {
    json!({
        "token_type": "Bearer",
        "access_token": "new-access",
        "expires_at": 4102444800i64,
        "expires_in": 21600,
        "refresh_token": "new-refresh"
    })
}

pub fn new_tokens() -> Tokens {
    Tokens::new("new-access", "new-refresh", 4102444800)
}

pub fn activity_body(id: i64) -> Value {
    json!({
        "id": id,
        "name": "Morning Run",
        "distance": 10012.3,
        "moving_time": 3000,
        "elapsed_time": 3100,
        "type": "Run",
        "start_date": "2023-06-01T10:00:00Z",
        "start_date_local": "2023-06-01T06:00:00Z",
        "timezone": "(GMT-05:00) America/New_York",
        "start_latlng": [40.78, -73.99],
        "end_latlng": [40.80, -73.97],
        "map": {"id": "a1", "polyline": "abc", "summary_polyline": "ab"},
        "description": "along the river"
    })
}
