use std::fmt;

use serde::Deserialize;

/// Base URL of the Strava REST API.
pub const STRAVA_API_BASE_URL: &str = "https://www.strava.com/api/v3";
/// Replays of a domain call allowed after Strava rejected the access token.
pub const MAX_UNAUTHORIZED_RETRIES: u32 = 1;

/// Application credentials and knobs of a [`StravaClient`](crate::StravaClient).
///
/// Deserializes from the application's configuration; every field is optional there and falls
/// back to [`ClientParams::default`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientParams {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub api_base_url: String,
    pub max_unauthorized_retries: u32,
}

impl ClientParams {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        ClientParams {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..ClientParams::default()
        }
    }

    /// Points the client at another API root, e.g. a mock server.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl Default for ClientParams {
    fn default() -> Self {
        ClientParams {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            api_base_url: STRAVA_API_BASE_URL.to_string(),
            max_unauthorized_retries: MAX_UNAUTHORIZED_RETRIES,
        }
    }
}

impl fmt::Debug for ClientParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientParams")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_base_url", &self.api_base_url)
            .field("max_unauthorized_retries", &self.max_unauthorized_retries)
            .finish()
    }
}
