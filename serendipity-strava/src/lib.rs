//! Strava API client that keeps a user's OAuth tokens alive.
//!
//! [`StravaClient`] sends its calls through a [`serendipity_request::RequestExecutor`], so
//! they get the executor's retries on server errors. On top of that it refreshes expired
//! access tokens before a call and replays a call once when Strava rejects the token.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serendipity_request::{default_http_client, CallContext};
//! use serendipity_strava::{ActivityQuery, ClientParams, StravaClient, TokenManager, Tokens};
//!
//! struct Db;
//!
//! #[async_trait::async_trait]
//! impl TokenManager for Db {
//!     async fn set_user_tokens(
//!         &self,
//!         _ctx: &CallContext,
//!         _user_id: &str,
//!         _tokens: &Tokens,
//!     ) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let params = ClientParams::new("client-id", "client-secret", "https://app.example/callback");
//! let tokens = Tokens::new("access", "refresh", 1_700_000_000);
//! let mut client =
//!     StravaClient::with_transport("user-1", tokens, Arc::new(Db), params, default_http_client()?);
//!
//! let activities = client
//!     .list_activities(&CallContext::new(), &ActivityQuery::default().page(1, 30))
//!     .await?;
//! println!("{} activities", activities.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod model;
mod oauth;
mod tokens;

pub use client::StravaClient;
pub use config::{ClientParams, MAX_UNAUTHORIZED_RETRIES, STRAVA_API_BASE_URL};
pub use error::{Error, Result};
pub use model::{
    ActivityMap, ActivityQuery, Athlete, DetailedActivity, MetaAthlete, RefreshResponse, Route,
    SummaryActivity, TokenResponse,
};
pub use oauth::{
    authorization_url, Platform, ANDROID_AUTHORIZE_URI, IOS_AUTHORIZE_URI, WEB_AUTHORIZE_URI,
};
pub use tokens::{TokenManager, Tokens};
